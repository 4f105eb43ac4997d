//! Data-load tracker printout.
//!
//! Works on rows already exported from the tracker spreadsheet (a JSON array
//! of objects keyed by flattened column header).

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

pub type TrackerRow = Map<String, Value>;

pub const OWNER_COLUMN: &str = "Owner";
pub const STATUS_COLUMN: &str = "Status";
pub const SERVICES_COLUMN: &str = "Services";

/// Columns printed for each matching row, in order.
pub const PROJECTED_COLUMNS: [&str; 14] = [
    "ID_Desc_Ref",
    "ENV",
    "Country",
    "type",
    "BS-TS",
    "Dataload-request",
    "Dataload-Plan-weekday",
    "Dataload-Plan-date",
    "Dataload-Plan-triggered time",
    "Services",
    "Flipped-required-Required",
    "Flipped-required-status",
    "Dependencies-Step",
    "Dependencies-status",
];

const MISSING: &str = "N/A";

/// A filtered row, projected to `PROJECTED_COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerEntry {
    pub fields: Vec<(String, String)>,
}

pub fn load_rows(path: &Path) -> Result<Vec<TrackerRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tracker export: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse tracker export: {}", path.display()))
}

/// Absent and null cells are missing; a blank string is a value.
fn cell(row: &TrackerRow, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Rows whose owner contains `owner` and whose status equals `status`, both
/// case-insensitively.
pub fn filter_rows(rows: &[TrackerRow], owner: &str, status: &str) -> Vec<TrackerEntry> {
    let owner = owner.to_lowercase();
    let status = status.to_lowercase();

    rows.iter()
        .filter(|row| {
            let row_owner = cell(row, OWNER_COLUMN).unwrap_or_default().to_lowercase();
            let row_status = cell(row, STATUS_COLUMN).unwrap_or_default().to_lowercase();
            row_owner.contains(&owner) && row_status == status
        })
        .map(|row| TrackerEntry {
            fields: PROJECTED_COLUMNS
                .iter()
                .map(|col| {
                    let value = cell(row, col).unwrap_or_else(|| MISSING.to_string());
                    (col.to_string(), value)
                })
                .collect(),
        })
        .collect()
}

pub fn print_rows(entries: &[TrackerEntry], out: &mut impl Write) -> std::io::Result<()> {
    let rule = "+".repeat(100);
    writeln!(out, "{rule}")?;
    for entry in entries {
        for (column, value) in &entry.fields {
            let value = if column == SERVICES_COLUMN {
                value.replace('\n', ", ")
            } else {
                value.clone()
            };
            writeln!(out, "{:30} : {:50}", column, value)?;
        }
        writeln!(out, "{rule}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<TrackerRow> {
        let value = json!([
            { "Owner": "Regina Gurung", "Status": "StandBy", "ID_Desc_Ref": "DL-1",
              "Services": "sales\nstock", "Dataload-Plan-date": "2021-03-26" },
            { "Owner": "someone else", "Status": "StandBy", "ID_Desc_Ref": "DL-2" },
            { "Owner": "REGINA", "Status": "Done", "ID_Desc_Ref": "DL-3" },
            { "Owner": "regina", "Status": "standby", "ID_Desc_Ref": "DL-4", "ENV": null, "Country": 44,
              "type": "" }
        ]);
        serde_json::from_value(value).unwrap()
    }

    fn field<'a>(entry: &'a TrackerEntry, column: &str) -> &'a str {
        entry
            .fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let matched = filter_rows(&rows(), "regina", "STANDBY");
        let ids: Vec<&str> = matched.iter().map(|e| field(e, "ID_Desc_Ref")).collect();
        assert_eq!(ids, vec!["DL-1", "DL-4"]);
    }

    #[test]
    fn test_projection_fills_missing_cells() {
        let matched = filter_rows(&rows(), "regina", "standby");
        let entry = &matched[1];
        assert_eq!(entry.fields.len(), PROJECTED_COLUMNS.len());
        assert_eq!(field(entry, "ENV"), "N/A");
        assert_eq!(field(entry, "Country"), "44");
        assert_eq!(field(entry, "Dependencies-status"), "N/A");
        assert_eq!(field(entry, "type"), "");
        assert!(entry.fields.iter().all(|(c, _)| c != "Owner" && c != "Status"));
    }

    #[test]
    fn test_print_joins_services() {
        let matched = filter_rows(&rows(), "gurung", "standby");
        let mut out = Vec::new();
        print_rows(&matched, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(&"+".repeat(100)));
        assert!(text.contains("sales, stock"));
        assert!(text.contains("Dataload-Plan-date"));
        assert!(text.contains("2021-03-26"));
    }

    #[test]
    fn test_load_rows_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"[{"Owner": "regina", "Status": "StandBy"}]"#).unwrap();
        assert_eq!(load_rows(file.path()).unwrap().len(), 1);
    }
}
