//! Re-run reconciliation.
//!
//! A pipeline that failed part-way is re-triggered; each re-run only retries
//! the work that did not succeed before. Folding the runs of a re-run group
//! oldest first, an activity's entry is only replaced while it is still not
//! `Succeeded`, so a success is never clobbered by a later run that did not
//! execute (or misreports) that activity.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{ActivityOutcome, RunSnapshot};

/// Merged view of a re-run group: one outcome per requested activity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconciledReport {
    outcomes: BTreeMap<String, ActivityOutcome>,
}

impl ReconciledReport {
    pub fn get(&self, name: &str) -> Option<&ActivityOutcome> {
        self.outcomes.get(name)
    }

    pub fn outcomes(&self) -> &BTreeMap<String, ActivityOutcome> {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Add a `NotStarted` entry for every requested name missing from `outcomes`.
/// Existing entries are kept as they are.
pub fn backfill_not_started(
    outcomes: &BTreeMap<String, ActivityOutcome>,
    requested: &[String],
) -> BTreeMap<String, ActivityOutcome> {
    let mut filled = outcomes.clone();
    for name in requested {
        filled
            .entry(name.clone())
            .or_insert_with(|| ActivityOutcome::not_started(name.as_str()));
    }
    filled
}

/// Fold `snapshots` (oldest first) into one outcome per requested activity.
///
/// Stops as soon as nothing is pending; whatever is still pending when the
/// snapshots run out keeps the status of the last snapshot that was looked at.
pub fn reconcile(snapshots: &[RunSnapshot], requested: &[String]) -> ReconciledReport {
    let Some((first, rest)) = snapshots.split_first() else {
        return ReconciledReport {
            outcomes: backfill_not_started(&BTreeMap::new(), requested),
        };
    };

    let mut outcomes = backfill_not_started(first.outcomes(), requested);
    let mut pending: Vec<String> = outcomes
        .values()
        .filter(|o| !o.status.is_succeeded())
        .map(|o| o.name.clone())
        .collect();

    for snapshot in rest {
        if pending.is_empty() {
            debug!(run_id = %snapshot.run_id(), "All activities succeeded, later runs not consulted");
            break;
        }

        let next = backfill_not_started(snapshot.outcomes(), requested);
        let mut still_pending = Vec::new();
        for name in pending {
            // Names outside `requested` can only come from the first run.
            let outcome = next
                .get(&name)
                .cloned()
                .unwrap_or_else(|| ActivityOutcome::not_started(name.as_str()));
            if !outcome.status.is_succeeded() {
                still_pending.push(name.clone());
            }
            outcomes.insert(name, outcome);
        }
        debug!(run_id = %snapshot.run_id(), pending = still_pending.len(), "Merged re-run");
        pending = still_pending;
    }

    ReconciledReport { outcomes }
}
