//! Re-run reconciliation checked over every small status history.

use adfreport::model::{ActivityOutcome, ActivityStatus, RunSnapshot};
use adfreport::reconcile::{backfill_not_started, reconcile};
use chrono::{DateTime, Duration, Utc};

/// Per-activity state in one snapshot; `None` means the activity is absent.
const STATES: [Option<ActivityStatus>; 4] = [
    None,
    Some(ActivityStatus::Succeeded),
    Some(ActivityStatus::Failed),
    Some(ActivityStatus::InProgress),
];

const NAMES: [&str; 2] = ["X", "Y"];

fn requested() -> Vec<String> {
    let mut names: Vec<String> = NAMES.iter().map(|n| n.to_string()).collect();
    names.push("Never".to_string());
    names
}

fn base() -> DateTime<Utc> {
    "2021-03-25T17:00:00Z".parse().unwrap()
}

fn snapshot(index: usize, states: &[Option<ActivityStatus>]) -> RunSnapshot {
    let started = base() + Duration::hours(index as i64);
    let outcomes = NAMES.iter().zip(states).filter_map(|(name, state)| {
        state.map(|status| {
            let mut o = ActivityOutcome::not_started(*name);
            o.status = status;
            o.started_at = Some(started);
            o.error = (status == ActivityStatus::Failed).then(|| format!("failed in run {index}"));
            o
        })
    });
    RunSnapshot::new(format!("run-{index}"), started, outcomes)
}

/// Every snapshot a run can produce for `NAMES`.
fn all_snapshots(index: usize) -> Vec<RunSnapshot> {
    let mut out = Vec::new();
    for x in STATES {
        for y in STATES {
            out.push(snapshot(index, &[x, y]));
        }
    }
    out
}

/// Every history of `len` snapshots.
fn histories(len: usize) -> Vec<Vec<RunSnapshot>> {
    let mut acc: Vec<Vec<RunSnapshot>> = vec![Vec::new()];
    for index in 0..len {
        acc = acc
            .into_iter()
            .flat_map(|prefix| {
                all_snapshots(index).into_iter().map(move |s| {
                    let mut next = prefix.clone();
                    next.push(s);
                    next
                })
            })
            .collect();
    }
    acc
}

#[test]
fn test_single_run_is_its_backfilled_snapshot() {
    for history in histories(1) {
        let report = reconcile(&history, &requested());
        assert_eq!(
            report.outcomes(),
            &backfill_not_started(history[0].outcomes(), &requested())
        );
    }
}

#[test]
fn test_never_seen_activity_is_not_started() {
    for len in 1..=3 {
        for history in histories(len) {
            let report = reconcile(&history, &requested());
            assert_eq!(report.get("Never").unwrap().status, ActivityStatus::NotStarted);
            assert_eq!(report.len(), requested().len());
        }
    }
}

#[test]
fn test_success_is_never_overwritten() {
    for history in histories(3) {
        let report = reconcile(&history, &requested());
        for name in NAMES {
            let first_success = history
                .iter()
                .find(|s| s.get(name).is_some_and(|o| o.status.is_succeeded()));
            if let Some(snapshot) = first_success {
                assert_eq!(report.get(name), snapshot.get(name), "{name} in {history:?}");
            }
        }
    }
}

#[test]
fn test_runs_after_full_success_are_ignored() {
    for history in histories(2) {
        // "Never" would stay pending forever, so leave it out here.
        let names: Vec<String> = NAMES.iter().map(|n| n.to_string()).collect();
        let settled = reconcile(&history, &names);
        let all_done = settled.outcomes().values().all(|o| o.status.is_succeeded());
        if !all_done {
            continue;
        }
        for extra in all_snapshots(2) {
            let mut longer = history.clone();
            longer.push(extra);
            assert_eq!(reconcile(&longer, &names), settled);
        }
    }
}

#[test]
fn test_reconciliation_is_repeatable() {
    for history in histories(2) {
        assert_eq!(reconcile(&history, &requested()), reconcile(&history, &requested()));
    }
}

#[test]
fn test_failed_then_rerun_example() {
    let a = snapshot(0, &[Some(ActivityStatus::Failed), Some(ActivityStatus::Succeeded)]);
    let b = snapshot(1, &[Some(ActivityStatus::Succeeded), None]);
    let names: Vec<String> = NAMES.iter().map(|n| n.to_string()).collect();

    let report = reconcile(&[a.clone(), b.clone()], &names);
    assert_eq!(report.get("X"), b.get("X"));
    assert_eq!(report.get("Y"), a.get("Y"));
}

#[test]
fn test_nothing_started_yet() {
    let empty = RunSnapshot::new("run-0", base(), Vec::new());
    let report = reconcile(&[empty], &requested());
    assert!(report
        .outcomes()
        .values()
        .all(|o| o.status == ActivityStatus::NotStarted));
}
