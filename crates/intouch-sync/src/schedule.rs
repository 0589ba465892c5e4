//! Recurring sync scheduling.

use chrono::{DateTime, Duration, Utc};
use intouch_db::sync_runs::{SyncRun, SyncRunStatus};

/// Returns true if `next_run_at` is at or before `now`.
pub fn is_job_due(next_run_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    next_run_at <= now
}

/// `from + interval_hours`.
pub fn next_run_after(from: DateTime<Utc>, interval_hours: u64) -> DateTime<Utc> {
    let hours = i64::try_from(interval_hours).unwrap_or(i64::MAX);
    Duration::try_hours(hours)
        .and_then(|interval| from.checked_add_signed(interval))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// When the first scheduled run should start given the most recent run.
///
/// A completed run pushes the first run out by one interval from its start;
/// anything else (no run yet, failed, cancelled, interrupted) is due now.
pub fn first_run_at(
    latest: Option<&SyncRun>,
    interval_hours: u64,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match latest {
        Some(run) if run.status == SyncRunStatus::Completed => {
            next_run_after(run.started_at, interval_hours).max(now)
        }
        _ => now,
    }
}

/// How long to sleep before `next_run_at`, zero if already due.
pub fn delay_until(next_run_at: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    if is_job_due(next_run_at, now) {
        return std::time::Duration::ZERO;
    }
    (next_run_at - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use intouch_db::sync_runs::SyncRunStats;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn run(started_at: &str, status: SyncRunStatus) -> SyncRun {
        SyncRun {
            id: "run-1".to_string(),
            started_at: at(started_at),
            completed_at: None,
            status,
            stats: SyncRunStats::default(),
            error_message: None,
        }
    }

    #[test]
    fn test_job_is_due_past_next_run() {
        let now = at("2026-02-17T12:00:00Z");
        assert!(is_job_due(at("2026-02-17T11:00:00Z"), now));
        assert!(is_job_due(now, now));
    }

    #[test]
    fn test_job_not_due_future_next_run() {
        let now = at("2026-02-17T12:00:00Z");
        assert!(!is_job_due(at("2026-02-17T13:00:00Z"), now));
    }

    #[test]
    fn test_next_run_after() {
        assert_eq!(
            next_run_after(at("2026-02-17T12:00:00Z"), 24),
            at("2026-02-18T12:00:00Z")
        );
    }

    #[test]
    fn test_first_run_waits_after_recent_completion() {
        let now = at("2026-02-17T18:00:00Z");
        let latest = run("2026-02-17T12:00:00Z", SyncRunStatus::Completed);
        assert_eq!(
            first_run_at(Some(&latest), 24, now),
            at("2026-02-18T12:00:00Z")
        );
    }

    #[test]
    fn test_first_run_due_now_otherwise() {
        let now = at("2026-02-17T18:00:00Z");
        assert_eq!(first_run_at(None, 24, now), now);

        let failed = run("2026-02-17T12:00:00Z", SyncRunStatus::Failed);
        assert_eq!(first_run_at(Some(&failed), 24, now), now);

        let stale = run("2026-02-10T12:00:00Z", SyncRunStatus::Completed);
        assert_eq!(first_run_at(Some(&stale), 24, now), now);
    }

    #[test]
    fn test_delay_until() {
        let now = at("2026-02-17T12:00:00Z");
        assert_eq!(
            delay_until(at("2026-02-17T12:00:30Z"), now),
            std::time::Duration::from_secs(30)
        );
        assert_eq!(
            delay_until(at("2026-02-17T11:00:00Z"), now),
            std::time::Duration::ZERO
        );
    }
}
