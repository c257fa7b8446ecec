use crate::models::{NavigationOutcome, NavigationRecord, NavigationStats};
use chrono::DateTime;

pub fn calculate_navigation_stats(records: &[NavigationRecord]) -> NavigationStats {
    let sessions_count = records.len().try_into().unwrap_or(u32::MAX);
    let mut stats = NavigationStats {
        sessions_count,
        ..NavigationStats::default()
    };

    let mut timed_sessions: u64 = 0;
    let mut total_seconds: u64 = 0;
    for record in records {
        match record.outcome {
            NavigationOutcome::Arrived => {
                stats.arrived_count = stats.arrived_count.saturating_add(1)
            }
            NavigationOutcome::Abandoned => {
                stats.abandoned_count = stats.abandoned_count.saturating_add(1)
            }
        }
        let checkpoints = record.checkpoints.len().try_into().unwrap_or(u32::MAX);
        stats.checkpoints_count = stats.checkpoints_count.saturating_add(checkpoints);
        stats.off_route_count = stats.off_route_count.saturating_add(record.off_route_count);
        stats.recalculation_count = stats
            .recalculation_count
            .saturating_add(record.recalculation_count);

        if let Some(seconds) = record
            .ended_at
            .as_deref()
            .and_then(|ended_at| duration_seconds_between(&record.started_at, ended_at))
        {
            timed_sessions += 1;
            total_seconds = total_seconds.saturating_add(seconds);
        }
    }

    stats.average_duration_seconds = if timed_sessions == 0 {
        0
    } else {
        (total_seconds / timed_sessions).min(u32::MAX as u64) as u32
    };
    stats.completion_rate = if stats.sessions_count == 0 {
        0.0
    } else {
        stats.arrived_count as f32 / stats.sessions_count as f32
    };

    stats
}

fn duration_seconds_between(start: &str, end: &str) -> Option<u64> {
    let start = DateTime::parse_from_rfc3339(start).ok()?;
    let end = DateTime::parse_from_rfc3339(end).ok()?;
    let seconds = end.signed_duration_since(start).num_seconds();
    Some(seconds.max(0) as u64)
}
