use crate::config::SimulationTimings;
use crate::models::NavStep;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a simulated QR scan confirms. Derived from the step the scan was
/// started in; no payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanPurpose {
    Entry,
    Precision,
    Checkpoint,
}

impl ScanPurpose {
    pub fn for_step(step: NavStep) -> Option<Self> {
        match step {
            NavStep::Search | NavStep::EntryConfirmation => Some(ScanPurpose::Entry),
            NavStep::RoutePreview | NavStep::PrecisionScan => Some(ScanPurpose::Precision),
            NavStep::ActiveNavigation => Some(ScanPurpose::Checkpoint),
            NavStep::Calculating => None,
        }
    }

    pub fn duration(self, timings: &SimulationTimings) -> Duration {
        let millis = match self {
            ScanPurpose::Entry => timings.entry_scan_ms,
            ScanPurpose::Precision => timings.precision_scan_ms,
            ScanPurpose::Checkpoint => timings.checkpoint_scan_ms,
        };
        Duration::from_millis(millis)
    }

    pub fn completion_message(self) -> &'static str {
        match self {
            ScanPurpose::Entry => "Entry point confirmed",
            ScanPurpose::Precision => "Location refined",
            ScanPurpose::Checkpoint => "Checkpoint reached",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ScanPurpose;
    use crate::config::SimulationTimings;
    use crate::models::NavStep;
    use std::time::Duration;

    #[test]
    fn purpose_follows_current_step() {
        assert_eq!(ScanPurpose::for_step(NavStep::Search), Some(ScanPurpose::Entry));
        assert_eq!(
            ScanPurpose::for_step(NavStep::RoutePreview),
            Some(ScanPurpose::Precision)
        );
        assert_eq!(
            ScanPurpose::for_step(NavStep::ActiveNavigation),
            Some(ScanPurpose::Checkpoint)
        );
        assert_eq!(ScanPurpose::for_step(NavStep::Calculating), None);
    }

    #[test]
    fn default_scans_last_two_seconds() {
        let timings = SimulationTimings::default();
        for purpose in [
            ScanPurpose::Entry,
            ScanPurpose::Precision,
            ScanPurpose::Checkpoint,
        ] {
            assert_eq!(purpose.duration(&timings), Duration::from_secs(2));
        }
    }
}
