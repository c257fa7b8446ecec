use crate::models::{CheckpointVisit, NavigationOutcome, NavigationRecord};
use chrono::Utc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Collects what happens during one navigation session so it can be kept in
/// the journey history once the session ends.
#[derive(Debug, Default)]
pub struct SessionTracker {
    active: Option<ActiveJourney>,
}

#[derive(Debug, Clone)]
struct ActiveJourney {
    id: String,
    started_at: String,
    location: String,
    destination_bay: Option<String>,
    booking_number: Option<String>,
    checkpoints: Vec<CheckpointVisit>,
    off_route_count: u32,
    recalculation_count: u32,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn start_journey(
        &mut self,
        location: &str,
        destination_bay: Option<&str>,
        booking_number: Option<&str>,
    ) -> String {
        let id = generate_journey_id();
        self.active = Some(ActiveJourney {
            id: id.clone(),
            started_at: now_rfc3339(),
            location: location.to_string(),
            destination_bay: destination_bay.map(str::to_string),
            booking_number: booking_number.map(str::to_string),
            checkpoints: Vec::new(),
            off_route_count: 0,
            recalculation_count: 0,
        });
        id
    }

    pub fn record_checkpoint(&mut self, name: &str, reached_at: String) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let already_recorded = active
            .checkpoints
            .last()
            .is_some_and(|visit| visit.name == name);
        if already_recorded {
            return;
        }
        active.checkpoints.push(CheckpointVisit {
            name: name.to_string(),
            reached_at,
        });
    }

    pub fn record_off_route(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.off_route_count = active.off_route_count.saturating_add(1);
        }
    }

    pub fn record_recalculation(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.recalculation_count = active.recalculation_count.saturating_add(1);
        }
    }

    pub fn finish_journey(
        &mut self,
        outcome: NavigationOutcome,
        ended_at: String,
    ) -> Option<NavigationRecord> {
        let active = self.active.take()?;
        Some(NavigationRecord {
            id: active.id,
            started_at: active.started_at,
            ended_at: Some(ended_at),
            location: active.location,
            destination_bay: active.destination_bay,
            booking_number: active.booking_number,
            checkpoints: active.checkpoints,
            off_route_count: active.off_route_count,
            recalculation_count: active.recalculation_count,
            outcome,
        })
    }
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn generate_journey_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("journey-{nanos}-{}", std::process::id())
}
