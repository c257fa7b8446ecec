use crate::app_error::AppErrorPayload;
use crate::models::{BusBookingRef, NavStep};
use crate::scan::ScanPurpose;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum NavigationEvent {
    LocationDetected {
        location: String,
        booking: BusBookingRef,
    },
    StepChanged {
        step: NavStep,
        step_index: u8,
    },
    ScanStarted {
        purpose: ScanPurpose,
    },
    ProgressChanged {
        progress: u8,
        checkpoint: String,
    },
    OffRouteChanged {
        off_route: bool,
    },
    RouteRecalculated {
        direction_text: String,
    },
    ArOverlayChanged {
        open: bool,
    },
    NavigationCompleted {
        destination_bay: Option<String>,
    },
    SessionReset,
    AppError {
        error: AppErrorPayload,
    },
}

impl NavigationEvent {
    pub fn step_changed(step: NavStep) -> Self {
        NavigationEvent::StepChanged {
            step,
            step_index: step.index(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NavigationEvent::LocationDetected { .. } => "location-detected",
            NavigationEvent::StepChanged { .. } => "step-changed",
            NavigationEvent::ScanStarted { .. } => "scan-started",
            NavigationEvent::ProgressChanged { .. } => "progress-changed",
            NavigationEvent::OffRouteChanged { .. } => "off-route-changed",
            NavigationEvent::RouteRecalculated { .. } => "route-recalculated",
            NavigationEvent::ArOverlayChanged { .. } => "ar-overlay-changed",
            NavigationEvent::NavigationCompleted { .. } => "navigation-completed",
            NavigationEvent::SessionReset => "session-reset",
            NavigationEvent::AppError { .. } => "app-error",
        }
    }
}

/// Receiver of session state changes.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: NavigationEvent);
}

/// Logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: NavigationEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => debug!(event = event.name(), %payload, "navigation event"),
            Err(err) => debug!(event = event.name(), error = %err, "navigation event"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<NavigationEvent>,
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: NavigationEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            trace!(event = name, "no subscribers for navigation event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BroadcastEventSink, EventSink, NavigationEvent};
    use crate::models::NavStep;

    #[test]
    fn step_changed_payload_is_tagged() {
        let event = NavigationEvent::step_changed(NavStep::RoutePreview);
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "step-changed");
        assert_eq!(json["step"], "routePreview");
        assert_eq!(json["stepIndex"], 2);
    }

    #[test]
    fn broadcast_delivers_to_subscribers() {
        let sink = BroadcastEventSink::new(8);
        let mut receiver = sink.subscribe();
        sink.emit(NavigationEvent::OffRouteChanged { off_route: true });
        let event = receiver.try_recv().expect("event delivered");
        assert_eq!(event, NavigationEvent::OffRouteChanged { off_route: true });
    }

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        let sink = BroadcastEventSink::default();
        sink.emit(NavigationEvent::SessionReset);
    }
}
