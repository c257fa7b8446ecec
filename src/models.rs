use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub name: String,
    pub arrival: String,
    pub departure: String,
    pub distance: String,
    pub passed: bool,
    pub is_next: bool,
    pub platform: Option<String>,
    pub status: Option<WaypointStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaypointStatus {
    OnTime,
    Delayed,
    Cancelled,
}

/// Render state of a waypoint on the progress rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointVisual {
    Active,
    Passed,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusBookingRef {
    pub number: String,
    pub destination: String,
    pub scheduled_time: String,
    pub bay: u8,
}

impl BusBookingRef {
    pub fn bay_label(&self) -> String {
        format!("Bay {}", self.bay)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum NavStep {
    #[default]
    Search,
    EntryConfirmation,
    RoutePreview,
    PrecisionScan,
    Calculating,
    ActiveNavigation,
}

impl NavStep {
    pub fn index(self) -> u8 {
        match self {
            NavStep::Search => 0,
            NavStep::EntryConfirmation => 1,
            NavStep::RoutePreview => 2,
            NavStep::PrecisionScan => 3,
            NavStep::Calculating => 4,
            NavStep::ActiveNavigation => 5,
        }
    }
}

impl std::fmt::Display for NavStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NavStep::Search => "search",
            NavStep::EntryConfirmation => "entry-confirmation",
            NavStep::RoutePreview => "route-preview",
            NavStep::PrecisionScan => "precision-scan",
            NavStep::Calculating => "calculating",
            NavStep::ActiveNavigation => "active-navigation",
        };
        write!(f, "{label}")
    }
}

/// Read-only projection of the navigation session handed to views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub step: NavStep,
    pub detected_location: Option<String>,
    pub destination_bay: Option<String>,
    pub bus_info: Option<BusBookingRef>,
    pub progress: u8,
    pub current_checkpoint_name: Option<String>,
    pub is_off_route: bool,
    pub is_scanning: bool,
    pub calculating_path: bool,
    pub waypoints: Vec<Waypoint>,
    pub direction_text: Option<String>,
    pub show_direction_indicator: bool,
    pub ar_overlay_open: bool,
    pub completion_dialog_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointVisit {
    pub name: String,
    pub reached_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationOutcome {
    Arrived,
    Abandoned,
}

/// One finished navigation session as kept in the journey history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRecord {
    pub id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub location: String,
    pub destination_bay: Option<String>,
    pub booking_number: Option<String>,
    pub checkpoints: Vec<CheckpointVisit>,
    pub off_route_count: u32,
    pub recalculation_count: u32,
    pub outcome: NavigationOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationStats {
    pub sessions_count: u32,
    pub arrived_count: u32,
    pub abandoned_count: u32,
    pub checkpoints_count: u32,
    pub off_route_count: u32,
    pub recalculation_count: u32,
    pub average_duration_seconds: u32,
    pub completion_rate: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
    pub logged_in: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            language: "en".to_string(),
            logged_in: false,
        }
    }
}
