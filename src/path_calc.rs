use crate::models::{BusBookingRef, Waypoint, WaypointStatus};

const SECURITY_CHECKPOINT: &str = "Security Checkpoint";
const MAIN_CONCOURSE: &str = "Main Concourse";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatedRoute {
    pub waypoints: Vec<Waypoint>,
    pub direction_text: String,
}

/// Route from the detected entry point to the booked bay. There is no graph
/// search: every terminal resolves to the same four-leg itinerary.
pub fn calculate_route(location: &str, booking: &BusBookingRef) -> CalculatedRoute {
    let waypoints = vec![
        Waypoint {
            name: location.to_string(),
            arrival: "Now".to_string(),
            departure: "Now".to_string(),
            distance: "0m".to_string(),
            passed: true,
            is_next: false,
            platform: None,
            status: None,
        },
        Waypoint {
            name: SECURITY_CHECKPOINT.to_string(),
            arrival: "2 min".to_string(),
            departure: "4 min".to_string(),
            distance: "120m".to_string(),
            passed: false,
            is_next: true,
            platform: None,
            status: Some(WaypointStatus::OnTime),
        },
        Waypoint {
            name: MAIN_CONCOURSE.to_string(),
            arrival: "6 min".to_string(),
            departure: "7 min".to_string(),
            distance: "250m".to_string(),
            passed: false,
            is_next: false,
            platform: None,
            status: Some(WaypointStatus::OnTime),
        },
        Waypoint {
            name: booking.bay_label(),
            arrival: "9 min".to_string(),
            departure: booking.scheduled_time.clone(),
            distance: "380m".to_string(),
            passed: false,
            is_next: false,
            platform: Some(booking.bay_label()),
            status: Some(WaypointStatus::OnTime),
        },
    ];
    let direction_text = directions_toward(&waypoints[1].name);
    CalculatedRoute {
        waypoints,
        direction_text,
    }
}

pub fn directions_toward(checkpoint: &str) -> String {
    format!("Continue straight ahead towards {checkpoint}")
}

pub fn recalculated_directions(checkpoint: &str) -> String {
    format!("Route updated: turn around and follow the signs to {checkpoint}")
}

pub fn arrival_directions(bay: &str) -> String {
    format!("You have arrived at {bay}")
}
