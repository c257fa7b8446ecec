use crate::models::{Waypoint, WaypointVisual};

pub const PROGRESS_COMPLETE: u8 = 100;

/// Visual state of every waypoint for the given progress.
///
/// A waypoint is active when its name matches the current checkpoint, passed
/// when flagged or when progress lies beyond its share of the route, and
/// upcoming otherwise. Once progress reaches 100 nothing is active.
pub fn waypoint_states(
    progress: u8,
    waypoints: &[Waypoint],
    current_checkpoint_name: Option<&str>,
) -> Vec<WaypointVisual> {
    let complete = progress >= PROGRESS_COMPLETE;
    let active_index = if complete {
        None
    } else {
        current_checkpoint_name
            .and_then(|name| waypoints.iter().position(|waypoint| waypoint.name == name))
    };

    waypoints
        .iter()
        .enumerate()
        .map(|(index, waypoint)| {
            if Some(index) == active_index {
                WaypointVisual::Active
            } else if waypoint.passed || progress_beyond(progress, index, waypoints.len()) {
                WaypointVisual::Passed
            } else {
                WaypointVisual::Upcoming
            }
        })
        .collect()
}

/// Recomputes `passed` and `is_next` after the current checkpoint moved.
pub fn refresh_flags(
    waypoints: &mut [Waypoint],
    current_checkpoint_name: Option<&str>,
    progress: u8,
) {
    let complete = progress >= PROGRESS_COMPLETE;
    let current_index = current_checkpoint_name
        .and_then(|name| waypoints.iter().position(|waypoint| waypoint.name == name));

    for (index, waypoint) in waypoints.iter_mut().enumerate() {
        waypoint.passed = complete || current_index.is_some_and(|current| index < current);
        waypoint.is_next = false;
    }
    if complete {
        return;
    }
    if let Some(next) = waypoints.iter_mut().find(|waypoint| !waypoint.passed) {
        next.is_next = true;
    }
}

fn progress_beyond(progress: u8, index: usize, count: usize) -> bool {
    if count <= 1 {
        return progress > 0;
    }
    let threshold = index as f64 / (count - 1) as f64 * 100.0;
    f64::from(progress) > threshold
}
