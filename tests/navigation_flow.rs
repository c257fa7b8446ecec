use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use wayfinder::data_manager::DataManager;
use wayfinder::events::{BroadcastEventSink, NavigationEvent};
use wayfinder::location::{search_locations, RandomLocationProvider};
use wayfinder::models::{NavigationOutcome, WaypointVisual};
use wayfinder::notifications::ChannelNotifier;
use wayfinder::progress_tracker::waypoint_states;
use wayfinder::{NavConfig, NavStep, NavigationController};

fn event_names(receiver: &mut Receiver<NavigationEvent>) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        names.push(event.name());
    }
    names
}

#[tokio::test(start_paused = true)]
async fn picked_location_navigates_to_bay_and_is_journaled() {
    let dir = tempfile::tempdir().expect("temp dir");
    let sink = BroadcastEventSink::new(128);
    let mut events = sink.subscribe();
    let controller = NavigationController::new(
        &NavConfig::default(),
        Box::new(RandomLocationProvider::seeded(42)),
        Arc::new(ChannelNotifier::default()),
        Arc::new(sink),
    );
    controller.attach_journal(DataManager::new(dir.path()).expect("journal"));

    controller.begin_session().expect("begin").join().await;
    let picked = search_locations("airport")
        .into_iter()
        .next()
        .expect("airport gates listed");
    controller.select_location(&picked).expect("select location");
    let state = controller.state().expect("state");
    assert_eq!(state.step, NavStep::EntryConfirmation);
    assert!(!state.is_scanning);
    controller.confirm_entry().expect("confirm entry");

    controller.rescan_entry().expect("rescan").join().await;
    let state = controller.state().expect("state");
    assert_eq!(state.step, NavStep::RoutePreview);
    assert_eq!(state.detected_location.as_deref(), Some(picked.as_str()));

    controller.calculate_path().expect("calculate").join().await;
    let state = controller.state().expect("state");
    assert_eq!(state.waypoints.len(), 4);
    assert_eq!(state.waypoints[0].name, picked);
    assert_eq!(
        state.waypoints.last().map(|waypoint| waypoint.name.clone()),
        state.destination_bay.clone()
    );
    let visuals = waypoint_states(
        state.progress,
        &state.waypoints,
        state.current_checkpoint_name.as_deref(),
    );
    assert_eq!(
        visuals
            .iter()
            .filter(|visual| **visual == WaypointVisual::Active)
            .count(),
        1
    );

    controller.scan_checkpoint().expect("scan").join().await;
    controller.complete_navigation().expect("complete");
    let state = controller.state().expect("state");
    assert_eq!(state.progress, 100);
    assert!(state.completion_dialog_open);

    let names = event_names(&mut events);
    assert_eq!(names.first(), Some(&"location-detected"));
    assert_eq!(names.last(), Some(&"navigation-completed"));
    assert!(names.contains(&"scan-started"));

    let journeys = controller.journeys().expect("journeys");
    assert_eq!(journeys.len(), 1);
    assert_eq!(journeys[0].location, picked);
    assert_eq!(journeys[0].outcome, NavigationOutcome::Arrived);
}

#[tokio::test(start_paused = true)]
async fn start_navigation_before_detection_acquires_booking() {
    let controller = NavigationController::new(
        &NavConfig::default(),
        Box::new(RandomLocationProvider::seeded(9)),
        Arc::new(ChannelNotifier::default()),
        Arc::new(BroadcastEventSink::default()),
    );
    let acquisition = controller.begin_session().expect("begin");

    let scan = controller.start_navigation().expect("start navigation");
    let state = controller.state().expect("state");
    assert_eq!(state.step, NavStep::EntryConfirmation);
    assert!(state.bus_info.is_some());
    assert!(state.destination_bay.is_some());

    acquisition.join().await;
    scan.join().await;
    assert_eq!(controller.state().expect("state").step, NavStep::RoutePreview);
}
