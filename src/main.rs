use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use wayfinder::app_context::{AppContext, MemoryPreferenceStore, PreferenceStore};
use wayfinder::data_manager::DataManager;
use wayfinder::events::TracingEventSink;
use wayfinder::location::{search_locations, RandomLocationProvider};
use wayfinder::logging;
use wayfinder::notifications::TracingNotifier;
use wayfinder::progress_tracker::waypoint_states;
use wayfinder::{NavConfig, NavigationController};

/// Walks one scripted session from location detection to arrival.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init("wayfinder=info");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = NavConfig::resolve(config_path.as_deref())?;

    let journal = match config.data_dir.as_deref() {
        Some(dir) => Some(DataManager::new(dir)?),
        None => None,
    };
    let store: Box<dyn PreferenceStore> = match journal.clone() {
        Some(manager) => Box::new(manager),
        None => Box::new(MemoryPreferenceStore::default()),
    };
    let context = AppContext::load(store);
    info!(
        theme = ?context.theme(),
        language = context.language(),
        logged_in = context.is_logged_in(),
        "preferences loaded"
    );
    info!(popular = ?search_locations(""), "popular locations");

    let controller = NavigationController::new(
        &config,
        Box::new(RandomLocationProvider::from_entropy()),
        Arc::new(TracingNotifier),
        Arc::new(TracingEventSink),
    );
    if let Some(journal) = journal {
        controller.attach_journal(journal);
    }

    controller.begin_session()?.join().await;
    controller.start_navigation()?.join().await;
    controller.calculate_path()?.join().await;
    controller.scan_checkpoint()?.join().await;

    let state = controller.state()?;
    let visuals = waypoint_states(
        state.progress,
        &state.waypoints,
        state.current_checkpoint_name.as_deref(),
    );
    for (waypoint, visual) in state.waypoints.iter().zip(visuals) {
        info!(waypoint = %waypoint.name, ?visual, "route");
    }

    controller.skip_to_end()?;
    println!("{}", serde_json::to_string_pretty(&controller.state()?)?);

    match controller.navigation_stats() {
        Ok(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
        Err(err) => warn!(error = %err, "navigation stats unavailable"),
    }
    controller.shutdown();
    Ok(())
}
