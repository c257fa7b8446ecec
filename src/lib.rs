pub mod app_context;
pub mod app_error;
pub mod config;
pub mod data_manager;
pub mod events;
pub mod location;
pub mod logging;
pub mod models;
pub mod nav_engine;
pub mod notifications;
pub mod path_calc;
pub mod progress_tracker;
pub mod scan;
pub mod scheduler;
pub mod session_controller;
pub mod session_stats;
pub mod session_tracker;

pub use app_error::{AppError, AppErrorKind};
pub use config::NavConfig;
pub use models::{NavStep, SessionState};
pub use nav_engine::{NavError, NavigationEngine};
pub use session_controller::NavigationController;
