use crate::app_error::AppError;
use crate::config::{NavConfig, SimulationTimings};
use crate::data_manager::DataManager;
use crate::events::{EventSink, NavigationEvent};
use crate::location::LocationProvider;
use crate::models::{
    NavStep, NavigationOutcome, NavigationRecord, NavigationStats, NotificationKind, SessionState,
};
use crate::nav_engine::{NavError, NavigationEngine, OperationTicket, PendingKind, Transition};
use crate::notifications::Notifier;
use crate::scan::ScanPurpose;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::session_stats::calculate_navigation_stats;
use crate::session_tracker::{now_rfc3339, SessionTracker};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::{debug, error, info, warn};

fn engine_lock_error() -> AppError {
    AppError::fatal("Navigation state lock failed")
}

/// Drives one indoor navigation session: forwards user intents to the
/// engine, runs the simulated latencies and reports what changed.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct NavigationController {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Mutex<NavigationEngine>,
    scheduler: Mutex<Scheduler>,
    provider: Mutex<Box<dyn LocationProvider>>,
    tracker: Mutex<SessionTracker>,
    timings: SimulationTimings,
    notifier: Arc<dyn Notifier>,
    events: Arc<dyn EventSink>,
    journal: OnceLock<DataManager>,
}

impl NavigationController {
    pub fn new(
        config: &NavConfig,
        provider: Box<dyn LocationProvider>,
        notifier: Arc<dyn Notifier>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine: Mutex::new(NavigationEngine::new(config)),
                scheduler: Mutex::new(Scheduler::new()),
                provider: Mutex::new(provider),
                tracker: Mutex::new(SessionTracker::new()),
                timings: config.timings.clone(),
                notifier,
                events,
                journal: OnceLock::new(),
            }),
        }
    }

    /// Finished sessions are appended to this store. Returns false when a
    /// journal was already attached.
    pub fn attach_journal(&self, journal: DataManager) -> bool {
        self.inner.journal.set(journal).is_ok()
    }

    pub fn state(&self) -> Result<SessionState, AppError> {
        let engine = self.inner.engine().map_err(|err| self.inner.report(err))?;
        Ok(engine.snapshot())
    }

    /// Entry action of the search step: detects the location after the
    /// acquisition delay.
    pub fn begin_session(&self) -> Result<ScheduledTask, AppError> {
        self.inner
            .begin_acquisition()
            .map_err(|err| self.inner.report(err))
    }

    pub fn start_navigation(&self) -> Result<ScheduledTask, AppError> {
        self.inner
            .start_navigation()
            .map_err(|err| self.inner.report(err))
    }

    pub fn select_location(&self, location: &str) -> Result<(), AppError> {
        self.inner
            .select_location(location)
            .map_err(|err| self.inner.report(err))
    }

    /// Moves on from an entry point confirmed without a scan.
    pub fn confirm_entry(&self) -> Result<(), AppError> {
        self.inner
            .confirm_entry()
            .map_err(|err| self.inner.report(err))
    }

    pub fn rescan_entry(&self) -> Result<ScheduledTask, AppError> {
        self.inner
            .begin_scan(|engine| engine.begin_precision_scan())
            .map_err(|err| self.inner.report(err))
    }

    pub fn calculate_path(&self) -> Result<ScheduledTask, AppError> {
        self.inner
            .calculate_path()
            .map_err(|err| self.inner.report(err))
    }

    pub fn scan_checkpoint(&self) -> Result<ScheduledTask, AppError> {
        self.inner
            .begin_scan(|engine| engine.scan_checkpoint())
            .map_err(|err| self.inner.report(err))
    }

    pub fn skip_to_end(&self) -> Result<(), AppError> {
        self.inner
            .finish(|engine| engine.skip_to_end())
            .map_err(|err| self.inner.report(err))
    }

    pub fn complete_navigation(&self) -> Result<(), AppError> {
        self.inner
            .finish(|engine| engine.complete_navigation())
            .map_err(|err| self.inner.report(err))
    }

    /// Returns the new off-route flag.
    pub fn toggle_off_route(&self) -> Result<bool, AppError> {
        self.inner
            .toggle_off_route()
            .map_err(|err| self.inner.report(err))
    }

    pub fn recalculate_route(&self) -> Result<(), AppError> {
        self.inner
            .recalculate_route()
            .map_err(|err| self.inner.report(err))
    }

    pub fn toggle_ar_overlay(&self) -> Result<bool, AppError> {
        self.inner
            .toggle_ar_overlay()
            .map_err(|err| self.inner.report(err))
    }

    /// "Change Location": abandons the session and detects the location anew.
    pub fn change_location(&self) -> Result<ScheduledTask, AppError> {
        self.inner
            .reset_session()
            .map_err(|err| self.inner.report(err))
    }

    /// "Done" or "Start New Navigation" from the completion dialog.
    pub fn start_new_navigation(&self) -> Result<ScheduledTask, AppError> {
        self.inner
            .reset_session()
            .map_err(|err| self.inner.report(err))
    }

    /// Cancels every pending simulated operation, as when the view unmounts.
    pub fn shutdown(&self) {
        match self.inner.scheduler.lock() {
            Ok(mut scheduler) => scheduler.cancel_all(),
            Err(_) => warn!("scheduler lock failed during shutdown"),
        }
    }

    pub fn journeys(&self) -> Result<Vec<NavigationRecord>, AppError> {
        let Some(journal) = self.inner.journal.get() else {
            return Ok(Vec::new());
        };
        journal
            .load_journeys()
            .map_err(|err| self.inner.report(AppError::from(err)))
    }

    pub fn navigation_stats(&self) -> Result<NavigationStats, AppError> {
        Ok(calculate_navigation_stats(&self.journeys()?))
    }

    /// Stats over journeys started between the two RFC 3339 instants.
    pub fn navigation_stats_in_range(
        &self,
        from: &str,
        to: &str,
    ) -> Result<NavigationStats, AppError> {
        let Some(journal) = self.inner.journal.get() else {
            return Ok(calculate_navigation_stats(&[]));
        };
        let journeys = journal
            .load_journeys_in_range(from, to)
            .map_err(|err| self.inner.report(AppError::from(err)))?;
        Ok(calculate_navigation_stats(&journeys))
    }
}

impl Inner {
    fn engine(&self) -> Result<MutexGuard<'_, NavigationEngine>, AppError> {
        self.engine.lock().map_err(|_| engine_lock_error())
    }

    fn scheduler(&self) -> Result<MutexGuard<'_, Scheduler>, AppError> {
        self.scheduler
            .lock()
            .map_err(|_| AppError::fatal("Scheduler lock failed"))
    }

    fn with_tracker<F>(&self, apply: F)
    where
        F: FnOnce(&mut SessionTracker),
    {
        match self.tracker.lock() {
            Ok(mut tracker) => apply(&mut tracker),
            Err(_) => warn!("session tracker lock failed"),
        }
    }

    fn begin_acquisition(self: &Arc<Self>) -> Result<ScheduledTask, AppError> {
        let ticket = self.engine()?.begin_acquisition()?;
        let weak = Arc::downgrade(self);
        let task = self
            .scheduler()?
            .schedule("acquisition", self.timings.acquisition(), move || {
                if let Some(inner) = weak.upgrade() {
                    inner.finish_acquisition(ticket);
                }
            });
        debug!(ticket = ticket.id(), "location acquisition scheduled");
        Ok(task)
    }

    fn finish_acquisition(&self, ticket: OperationTicket) {
        let (location, booking) = match self.provider.lock() {
            Ok(mut provider) => (provider.detect_location(), provider.synthesize_booking()),
            Err(_) => {
                self.report(AppError::fatal("Location provider lock failed"));
                return;
            }
        };
        let result = match self.engine() {
            Ok(mut engine) => {
                engine.complete_acquisition(ticket, location.clone(), booking.clone())
            }
            Err(err) => {
                self.report(err);
                return;
            }
        };
        match result {
            Ok(_) => {
                info!(%location, bay = booking.bay, "location detected");
                self.notifier
                    .notify("Location detected", NotificationKind::Info, Some(&location));
                self.events
                    .emit(NavigationEvent::LocationDetected { location, booking });
            }
            Err(err) => self.discard(err),
        }
    }

    /// Makes sure a booking exists before leaving the search step, acquiring
    /// one on the spot if the timed acquisition has not finished yet.
    fn ensure_booking(&self) -> Result<(), AppError> {
        let needs_booking = {
            let engine = self.engine()?;
            engine.step() == NavStep::Search && engine.booking().is_none()
        };
        if !needs_booking {
            return Ok(());
        }
        let (location, booking) = {
            let mut provider = self
                .provider
                .lock()
                .map_err(|_| AppError::fatal("Location provider lock failed"))?;
            (provider.detect_location(), provider.synthesize_booking())
        };
        let mut engine = self.engine()?;
        if engine.booking().is_some() {
            return Ok(());
        }
        engine.apply_location(location.clone(), booking.clone())?;
        drop(engine);
        self.events
            .emit(NavigationEvent::LocationDetected { location, booking });
        Ok(())
    }

    fn start_navigation(self: &Arc<Self>) -> Result<ScheduledTask, AppError> {
        self.ensure_booking()?;
        let (ticket, state) = {
            let mut engine = self.engine()?;
            let ticket = engine.start_navigation()?;
            (ticket, engine.snapshot())
        };
        self.begin_journey(&state);
        self.events.emit(NavigationEvent::step_changed(state.step));
        self.schedule_scan(ticket)
    }

    fn select_location(&self, location: &str) -> Result<(), AppError> {
        self.ensure_booking()?;
        let state = {
            let mut engine = self.engine()?;
            engine.select_location(location.to_string())?;
            engine.snapshot()
        };
        self.scheduler()?.cancel_all();
        info!(location, "location selected");
        self.begin_journey(&state);
        self.events.emit(NavigationEvent::step_changed(state.step));
        Ok(())
    }

    fn confirm_entry(&self) -> Result<(), AppError> {
        let transition = self.engine()?.confirm_entry()?;
        if let Transition::StepChanged { step } = transition {
            self.events.emit(NavigationEvent::step_changed(step));
        }
        Ok(())
    }

    fn begin_journey(&self, state: &SessionState) {
        let location = state.detected_location.as_deref().unwrap_or_default();
        let booking_number = state.bus_info.as_ref().map(|booking| booking.number.as_str());
        self.with_tracker(|tracker| {
            let id =
                tracker.start_journey(location, state.destination_bay.as_deref(), booking_number);
            debug!(journey = %id, "journey started");
        });
    }

    fn begin_scan<F>(self: &Arc<Self>, begin: F) -> Result<ScheduledTask, AppError>
    where
        F: FnOnce(&mut NavigationEngine) -> Result<OperationTicket, NavError>,
    {
        let (ticket, step) = {
            let mut engine = self.engine()?;
            let before = engine.step();
            let ticket = begin(&mut *engine)?;
            let step = (engine.step() != before).then(|| engine.step());
            (ticket, step)
        };
        if let Some(step) = step {
            self.events.emit(NavigationEvent::step_changed(step));
        }
        self.schedule_scan(ticket)
    }

    fn schedule_scan(self: &Arc<Self>, ticket: OperationTicket) -> Result<ScheduledTask, AppError> {
        let PendingKind::Scan(purpose) = ticket.kind() else {
            return Err(AppError::system("Scan scheduled for a non-scan operation"));
        };
        let weak = Arc::downgrade(self);
        let task = self.scheduler()?.schedule(
            "qr-scan",
            purpose.duration(&self.timings),
            move || {
                if let Some(inner) = weak.upgrade() {
                    inner.finish_scan(ticket, purpose);
                }
            },
        );
        self.events.emit(NavigationEvent::ScanStarted { purpose });
        debug!(ticket = ticket.id(), ?purpose, "scan scheduled");
        Ok(task)
    }

    fn finish_scan(&self, ticket: OperationTicket, purpose: ScanPurpose) {
        let result = match self.engine() {
            Ok(mut engine) => engine
                .complete_scan(ticket)
                .map(|transition| (transition, engine.snapshot())),
            Err(err) => {
                self.report(err);
                return;
            }
        };
        match result {
            Ok((transition, state)) => {
                let description = match &transition {
                    Transition::ProgressAdvanced { checkpoint, .. } => Some(checkpoint.clone()),
                    _ => state.detected_location.clone(),
                };
                if !matches!(transition, Transition::Arrived { .. }) {
                    self.notifier.notify(
                        purpose.completion_message(),
                        NotificationKind::Success,
                        description.as_deref(),
                    );
                }
                self.apply_transition(transition, &state);
            }
            Err(err) => self.discard(err),
        }
    }

    fn calculate_path(self: &Arc<Self>) -> Result<ScheduledTask, AppError> {
        let ticket = {
            let mut engine = self.engine()?;
            engine.calculate_path()?
        };
        self.events
            .emit(NavigationEvent::step_changed(NavStep::Calculating));
        let weak = Arc::downgrade(self);
        let task = self.scheduler()?.schedule(
            "path-calculation",
            self.timings.path_calculation(),
            move || {
                if let Some(inner) = weak.upgrade() {
                    inner.finish_path_calculation(ticket);
                }
            },
        );
        Ok(task)
    }

    fn finish_path_calculation(&self, ticket: OperationTicket) {
        let result = match self.engine() {
            Ok(mut engine) => engine
                .complete_path_calculation(ticket)
                .map(|transition| (transition, engine.snapshot())),
            Err(err) => {
                self.report(err);
                return;
            }
        };
        match result {
            Ok((transition, state)) => {
                info!(
                    destination = state.destination_bay.as_deref().unwrap_or_default(),
                    waypoints = state.waypoints.len(),
                    "route calculated"
                );
                self.notifier.notify(
                    "Route calculated",
                    NotificationKind::Success,
                    state.direction_text.as_deref(),
                );
                self.apply_transition(transition, &state);
                if let Some(checkpoint) = state.current_checkpoint_name.clone() {
                    self.events.emit(NavigationEvent::ProgressChanged {
                        progress: state.progress,
                        checkpoint,
                    });
                }
            }
            Err(err) => self.discard(err),
        }
    }

    fn finish<F>(&self, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut NavigationEngine) -> Result<Transition, NavError>,
    {
        let (transition, state, ar_was_open) = {
            let mut engine = self.engine()?;
            let ar_was_open = engine.snapshot().ar_overlay_open;
            let transition = apply(&mut *engine)?;
            (transition, engine.snapshot(), ar_was_open)
        };
        if ar_was_open && !state.ar_overlay_open {
            self.events
                .emit(NavigationEvent::ArOverlayChanged { open: false });
        }
        self.apply_transition(transition, &state);
        Ok(())
    }

    fn toggle_off_route(&self) -> Result<bool, AppError> {
        let off_route = self.engine()?.toggle_off_route()?;
        if off_route {
            self.with_tracker(SessionTracker::record_off_route);
            self.notifier.notify(
                "You are off route",
                NotificationKind::Warning,
                Some("Recalculate to get back on track"),
            );
        }
        info!(off_route, "off-route simulation toggled");
        self.events
            .emit(NavigationEvent::OffRouteChanged { off_route });
        Ok(off_route)
    }

    fn recalculate_route(&self) -> Result<(), AppError> {
        let direction_text = {
            let mut engine = self.engine()?;
            engine.recalculate_route()?;
            engine.snapshot().direction_text.unwrap_or_default()
        };
        self.with_tracker(SessionTracker::record_recalculation);
        self.notifier.notify(
            "Route recalculated",
            NotificationKind::Info,
            Some(&direction_text),
        );
        self.events
            .emit(NavigationEvent::OffRouteChanged { off_route: false });
        self.events
            .emit(NavigationEvent::RouteRecalculated { direction_text });
        Ok(())
    }

    fn toggle_ar_overlay(&self) -> Result<bool, AppError> {
        let open = self.engine()?.toggle_ar_overlay()?;
        self.events.emit(NavigationEvent::ArOverlayChanged { open });
        Ok(open)
    }

    fn reset_session(self: &Arc<Self>) -> Result<ScheduledTask, AppError> {
        self.scheduler()?.cancel_all();
        let previous_step = {
            let mut engine = self.engine()?;
            let step = engine.step();
            engine.reset();
            step
        };
        let mut abandoned = None;
        self.with_tracker(|tracker| {
            abandoned = tracker.finish_journey(NavigationOutcome::Abandoned, now_rfc3339());
        });
        if let Some(record) = abandoned {
            info!(journey = %record.id, %previous_step, "journey abandoned");
            self.store_journey(record);
        }
        self.events.emit(NavigationEvent::SessionReset);
        self.events
            .emit(NavigationEvent::step_changed(NavStep::Search));
        self.begin_acquisition()
    }

    fn apply_transition(&self, transition: Transition, state: &SessionState) {
        match transition {
            Transition::NoChange => {}
            Transition::StepChanged { step } => {
                self.events.emit(NavigationEvent::step_changed(step));
            }
            Transition::ProgressAdvanced {
                progress,
                checkpoint,
            } => {
                info!(progress, %checkpoint, "checkpoint reached");
                self.with_tracker(|tracker| {
                    tracker.record_checkpoint(&checkpoint, now_rfc3339())
                });
                self.events.emit(NavigationEvent::ProgressChanged {
                    progress,
                    checkpoint,
                });
            }
            Transition::Arrived { checkpoint } => {
                if let Some(checkpoint) = checkpoint {
                    info!(%checkpoint, "final checkpoint reached");
                    self.with_tracker(|tracker| {
                        tracker.record_checkpoint(&checkpoint, now_rfc3339())
                    });
                }
                self.arrive(state)
            }
        }
    }

    fn arrive(&self, state: &SessionState) {
        let bay = state.destination_bay.clone();
        info!(bay = bay.as_deref().unwrap_or_default(), "navigation completed");
        if let Some(checkpoint) = state.current_checkpoint_name.clone() {
            self.events.emit(NavigationEvent::ProgressChanged {
                progress: state.progress,
                checkpoint,
            });
        }
        self.notifier.notify(
            "You have arrived",
            NotificationKind::Success,
            bay.as_deref(),
        );
        self.events.emit(NavigationEvent::NavigationCompleted {
            destination_bay: bay,
        });
        let mut finished = None;
        self.with_tracker(|tracker| {
            finished = tracker.finish_journey(NavigationOutcome::Arrived, now_rfc3339());
        });
        if let Some(record) = finished {
            self.store_journey(record);
        }
    }

    fn store_journey(&self, record: NavigationRecord) {
        let Some(journal) = self.journal.get() else {
            return;
        };
        if let Err(err) = journal.save_journey(record) {
            self.report(AppError::from(err));
        }
    }

    /// Completions racing a reset lose quietly; anything else is reported.
    fn discard(&self, error: NavError) {
        match error {
            NavError::StaleOperation => debug!("stale simulated operation ignored"),
            other => {
                self.report(AppError::from(other));
            }
        }
    }

    fn report(&self, error: AppError) -> AppError {
        self.events.emit(NavigationEvent::AppError {
            error: error.payload(),
        });
        self.notifier
            .notify(error.message(), NotificationKind::Error, error.detail());
        let detail = error.detail().unwrap_or_default();
        if error.is_recoverable() {
            warn!(kind = ?error.kind(), detail, "{}", error.message());
            return error;
        }
        // The session can no longer be trusted: stop everything still queued.
        error!(kind = ?error.kind(), detail, "{}", error.message());
        match self.scheduler.lock() {
            Ok(mut scheduler) => scheduler.cancel_all(),
            Err(_) => error!("scheduler lock failed while halting the session"),
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::NavigationController;
    use crate::app_error::{AppError, AppErrorKind};
    use crate::config::NavConfig;
    use crate::data_manager::DataManager;
    use crate::events::{BroadcastEventSink, NavigationEvent};
    use crate::location::RandomLocationProvider;
    use crate::models::{NavStep, NavigationOutcome, NotificationKind};
    use crate::notifications::{ChannelNotifier, Notification};
    use crate::scheduler::TaskOutcome;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast::Receiver;
    use tokio::time::{advance, Instant};

    struct Harness {
        controller: NavigationController,
        notifications: Receiver<Notification>,
        events: Receiver<NavigationEvent>,
    }

    fn harness() -> Harness {
        harness_with(&NavConfig::default())
    }

    fn harness_with(config: &NavConfig) -> Harness {
        let notifier = ChannelNotifier::new(64);
        let sink = BroadcastEventSink::new(64);
        let notifications = notifier.subscribe();
        let events = sink.subscribe();
        let controller = NavigationController::new(
            config,
            Box::new(RandomLocationProvider::seeded(5)),
            Arc::new(notifier),
            Arc::new(sink),
        );
        Harness {
            controller,
            notifications,
            events,
        }
    }

    fn drain<T: Clone>(receiver: &mut Receiver<T>) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = receiver.try_recv() {
            items.push(item);
        }
        items
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    async fn navigating(controller: &NavigationController) {
        controller.begin_session().expect("begin").join().await;
        controller.start_navigation().expect("start").join().await;
        controller.calculate_path().expect("calculate").join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_respects_simulated_delays() {
        let Harness {
            controller,
            mut notifications,
            mut events,
        } = harness();

        let started = Instant::now();
        let acquisition = controller.begin_session().expect("begin session");
        advance(Duration::from_millis(999)).await;
        settle().await;
        assert!(controller.state().expect("state").detected_location.is_none());
        assert_eq!(acquisition.join().await, TaskOutcome::Completed);
        assert!(started.elapsed() >= Duration::from_millis(1_000));
        let state = controller.state().expect("state");
        assert!(state.detected_location.is_some());
        assert!(state.bus_info.is_some());

        let scan = controller.start_navigation().expect("start navigation");
        let state = controller.state().expect("state");
        assert_eq!(state.step, NavStep::EntryConfirmation);
        assert!(state.is_scanning);
        advance(Duration::from_millis(1_999)).await;
        settle().await;
        assert_eq!(controller.state().expect("state").step, NavStep::EntryConfirmation);
        scan.join().await;
        let state = controller.state().expect("state");
        assert_eq!(state.step, NavStep::RoutePreview);
        assert!(!state.is_scanning);

        let calculation = controller.calculate_path().expect("calculate path");
        assert!(controller.state().expect("state").calculating_path);
        advance(Duration::from_millis(2_499)).await;
        settle().await;
        assert_eq!(controller.state().expect("state").step, NavStep::Calculating);
        calculation.join().await;
        let state = controller.state().expect("state");
        assert_eq!(state.step, NavStep::ActiveNavigation);
        assert_eq!(state.progress, 0);
        assert_eq!(
            state.current_checkpoint_name.as_deref(),
            Some(state.waypoints[1].name.as_str())
        );

        let checkpoint = controller.scan_checkpoint().expect("scan checkpoint");
        advance(Duration::from_millis(1_999)).await;
        settle().await;
        assert_eq!(controller.state().expect("state").progress, 0);
        checkpoint.join().await;
        let state = controller.state().expect("state");
        assert_eq!(state.progress, 75);
        assert_eq!(
            state.current_checkpoint_name.as_deref(),
            Some(state.waypoints[2].name.as_str())
        );

        controller.skip_to_end().expect("skip to end");
        let state = controller.state().expect("state");
        assert_eq!(state.progress, 100);
        assert!(state.completion_dialog_open);

        let messages: Vec<_> = drain(&mut notifications)
            .into_iter()
            .map(|notification| notification.message)
            .collect();
        assert!(messages.contains(&"Location detected".to_string()));
        assert!(messages.contains(&"Checkpoint reached".to_string()));
        assert_eq!(messages.last().map(String::as_str), Some("You have arrived"));
        assert!(drain(&mut events)
            .iter()
            .any(|event| matches!(event, NavigationEvent::NavigationCompleted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_reset_clears_session() {
        let Harness { controller, .. } = harness();
        navigating(&controller).await;

        let reacquire = controller.change_location().expect("change location");
        let state = controller.state().expect("state");
        assert_eq!(state.step, NavStep::Search);
        assert_eq!(state.destination_bay, None);
        assert_eq!(state.bus_info, None);
        assert_eq!(state.progress, 0);
        reacquire.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn reset_invalidates_pending_scan() {
        let Harness { controller, .. } = harness();
        controller.begin_session().expect("begin").join().await;
        let scan = controller.start_navigation().expect("start navigation");

        let reacquire = controller.change_location().expect("change location");
        assert_eq!(scan.join().await, TaskOutcome::Cancelled);
        advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(reacquire.join().await, TaskOutcome::Completed);

        let state = controller.state().expect("state");
        assert_eq!(state.step, NavStep::Search);
        assert!(!state.is_scanning);
        assert!(state.bus_info.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn off_route_and_recalculate_keep_progress() {
        let Harness {
            controller,
            mut notifications,
            ..
        } = harness();
        navigating(&controller).await;
        controller
            .scan_checkpoint()
            .expect("scan checkpoint")
            .join()
            .await;
        let progress = controller.state().expect("state").progress;
        drain(&mut notifications);

        assert!(controller.toggle_off_route().expect("off route"));
        let state = controller.state().expect("state");
        assert!(state.is_off_route);
        assert!(!state.show_direction_indicator);
        let warning = notifications.try_recv().expect("warning");
        assert_eq!(warning.kind, NotificationKind::Warning);

        controller.recalculate_route().expect("recalculate");
        let state = controller.state().expect("state");
        assert!(!state.is_off_route);
        assert_eq!(state.progress, progress);
    }

    #[tokio::test(start_paused = true)]
    async fn double_toggle_restores_directions() {
        let Harness { controller, .. } = harness();
        navigating(&controller).await;
        let before = controller.state().expect("state");

        controller.toggle_off_route().expect("toggle on");
        controller.toggle_off_route().expect("toggle off");
        let after = controller.state().expect("state");
        assert_eq!(after.direction_text, before.direction_text);
        assert_eq!(after.show_direction_indicator, before.show_direction_indicator);
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_location_skips_entry_scan() {
        let Harness { controller, .. } = harness();
        controller
            .select_location("Harbour Coach Station - Gate E")
            .expect("select location");
        let state = controller.state().expect("state");
        assert_eq!(state.step, NavStep::EntryConfirmation);
        assert!(!state.is_scanning);
        assert_eq!(
            state.detected_location.as_deref(),
            Some("Harbour Coach Station - Gate E")
        );
        assert!(state.destination_bay.is_some());

        controller.confirm_entry().expect("confirm entry");
        assert_eq!(controller.state().expect("state").step, NavStep::RoutePreview);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_location_is_refused() {
        let Harness {
            controller,
            mut notifications,
            ..
        } = harness();
        let err = controller
            .select_location("Main Concourse")
            .expect_err("should fail");
        assert_eq!(err.kind(), AppErrorKind::Navigation);
        assert_eq!(controller.state().expect("state").step, NavStep::Search);
        let notification = drain(&mut notifications).pop().expect("notification");
        assert_eq!(notification.kind, NotificationKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_before_detection_stays_in_search() {
        let Harness { controller, .. } = harness();
        let first = controller.begin_session().expect("begin session");
        advance(Duration::from_millis(500)).await;
        settle().await;

        let second = controller.change_location().expect("change location");
        let state = controller.state().expect("state");
        assert_eq!(state.step, NavStep::Search);
        assert_eq!(state.destination_bay, None);
        assert_eq!(state.bus_info, None);
        assert_eq!(state.progress, 0);
        assert_eq!(first.join().await, TaskOutcome::Cancelled);

        assert_eq!(second.join().await, TaskOutcome::Completed);
        let state = controller.state().expect("state");
        assert_eq!(state.step, NavStep::Search);
        assert!(state.bus_info.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn checkpoint_that_completes_is_kept_in_journey() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = NavConfig {
            checkpoint_progress: 99,
            ..NavConfig::default()
        };
        let Harness { controller, .. } = harness_with(&config);
        controller.attach_journal(DataManager::new(dir.path()).expect("journal"));

        navigating(&controller).await;
        controller
            .scan_checkpoint()
            .expect("scan checkpoint")
            .join()
            .await;
        let state = controller.state().expect("state");
        assert_eq!(state.progress, 100);
        assert!(state.completion_dialog_open);

        let journeys = controller.journeys().expect("journeys");
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].outcome, NavigationOutcome::Arrived);
        assert_eq!(journeys[0].checkpoints.len(), 1);
        assert_eq!(journeys[0].checkpoints[0].name, "Main Concourse");
    }

    #[tokio::test(start_paused = true)]
    async fn stats_are_limited_to_the_requested_range() {
        let dir = tempfile::tempdir().expect("temp dir");
        let Harness { controller, .. } = harness();
        controller.attach_journal(DataManager::new(dir.path()).expect("journal"));
        navigating(&controller).await;
        controller.skip_to_end().expect("skip");

        let all = controller
            .navigation_stats_in_range("2000-01-01T00:00:00Z", "2999-12-31T23:59:59Z")
            .expect("stats");
        assert_eq!(all.sessions_count, 1);
        assert_eq!(all.arrived_count, 1);

        let none = controller
            .navigation_stats_in_range("2000-01-01T00:00:00Z", "2000-12-31T23:59:59Z")
            .expect("stats");
        assert_eq!(none.sessions_count, 0);

        let err = controller
            .navigation_stats_in_range("yesterday", "today")
            .expect_err("should fail");
        assert_eq!(err.kind(), AppErrorKind::Data);
    }

    #[tokio::test(start_paused = true)]
    async fn recoverable_error_leaves_pending_work_running() {
        let Harness { controller, .. } = harness();
        let acquisition = controller.begin_session().expect("begin");
        controller.skip_to_end().expect_err("not navigating yet");
        assert_eq!(acquisition.join().await, TaskOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_halts_pending_work() {
        let Harness {
            controller,
            mut notifications,
            ..
        } = harness();
        controller.begin_session().expect("begin").join().await;
        let scan = controller.start_navigation().expect("start navigation");

        let error = controller
            .inner
            .report(AppError::fatal("Navigation state lock failed"));
        assert!(!error.is_recoverable());
        assert_eq!(scan.join().await, TaskOutcome::Cancelled);
        assert_eq!(
            controller.state().expect("state").step,
            NavStep::EntryConfirmation
        );
        let notification = drain(&mut notifications).pop().expect("notification");
        assert_eq!(notification.kind, NotificationKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_navigation_closes_ar_view() {
        let Harness { controller, .. } = harness();
        navigating(&controller).await;
        assert!(controller.toggle_ar_overlay().expect("open AR"));
        controller.complete_navigation().expect("complete");
        let state = controller.state().expect("state");
        assert!(!state.ar_overlay_open);
        assert!(state.completion_dialog_open);

        let next = controller.start_new_navigation().expect("start new");
        assert_eq!(controller.state().expect("state").step, NavStep::Search);
        next.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_action_is_reported() {
        let Harness {
            controller,
            mut notifications,
            ..
        } = harness();
        let err = controller.skip_to_end().expect_err("should fail");
        assert_eq!(err.kind(), AppErrorKind::Navigation);
        let notification = notifications.try_recv().expect("error notification");
        assert_eq!(notification.kind, NotificationKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn journeys_are_recorded_in_journal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let Harness { controller, .. } = harness();
        assert!(controller.attach_journal(DataManager::new(dir.path()).expect("journal")));

        navigating(&controller).await;
        controller
            .scan_checkpoint()
            .expect("scan checkpoint")
            .join()
            .await;
        controller.toggle_off_route().expect("off route");
        controller.recalculate_route().expect("recalculate");
        controller.skip_to_end().expect("skip");

        controller
            .start_new_navigation()
            .expect("start new")
            .join()
            .await;
        controller.start_navigation().expect("start again").join().await;
        controller.change_location().expect("abandon").cancel();

        let journeys = controller.journeys().expect("journeys");
        assert_eq!(journeys.len(), 2);
        assert_eq!(journeys[0].outcome, NavigationOutcome::Arrived);
        assert_eq!(journeys[0].checkpoints.len(), 1);
        assert_eq!(journeys[0].off_route_count, 1);
        assert_eq!(journeys[0].recalculation_count, 1);
        assert_eq!(journeys[1].outcome, NavigationOutcome::Abandoned);

        let stats = controller.navigation_stats().expect("stats");
        assert_eq!(stats.sessions_count, 2);
        assert_eq!(stats.arrived_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_work() {
        let Harness { controller, .. } = harness();
        let acquisition = controller.begin_session().expect("begin");
        controller.shutdown();
        assert_eq!(acquisition.join().await, TaskOutcome::Cancelled);
        assert!(controller.state().expect("state").detected_location.is_none());
    }
}
