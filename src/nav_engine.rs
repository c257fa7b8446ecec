use crate::config::NavConfig;
use crate::location;
use crate::models::{BusBookingRef, NavStep, SessionState, Waypoint};
use crate::path_calc::{self, CalculatedRoute};
use crate::progress_tracker::{self, PROGRESS_COMPLETE};
use crate::scan::ScanPurpose;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("cannot {action} during {step}")]
    InvalidTransition { action: &'static str, step: NavStep },
    #[error("operation was superseded by a newer one")]
    StaleOperation,
    #[error("no booking available for this session")]
    MissingBooking,
    #[error("no location detected for this session")]
    MissingLocation,
    #[error("{0:?} is not a known terminal gate")]
    UnknownLocation(String),
    #[error("navigation already complete")]
    AlreadyComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Acquisition,
    Scan(ScanPurpose),
    PathCalculation,
}

/// Handle for one simulated operation. Completing with a ticket that is no
/// longer current fails with [`NavError::StaleOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTicket {
    id: u64,
    kind: PendingKind,
}

impl OperationTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> PendingKind {
        self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    StepChanged { step: NavStep },
    ProgressAdvanced { progress: u8, checkpoint: String },
    /// `checkpoint` is set when a checkpoint scan carried the session over
    /// the completion threshold.
    Arrived { checkpoint: Option<String> },
}

#[derive(Debug)]
pub struct NavigationEngine {
    checkpoint_progress: u8,
    completion_threshold: u8,
    step: NavStep,
    detected_location: Option<String>,
    booking: Option<BusBookingRef>,
    destination_bay: Option<String>,
    progress: u8,
    current_checkpoint: Option<String>,
    waypoints: Vec<Waypoint>,
    direction_text: Option<String>,
    is_off_route: bool,
    ar_overlay_open: bool,
    completion_dialog_open: bool,
    pending: Option<OperationTicket>,
    last_ticket_id: u64,
}

impl Default for NavigationEngine {
    fn default() -> Self {
        Self::new(&NavConfig::default())
    }
}

impl NavigationEngine {
    pub fn new(config: &NavConfig) -> Self {
        Self {
            checkpoint_progress: config.checkpoint_progress.min(PROGRESS_COMPLETE),
            completion_threshold: config.completion_threshold.min(PROGRESS_COMPLETE),
            step: NavStep::Search,
            detected_location: None,
            booking: None,
            destination_bay: None,
            progress: 0,
            current_checkpoint: None,
            waypoints: Vec::new(),
            direction_text: None,
            is_off_route: false,
            ar_overlay_open: false,
            completion_dialog_open: false,
            pending: None,
            last_ticket_id: 0,
        }
    }

    pub fn step(&self) -> NavStep {
        self.step
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn booking(&self) -> Option<&BusBookingRef> {
        self.booking.as_ref()
    }

    pub fn detected_location(&self) -> Option<&str> {
        self.detected_location.as_deref()
    }

    pub fn destination_bay(&self) -> Option<&str> {
        self.destination_bay.as_deref()
    }

    pub fn current_checkpoint(&self) -> Option<&str> {
        self.current_checkpoint.as_deref()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn pending(&self) -> Option<OperationTicket> {
        self.pending
    }

    pub fn is_scanning(&self) -> bool {
        matches!(
            self.pending,
            Some(OperationTicket {
                kind: PendingKind::Scan(_),
                ..
            })
        )
    }

    pub fn is_calculating(&self) -> bool {
        matches!(
            self.pending,
            Some(OperationTicket {
                kind: PendingKind::PathCalculation,
                ..
            })
        )
    }

    pub fn is_off_route(&self) -> bool {
        self.is_off_route
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= PROGRESS_COMPLETE
    }

    /// True once a route has been calculated for the current session.
    pub fn has_route(&self) -> bool {
        !self.waypoints.is_empty()
    }

    pub fn snapshot(&self) -> SessionState {
        SessionState {
            step: self.step,
            detected_location: self.detected_location.clone(),
            destination_bay: self.destination_bay.clone(),
            bus_info: self.booking.clone(),
            progress: self.progress,
            current_checkpoint_name: self.current_checkpoint.clone(),
            is_off_route: self.is_off_route,
            is_scanning: self.is_scanning(),
            calculating_path: self.is_calculating(),
            waypoints: self.waypoints.clone(),
            direction_text: self.direction_text.clone(),
            show_direction_indicator: self.step == NavStep::ActiveNavigation
                && !self.is_off_route
                && !self.is_complete(),
            ar_overlay_open: self.ar_overlay_open,
            completion_dialog_open: self.completion_dialog_open,
        }
    }

    pub fn begin_acquisition(&mut self) -> Result<OperationTicket, NavError> {
        self.require_step(NavStep::Search, "detect location")?;
        Ok(self.issue(PendingKind::Acquisition))
    }

    pub fn complete_acquisition(
        &mut self,
        ticket: OperationTicket,
        location: String,
        booking: BusBookingRef,
    ) -> Result<Transition, NavError> {
        self.take_pending(ticket)?;
        self.apply_location(location, booking)
    }

    /// Installs a location and booking immediately, superseding any pending
    /// acquisition.
    pub fn apply_location(
        &mut self,
        location: String,
        booking: BusBookingRef,
    ) -> Result<Transition, NavError> {
        self.require_step(NavStep::Search, "set location")?;
        if matches!(
            self.pending,
            Some(OperationTicket {
                kind: PendingKind::Acquisition,
                ..
            })
        ) {
            self.pending = None;
        }
        self.detected_location = Some(location);
        self.booking = Some(booking);
        Ok(Transition::NoChange)
    }

    /// "Scan QR" from the search screen: adopts the booking's bay as the
    /// destination and starts the entry scan.
    pub fn start_navigation(&mut self) -> Result<OperationTicket, NavError> {
        self.require_step(NavStep::Search, "start navigation")?;
        let bay = self
            .booking
            .as_ref()
            .map(BusBookingRef::bay_label)
            .ok_or(NavError::MissingBooking)?;
        self.destination_bay = Some(bay);
        self.step = NavStep::EntryConfirmation;
        self.issue_scan("start entry scan")
    }

    /// Picking a location from search or the popular list lands on the entry
    /// confirmation step with the entry point already confirmed, so no scan
    /// is pending. Only catalog gates are accepted.
    pub fn select_location(&mut self, location: String) -> Result<Transition, NavError> {
        self.require_step(NavStep::Search, "select location")?;
        if !location::is_catalog_location(&location) {
            return Err(NavError::UnknownLocation(location));
        }
        let bay = self
            .booking
            .as_ref()
            .map(BusBookingRef::bay_label)
            .ok_or(NavError::MissingBooking)?;
        self.pending = None;
        self.detected_location = Some(location);
        self.destination_bay = Some(bay);
        self.step = NavStep::EntryConfirmation;
        Ok(Transition::StepChanged {
            step: NavStep::EntryConfirmation,
        })
    }

    /// "Continue" on an entry point confirmed without a scan.
    pub fn confirm_entry(&mut self) -> Result<Transition, NavError> {
        self.require_step(NavStep::EntryConfirmation, "confirm entry point")?;
        if self.is_scanning() {
            return Err(NavError::InvalidTransition {
                action: "confirm entry point while scanning",
                step: self.step,
            });
        }
        self.step = NavStep::RoutePreview;
        Ok(Transition::StepChanged {
            step: NavStep::RoutePreview,
        })
    }

    pub fn begin_precision_scan(&mut self) -> Result<OperationTicket, NavError> {
        self.require_step(NavStep::RoutePreview, "rescan entry point")?;
        self.step = NavStep::PrecisionScan;
        self.issue_scan("rescan entry point")
    }

    pub fn scan_checkpoint(&mut self) -> Result<OperationTicket, NavError> {
        self.require_step(NavStep::ActiveNavigation, "scan checkpoint")?;
        if self.is_complete() {
            return Err(NavError::AlreadyComplete);
        }
        self.issue_scan("scan checkpoint")
    }

    pub fn complete_scan(&mut self, ticket: OperationTicket) -> Result<Transition, NavError> {
        let PendingKind::Scan(purpose) = ticket.kind else {
            return Err(NavError::StaleOperation);
        };
        self.take_pending(ticket)?;
        match purpose {
            ScanPurpose::Entry | ScanPurpose::Precision => {
                self.step = NavStep::RoutePreview;
                Ok(Transition::StepChanged {
                    step: NavStep::RoutePreview,
                })
            }
            ScanPurpose::Checkpoint => self.reach_checkpoint(),
        }
    }

    /// "Calculate Best Path" from the route preview.
    pub fn calculate_path(&mut self) -> Result<OperationTicket, NavError> {
        self.require_step(NavStep::RoutePreview, "calculate path")?;
        if self.detected_location.is_none() {
            return Err(NavError::MissingLocation);
        }
        if self.booking.is_none() {
            return Err(NavError::MissingBooking);
        }
        self.step = NavStep::Calculating;
        Ok(self.issue(PendingKind::PathCalculation))
    }

    pub fn complete_path_calculation(
        &mut self,
        ticket: OperationTicket,
    ) -> Result<Transition, NavError> {
        if ticket.kind != PendingKind::PathCalculation {
            return Err(NavError::StaleOperation);
        }
        self.take_pending(ticket)?;
        let location = self
            .detected_location
            .as_deref()
            .ok_or(NavError::MissingLocation)?;
        let booking = self.booking.as_ref().ok_or(NavError::MissingBooking)?;
        let CalculatedRoute {
            waypoints,
            direction_text,
        } = path_calc::calculate_route(location, booking);

        self.current_checkpoint = waypoints.get(1).map(|waypoint| waypoint.name.clone());
        self.waypoints = waypoints;
        self.progress = 0;
        self.direction_text = Some(direction_text);
        self.is_off_route = false;
        self.refresh_waypoints();
        self.step = NavStep::ActiveNavigation;
        Ok(Transition::StepChanged {
            step: NavStep::ActiveNavigation,
        })
    }

    pub fn skip_to_end(&mut self) -> Result<Transition, NavError> {
        self.require_step(NavStep::ActiveNavigation, "skip to end")?;
        if self.is_complete() {
            return Err(NavError::AlreadyComplete);
        }
        self.raise_progress(PROGRESS_COMPLETE);
        Ok(self.arrive(None))
    }

    /// Closes the AR overlay and raises the completion dialog.
    pub fn complete_navigation(&mut self) -> Result<Transition, NavError> {
        self.require_step(NavStep::ActiveNavigation, "complete navigation")?;
        self.ar_overlay_open = false;
        if self.is_complete() {
            self.completion_dialog_open = true;
            return Ok(Transition::NoChange);
        }
        self.raise_progress(PROGRESS_COMPLETE);
        Ok(self.arrive(None))
    }

    /// Returns the new off-route flag.
    pub fn toggle_off_route(&mut self) -> Result<bool, NavError> {
        self.require_step(NavStep::ActiveNavigation, "simulate off-route")?;
        if self.is_complete() {
            return Err(NavError::AlreadyComplete);
        }
        self.is_off_route = !self.is_off_route;
        Ok(self.is_off_route)
    }

    pub fn recalculate_route(&mut self) -> Result<Transition, NavError> {
        self.require_step(NavStep::ActiveNavigation, "recalculate route")?;
        if !self.is_off_route {
            return Err(NavError::InvalidTransition {
                action: "recalculate route while on route",
                step: self.step,
            });
        }
        self.is_off_route = false;
        let target = self.current_checkpoint.clone().unwrap_or_default();
        self.direction_text = Some(path_calc::recalculated_directions(&target));
        Ok(Transition::NoChange)
    }

    /// Returns whether the overlay is now open.
    pub fn toggle_ar_overlay(&mut self) -> Result<bool, NavError> {
        self.require_step(NavStep::ActiveNavigation, "toggle AR view")?;
        self.ar_overlay_open = !self.ar_overlay_open;
        Ok(self.ar_overlay_open)
    }

    /// Back to the search step with every session field cleared. Outstanding
    /// tickets become stale.
    pub fn reset(&mut self) {
        self.step = NavStep::Search;
        self.detected_location = None;
        self.booking = None;
        self.destination_bay = None;
        self.progress = 0;
        self.current_checkpoint = None;
        self.waypoints.clear();
        self.direction_text = None;
        self.is_off_route = false;
        self.ar_overlay_open = false;
        self.completion_dialog_open = false;
        self.pending = None;
    }

    fn reach_checkpoint(&mut self) -> Result<Transition, NavError> {
        let checkpoint = self
            .waypoints
            .get(2)
            .or_else(|| self.waypoints.last())
            .map(|waypoint| waypoint.name.clone())
            .ok_or(NavError::InvalidTransition {
                action: "reach checkpoint without a route",
                step: self.step,
            })?;
        self.raise_progress(self.checkpoint_progress);
        if self.progress >= self.completion_threshold {
            self.raise_progress(PROGRESS_COMPLETE);
            return Ok(self.arrive(Some(checkpoint)));
        }
        self.current_checkpoint = Some(checkpoint.clone());
        self.refresh_waypoints();
        if !self.is_off_route {
            self.direction_text = Some(path_calc::directions_toward(&checkpoint));
        }
        Ok(Transition::ProgressAdvanced {
            progress: self.progress,
            checkpoint,
        })
    }

    fn arrive(&mut self, checkpoint: Option<String>) -> Transition {
        if let Some(OperationTicket {
            kind: PendingKind::Scan(_),
            ..
        }) = self.pending
        {
            self.pending = None;
        }
        self.is_off_route = false;
        self.current_checkpoint = self.waypoints.last().map(|waypoint| waypoint.name.clone());
        self.refresh_waypoints();
        let bay = self
            .destination_bay
            .clone()
            .or_else(|| self.current_checkpoint.clone())
            .unwrap_or_default();
        self.direction_text = Some(path_calc::arrival_directions(&bay));
        self.completion_dialog_open = true;
        Transition::Arrived { checkpoint }
    }

    fn raise_progress(&mut self, value: u8) {
        self.progress = self.progress.max(value.min(PROGRESS_COMPLETE));
    }

    fn refresh_waypoints(&mut self) {
        progress_tracker::refresh_flags(
            &mut self.waypoints,
            self.current_checkpoint.as_deref(),
            self.progress,
        );
    }

    fn require_step(&self, expected: NavStep, action: &'static str) -> Result<(), NavError> {
        if self.step != expected {
            return Err(NavError::InvalidTransition {
                action,
                step: self.step,
            });
        }
        Ok(())
    }

    fn issue(&mut self, kind: PendingKind) -> OperationTicket {
        self.last_ticket_id = self.last_ticket_id.saturating_add(1);
        let ticket = OperationTicket {
            id: self.last_ticket_id,
            kind,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Scan purpose follows the step the scan is started from.
    fn issue_scan(&mut self, action: &'static str) -> Result<OperationTicket, NavError> {
        let purpose = ScanPurpose::for_step(self.step).ok_or(NavError::InvalidTransition {
            action,
            step: self.step,
        })?;
        Ok(self.issue(PendingKind::Scan(purpose)))
    }

    fn take_pending(&mut self, ticket: OperationTicket) -> Result<(), NavError> {
        match self.pending {
            Some(pending) if pending == ticket => {
                self.pending = None;
                Ok(())
            }
            _ => Err(NavError::StaleOperation),
        }
    }
}
