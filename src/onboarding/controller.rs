//! Onboarding controller — the single source of truth for the active step
//! and the only thing that navigates between onboarding routes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use super::state::{OnboardingStep, route_to_step};
use crate::error::OnboardingError;

/// Something that can move the user to a route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// In-memory navigation history. Clones share the same history, so a view
/// can keep one handle while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Arc<Mutex<Vec<String>>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(route: &str) -> Self {
        let history = Self::new();
        history.push(route);
        history
    }

    /// Record a route change (navigation or an external back/forward/link).
    pub fn push(&self, route: &str) {
        self.lock().push(route.to_string());
    }

    /// Current location, if any route has been visited.
    pub fn location(&self) -> Option<String> {
        self.lock().last().cloned()
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    // A panic elsewhere must not make the history drop navigations.
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for History {
    fn navigate(&self, route: &str) {
        self.push(route);
    }
}

/// View-state of the controller, as rendered by the step indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingStatus {
    pub step: OnboardingStep,
    pub step_number: u8,
    pub route: &'static str,
    pub show_progress: bool,
}

/// Tracks the current onboarding step for one mounted flow.
pub struct OnboardingController {
    current: OnboardingStep,
    show_progress: bool,
    navigator: Box<dyn Navigator>,
}

impl OnboardingController {
    /// Mount the controller at `route`.
    ///
    /// A mapped route sets the step; an unmapped one keeps `fallback`.
    /// `show_progress` is fixed here for the life of the mount.
    pub fn mount(route: &str, fallback: OnboardingStep, navigator: Box<dyn Navigator>) -> Self {
        let mounted = route_to_step(route);
        let current = mounted.unwrap_or(fallback);
        let show_progress = mounted != Some(OnboardingStep::LAST);
        debug!(route, step = %current, show_progress, "Onboarding controller mounted");
        Self {
            current,
            show_progress,
            navigator,
        }
    }

    pub fn current_step(&self) -> OnboardingStep {
        self.current
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    pub fn status(&self) -> OnboardingStatus {
        OnboardingStatus {
            step: self.current,
            step_number: self.current.number(),
            route: self.current.route(),
            show_progress: self.show_progress,
        }
    }

    /// Move to the next step and navigate to its route.
    ///
    /// Returns the route navigated to, or `None` on the terminal step, where
    /// nothing changes.
    pub fn advance(&mut self) -> Option<&'static str> {
        let Some(next) = self.current.next() else {
            debug!(step = %self.current, "Advance past the terminal step ignored");
            return None;
        };
        Some(self.go_to(next))
    }

    /// Move to the previous step and navigate to its route.
    ///
    /// Returns `None` on the first step, where nothing changes.
    pub fn retreat(&mut self) -> Option<&'static str> {
        let Some(prev) = self.current.prev() else {
            debug!(step = %self.current, "Retreat before the first step ignored");
            return None;
        };
        Some(self.go_to(prev))
    }

    /// Resynchronize with an external route change (back/forward, direct link).
    ///
    /// Unmapped routes leave the step untouched. Returns the step after the sync.
    pub fn sync_route(&mut self, route: &str) -> OnboardingStep {
        if let Some(step) = route_to_step(route) {
            if step != self.current {
                debug!(from = %self.current, to = %step, route, "Onboarding step resynchronized");
            }
            self.current = step;
        }
        self.current
    }

    fn go_to(&mut self, step: OnboardingStep) -> &'static str {
        let route = step.route();
        info!(from = %self.current, to = %step, route, "Onboarding navigation");
        self.current = step;
        self.navigator.navigate(route);
        route
    }
}

/// Explicit container for the onboarding flow.
///
/// The controller exists only between [`enter`](Self::enter) and
/// [`exit`](Self::exit); using it outside that window is a programming error
/// reported as [`OnboardingError::OutsideFlow`]. The last step is remembered
/// across exit/enter for the life of the scope so an unmapped entry route
/// resumes where the user left off.
#[derive(Default)]
pub struct OnboardingScope {
    controller: Option<OnboardingController>,
    last_step: Option<OnboardingStep>,
}

impl OnboardingScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the controller for a flow entered at `route`. Entering again
    /// replaces the running controller.
    pub fn enter(&mut self, route: &str, navigator: Box<dyn Navigator>) -> &mut OnboardingController {
        let fallback = self
            .controller
            .as_ref()
            .map(OnboardingController::current_step)
            .or(self.last_step)
            .unwrap_or(OnboardingStep::FIRST);
        self.controller
            .insert(OnboardingController::mount(route, fallback, navigator))
    }

    /// Tear the controller down. Returns the step it ended on.
    pub fn exit(&mut self) -> Option<OnboardingStep> {
        let controller = self.controller.take()?;
        let step = controller.current_step();
        self.last_step = Some(step);
        debug!(step = %step, "Onboarding flow exited");
        Some(step)
    }

    pub fn is_active(&self) -> bool {
        self.controller.is_some()
    }

    pub fn controller(&self) -> Result<&OnboardingController, OnboardingError> {
        self.controller.as_ref().ok_or(OnboardingError::OutsideFlow)
    }

    pub fn controller_mut(&mut self) -> Result<&mut OnboardingController, OnboardingError> {
        self.controller.as_mut().ok_or(OnboardingError::OutsideFlow)
    }

    pub fn current_step(&self) -> Result<OnboardingStep, OnboardingError> {
        self.controller().map(OnboardingController::current_step)
    }

    pub fn advance(&mut self) -> Result<Option<&'static str>, OnboardingError> {
        self.controller_mut().map(OnboardingController::advance)
    }

    pub fn retreat(&mut self) -> Result<Option<&'static str>, OnboardingError> {
        self.controller_mut().map(OnboardingController::retreat)
    }
}
