//! Onboarding flow — the fixed sequence of steps a new user walks through
//! before reaching the app.
//!
//! The controller owns the current step and is the only thing that moves
//! between step routes. The manager validates each step's form, writes it
//! to the profile, and only then advances.

pub mod controller;
pub mod manager;
pub mod model;
pub mod routes;
pub mod state;

pub use controller::{History, Navigator, OnboardingController, OnboardingScope, OnboardingStatus};
pub use manager::OnboardingManager;
pub use model::{StepSubmission, StepValidator};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{OnboardingStep, STEP_COUNT, route_to_step, step_to_route};
