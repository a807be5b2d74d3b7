//! Session/identity provider.
//!
//! Wraps the backend's authentication session and exposes the current
//! identity plus a loading flag to the rest of the app. The session is the
//! only state shared between otherwise independent views; it is owned here
//! and read-only everywhere else.

pub mod inactivity;
pub mod provider;
pub mod routes;

pub use inactivity::InactivityMonitor;
pub use provider::{AuthEvent, SessionProvider, SessionSnapshot, spawn_token_refresh};
pub use routes::session_routes;
