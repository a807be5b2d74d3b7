//! Hive Invest — onboarding flow, session handling and data services for
//! the investment app, over a backend-as-a-service.

pub mod backend;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod rewards;
pub mod services;
pub mod session;
pub mod timers;
