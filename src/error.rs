//! Error types for Hive Invest.

use crate::onboarding::OnboardingStep;

/// Route of the login entry point that auth failures redirect to.
pub const LOGIN_ROUTE: &str = "/login";

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),
}

/// Configuration-related errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors returned by the remote backend boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Could not decode backend response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Authentication and session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No active session")]
    NoSession,

    #[error("Sign-in failed: {reason}")]
    SignInFailed { reason: String },

    #[error("Session expired")]
    SessionExpired,

    #[error("Session backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors from the data-fetch services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Admin access required")]
    AdminRequired,
}

impl ServiceError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the caller must sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::Backend(BackendError::Unauthorized(_))
        )
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Backend(e.into())
    }
}

/// Onboarding flow errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingError {
    /// A controller function was used while no onboarding flow is active.
    #[error("Onboarding flow is not active")]
    OutsideFlow,

    #[error("Submission for step {submitted} does not match current step {current}")]
    StepMismatch {
        current: OnboardingStep,
        submitted: OnboardingStep,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Bee name {0} is already taken")]
    NameTaken(String),

    #[error("Referral code {0} is not valid")]
    InvalidReferral(String),

    #[error("Verification code was rejected")]
    CodeRejected,

    #[error("{0}")]
    Service(#[from] ServiceError),
}

impl OnboardingError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// How an error is presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSurface {
    /// Send the user to the login entry point.
    RedirectToLogin,
    /// Show a message next to the form or list that triggered the call.
    Inline(String),
    /// Abort startup.
    Fatal(String),
}

impl ErrorSurface {
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            Self::RedirectToLogin => Some(LOGIN_ROUTE),
            _ => None,
        }
    }
}

impl From<&ServiceError> for ErrorSurface {
    fn from(e: &ServiceError) -> Self {
        if e.requires_login() {
            Self::RedirectToLogin
        } else {
            Self::Inline(e.to_string())
        }
    }
}

impl From<&OnboardingError> for ErrorSurface {
    fn from(e: &OnboardingError) -> Self {
        match e {
            OnboardingError::Service(inner) => inner.into(),
            other => Self::Inline(other.to_string()),
        }
    }
}

impl Error {
    /// Classify the error by how it must be surfaced.
    pub fn surface(&self) -> ErrorSurface {
        match self {
            Self::Config(e) => ErrorSurface::Fatal(e.to_string()),
            Self::Auth(_) | Self::Backend(BackendError::Unauthorized(_)) => {
                ErrorSurface::RedirectToLogin
            }
            Self::Backend(e) => ErrorSurface::Inline(e.to_string()),
            Self::Service(e) => e.into(),
            Self::Onboarding(e) => e.into(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_fatal() {
        let err = Error::from(ConfigError::MissingEnvVar("HIVE_BACKEND_URL".into()));
        assert!(matches!(err.surface(), ErrorSurface::Fatal(msg) if msg.contains("HIVE_BACKEND_URL")));
    }

    #[test]
    fn auth_errors_redirect_to_login() {
        let err = Error::from(AuthError::NoSession);
        assert_eq!(err.surface(), ErrorSurface::RedirectToLogin);
        assert_eq!(err.surface().redirect(), Some(LOGIN_ROUTE));

        let err = Error::from(ServiceError::from(BackendError::Unauthorized("jwt expired".into())));
        assert_eq!(err.surface(), ErrorSurface::RedirectToLogin);
    }

    #[test]
    fn remote_errors_are_inline() {
        let err = Error::from(ServiceError::from(BackendError::NotFound("asset".into())));
        match err.surface() {
            ErrorSurface::Inline(msg) => assert_eq!(msg, "Not found: asset"),
            other => panic!("Expected inline surface, got {other:?}"),
        }
        assert_eq!(err.surface().redirect(), None);
    }

    #[test]
    fn onboarding_service_errors_use_inner_surface() {
        let err = OnboardingError::Service(ServiceError::Auth(AuthError::NoSession));
        assert_eq!(ErrorSurface::from(&err), ErrorSurface::RedirectToLogin);

        let err = OnboardingError::NameTaken("buzz".into());
        assert_eq!(
            ErrorSurface::from(&err),
            ErrorSurface::Inline("Bee name buzz is already taken".into())
        );
    }
}
