//! SessionProvider — owns the authenticated session and broadcasts changes.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::backend::{AuthSession, Backend, Identity};
use crate::error::{AuthError, BackendError};
use crate::timers::{ScopedTask, spawn_interval};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Authentication state change, as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// The initial session check finished.
    InitialSession { signed_in: bool },
    SignedIn { identity: Identity },
    SignedOut,
    TokenRefreshed { identity: Identity },
}

/// What the rest of the app sees of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub is_loading: bool,
}

struct SessionState {
    session: Option<AuthSession>,
    is_loading: bool,
}

/// Single owner of the backend session. Everything else reads it through
/// [`SessionProvider::snapshot`], [`SessionProvider::access_token`] or the
/// event stream.
pub struct SessionProvider {
    backend: Arc<dyn Backend>,
    state: RwLock<SessionState>,
    tx: broadcast::Sender<AuthEvent>,
}

impl SessionProvider {
    /// Create a provider in the loading state. Call [`initialize`](Self::initialize)
    /// to run the initial session check.
    pub fn new(backend: Arc<dyn Backend>) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            backend,
            state: RwLock::new(SessionState {
                session: None,
                is_loading: true,
            }),
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    /// Auth events as a stream; lagged events are skipped.
    pub fn events(&self) -> BroadcastStream<AuthEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            identity: state.session.as_ref().map(|s| s.user.clone()),
            is_loading: state.is_loading,
        }
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    /// Run the initial session check.
    ///
    /// With a stored refresh token the session is restored from the backend;
    /// a rejected token just leaves the user signed out. Loading always ends.
    pub async fn initialize(&self, refresh_token: Option<&str>) -> SessionSnapshot {
        let restored = match refresh_token {
            Some(token) => match self.backend.refresh_session(token).await {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(error = %e, "Stored session could not be restored");
                    None
                }
            },
            None => None,
        };

        let signed_in = restored.is_some();
        {
            let mut state = self.state.write().await;
            state.session = restored;
            state.is_loading = false;
        }
        info!(signed_in, "Initial session check complete");
        let _ = self.tx.send(AuthEvent::InitialSession { signed_in });
        self.snapshot().await
    }

    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        let session = self
            .backend
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| AuthError::SignInFailed {
                reason: e.to_string(),
            })?;
        let identity = session.user.clone();
        self.replace(Some(session)).await;
        info!(user_id = %identity.id, "Signed in");
        let _ = self.tx.send(AuthEvent::SignedIn {
            identity: identity.clone(),
        });
        Ok(identity)
    }

    /// Sign out. The backend logout is best-effort; local state is always cleared.
    pub async fn sign_out(&self) {
        let previous = self.replace(None).await;
        let Some(previous) = previous else {
            debug!("Sign-out requested without a session");
            return;
        };
        if let Err(e) = self.backend.sign_out(&previous.access_token).await {
            warn!(error = %e, "Backend sign-out failed; local session cleared anyway");
        }
        info!(user_id = %previous.user.id, "Signed out");
        let _ = self.tx.send(AuthEvent::SignedOut);
    }

    /// Exchange the current refresh token for a new session.
    ///
    /// A rejected refresh token ends the session; network and server
    /// failures leave it in place.
    pub async fn refresh(&self) -> Result<Identity, AuthError> {
        let refresh_token = {
            let state = self.state.read().await;
            state
                .session
                .as_ref()
                .map(|s| s.refresh_token.clone())
                .ok_or(AuthError::NoSession)?
        };

        match self.backend.refresh_session(&refresh_token).await {
            Ok(session) => {
                let identity = session.user.clone();
                self.replace(Some(session)).await;
                debug!(user_id = %identity.id, "Session token refreshed");
                let _ = self.tx.send(AuthEvent::TokenRefreshed {
                    identity: identity.clone(),
                });
                Ok(identity)
            }
            Err(e @ (BackendError::Unauthorized(_) | BackendError::Validation(_))) => {
                warn!(error = %e, "Session refresh rejected; signing out");
                if self.replace(None).await.is_some() {
                    let _ = self.tx.send(AuthEvent::SignedOut);
                }
                Err(AuthError::SessionExpired)
            }
            // Transient failure: keep the session and retry on the next tick.
            Err(e) => {
                warn!(error = %e, "Session refresh failed; keeping current session");
                Err(AuthError::Backend(e))
            }
        }
    }

    /// A remote call was rejected as unauthorized: drop the local session.
    pub async fn handle_unauthorized(&self) {
        if self.replace(None).await.is_some() {
            warn!("Backend rejected the session token; signed out locally");
            let _ = self.tx.send(AuthEvent::SignedOut);
        }
    }

    pub async fn access_token(&self) -> Result<String, AuthError> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(AuthError::NoSession)
    }

    pub async fn require_identity(&self) -> Result<Identity, AuthError> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or(AuthError::NoSession)
    }

    async fn replace(&self, session: Option<AuthSession>) -> Option<AuthSession> {
        let mut state = self.state.write().await;
        state.is_loading = false;
        std::mem::replace(&mut state.session, session)
    }
}

/// Refresh the session every `period` while one exists.
pub fn spawn_token_refresh(provider: Arc<SessionProvider>, period: Duration) -> ScopedTask {
    spawn_interval(period, move || {
        let provider = Arc::clone(&provider);
        async move {
            if provider.require_identity().await.is_ok() {
                let _ = provider.refresh().await;
            }
        }
    })
}
