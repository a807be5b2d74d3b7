//! Data-fetch services.
//!
//! Each service method performs exactly one logical read or write against
//! the backend for the signed-in user. Views keep results in a
//! [`FetchState`], which turns failures into an inline message (or a login
//! redirect) instead of propagating them.

pub mod payouts;
pub mod portfolio;
pub mod prices;
pub mod profile;
pub mod referrals;
pub mod transactions;

pub use payouts::{Payout, PayoutService, PayoutStatus};
pub use portfolio::{Balance, PortfolioOverview, PortfolioService};
pub use prices::{Asset, PriceBoard, PriceService};
pub use profile::{FinancialInfo, Profile, ProfilePatch, ProfileService};
pub use referrals::{PollenBalance, ReferralReward, ReferralService, ReferralSummary, RewardsService};
pub use transactions::{Transaction, TransactionKind, TransactionService, TransactionStatus};

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::{Backend, Identity, Query};
use crate::error::{BackendError, ErrorSurface, ServiceError};
use crate::session::SessionProvider;

/// Backend access on behalf of the signed-in user.
///
/// Every call attaches the session token; an unauthorized answer drops the
/// session through the provider so the UI falls back to the login route.
#[derive(Clone)]
pub struct ServiceContext {
    backend: Arc<dyn Backend>,
    session: Arc<SessionProvider>,
}

impl ServiceContext {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionProvider>) -> Self {
        Self { backend, session }
    }

    pub fn session(&self) -> &Arc<SessionProvider> {
        &self.session
    }

    pub async fn identity(&self) -> Result<Identity, ServiceError> {
        Ok(self.session.require_identity().await?)
    }

    /// Identity of the signed-in user, who must be an admin.
    pub async fn require_admin(&self) -> Result<Identity, ServiceError> {
        let identity = self.identity().await?;
        if !identity.is_admin() {
            tracing::warn!(user_id = %identity.id, "Admin operation refused");
            return Err(ServiceError::AdminRequired);
        }
        Ok(identity)
    }

    pub async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        params: serde_json::Value,
    ) -> Result<T, ServiceError> {
        let token = self.session.access_token().await?;
        let result = self.backend.rpc(function, params, Some(&token)).await;
        let value = self.check(result).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, ServiceError> {
        let token = self.session.access_token().await?;
        let result = self.backend.select(table, query, Some(&token)).await;
        let rows = self.check(result).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(ServiceError::from))
            .collect()
    }

    /// Patch the single row matched by `query` and return it.
    pub async fn update_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        patch: &impl Serialize,
    ) -> Result<T, ServiceError> {
        let token = self.session.access_token().await?;
        let patch = serde_json::to_value(patch)?;
        let result = self.backend.update(table, query, patch, Some(&token)).await;
        let rows = self.check(result).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("no {table} row matched")))?;
        Ok(serde_json::from_value(row)?)
    }

    /// Insert one row and return it as stored.
    pub async fn insert(
        &self,
        table: &str,
        row: serde_json::Value,
    ) -> Result<serde_json::Value, ServiceError> {
        let token = self.session.access_token().await?;
        let result = self.backend.insert(table, row, Some(&token)).await;
        self.check(result).await
    }

    async fn check<T>(&self, result: Result<T, BackendError>) -> Result<T, ServiceError> {
        match result {
            Err(BackendError::Unauthorized(message)) => {
                self.session.handle_unauthorized().await;
                Err(BackendError::Unauthorized(message).into())
            }
            other => other.map_err(ServiceError::from),
        }
    }
}

/// `{data, loading, error}` view-state for one remote read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    /// Inline message from the last failed call.
    pub error: Option<String>,
    /// The last call failed because the user must sign in again.
    pub login_required: bool,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            login_required: false,
        }
    }
}

impl<T> FetchState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a request as in flight.
    pub fn begin(&mut self) {
        self.loading = true;
    }

    /// Record the outcome of a request.
    ///
    /// Success replaces the data and clears any error; failure keeps the
    /// previous data and records the message. Returns whether it succeeded.
    pub fn finish(&mut self, result: Result<T, ServiceError>) -> bool {
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.login_required = false;
                true
            }
            Err(e) => {
                self.record_error(&e);
                false
            }
        }
    }

    /// Run a request through `begin`/`finish`.
    pub async fn run<F>(&mut self, request: F) -> bool
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        self.begin();
        let result = request.await;
        self.finish(result)
    }

    pub fn record_error(&mut self, error: &ServiceError) {
        match ErrorSurface::from(error) {
            ErrorSurface::RedirectToLogin => {
                self.login_required = true;
                self.error = Some(error.to_string());
            }
            ErrorSurface::Inline(message) | ErrorSurface::Fatal(message) => {
                self.login_required = false;
                self.error = Some(message);
            }
        }
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.login_required = false;
    }
}
