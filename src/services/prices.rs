//! Asset prices and the admin price board.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{FetchState, ServiceContext};
use crate::backend::Query;
use crate::error::{ErrorSurface, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub symbol: String,
    pub name: String,
    pub price_usd: Decimal,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PriceService {
    ctx: ServiceContext,
}

impl PriceService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list_assets(&self) -> Result<Vec<Asset>, ServiceError> {
        self.ctx
            .select("assets", &Query::new().order_asc("symbol"))
            .await
    }

    /// Set an asset's USD price. Admin only.
    ///
    /// Returns the price the backend stored, or `new_price` when it answers
    /// with no body.
    pub async fn update_price(&self, asset_id: Uuid, new_price: Decimal) -> Result<Decimal, ServiceError> {
        if new_price <= Decimal::ZERO {
            return Err(ServiceError::invalid("price", "must be greater than zero"));
        }
        let admin = self.ctx.require_admin().await?;
        let stored: Option<Decimal> = self
            .ctx
            .rpc(
                "update_asset_price",
                serde_json::json!({ "p_asset_id": asset_id, "p_new_price": new_price }),
            )
            .await?;
        let price = stored.unwrap_or(new_price);
        info!(%asset_id, %price, admin_id = %admin.id, "Asset price updated");
        Ok(price)
    }
}

/// View-state of the admin price list.
///
/// Each row keeps its own inline error so a failed edit on one asset does
/// not disturb the others.
pub struct PriceBoard {
    service: PriceService,
    assets: FetchState<Vec<Asset>>,
    row_errors: HashMap<Uuid, String>,
}

impl PriceBoard {
    pub fn new(service: PriceService) -> Self {
        Self {
            service,
            assets: FetchState::new(),
            row_errors: HashMap::new(),
        }
    }

    pub fn assets(&self) -> &FetchState<Vec<Asset>> {
        &self.assets
    }

    pub async fn load(&mut self) -> bool {
        let service = self.service.clone();
        self.assets.run(service.list_assets()).await
    }

    /// Submit a new price for one row.
    ///
    /// On failure the displayed price is left as it was and the row gets an
    /// inline error; on success the price is replaced and the error cleared.
    pub async fn update_price(&mut self, asset_id: Uuid, new_price: Decimal) -> bool {
        match self.service.update_price(asset_id, new_price).await {
            Ok(price) => {
                self.row_errors.remove(&asset_id);
                if let Some(asset) = self.asset_mut(asset_id) {
                    asset.price_usd = price;
                    asset.updated_at = Some(Utc::now());
                }
                true
            }
            Err(e) => {
                warn!(%asset_id, error = %e, "Price update failed");
                let message = match ErrorSurface::from(&e) {
                    ErrorSurface::Inline(message) | ErrorSurface::Fatal(message) => message,
                    ErrorSurface::RedirectToLogin => {
                        self.assets.record_error(&e);
                        e.to_string()
                    }
                };
                self.row_errors.insert(asset_id, message);
                false
            }
        }
    }

    pub fn price_of(&self, asset_id: Uuid) -> Option<Decimal> {
        self.assets
            .data
            .as_ref()?
            .iter()
            .find(|a| a.id == asset_id)
            .map(|a| a.price_usd)
    }

    pub fn error_for(&self, asset_id: Uuid) -> Option<&str> {
        self.row_errors.get(&asset_id).map(String::as_str)
    }

    fn asset_mut(&mut self, asset_id: Uuid) -> Option<&mut Asset> {
        self.assets
            .data
            .as_mut()?
            .iter_mut()
            .find(|a| a.id == asset_id)
    }
}
