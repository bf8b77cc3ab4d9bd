//! Async commands: fetch from the repository ports into the store, and
//! forward position increases to the vault.
//!
//! Every fetch walks the same lifecycle on its slice: `Pending` while the
//! port is awaited, then `Fulfilled` with the new data or `Rejected` with the
//! error text. Rejections are also recorded as events and returned unchanged.

use super::QueryError;
use crate::asset::AssetPriceEntity;
use crate::config::CoreConfig;
use crate::decimal::{Collateral, DecimalCalculator, PositionSize, Ratio, Size};
use crate::events::{
    Event, EventCollector, EventPayload, FetchRejectedEvent, PositionIncreasedEvent,
    VaultOperationFailedEvent,
};
use crate::repository::{
    AssetPriceFilter, AssetPriceRepository, AssetRepository, CandleFilter, CandleRepository,
    MarketConfigRepository, PositionRepository, RepositoryResult,
};
use crate::store::{SliceKey, TradingStore};
use crate::types::{Address, AssetId, PositionStableId, Side};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// The ports a [`TradingCommands`] reads from.
#[derive(Clone)]
pub struct Repositories {
    pub assets: Arc<dyn AssetRepository>,
    pub asset_prices: Arc<dyn AssetPriceRepository>,
    pub candles: Arc<dyn CandleRepository>,
    pub market_configs: Arc<dyn MarketConfigRepository>,
    pub positions: Arc<dyn PositionRepository>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Vault rejected the operation: {0}")]
pub struct VaultError(pub String);

/// What the caller asks for: side, market, collateral and leverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncreasePositionParams {
    pub is_long: bool,
    pub index_asset: AssetId,
    pub collateral_asset: AssetId,
    pub leverage: Ratio,
    pub collateral_amount: Collateral,
}

/// What the vault receives. Size is collateral times leverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncreasePositionRequest {
    pub account: Address,
    pub collateral_asset: AssetId,
    pub index_asset: AssetId,
    pub side: Side,
    pub size: Size,
    pub collateral: Collateral,
}

impl IncreasePositionRequest {
    pub fn new(account: Address, params: &IncreasePositionParams) -> Self {
        Self {
            account,
            collateral_asset: params.collateral_asset.clone(),
            index_asset: params.index_asset.clone(),
            side: Side::from_is_long(params.is_long),
            size: position_size(params.collateral_amount, params.leverage),
            collateral: params.collateral_amount,
        }
    }
}

pub fn position_size(collateral: Collateral, leverage: Ratio) -> Size {
    DecimalCalculator::first(collateral)
        .multiply_by(leverage)
        .calculate::<PositionSize>()
}

/// Signs and submits vault transactions. `account` is None while no wallet
/// is connected.
#[async_trait]
pub trait VaultPort: Send + Sync {
    async fn account(&self) -> Option<Address>;

    async fn increase_position(&self, request: &IncreasePositionRequest) -> Result<(), VaultError>;
}

pub struct TradingCommands {
    store: Arc<TradingStore>,
    repos: Repositories,
    vault: Arc<dyn VaultPort>,
    config: CoreConfig,
    events: Mutex<EventCollector>,
}

impl TradingCommands {
    pub fn new(
        store: Arc<TradingStore>,
        repos: Repositories,
        vault: Arc<dyn VaultPort>,
        config: CoreConfig,
    ) -> Self {
        Self {
            store,
            repos,
            vault,
            config,
            events: Mutex::new(EventCollector::new()),
        }
    }

    pub fn store(&self) -> &Arc<TradingStore> {
        &self.store
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn collector(&self) -> MutexGuard<'_, EventCollector> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<Event> {
        self.collector().events().to_vec()
    }

    /// Returns the recorded events and clears the log.
    pub fn take_events(&self) -> Vec<Event> {
        let mut collector = self.collector();
        let events = collector.events().to_vec();
        collector.clear();
        events
    }

    async fn track<T, F>(&self, slice: SliceKey, fetch: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        self.store.mark_pending(slice);
        debug!(%slice, "fetch started");
        match fetch.await {
            Ok(data) => {
                debug!(%slice, "fetch fulfilled");
                Ok(data)
            }
            Err(err) => {
                warn!(%slice, error = %err, "fetch rejected");
                self.store.mark_rejected(slice, err.to_string());
                self.collector().record(EventPayload::FetchRejected(FetchRejectedEvent {
                    slice,
                    error: err.to_string(),
                }));
                Err(err)
            }
        }
    }

    pub async fn fetch_assets(&self) -> RepositoryResult<()> {
        let assets = self
            .track(SliceKey::Assets, self.repos.assets.get_assets())
            .await?;
        self.store.replace_assets(assets);
        Ok(())
    }

    pub async fn fetch_latest_asset_price(
        &self,
        asset: &AssetId,
    ) -> RepositoryResult<Option<AssetPriceEntity>> {
        let price = self
            .track(
                SliceKey::AssetPrices,
                self.repos.asset_prices.get_current_asset_price(asset),
            )
            .await?;
        match &price {
            Some(price) => self.store.upsert_asset_prices(vec![price.clone()]),
            None => self.store.mark_fulfilled(SliceKey::AssetPrices),
        }
        Ok(price)
    }

    pub async fn fetch_asset_prices(&self, ids: &[AssetId]) -> RepositoryResult<()> {
        let prices = self
            .track(
                SliceKey::AssetPrices,
                self.repos.asset_prices.get_asset_prices_by_ids(ids),
            )
            .await?;
        self.store.upsert_asset_prices(prices);
        Ok(())
    }

    pub async fn fetch_historical_asset_prices(&self, mut filter: AssetPriceFilter) -> RepositoryResult<()> {
        filter.limit = Some(self.config.query.resolve_limit(filter.limit));
        let prices = self
            .track(
                SliceKey::AssetPrices,
                self.repos.asset_prices.get_historical_asset_prices(&filter),
            )
            .await?;
        self.store.upsert_asset_prices(prices);
        Ok(())
    }

    pub async fn fetch_candles(&self, mut filter: CandleFilter) -> RepositoryResult<()> {
        filter.limit = Some(self.config.query.resolve_limit(filter.limit));
        let candles = self
            .track(SliceKey::Candles, self.repos.candles.get_candles(&filter))
            .await?;
        self.store.replace_candles(candles);
        Ok(())
    }

    pub async fn fetch_market_config(&self, asset: &AssetId) -> RepositoryResult<()> {
        let config = self
            .track(
                SliceKey::MarketConfigs,
                self.repos.market_configs.get_market_config(asset),
            )
            .await?;
        self.store.upsert_market_config(config);
        Ok(())
    }

    pub async fn fetch_market_configs(&self) -> RepositoryResult<()> {
        let configs = self
            .track(
                SliceKey::MarketConfigs,
                self.repos.market_configs.get_market_configs(),
            )
            .await?;
        self.store.replace_market_configs(configs);
        Ok(())
    }

    pub async fn fetch_positions_by_account(&self, account: &Address) -> RepositoryResult<()> {
        let latest_only = self.config.query.positions_latest_only;
        let positions = self
            .track(
                SliceKey::Positions,
                self.repos.positions.get_positions_by_account(account, latest_only),
            )
            .await?;
        self.store.upsert_positions(positions);
        Ok(())
    }

    /// Loads the full revision history of one lineage.
    pub async fn fetch_positions_by_stable_id(&self, id: &PositionStableId) -> RepositoryResult<()> {
        let positions = self
            .track(
                SliceKey::Positions,
                self.repos.positions.get_positions_by_stable_id(id, false),
            )
            .await?;
        self.store.upsert_positions(positions);
        Ok(())
    }

    pub fn set_current_user(&self, user: Option<Address>) {
        debug!(user = ?user, "current user changed");
        self.store.set_current_user(user);
    }

    pub async fn increase_position(
        &self,
        params: &IncreasePositionParams,
    ) -> Result<IncreasePositionRequest, QueryError> {
        let Some(account) = self.vault.account().await else {
            return Err(QueryError::NoCurrentUser);
        };
        let request = IncreasePositionRequest::new(account, params);

        match self.vault.increase_position(&request).await {
            Ok(()) => {
                info!(
                    account = %request.account,
                    asset = %request.index_asset,
                    side = %request.side,
                    size = %request.size,
                    "position increased"
                );
                self.collector().record(EventPayload::PositionIncreased(PositionIncreasedEvent {
                    account: request.account.clone(),
                    index_asset: request.index_asset.clone(),
                    side: request.side,
                    size: request.size,
                    collateral: request.collateral,
                }));
                Ok(request)
            }
            Err(err) => {
                warn!(error = %err, "increase position failed");
                self.collector().record(EventPayload::VaultOperationFailed(
                    VaultOperationFailedEvent {
                        operation: "increase_position".to_string(),
                        error: err.to_string(),
                    },
                ));
                Err(err.into())
            }
        }
    }
}
