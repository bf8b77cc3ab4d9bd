//! Data-access ports consumed by the command layer.
//!
//! The calculators never touch these. Implementations own transport and
//! parsing; everything crossing this boundary already satisfies the entity
//! invariants. [`memory`] provides adapters over in-process vectors.

pub mod memory;

use crate::asset::{AssetEntity, AssetPriceEntity};
use crate::candle::{Candle, CandleInterval};
use crate::market::MarketConfigEntity;
use crate::position::PositionEntity;
use crate::types::{Address, AssetId, PositionStableId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::{
    InMemoryAssetPriceRepository, InMemoryAssetRepository, InMemoryCandleRepository,
    InMemoryMarketConfigRepository, InMemoryPositionRepository,
};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Market config not found for asset {0}")]
    MarketConfigNotFound(AssetId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid data from source: {0}")]
    InvalidData(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderBy {
    #[default]
    TimestampDesc,
    TimestampAsc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPriceFilter {
    pub asset: Option<AssetId>,
    pub timestamp_lte: Option<Timestamp>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Option<OrderBy>,
}

impl AssetPriceFilter {
    pub fn for_asset(asset: AssetId) -> Self {
        Self {
            asset: Some(asset),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleFilter {
    pub asset: Option<AssetId>,
    pub interval: CandleInterval,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Option<OrderBy>,
}

impl CandleFilter {
    pub fn new(interval: CandleInterval) -> Self {
        Self {
            asset: None,
            interval,
            limit: None,
            offset: None,
            order_by: None,
        }
    }

    pub fn asset(mut self, asset: AssetId) -> Self {
        self.asset = Some(asset);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionFilter {
    pub account: Option<Address>,
    pub asset: Option<AssetId>,
    pub stable_id: Option<PositionStableId>,
    pub is_long: Option<bool>,
    pub latest_only: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Option<OrderBy>,
}

impl PositionFilter {
    pub fn matches(&self, position: &PositionEntity) -> bool {
        self.account.as_ref().map_or(true, |a| &position.account == a)
            && self.asset.as_ref().map_or(true, |a| &position.asset_id == a)
            && self.stable_id.as_ref().map_or(true, |s| &position.stable_id == s)
            && self.is_long.map_or(true, |l| position.is_long() == l)
            && (!self.latest_only || position.is_latest)
    }
}

#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn get_assets(&self) -> RepositoryResult<Vec<AssetEntity>>;
}

#[async_trait]
pub trait AssetPriceRepository: Send + Sync {
    /// Current price of each requested asset. Unknown ids are absent from the result.
    async fn get_asset_prices_by_ids(&self, ids: &[AssetId]) -> RepositoryResult<Vec<AssetPriceEntity>>;

    async fn get_current_asset_price(&self, id: &AssetId) -> RepositoryResult<Option<AssetPriceEntity>>;

    async fn get_historical_asset_prices(
        &self,
        filter: &AssetPriceFilter,
    ) -> RepositoryResult<Vec<AssetPriceEntity>>;
}

#[async_trait]
pub trait CandleRepository: Send + Sync {
    async fn get_candles(&self, filter: &CandleFilter) -> RepositoryResult<Vec<Candle>>;
}

#[async_trait]
pub trait MarketConfigRepository: Send + Sync {
    /// Fails with [`RepositoryError::MarketConfigNotFound`] when the asset has no config.
    async fn get_market_config(&self, asset: &AssetId) -> RepositoryResult<MarketConfigEntity>;

    async fn get_market_configs(&self) -> RepositoryResult<Vec<MarketConfigEntity>>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn get_positions(&self, filter: &PositionFilter) -> RepositoryResult<Vec<PositionEntity>>;

    async fn get_positions_by_stable_id(
        &self,
        id: &PositionStableId,
        latest_only: bool,
    ) -> RepositoryResult<Vec<PositionEntity>> {
        let filter = PositionFilter {
            stable_id: Some(id.clone()),
            latest_only,
            ..PositionFilter::default()
        };
        self.get_positions(&filter).await
    }

    async fn get_positions_by_account(
        &self,
        account: &Address,
        latest_only: bool,
    ) -> RepositoryResult<Vec<PositionEntity>> {
        let filter = PositionFilter {
            account: Some(account.clone()),
            latest_only,
            ..PositionFilter::default()
        };
        self.get_positions(&filter).await
    }

    async fn get_positions_by_asset(
        &self,
        asset: &AssetId,
        is_long: Option<bool>,
    ) -> RepositoryResult<Vec<PositionEntity>> {
        let filter = PositionFilter {
            asset: Some(asset.clone()),
            is_long,
            latest_only: true,
            ..PositionFilter::default()
        };
        self.get_positions(&filter).await
    }
}
