// in-memory adapters for every port. filter semantics match the indexer:
// limit defaults to 100, offset to 0, order to newest first.

use super::{
    AssetPriceFilter, AssetPriceRepository, AssetRepository, CandleFilter, CandleRepository,
    MarketConfigRepository, OrderBy, PositionFilter, PositionRepository, RepositoryError,
    RepositoryResult,
};
use crate::asset::{current_prices_by_asset, AssetEntity, AssetPriceEntity};
use crate::candle::Candle;
use crate::config::DEFAULT_QUERY_LIMIT;
use crate::market::MarketConfigEntity;
use crate::position::PositionEntity;
use crate::types::{AssetId, Timestamp};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard};

fn read<T>(lock: &RwLock<T>) -> RepositoryResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| RepositoryError::Transport("in-memory source lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<Vec<T>>, item: T) {
    match lock.write() {
        Ok(mut items) => items.push(item),
        Err(poisoned) => poisoned.into_inner().push(item),
    }
}

/// Sorts by timestamp, then applies offset and limit.
fn page<T, F>(mut items: Vec<T>, key: F, order_by: Option<OrderBy>, offset: Option<u32>, limit: Option<u32>) -> Vec<T>
where
    F: Fn(&T) -> Timestamp,
{
    match order_by.unwrap_or_default() {
        OrderBy::TimestampDesc => items.sort_by(|a, b| key(b).cmp(&key(a))),
        OrderBy::TimestampAsc => items.sort_by(|a, b| key(a).cmp(&key(b))),
    }
    items
        .into_iter()
        .skip(offset.unwrap_or(0) as usize)
        .take(limit.unwrap_or(DEFAULT_QUERY_LIMIT) as usize)
        .collect()
}

#[derive(Debug, Default)]
pub struct InMemoryAssetRepository {
    assets: RwLock<Vec<AssetEntity>>,
}

impl InMemoryAssetRepository {
    pub fn new(assets: Vec<AssetEntity>) -> Self {
        Self {
            assets: RwLock::new(assets),
        }
    }

    pub fn insert(&self, asset: AssetEntity) {
        write(&self.assets, asset);
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn get_assets(&self) -> RepositoryResult<Vec<AssetEntity>> {
        Ok(read(&self.assets)?.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAssetPriceRepository {
    prices: RwLock<Vec<AssetPriceEntity>>,
}

impl InMemoryAssetPriceRepository {
    pub fn new(prices: Vec<AssetPriceEntity>) -> Self {
        Self {
            prices: RwLock::new(prices),
        }
    }

    pub fn insert(&self, price: AssetPriceEntity) {
        write(&self.prices, price);
    }
}

#[async_trait]
impl AssetPriceRepository for InMemoryAssetPriceRepository {
    async fn get_asset_prices_by_ids(&self, ids: &[AssetId]) -> RepositoryResult<Vec<AssetPriceEntity>> {
        let prices = read(&self.prices)?;
        let latest = current_prices_by_asset(&prices);
        Ok(ids.iter().filter_map(|id| latest.get(id).cloned()).collect())
    }

    async fn get_current_asset_price(&self, id: &AssetId) -> RepositoryResult<Option<AssetPriceEntity>> {
        let prices = read(&self.prices)?;
        Ok(crate::asset::current_price(&prices, id).cloned())
    }

    async fn get_historical_asset_prices(
        &self,
        filter: &AssetPriceFilter,
    ) -> RepositoryResult<Vec<AssetPriceEntity>> {
        let matching: Vec<AssetPriceEntity> = read(&self.prices)?
            .iter()
            .filter(|p| filter.asset.as_ref().map_or(true, |a| &p.asset_id == a))
            .filter(|p| filter.timestamp_lte.map_or(true, |ts| p.timestamp <= ts))
            .cloned()
            .collect();
        Ok(page(matching, |p| p.timestamp, filter.order_by, filter.offset, filter.limit))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCandleRepository {
    candles: RwLock<Vec<Candle>>,
}

impl InMemoryCandleRepository {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles: RwLock::new(candles),
        }
    }

    pub fn insert(&self, candle: Candle) {
        write(&self.candles, candle);
    }
}

#[async_trait]
impl CandleRepository for InMemoryCandleRepository {
    async fn get_candles(&self, filter: &CandleFilter) -> RepositoryResult<Vec<Candle>> {
        let matching: Vec<Candle> = read(&self.candles)?
            .iter()
            .filter(|c| c.interval == filter.interval)
            .filter(|c| filter.asset.as_ref().map_or(true, |a| &c.asset == a))
            .cloned()
            .collect();
        Ok(page(matching, |c| c.started_at, filter.order_by, filter.offset, filter.limit))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMarketConfigRepository {
    configs: RwLock<Vec<MarketConfigEntity>>,
}

impl InMemoryMarketConfigRepository {
    pub fn new(configs: Vec<MarketConfigEntity>) -> Self {
        Self {
            configs: RwLock::new(configs),
        }
    }

    pub fn insert(&self, config: MarketConfigEntity) {
        write(&self.configs, config);
    }
}

#[async_trait]
impl MarketConfigRepository for InMemoryMarketConfigRepository {
    async fn get_market_config(&self, asset: &AssetId) -> RepositoryResult<MarketConfigEntity> {
        read(&self.configs)?
            .iter()
            .find(|c| &c.asset_id == asset)
            .cloned()
            .ok_or_else(|| RepositoryError::MarketConfigNotFound(asset.clone()))
    }

    async fn get_market_configs(&self) -> RepositoryResult<Vec<MarketConfigEntity>> {
        Ok(read(&self.configs)?.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPositionRepository {
    revisions: RwLock<Vec<PositionEntity>>,
}

impl InMemoryPositionRepository {
    pub fn new(revisions: Vec<PositionEntity>) -> Self {
        Self {
            revisions: RwLock::new(revisions),
        }
    }

    /// Appends a revision. The previous latest revision of the same lineage
    /// keeps its data but loses the latest flag, as the indexer does.
    pub fn append(&self, revision: PositionEntity) {
        let mut revisions = match self.revisions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if revision.is_latest {
            for existing in revisions.iter_mut().filter(|r| r.stable_id == revision.stable_id) {
                existing.is_latest = false;
            }
        }
        revisions.push(revision);
    }
}

#[async_trait]
impl PositionRepository for InMemoryPositionRepository {
    async fn get_positions(&self, filter: &PositionFilter) -> RepositoryResult<Vec<PositionEntity>> {
        let matching: Vec<PositionEntity> = read(&self.revisions)?
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(page(matching, |r| r.timestamp, filter.order_by, filter.offset, filter.limit))
    }
}
