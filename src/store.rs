//! Normalized collections shared by commands and queries.
//!
//! Every collection is a [`Slice`]: an `Arc` snapshot plus the status of the
//! last fetch that targeted it. Readers get cheap clones of the `Arc`;
//! writers build a new collection and swap it in, so a changed slice always
//! has a new pointer identity and an unchanged one keeps its old one.

use crate::asset::{AssetEntity, AssetPriceEntity};
use crate::candle::Candle;
use crate::market::MarketConfigEntity;
use crate::position::PositionEntity;
use crate::types::{Address, PositionRevisionId, PositionStableId, Timestamp};
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    #[default]
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceKey {
    Assets,
    AssetPrices,
    MarketConfigs,
    Positions,
    Candles,
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SliceKey::Assets => "assets",
            SliceKey::AssetPrices => "asset_prices",
            SliceKey::MarketConfigs => "market_configs",
            SliceKey::Positions => "positions",
            SliceKey::Candles => "candles",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct Slice<T> {
    pub data: Arc<T>,
    pub status: FetchStatus,
    pub error: Option<String>,
}

impl<T> Clone for Slice<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

impl<T: Default> Default for Slice<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(T::default()),
            status: FetchStatus::Idle,
            error: None,
        }
    }
}

impl<T> Slice<T> {
    fn fulfill(&mut self, data: T) {
        self.data = Arc::new(data);
        self.status = FetchStatus::Fulfilled;
        self.error = None;
    }

    // status-only transitions leave data (and its identity) alone
    fn mark(&mut self, status: FetchStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
    }
}

#[derive(Debug, Default)]
struct StoreState {
    assets: Slice<Vec<AssetEntity>>,
    asset_prices: Slice<Vec<AssetPriceEntity>>,
    market_configs: Slice<Vec<MarketConfigEntity>>,
    positions: Slice<Vec<PositionEntity>>,
    candles: Slice<Vec<Candle>>,
    current_user: Option<Address>,
}

#[derive(Debug, Default)]
pub struct TradingStore {
    state: RwLock<StoreState>,
}

impl TradingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn assets(&self) -> Slice<Vec<AssetEntity>> {
        self.read().assets.clone()
    }

    pub fn asset_prices(&self) -> Slice<Vec<AssetPriceEntity>> {
        self.read().asset_prices.clone()
    }

    pub fn market_configs(&self) -> Slice<Vec<MarketConfigEntity>> {
        self.read().market_configs.clone()
    }

    pub fn positions(&self) -> Slice<Vec<PositionEntity>> {
        self.read().positions.clone()
    }

    pub fn candles(&self) -> Slice<Vec<Candle>> {
        self.read().candles.clone()
    }

    pub fn current_user(&self) -> Option<Address> {
        self.read().current_user.clone()
    }

    pub fn status(&self, key: SliceKey) -> FetchStatus {
        let state = self.read();
        match key {
            SliceKey::Assets => state.assets.status,
            SliceKey::AssetPrices => state.asset_prices.status,
            SliceKey::MarketConfigs => state.market_configs.status,
            SliceKey::Positions => state.positions.status,
            SliceKey::Candles => state.candles.status,
        }
    }

    pub fn mark_pending(&self, key: SliceKey) {
        self.mark(key, FetchStatus::Pending, None);
    }

    pub fn mark_rejected(&self, key: SliceKey, error: impl Into<String>) {
        self.mark(key, FetchStatus::Rejected, Some(error.into()));
    }

    /// Settles a fetch that brought nothing new. Data and its identity are kept.
    pub fn mark_fulfilled(&self, key: SliceKey) {
        self.mark(key, FetchStatus::Fulfilled, None);
    }

    fn mark(&self, key: SliceKey, status: FetchStatus, error: Option<String>) {
        let mut state = self.write();
        match key {
            SliceKey::Assets => state.assets.mark(status, error),
            SliceKey::AssetPrices => state.asset_prices.mark(status, error),
            SliceKey::MarketConfigs => state.market_configs.mark(status, error),
            SliceKey::Positions => state.positions.mark(status, error),
            SliceKey::Candles => state.candles.mark(status, error),
        }
    }

    /// Reference data is replaced wholesale.
    pub fn replace_assets(&self, assets: Vec<AssetEntity>) {
        self.write().assets.fulfill(assets);
    }

    /// Merges by (asset, timestamp). Kept newest first.
    pub fn upsert_asset_prices(&self, incoming: Vec<AssetPriceEntity>) {
        let mut state = self.write();
        let mut merged: Vec<AssetPriceEntity> = state
            .asset_prices
            .data
            .iter()
            .filter(|p| {
                !incoming
                    .iter()
                    .any(|n| n.asset_id == p.asset_id && n.timestamp == p.timestamp)
            })
            .cloned()
            .collect();
        merged.extend(incoming);
        crate::asset::sort_prices_desc(&mut merged);
        state.asset_prices.fulfill(merged);
    }

    /// One config per asset; a fetched config replaces the previous one for its asset.
    pub fn upsert_market_config(&self, config: MarketConfigEntity) {
        let mut state = self.write();
        let mut configs: Vec<MarketConfigEntity> = state
            .market_configs
            .data
            .iter()
            .filter(|c| c.asset_id != config.asset_id)
            .cloned()
            .collect();
        configs.push(config);
        state.market_configs.fulfill(configs);
    }

    pub fn replace_market_configs(&self, configs: Vec<MarketConfigEntity>) {
        self.write().market_configs.fulfill(configs);
    }

    /// Merges by revision id, incoming copies win. Afterwards each lineage keeps
    /// the latest flag only on its newest flagged revision by (timestamp, revision id),
    /// so a late response carrying an older revision cannot displace a newer one.
    pub fn upsert_positions(&self, incoming: Vec<PositionEntity>) {
        let mut state = self.write();
        let mut merged: Vec<PositionEntity> = state
            .positions
            .data
            .iter()
            .filter(|p| !incoming.iter().any(|n| n.revision_id == p.revision_id))
            .cloned()
            .collect();
        merged.extend(incoming);
        settle_latest(&mut merged);
        state.positions.fulfill(merged);
    }

    pub fn replace_candles(&self, candles: Vec<Candle>) {
        self.write().candles.fulfill(candles);
    }

    pub fn set_current_user(&self, user: Option<Address>) {
        self.write().current_user = user;
    }
}

fn settle_latest(positions: &mut [PositionEntity]) {
    let mut newest: BTreeMap<PositionStableId, (Timestamp, PositionRevisionId)> = BTreeMap::new();
    for p in positions.iter().filter(|p| p.is_latest) {
        let candidate = (p.timestamp, p.revision_id.clone());
        match newest.get(&p.stable_id) {
            Some(current) if *current >= candidate => {}
            _ => {
                newest.insert(p.stable_id.clone(), candidate);
            }
        }
    }
    for p in positions.iter_mut().filter(|p| p.is_latest) {
        p.is_latest = newest
            .get(&p.stable_id)
            .is_some_and(|(ts, id)| *ts == p.timestamp && *id == p.revision_id);
    }
}
