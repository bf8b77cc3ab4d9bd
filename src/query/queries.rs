// 8.2: read queries. each struct owns one memo slot and reads store snapshots.
// inputs are keyed by Arc identity of the slices they read, so a store write
// that touches a slice invalidates every query depending on it.

use super::memo::Memo;
use super::QueryError;
use crate::account::{calculate_account_metrics, AccountMetrics, OraclePrices};
use crate::asset::{current_price, current_prices_by_asset, AssetPriceEntity};
use crate::config::PriceConfig;
use crate::decimal::Usd;
use crate::ledger::{filter_open_positions, history_for, latest_revision};
use crate::margin::{calculate_risk_metrics, evaluate_margin_status, MarginStatus, RiskMetrics};
use crate::market::MarketConfigEntity;
use crate::metrics::{calculate_notional, calculate_position_metrics, PositionMetrics};
use crate::position::PositionEntity;
use crate::store::{FetchStatus, TradingStore};
use crate::types::{Address, AssetId, MarketConfigId, PositionStableId, Timestamp};
use std::sync::Arc;

type Positions = Arc<Vec<PositionEntity>>;
type Prices = Arc<Vec<AssetPriceEntity>>;
type Configs = Arc<Vec<MarketConfigEntity>>;

fn find_config(configs: &[MarketConfigEntity], asset: &AssetId) -> Result<MarketConfigEntity, QueryError> {
    configs
        .iter()
        .find(|c| &c.asset_id == asset)
        .cloned()
        .ok_or_else(|| QueryError::MissingMarketConfig(asset.clone()))
}

fn find_price(prices: &[AssetPriceEntity], asset: &AssetId) -> Result<AssetPriceEntity, QueryError> {
    current_price(prices, asset)
        .cloned()
        .ok_or_else(|| QueryError::MissingOraclePrice(asset.clone()))
}

fn lineage(positions: &[PositionEntity], stable_id: &PositionStableId) -> Result<Vec<PositionEntity>, QueryError> {
    let history = history_for(positions, stable_id);
    if history.is_empty() {
        return Err(QueryError::PositionNotFound(stable_id.clone()));
    }
    Ok(history)
}

/// Open positions of the current user. Empty when nobody is signed in.
pub struct CurrentAccountOpenPositionsQuery {
    store: Arc<TradingStore>,
    memo: Memo<(Option<Address>, Positions), Vec<PositionEntity>>,
}

impl CurrentAccountOpenPositionsQuery {
    pub fn new(store: Arc<TradingStore>) -> Self {
        Self {
            store,
            memo: Memo::new(),
        }
    }

    pub fn get(&self) -> Arc<Vec<PositionEntity>> {
        let input = (self.store.current_user(), self.store.positions().data);
        self.memo.get_or_compute(input, |(user, positions)| match user {
            Some(user) => {
                let owned: Vec<PositionEntity> = positions
                    .iter()
                    .filter(|p| &p.account == user)
                    .cloned()
                    .collect();
                filter_open_positions(&owned)
            }
            None => Vec::new(),
        })
    }
}

pub struct CurrentAssetPriceQuery {
    store: Arc<TradingStore>,
    config: PriceConfig,
    memo: Memo<(AssetId, Prices), Option<AssetPriceEntity>>,
}

impl CurrentAssetPriceQuery {
    pub fn new(store: Arc<TradingStore>, config: PriceConfig) -> Self {
        Self {
            store,
            config,
            memo: Memo::new(),
        }
    }

    pub fn get(&self, asset: &AssetId) -> Arc<Option<AssetPriceEntity>> {
        let input = (asset.clone(), self.store.asset_prices().data);
        self.memo
            .get_or_compute(input, |(asset, prices)| current_price(prices, asset).cloned())
    }

    /// True when the current price is older than the configured max age,
    /// or when there is no price at all.
    pub fn is_stale(&self, asset: &AssetId, now: Timestamp) -> bool {
        match self.get(asset).as_ref() {
            Some(price) => price.is_stale(now, self.config.max_price_age_secs),
            None => true,
        }
    }
}

/// Revisions of one lineage, newest first.
pub struct PositionHistoryQuery {
    store: Arc<TradingStore>,
    memo: Memo<(PositionStableId, Positions), Vec<PositionEntity>>,
}

impl PositionHistoryQuery {
    pub fn new(store: Arc<TradingStore>) -> Self {
        Self {
            store,
            memo: Memo::new(),
        }
    }

    pub fn get(&self, stable_id: &PositionStableId) -> Arc<Vec<PositionEntity>> {
        let input = (stable_id.clone(), self.store.positions().data);
        self.memo
            .get_or_compute(input, |(id, positions)| history_for(positions, id))
    }
}

/// Margin figures of one position. Fails when its market config or oracle
/// price has not been loaded; those are never defaulted to zero.
pub struct RiskMetricsQuery {
    store: Arc<TradingStore>,
    memo: Memo<(PositionStableId, Usd, Positions, Prices, Configs), RiskMetrics>,
}

impl RiskMetricsQuery {
    pub fn new(store: Arc<TradingStore>) -> Self {
        Self {
            store,
            memo: Memo::new(),
        }
    }

    pub fn get(&self, stable_id: &PositionStableId, equity: Usd) -> Result<Arc<RiskMetrics>, QueryError> {
        let input = (
            stable_id.clone(),
            equity,
            self.store.positions().data,
            self.store.asset_prices().data,
            self.store.market_configs().data,
        );
        self.memo
            .get_or_try_compute(input, |(id, equity, positions, prices, configs)| {
                let history = lineage(positions, id)?;
                let asset = &history[0].asset_id;
                let config = find_config(configs, asset)?;
                let price = find_price(prices, asset)?;
                let notional = calculate_notional(&history, price.price);
                Ok(calculate_risk_metrics(notional, *equity, &config))
            })
    }

    /// Where `equity` sits against the position's IM and MM.
    pub fn margin_status(&self, stable_id: &PositionStableId, equity: Usd) -> Result<MarginStatus, QueryError> {
        let metrics = self.get(stable_id, equity)?;
        Ok(evaluate_margin_status(equity, &metrics))
    }
}

pub struct PositionMetricsQuery {
    store: Arc<TradingStore>,
    memo: Memo<(PositionStableId, Usd, Positions, Prices, Configs), PositionMetrics>,
}

impl PositionMetricsQuery {
    pub fn new(store: Arc<TradingStore>) -> Self {
        Self {
            store,
            memo: Memo::new(),
        }
    }

    pub fn get(&self, stable_id: &PositionStableId, equity: Usd) -> Result<Arc<PositionMetrics>, QueryError> {
        let input = (
            stable_id.clone(),
            equity,
            self.store.positions().data,
            self.store.asset_prices().data,
            self.store.market_configs().data,
        );
        self.memo
            .get_or_try_compute(input, |(id, equity, positions, prices, configs)| {
                let history = lineage(positions, id)?;
                let Some(latest) = latest_revision(&history) else {
                    return Ok(PositionMetrics::default());
                };
                let config = find_config(configs, &latest.asset_id)?;
                let price = find_price(prices, &latest.asset_id)?;
                Ok(calculate_position_metrics(&history, *equity, price.price, &config))
            })
    }
}

/// Account figures for the current user's open positions.
pub struct AccountMetricsQuery {
    store: Arc<TradingStore>,
    memo: Memo<(Option<Address>, Usd, Usd, Positions, Prices), AccountMetrics>,
}

impl AccountMetricsQuery {
    pub fn new(store: Arc<TradingStore>) -> Self {
        Self {
            store,
            memo: Memo::new(),
        }
    }

    pub fn get(&self, collateral_balance: Usd, used_margin: Usd) -> Arc<AccountMetrics> {
        let input = (
            self.store.current_user(),
            collateral_balance,
            used_margin,
            self.store.positions().data,
            self.store.asset_prices().data,
        );
        self.memo
            .get_or_compute(input, |(user, balance, used, positions, prices)| {
                let open: Vec<PositionEntity> = match user {
                    Some(user) => filter_open_positions(positions)
                        .into_iter()
                        .filter(|p| &p.account == user)
                        .collect(),
                    None => Vec::new(),
                };
                let oracle: OraclePrices = current_prices_by_asset(prices)
                    .into_iter()
                    .map(|(asset, p)| (asset, p.price))
                    .collect();
                calculate_account_metrics(&open, *balance, &oracle, *used)
            })
    }
}

/// Selectors over the market config slice.
pub struct MarketConfigQuery {
    store: Arc<TradingStore>,
}

impl MarketConfigQuery {
    pub fn new(store: Arc<TradingStore>) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Arc<Vec<MarketConfigEntity>> {
        self.store.market_configs().data
    }

    pub fn by_id(&self, id: &MarketConfigId) -> Option<MarketConfigEntity> {
        self.all().iter().find(|c| &c.id == id).cloned()
    }

    pub fn by_asset(&self, asset: &AssetId) -> Option<MarketConfigEntity> {
        self.all().iter().find(|c| &c.asset_id == asset).cloned()
    }

    pub fn fetch_status(&self) -> FetchStatus {
        self.store.market_configs().status
    }

    pub fn error(&self) -> Option<String> {
        self.store.market_configs().error
    }
}
