//! Asset reference data and oracle prices.

use crate::decimal::Price;
use crate::types::{AssetId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntity {
    pub asset_id: AssetId,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub is_base_asset: Option<bool>,
}

impl AssetEntity {
    pub fn is_base(&self) -> bool {
        self.is_base_asset.unwrap_or(false)
    }
}

/// One oracle observation. Several per asset, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPriceEntity {
    pub asset_id: AssetId,
    pub price: Price,
    pub timestamp: Timestamp,
}

impl AssetPriceEntity {
    pub fn new(asset_id: AssetId, price: Price, timestamp: Timestamp) -> Self {
        Self {
            asset_id,
            price,
            timestamp,
        }
    }

    pub fn is_stale(&self, now: Timestamp, max_age_secs: i64) -> bool {
        now.seconds_since(&self.timestamp) > max_age_secs
    }
}

/// The most recent observation for `asset`, if any.
pub fn current_price<'a>(
    prices: &'a [AssetPriceEntity],
    asset: &AssetId,
) -> Option<&'a AssetPriceEntity> {
    prices
        .iter()
        .filter(|p| &p.asset_id == asset)
        .max_by_key(|p| p.timestamp)
}

/// Newest observation per asset.
pub fn current_prices_by_asset(prices: &[AssetPriceEntity]) -> BTreeMap<AssetId, AssetPriceEntity> {
    let mut latest: BTreeMap<AssetId, AssetPriceEntity> = BTreeMap::new();
    for price in prices {
        match latest.get(&price.asset_id) {
            Some(existing) if existing.timestamp >= price.timestamp => {}
            _ => {
                latest.insert(price.asset_id.clone(), price.clone());
            }
        }
    }
    latest
}

/// Price points sorted newest first, as the indexer returns them.
pub fn sort_prices_desc(prices: &mut [AssetPriceEntity]) {
    prices.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
