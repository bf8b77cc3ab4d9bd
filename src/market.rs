//! Per-asset market configuration.
//!
//! A market config carries the margin fractions that bound leverage for one
//! index asset, plus the decimal counts used for tick (price) and step (size)
//! rounding. Configs are reference data: replaced wholesale on every fetch.

use crate::decimal::{Price, Ratio, Size};
use crate::margin::calculate_max_leverage;
use crate::types::{AssetId, MarketConfigId};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketConfigEntity {
    pub id: MarketConfigId,
    pub asset_id: AssetId,
    /// IMF, e.g. 0.05 for 20x max leverage.
    pub initial_margin_fraction: Ratio,
    /// MMF, always at most the IMF.
    pub maintenance_margin_fraction: Ratio,
    pub tick_size_decimals: u32,
    pub step_size_decimals: u32,
}

impl MarketConfigEntity {
    /// BTC market with 20x max leverage, used by fixtures and presets.
    pub fn btc_default(asset_id: AssetId) -> Self {
        Self {
            id: MarketConfigId::new(format!("{}-config", asset_id)),
            asset_id,
            initial_margin_fraction: Ratio::from_decimal(dec!(0.05)),
            maintenance_margin_fraction: Ratio::from_decimal(dec!(0.03)),
            tick_size_decimals: 1,
            step_size_decimals: 4,
        }
    }

    pub fn validate(&self) -> Result<(), MarketConfigError> {
        if self.asset_id.is_empty() {
            return Err(MarketConfigError::MissingAsset(self.id.clone()));
        }
        let one = Ratio::from_units(1);
        if !self.initial_margin_fraction.is_positive() || self.initial_margin_fraction > one {
            return Err(MarketConfigError::InvalidInitialMarginFraction(
                self.initial_margin_fraction,
            ));
        }
        if self.maintenance_margin_fraction.is_negative()
            || self.maintenance_margin_fraction > self.initial_margin_fraction
        {
            return Err(MarketConfigError::InvalidMaintenanceMarginFraction {
                maintenance: self.maintenance_margin_fraction,
                initial: self.initial_margin_fraction,
            });
        }
        if self.tick_size_decimals > Price::DECIMALS || self.step_size_decimals > Size::DECIMALS {
            return Err(MarketConfigError::InvalidPrecision {
                tick: self.tick_size_decimals,
                step: self.step_size_decimals,
            });
        }
        Ok(())
    }

    /// Truncates a price to the market's tick.
    pub fn round_price_to_tick(&self, price: Price) -> Price {
        let unit = 10i128.pow(Price::DECIMALS.saturating_sub(self.tick_size_decimals));
        Price::from_raw(price.raw() / unit * unit)
    }

    /// Truncates a size to the market's step.
    pub fn round_size_to_step(&self, size: Size) -> Size {
        let unit = 10i128.pow(Size::DECIMALS.saturating_sub(self.step_size_decimals));
        Size::from_raw(size.raw() / unit * unit)
    }

    pub fn max_leverage(&self) -> Ratio {
        calculate_max_leverage(self)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketConfigError {
    #[error("Market config {0} has no asset")]
    MissingAsset(MarketConfigId),

    #[error("Initial margin fraction {0} outside (0, 1]")]
    InvalidInitialMarginFraction(Ratio),

    #[error("Maintenance margin fraction {maintenance} must be within [0, {initial}]")]
    InvalidMaintenanceMarginFraction { maintenance: Ratio, initial: Ratio },

    #[error("Invalid precision: tick {tick}, step {step}")]
    InvalidPrecision { tick: u32, step: u32 },
}
