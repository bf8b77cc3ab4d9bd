//! Margin requirements and position health.
//!
//! Initial margin (IM) is notional times the market's initial margin
//! fraction and bounds how much can be opened. Maintenance margin (MM) is
//! notional times the maintenance fraction; equity below it is liquidatable.
//!
//! Every ratio here returns zero of its kind when its denominator is not
//! positive, so callers feeding display values never see an error.

use crate::decimal::{
    DecimalCalculator, Percent, PercentageValue, Ratio, RatioOutput, Usd, UsdValue,
};
use crate::market::MarketConfigEntity;
use serde::{Deserialize, Serialize};

/// Upper bound of [`calculate_position_health`], in percent.
pub const HEALTH_CAP_PERCENT: i128 = 100;

/// Derived on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub initial_margin: Usd,
    pub maintenance_margin: Usd,
    pub max_leverage: Ratio,
    pub position_health: Percent,
}

pub fn calculate_initial_margin(notional: Usd, config: &MarketConfigEntity) -> Usd {
    DecimalCalculator::first(notional)
        .multiply_by(config.initial_margin_fraction)
        .calculate::<UsdValue>()
}

pub fn calculate_maintenance_margin(notional: Usd, config: &MarketConfigEntity) -> Usd {
    DecimalCalculator::first(notional)
        .multiply_by(config.maintenance_margin_fraction)
        .calculate::<UsdValue>()
}

/// 1 / IMF, zero when the IMF is not positive.
pub fn calculate_max_leverage(config: &MarketConfigEntity) -> Ratio {
    if !config.initial_margin_fraction.is_positive() {
        return Ratio::zero();
    }
    DecimalCalculator::one()
        .divide_by(config.initial_margin_fraction)
        .calculate::<RatioOutput>()
}

/// equity / MM as a percentage, capped at 100.
pub fn calculate_position_health(equity: Usd, maintenance_margin: Usd) -> Percent {
    if !equity.is_positive() || !maintenance_margin.is_positive() {
        return Percent::zero();
    }
    let health = DecimalCalculator::first(equity)
        .multiply_by_integer(100)
        .divide_by(maintenance_margin)
        .calculate::<PercentageValue>();
    health.min(Percent::from_units(HEALTH_CAP_PERCENT))
}

pub fn calculate_risk_metrics(
    notional: Usd,
    equity: Usd,
    config: &MarketConfigEntity,
) -> RiskMetrics {
    let initial_margin = calculate_initial_margin(notional, config);
    let maintenance_margin = calculate_maintenance_margin(notional, config);
    RiskMetrics {
        initial_margin,
        maintenance_margin,
        max_leverage: calculate_max_leverage(config),
        position_health: calculate_position_health(equity, maintenance_margin),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginStatus {
    Healthy,
    Warning,
    Liquidatable,
}

/// Healthy at or above IM, Warning between MM and IM, Liquidatable below MM.
pub fn evaluate_margin_status(equity: Usd, metrics: &RiskMetrics) -> MarginStatus {
    if equity >= metrics.initial_margin {
        MarginStatus::Healthy
    } else if equity >= metrics.maintenance_margin {
        MarginStatus::Warning
    } else {
        MarginStatus::Liquidatable
    }
}
