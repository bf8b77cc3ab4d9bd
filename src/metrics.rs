// 4.3: valuation of a single position against an oracle price.
// two pnl forms exist side by side:
//   ledger form: compares |size| * price against the collateral basis on the latest revision.
//   mark-to-entry form: for sizes quoted in usd, pnl = size * mark / entry - size.
// both branch on the explicit side and use |size|, so a short stored as a negative size
// and one stored as a positive size value the same.

use crate::decimal::{
    Collateral, DecimalCalculator, Percent, PercentageValue, Price, Ratio, RatioOutput, Size, Usd,
    UsdValue,
};
use crate::ledger::{calculate_entry_price, latest_revision};
use crate::liquidation::calculate_liquidation_price_approx;
use crate::margin::calculate_max_leverage;
use crate::market::MarketConfigEntity;
use crate::position::PositionEntity;
use crate::types::Side;
use serde::{Deserialize, Serialize};

/// |latest size| * price. Zero without a latest revision.
pub fn calculate_notional(history: &[PositionEntity], price: Price) -> Usd {
    match latest_revision(history) {
        Some(latest) => notional_value(latest.size, price),
        None => Usd::zero(),
    }
}

pub fn notional_value(size: Size, price: Price) -> Usd {
    DecimalCalculator::first(size.abs())
        .multiply_by(price)
        .calculate::<UsdValue>()
}

/// Ledger-form unrealized pnl of the latest revision.
pub fn calculate_unrealized_pnl(history: &[PositionEntity], price: Price) -> Usd {
    match latest_revision(history) {
        Some(latest) => unrealized_pnl(latest.side, latest.size, latest.collateral, price),
        None => Usd::zero(),
    }
}

/// LONG: |size| * price - collateral. SHORT: collateral - |size| * price.
pub fn unrealized_pnl(side: Side, size: Size, collateral: Collateral, price: Price) -> Usd {
    let long_pnl = DecimalCalculator::first(size.abs())
        .multiply_by(price)
        .subtract_by(collateral)
        .calculate::<UsdValue>();
    match side {
        Side::Long => long_pnl,
        Side::Short => -long_pnl,
    }
}

/// Mark-to-entry form. Zero when size or entry price is zero.
pub fn calculate_unrealized_pnl_at_mark(side: Side, size: Usd, entry_price: Price, mark_price: Price) -> Usd {
    if size.is_zero() || entry_price.is_zero() {
        return Usd::zero();
    }
    // size * mark / entry - size == size * (mark - entry) / entry, taken in one step
    let long_pnl = DecimalCalculator::first(size.abs())
        .multiply_by(mark_price - entry_price)
        .divide_by(entry_price)
        .calculate::<UsdValue>();
    match side {
        Side::Long => long_pnl,
        Side::Short => -long_pnl,
    }
}

/// pnl * 100 / equity. Zero when equity is not positive.
pub fn calculate_unrealized_pnl_percent(history: &[PositionEntity], equity: Usd, price: Price) -> Percent {
    pnl_percent(calculate_unrealized_pnl(history, price), equity)
}

pub fn pnl_percent(pnl: Usd, equity: Usd) -> Percent {
    if !equity.is_positive() {
        return Percent::zero();
    }
    DecimalCalculator::first(pnl)
        .multiply_by_integer(100)
        .divide_by(equity)
        .calculate::<PercentageValue>()
}

/// notional / equity for the latest revision.
pub fn calculate_leverage(history: &[PositionEntity], equity: Usd, price: Price) -> Ratio {
    leverage_from_notional(calculate_notional(history, price), equity)
}

/// notional / equity. Zero when equity is not positive.
pub fn leverage_from_notional(notional: Usd, equity: Usd) -> Ratio {
    if !equity.is_positive() {
        return Ratio::zero();
    }
    DecimalCalculator::first(notional)
        .divide_by(equity)
        .calculate::<RatioOutput>()
}

/// |size| / collateral. Zero when collateral is not positive.
pub fn calculate_position_leverage(size: Size, collateral: Collateral) -> Ratio {
    if !collateral.is_positive() {
        return Ratio::zero();
    }
    DecimalCalculator::first(size.abs())
        .divide_by(collateral)
        .calculate::<RatioOutput>()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionMetrics {
    pub notional: Usd,
    pub unrealized_pnl: Usd,
    pub unrealized_pnl_percent: Percent,
    pub leverage: Ratio,
    pub position_leverage: Ratio,
    pub entry_price: Price,
    pub liquidation_price: Price,
}

/// Every per-position figure at once. Entry price comes from the latest revision's
/// running total and falls back to the weighted average over the history.
pub fn calculate_position_metrics(
    history: &[PositionEntity],
    equity: Usd,
    price: Price,
    config: &MarketConfigEntity,
) -> PositionMetrics {
    let Some(latest) = latest_revision(history) else {
        return PositionMetrics::default();
    };

    let entry_price = if latest.entry_price.is_zero() {
        calculate_entry_price(history)
    } else {
        latest.entry_price
    };
    let notional = notional_value(latest.size, price);
    let unrealized_pnl = unrealized_pnl(latest.side, latest.size, latest.collateral, price);

    PositionMetrics {
        notional,
        unrealized_pnl,
        unrealized_pnl_percent: pnl_percent(unrealized_pnl, equity),
        leverage: leverage_from_notional(notional, equity),
        position_leverage: calculate_position_leverage(latest.size, latest.collateral),
        entry_price,
        liquidation_price: calculate_liquidation_price_approx(
            latest.side,
            latest.size,
            latest.collateral,
            entry_price,
            calculate_max_leverage(config),
        ),
    }
}

impl Default for PositionMetrics {
    fn default() -> Self {
        Self {
            notional: Usd::zero(),
            unrealized_pnl: Usd::zero(),
            unrealized_pnl_percent: Percent::zero(),
            leverage: Ratio::zero(),
            position_leverage: Ratio::zero(),
            entry_price: Price::zero(),
            liquidation_price: Price::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::fixtures::{open_long, revision};
    use crate::types::AssetId;

    fn short(size: i128, collateral: i128) -> PositionEntity {
        PositionEntity {
            side: Side::Short,
            size: Size::from_units(size),
            collateral: Collateral::from_units(collateral),
            ..revision("s", "s")
        }
    }

    #[test]
    fn notional_uses_size_magnitude() {
        let price = Price::from_units(50_000);
        assert_eq!(calculate_notional(&[open_long("a", 2, 0)], price), Usd::from_units(100_000));
        assert_eq!(calculate_notional(&[short(-2, 0)], price), Usd::from_units(100_000));
        assert_eq!(calculate_notional(&[], price), Usd::zero());
    }

    #[test]
    fn notional_ignores_history_without_latest() {
        let mut old = open_long("a", 2, 0);
        old.is_latest = false;
        assert_eq!(calculate_notional(&[old], Price::from_units(10)), Usd::zero());
    }

    #[test]
    fn ledger_pnl_long() {
        let history = [open_long("a", 1, 50_000)];
        assert_eq!(calculate_unrealized_pnl(&history, Price::from_units(55_000)), Usd::from_units(5_000));
        assert_eq!(calculate_unrealized_pnl(&history, Price::from_units(45_000)), Usd::from_units(-5_000));
    }

    #[test]
    fn ledger_pnl_short() {
        let history = [short(-1, 50_000)];
        assert_eq!(calculate_unrealized_pnl(&history, Price::from_units(45_000)), Usd::from_units(5_000));
        assert_eq!(calculate_unrealized_pnl(&history, Price::from_units(55_000)), Usd::from_units(-5_000));
        assert_eq!(calculate_unrealized_pnl(&[], Price::from_units(55_000)), Usd::zero());
    }

    #[test]
    fn mark_to_entry_pnl() {
        let size = Usd::from_units(1_000);
        let entry = Price::from_units(50_000);
        let mark = Price::from_units(55_000);
        assert_eq!(calculate_unrealized_pnl_at_mark(Side::Long, size, entry, mark), Usd::from_units(100));
        assert_eq!(calculate_unrealized_pnl_at_mark(Side::Short, size, entry, mark), Usd::from_units(-100));
        assert_eq!(calculate_unrealized_pnl_at_mark(Side::Long, Usd::zero(), entry, mark), Usd::zero());
        assert_eq!(calculate_unrealized_pnl_at_mark(Side::Long, size, Price::zero(), mark), Usd::zero());
    }

    #[test]
    fn pnl_percent_of_equity() {
        let history = [open_long("a", 1, 45_000)];
        let pct = calculate_unrealized_pnl_percent(&history, Usd::from_units(100_000), Price::from_units(50_000));
        assert_eq!(pct, Percent::from_units(5));
        let zero = calculate_unrealized_pnl_percent(&history, Usd::zero(), Price::from_units(50_000));
        assert_eq!(zero, Percent::zero());
    }

    #[test]
    fn leverage_is_notional_over_equity() {
        let history = [open_long("a", 1, 0)];
        let price = Price::from_units(50_000);
        assert_eq!(calculate_leverage(&history, Usd::from_units(100_000), price), Ratio::from_raw(500_000_000));
        assert_eq!(calculate_leverage(&history, Usd::from_units(10_000), price), Ratio::from_units(5));
        assert_eq!(calculate_leverage(&history, Usd::zero(), price), Ratio::zero());
        assert_eq!(calculate_leverage(&history, Usd::from_units(-1), price), Ratio::zero());
    }

    #[test]
    fn position_leverage_guards_collateral() {
        assert_eq!(calculate_position_leverage(Size::from_units(10_000), Collateral::from_units(1_000)), Ratio::from_units(10));
        assert_eq!(calculate_position_leverage(Size::from_units(-10_000), Collateral::from_units(1_000)), Ratio::from_units(10));
        assert_eq!(calculate_position_leverage(Size::from_units(10), Collateral::zero()), Ratio::zero());
    }

    #[test]
    fn position_metrics_bundle() {
        let latest = PositionEntity {
            entry_price: Price::from_units(50_000),
            ..open_long("a", 10_000, 1_000)
        };
        let config = MarketConfigEntity {
            initial_margin_fraction: Ratio::from_raw(20_000_000), // 50x
            maintenance_margin_fraction: Ratio::from_raw(10_000_000),
            ..MarketConfigEntity::btc_default(AssetId::new("0xbtc"))
        };

        let metrics = calculate_position_metrics(&[latest], Usd::from_units(1_000), Price::from_units(1), &config);
        assert_eq!(metrics.notional, Usd::from_units(10_000));
        assert_eq!(metrics.unrealized_pnl, Usd::from_units(9_000));
        assert_eq!(metrics.position_leverage, Ratio::from_units(10));
        assert_eq!(metrics.entry_price, Price::from_units(50_000));
        assert_eq!(metrics.liquidation_price, Price::from_units(46_000));
    }

    #[test]
    fn position_metrics_empty_history() {
        let config = MarketConfigEntity::btc_default(AssetId::new("0xbtc"));
        let metrics = calculate_position_metrics(&[], Usd::from_units(1), Price::from_units(1), &config);
        assert_eq!(metrics, PositionMetrics::default());
    }
}
