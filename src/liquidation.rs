//! Approximate liquidation price.
//!
//! The position is liquidated once losses eat through the collateral held
//! above the minimum required at max leverage:
//!
//! ```text
//! min_collateral = |size| / max_leverage
//! available      = collateral - min_collateral
//! price_change   = available * entry_price / |size|
//! LONG  -> entry_price - price_change
//! SHORT -> entry_price + price_change
//! ```
//!
//! Funding, fees and other positions are ignored. The result is not clamped,
//! so a long with more collateral than notional reports a negative price.

use crate::decimal::{Collateral, DecimalCalculator, OraclePrice, Price, Ratio, Size};
use crate::position::PositionEntity;
use crate::types::Side;

pub fn calculate_liquidation_price_approx(
    side: Side,
    size: Size,
    collateral: Collateral,
    entry_price: Price,
    max_leverage: Ratio,
) -> Price {
    if size.is_zero() || entry_price.is_zero() || !max_leverage.is_positive() {
        return Price::zero();
    }
    let size = size.abs();

    // available * max_leverage, kept unscaled so nothing is rounded before the final division
    let excess = || {
        DecimalCalculator::first(collateral)
            .multiply_by(max_leverage)
            .subtract_by(size)
    };
    if excess().signum() <= 0 {
        return entry_price;
    }

    let price_change = excess()
        .multiply_by(entry_price)
        .in_denominator(|d| d.value(max_leverage).multiply_by(size))
        .calculate::<OraclePrice>();

    match side {
        Side::Long => entry_price - price_change,
        Side::Short => entry_price + price_change,
    }
}

/// Liquidation price of a revision's running totals.
pub fn liquidation_price_for(position: &PositionEntity, max_leverage: Ratio) -> Price {
    calculate_liquidation_price_approx(
        position.side,
        position.size,
        position.collateral,
        position.entry_price,
        max_leverage,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::fixtures::revision;

    fn liq(side: Side, size: i128, collateral: i128, entry: i128, max_lev: i128) -> Price {
        calculate_liquidation_price_approx(
            side,
            Size::from_units(size),
            Collateral::from_units(collateral),
            Price::from_units(entry),
            Ratio::from_units(max_lev),
        )
    }

    #[test]
    fn long_liquidates_below_entry() {
        // min collateral 200, 800 available, change = 800 * 50000 / 10000
        let price = liq(Side::Long, 10_000, 1_000, 50_000, 50);
        assert_eq!(price, Price::from_units(46_000));
        assert!(price.is_positive() && price < Price::from_units(50_000));
    }

    #[test]
    fn short_liquidates_above_entry() {
        assert_eq!(liq(Side::Short, 10_000, 1_000, 50_000, 50), Price::from_units(54_000));
        assert_eq!(liq(Side::Short, -10_000, 1_000, 50_000, 50), Price::from_units(54_000));
    }

    #[test]
    fn at_max_leverage_returns_entry() {
        assert_eq!(liq(Side::Long, 50_000, 1_000, 50_000, 50), Price::from_units(50_000));
        assert_eq!(liq(Side::Short, 50_000, 1_000, 50_000, 50), Price::from_units(50_000));
        // beyond max leverage as well
        assert_eq!(liq(Side::Long, 100_000, 1_000, 50_000, 50), Price::from_units(50_000));
    }

    #[test]
    fn more_collateral_moves_long_liquidation_down() {
        let low = liq(Side::Long, 10_000, 500, 50_000, 50);
        let high = liq(Side::Long, 10_000, 2_000, 50_000, 50);
        assert!(high < low);
    }

    #[test]
    fn less_collateral_moves_short_liquidation_down() {
        let high = liq(Side::Short, 10_000, 2_000, 50_000, 50);
        let low = liq(Side::Short, 10_000, 500, 50_000, 50);
        assert!(low < high);
    }

    #[test]
    fn degenerate_inputs_are_zero() {
        assert_eq!(liq(Side::Long, 0, 1_000, 50_000, 50), Price::zero());
        assert_eq!(liq(Side::Long, 10_000, 1_000, 0, 50), Price::zero());
        assert_eq!(liq(Side::Long, 10_000, 1_000, 50_000, 0), Price::zero());
        assert_eq!(liq(Side::Long, 10_000, 1_000, 50_000, -5), Price::zero());
    }

    #[test]
    fn over_collateralized_long_goes_negative() {
        // 10000 size, 20000 collateral: change = 19800 * 50000 / 10000
        assert_eq!(liq(Side::Long, 10_000, 20_000, 50_000, 50), Price::from_units(-49_000));
    }

    #[test]
    fn buffer_below_collateral_precision_still_counts() {
        // 1 * 20.000000001 - 20 leaves 1e-9 of buffer, invisible at 6 places
        let max_leverage = Ratio::from_raw(20_000_000_001);
        let at = |side| {
            calculate_liquidation_price_approx(
                side,
                Size::from_units(20),
                Collateral::from_units(1),
                Price::from_units(50_000),
                max_leverage,
            )
        };
        assert!(at(Side::Long) < Price::from_units(50_000));
        assert!(at(Side::Short) > Price::from_units(50_000));
    }

    #[test]
    fn from_revision() {
        let position = PositionEntity {
            size: Size::from_units(10_000),
            collateral: Collateral::from_units(1_000),
            entry_price: Price::from_units(50_000),
            ..revision("r1", "s1")
        };
        assert_eq!(liquidation_price_for(&position, Ratio::from_units(50)), Price::from_units(46_000));
    }
}
