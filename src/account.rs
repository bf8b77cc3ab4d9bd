//! Account-level valuation.
//!
//! An account's equity is its collateral balance plus the unrealized pnl of
//! every position that has an oracle price. Positions without a price are
//! skipped rather than valued at zero.

use crate::decimal::{DecimalCalculator, Percent, PercentageValue, Price, Ratio, Usd};
use crate::metrics::{leverage_from_notional, notional_value, unrealized_pnl};
use crate::position::PositionEntity;
use crate::types::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type OraclePrices = HashMap<AssetId, Price>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetrics {
    pub equity: Usd,
    pub total_notional: Usd,
    pub account_leverage: Ratio,
    pub margin_usage: Percent,
}

/// Positions are expected to be the latest revisions of the account.
pub fn calculate_account_equity(
    positions: &[PositionEntity],
    collateral_balance: Usd,
    prices: &OraclePrices,
) -> Usd {
    positions
        .iter()
        .filter_map(|p| {
            prices
                .get(&p.asset_id)
                .map(|price| unrealized_pnl(p.side, p.size, p.collateral, *price))
        })
        .fold(collateral_balance, |equity, pnl| equity + pnl)
}

/// Sum of |size| * price over positions that have a price.
pub fn calculate_total_notional(positions: &[PositionEntity], prices: &OraclePrices) -> Usd {
    positions
        .iter()
        .filter_map(|p| prices.get(&p.asset_id).map(|price| notional_value(p.size, *price)))
        .sum()
}

pub fn calculate_account_leverage(total_notional: Usd, equity: Usd) -> Ratio {
    leverage_from_notional(total_notional, equity)
}

/// used * 100 / total. Zero when total is not positive.
pub fn calculate_margin_usage(used_margin: Usd, total_margin: Usd) -> Percent {
    if !total_margin.is_positive() {
        return Percent::zero();
    }
    DecimalCalculator::first(used_margin)
        .multiply_by_integer(100)
        .divide_by(total_margin)
        .calculate::<PercentageValue>()
}

pub fn calculate_account_metrics(
    positions: &[PositionEntity],
    collateral_balance: Usd,
    prices: &OraclePrices,
    used_margin: Usd,
) -> AccountMetrics {
    let equity = calculate_account_equity(positions, collateral_balance, prices);
    let total_notional = calculate_total_notional(positions, prices);
    AccountMetrics {
        equity,
        total_notional,
        account_leverage: calculate_account_leverage(total_notional, equity),
        margin_usage: calculate_margin_usage(used_margin, equity),
    }
}
