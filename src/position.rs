// 4.0: one position revision = one immutable ledger event.
// running totals (size, collateral, realized pnl, entry price) are as of this event.
// the revision flagged is_latest carries the current state of its lineage.

use crate::decimal::{Collateral, Price, Size, Usd};
use crate::types::{Address, AssetId, PositionRevisionId, PositionStableId, Side, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionChange {
    Increase,
    Decrease,
    Close,
    Liquidate,
}

impl PositionChange {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionChange::Close | PositionChange::Liquidate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Fee components charged on a single revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFees {
    pub position_fee: Collateral,
    pub funding_rate: Collateral,
    pub borrow_fee: Collateral,
}

impl PositionFees {
    pub fn total(&self) -> Collateral {
        self.position_fee + self.funding_rate + self.borrow_fee
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEntity {
    pub revision_id: PositionRevisionId,
    pub stable_id: PositionStableId,
    pub account: Address,
    pub asset_id: AssetId,
    pub side: Side,
    pub is_latest: bool,
    pub change: PositionChange,
    pub timestamp: Timestamp,

    // per-event deltas
    pub collateral_delta: Collateral,
    pub size_delta: Size,
    pub pnl_delta: Usd,
    #[serde(default)]
    pub fees: PositionFees,

    // running totals as of this event
    pub size: Size,
    pub collateral: Collateral,
    pub realized_pnl: Usd,
    pub entry_price: Price,
}

impl PositionEntity {
    /// Only the latest revision speaks for the present. Close/Liquidate and a
    /// zero running size are closed regardless of the latest flag.
    pub fn status(&self) -> PositionStatus {
        if self.change.is_terminal() || self.size.is_zero() || !self.is_latest {
            PositionStatus::Closed
        } else {
            PositionStatus::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == PositionStatus::Open
    }

    pub fn is_long(&self) -> bool {
        self.side.is_long()
    }

    /// Size magnitude, whichever sign convention the source used.
    pub fn abs_size(&self) -> Size {
        self.size.abs()
    }
}
