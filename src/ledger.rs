//! Derives point-in-time position state from revision history.
//!
//! Revisions are never mutated here: every function borrows a slice and
//! returns new values. Empty or degenerate input yields zero of the
//! relevant kind, never an error.

use crate::decimal::{
    Collateral, DecimalCalculator, DecimalKind, DecimalValue, OraclePrice, Price, Size, Usd,
};
use crate::position::{PositionChange, PositionEntity, PositionStatus};
use crate::types::{PositionStableId, Side, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub fn position_status(revision: &PositionEntity) -> PositionStatus {
    revision.status()
}

pub fn is_position_open(revision: &PositionEntity) -> bool {
    position_status(revision) == PositionStatus::Open
}

pub fn is_position_closed(revision: &PositionEntity) -> bool {
    position_status(revision) == PositionStatus::Closed
}

pub fn position_side(revision: &PositionEntity) -> Side {
    revision.side
}

/// Open revisions, input order preserved.
pub fn filter_open_positions(revisions: &[PositionEntity]) -> Vec<PositionEntity> {
    revisions.iter().filter(|r| is_position_open(r)).cloned().collect()
}

pub fn filter_closed_positions(revisions: &[PositionEntity]) -> Vec<PositionEntity> {
    revisions.iter().filter(|r| is_position_closed(r)).cloned().collect()
}

pub fn latest_revision(history: &[PositionEntity]) -> Option<&PositionEntity> {
    history.iter().find(|r| r.is_latest)
}

/// Newest first. Ties fall back to revision id so the order is total.
pub fn sort_history(history: &mut [PositionEntity]) {
    history.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.revision_id.cmp(&a.revision_id))
    });
}

/// Full history of one lineage, newest first.
pub fn history_for(revisions: &[PositionEntity], stable_id: &PositionStableId) -> Vec<PositionEntity> {
    let mut history: Vec<PositionEntity> = revisions
        .iter()
        .filter(|r| &r.stable_id == stable_id)
        .cloned()
        .collect();
    sort_history(&mut history);
    history
}

pub fn group_by_stable_id(
    revisions: &[PositionEntity],
) -> BTreeMap<PositionStableId, Vec<PositionEntity>> {
    let mut groups: BTreeMap<PositionStableId, Vec<PositionEntity>> = BTreeMap::new();
    for revision in revisions {
        groups
            .entry(revision.stable_id.clone())
            .or_default()
            .push(revision.clone());
    }
    for history in groups.values_mut() {
        sort_history(history);
    }
    groups
}

// 4.2: weighted-average cost basis. only Increase events count, walked oldest first:
// sum(collateral added) / sum(|size added|). zero when nothing was added.
pub fn calculate_entry_price(history: &[PositionEntity]) -> Price {
    let mut increases: Vec<&PositionEntity> = history
        .iter()
        .filter(|r| r.change == PositionChange::Increase)
        .collect();
    if increases.is_empty() {
        return Price::zero();
    }
    increases.sort_by_key(|r| r.timestamp);

    let (collateral, size) = increases.iter().fold(
        (Collateral::zero(), Size::zero()),
        |(collateral, size), r| (collateral + r.collateral_delta, size + r.size_delta.abs()),
    );
    if size.is_zero() {
        return Price::zero();
    }

    DecimalCalculator::first(collateral)
        .divide_by(size)
        .calculate::<OraclePrice>()
}

fn sum_values<K: DecimalKind>(values: &[DecimalValue<K>]) -> DecimalValue<K> {
    values.iter().sum()
}

/// Signed sum. Longs and shorts stored with opposite signs net out.
pub fn calculate_total_size(sizes: &[Size]) -> Size {
    sum_values(sizes)
}

pub fn calculate_total_collateral(collaterals: &[Collateral]) -> Collateral {
    sum_values(collaterals)
}

/// Direction-agnostic: sum of |size|.
pub fn calculate_total_exposure(sizes: &[Size]) -> Size {
    sizes.iter().map(|s| s.abs()).sum()
}

pub fn total_position_size(revisions: &[PositionEntity]) -> Size {
    revisions.iter().map(|r| r.size).sum()
}

pub fn total_position_collateral(revisions: &[PositionEntity]) -> Collateral {
    revisions.iter().map(|r| r.collateral).sum()
}

pub fn total_position_exposure(revisions: &[PositionEntity]) -> Size {
    revisions.iter().map(|r| r.abs_size()).sum()
}

/// Current state of one lineage, derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub stable_id: PositionStableId,
    pub side: Side,
    pub status: PositionStatus,
    pub size: Size,
    pub collateral: Collateral,
    pub realized_pnl: Usd,
    pub entry_price: Price,
    pub revision_count: usize,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Snapshot of the lineage whose latest revision is in `history`.
/// None when no revision is flagged latest.
pub fn project(history: &[PositionEntity]) -> Option<PositionSnapshot> {
    let latest = latest_revision(history)?;
    let lineage: Vec<&PositionEntity> = history
        .iter()
        .filter(|r| r.stable_id == latest.stable_id)
        .collect();
    let owned: Vec<PositionEntity> = lineage.iter().map(|r| (*r).clone()).collect();

    let opened_at = lineage
        .iter()
        .map(|r| r.timestamp)
        .min()
        .unwrap_or(latest.timestamp);
    let updated_at = lineage
        .iter()
        .map(|r| r.timestamp)
        .max()
        .unwrap_or(latest.timestamp);

    Some(PositionSnapshot {
        stable_id: latest.stable_id.clone(),
        side: latest.side,
        status: latest.status(),
        size: latest.size,
        collateral: latest.collateral,
        realized_pnl: latest.realized_pnl,
        entry_price: calculate_entry_price(&owned),
        revision_count: lineage.len(),
        opened_at,
        updated_at,
    })
}
