// 8.x query/: composition layer. wires repositories, the store and the calculators
// into named operations.
//   8.1 memo.rs: single-slot memoization keyed on input identity
//   8.2 queries.rs: memoized read queries over store snapshots
//   8.3 commands.rs: async fetch commands and the vault increase command

pub mod commands;
pub mod memo;
pub mod queries;

pub use commands::{
    position_size, IncreasePositionParams, IncreasePositionRequest, Repositories, TradingCommands,
    VaultError, VaultPort,
};
pub use memo::{Memo, MemoKey};
pub use queries::{
    AccountMetricsQuery, CurrentAccountOpenPositionsQuery, CurrentAssetPriceQuery,
    MarketConfigQuery, PositionHistoryQuery, PositionMetricsQuery, RiskMetricsQuery,
};

use crate::repository::RepositoryError;
use crate::types::{AssetId, PositionStableId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("No market config loaded for asset {0}")]
    MissingMarketConfig(AssetId),

    #[error("No oracle price loaded for asset {0}")]
    MissingOraclePrice(AssetId),

    #[error("Position {0} not found")]
    PositionNotFound(PositionStableId),

    #[error("Wallet not connected")]
    NoCurrentUser,

    #[error(transparent)]
    Vault(#[from] VaultError),
}
