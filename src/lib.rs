// perps-risk: valuation and risk core for a perpetual futures exchange.
// pure fixed-point math over indexed position history, plus a thin async layer
// that loads data through repository ports and memoizes derived views.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: ids, Side, Timestamp
//   1.1x decimal/: kind-tagged fixed-point values and the formula calculator
//   2.x  asset.rs, candle.rs: reference data, oracle prices, OHLC candles
//   3.x  margin.rs: IM/MM, max leverage, position health
//   4.x  position.rs: position revision entity
//   4.2  ledger.rs: status, history, entry price, aggregates, snapshots
//   4.3  metrics.rs: notional, unrealized pnl, leverage per position
//   6.x  liquidation.rs: approximate liquidation price
//   7.x  config.rs: query limits, price freshness, env presets
//   8.x  query/: memoized queries and async commands
//   9.x  repository/: data-access ports and in-memory adapters
//   9.1  store.rs: Arc-snapshot slices with fetch status
//   10.x account.rs: account equity, leverage, margin usage
//   11.x events.rs: command outcome events
//   12.x market.rs: per-asset market config

// value kernel
pub mod decimal;
pub mod types;

// entities and calculators
pub mod account;
pub mod asset;
pub mod candle;
pub mod ledger;
pub mod liquidation;
pub mod margin;
pub mod market;
pub mod metrics;
pub mod position;

// composition
pub mod config;
pub mod events;
pub mod query;
pub mod repository;
pub mod store;

// re exports for convenience
pub use account::*;
pub use asset::*;
pub use candle::*;
pub use decimal::{
    Collateral, DecimalCalculator, DecimalError, DecimalKind, DecimalValue, Percent, Price, Ratio,
    Size, Usd,
};
pub use ledger::*;
pub use liquidation::*;
pub use margin::*;
pub use market::*;
pub use metrics::*;
pub use position::*;
pub use types::*;
pub use config::{ConfigError, CoreConfig, Environment, PriceConfig, QueryConfig};
pub use events::{Event, EventCollector, EventEmitter, EventId, EventPayload};
pub use query::{QueryError, TradingCommands};
pub use repository::{RepositoryError, RepositoryResult};
pub use store::{FetchStatus, SliceKey, TradingStore};
