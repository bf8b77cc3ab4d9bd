//! OHLC candles as served by the indexer.

use crate::decimal::Price;
use crate::types::{AssetId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleInterval {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl CandleInterval {
    pub const ALL: [CandleInterval; 7] = [
        CandleInterval::M1,
        CandleInterval::M5,
        CandleInterval::M15,
        CandleInterval::M30,
        CandleInterval::H1,
        CandleInterval::H4,
        CandleInterval::D1,
    ];

    pub fn seconds(&self) -> i64 {
        match self {
            CandleInterval::M1 => 60,
            CandleInterval::M5 => 5 * 60,
            CandleInterval::M15 => 15 * 60,
            CandleInterval::M30 => 30 * 60,
            CandleInterval::H1 => 3_600,
            CandleInterval::H4 => 4 * 3_600,
            CandleInterval::D1 => 86_400,
        }
    }

    /// Start of the bucket containing `ts`.
    pub fn bucket_start(&self, ts: Timestamp) -> Timestamp {
        let width = self.seconds();
        Timestamp::from_secs(ts.as_secs().div_euclid(width) * width)
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandleInterval::M1 => "M1",
            CandleInterval::M5 => "M5",
            CandleInterval::M15 => "M15",
            CandleInterval::M30 => "M30",
            CandleInterval::H1 => "H1",
            CandleInterval::H4 => "H4",
            CandleInterval::D1 => "D1",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub asset: AssetId,
    pub interval: CandleInterval,
    pub close_price: Price,
    pub high_price: Price,
    pub low_price: Price,
    pub started_at: Timestamp,
}

impl Candle {
    pub fn validate(&self) -> Result<(), CandleError> {
        if self.asset.is_empty() {
            return Err(CandleError::EmptyAsset);
        }
        if self.low_price > self.high_price {
            return Err(CandleError::InvertedRange {
                low: self.low_price,
                high: self.high_price,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CandleError {
    #[error("Candle has an empty asset id")]
    EmptyAsset,

    #[error("Candle low {low} above high {high}")]
    InvertedRange { low: Price, high: Price },
}
