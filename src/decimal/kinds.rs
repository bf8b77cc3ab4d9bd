//! Kind markers for [`DecimalValue`](super::DecimalValue).
//!
//! Each marker is a zero-sized type that pins the number of decimal places
//! for its kind. The place count is a compile-time constant and is never
//! inferred from input.

use std::fmt::Debug;
use std::hash::Hash;

pub trait DecimalKind:
    Debug + Clone + Copy + PartialEq + Eq + PartialOrd + Ord + Hash + Default + Send + Sync + 'static
{
    /// Fixed decimal places of every value of this kind.
    const DECIMALS: u32;
    /// Human readable kind name, used in logs and error messages.
    const NAME: &'static str;
}

macro_rules! decimal_kind {
    ($(#[$meta:meta])* $name:ident, $decimals:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name;

        impl DecimalKind for $name {
            const DECIMALS: u32 = $decimals;
            const NAME: &'static str = stringify!($name);
        }
    };
}

decimal_kind!(
    /// Oracle price, quote currency per unit of the index asset.
    OraclePrice,
    9
);
decimal_kind!(
    /// Quote currency amount: notional, margin, P&L, equity.
    UsdValue,
    9
);
decimal_kind!(
    /// Position size. Signed where a call site stores shorts as negative.
    PositionSize,
    6
);
decimal_kind!(CollateralAmount, 6);
decimal_kind!(
    /// Percentages on a 0-100 scale.
    PercentageValue,
    6
);
decimal_kind!(
    /// Dimensionless ratios such as leverage and margin fractions.
    RatioOutput,
    9
);
