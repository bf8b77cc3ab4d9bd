//! Fixed-point decimal values tagged with a semantic kind.
//!
//! A [`DecimalValue<K>`] is an `i128` magnitude scaled by `10^K::DECIMALS`.
//! Same-kind values add and subtract through the usual operators; anything
//! that mixes kinds goes through [`DecimalCalculator`], where the call site
//! names the output kind explicitly.

mod calculator;
pub mod kinds;

pub use calculator::{DecimalCalculator, Denominator, DenominatorBuilder, Fraction, Numerator};
pub use kinds::{
    CollateralAmount, DecimalKind, OraclePrice, PercentageValue, PositionSize, RatioOutput,
    UsdValue,
};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

pub type Price = DecimalValue<OraclePrice>;
pub type Usd = DecimalValue<UsdValue>;
pub type Size = DecimalValue<PositionSize>;
pub type Collateral = DecimalValue<CollateralAmount>;
pub type Percent = DecimalValue<PercentageValue>;
pub type Ratio = DecimalValue<RatioOutput>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecimalError {
    #[error("division by zero in decimal formula")]
    DivisionByZero,
    #[error("value out of range for {kind}")]
    OutOfRange { kind: &'static str },
    #[error("invalid decimal literal: {0}")]
    Parse(String),
}

pub(crate) fn pow10(exp: u32) -> i128 {
    10i128.pow(exp)
}

pub struct DecimalValue<K: DecimalKind> {
    raw: i128,
    kind: PhantomData<K>,
}

impl<K: DecimalKind> DecimalValue<K> {
    pub const DECIMALS: u32 = K::DECIMALS;

    /// Wraps an already-scaled magnitude.
    pub const fn from_raw(raw: i128) -> Self {
        Self {
            raw,
            kind: PhantomData,
        }
    }

    pub const fn zero() -> Self {
        Self::from_raw(0)
    }

    /// Whole units, e.g. `Price::from_units(50_000)`. Saturates on overflow.
    pub fn from_units(units: i128) -> Self {
        Self::from_raw(units.saturating_mul(pow10(K::DECIMALS)))
    }

    /// Truncates toward zero to the kind's decimal places.
    pub fn from_decimal(value: Decimal) -> Self {
        let truncated = value.round_dp_with_strategy(K::DECIMALS, RoundingStrategy::ToZero);
        let mantissa = truncated.mantissa();
        let shift = K::DECIMALS.saturating_sub(truncated.scale());
        Self::from_raw(mantissa.saturating_mul(pow10(shift)))
    }

    pub fn to_decimal(&self) -> Result<Decimal, DecimalError> {
        Decimal::try_from_i128_with_scale(self.raw, K::DECIMALS)
            .map_err(|_| DecimalError::OutOfRange { kind: K::NAME })
    }

    pub fn raw(&self) -> i128 {
        self.raw
    }

    pub fn kind_name(&self) -> &'static str {
        K::NAME
    }

    pub fn abs(&self) -> Self {
        Self::from_raw(self.raw.saturating_abs())
    }

    pub fn signum(&self) -> i32 {
        match self.raw.cmp(&0) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    pub fn is_positive(&self) -> bool {
        self.raw > 0
    }

    pub fn is_negative(&self) -> bool {
        self.raw < 0
    }

    /// Re-tags the value as another kind, rescaling (and truncating) to its places.
    pub fn cast<O: DecimalKind>(&self) -> DecimalValue<O> {
        if O::DECIMALS >= K::DECIMALS {
            DecimalValue::from_raw(self.raw.saturating_mul(pow10(O::DECIMALS - K::DECIMALS)))
        } else {
            DecimalValue::from_raw(self.raw / pow10(K::DECIMALS - O::DECIMALS))
        }
    }
}

impl<K: DecimalKind> Clone for DecimalValue<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: DecimalKind> Copy for DecimalValue<K> {}

impl<K: DecimalKind> Default for DecimalValue<K> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<K: DecimalKind> PartialEq for DecimalValue<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: DecimalKind> Eq for DecimalValue<K> {}

impl<K: DecimalKind> PartialOrd for DecimalValue<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: DecimalKind> Ord for DecimalValue<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<K: DecimalKind> std::hash::Hash for DecimalValue<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: DecimalKind> fmt::Debug for DecimalValue<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", K::NAME, self)
    }
}

impl<K: DecimalKind> fmt::Display for DecimalValue<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = pow10(K::DECIMALS) as u128;
        let magnitude = self.raw.unsigned_abs();
        let sign = if self.raw < 0 { "-" } else { "" };
        if K::DECIMALS == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / scale,
            magnitude % scale,
            width = K::DECIMALS as usize
        )
    }
}

impl<K: DecimalKind> FromStr for DecimalValue<K> {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self::from_decimal)
            .map_err(|_| DecimalError::Parse(s.to_string()))
    }
}

impl<K: DecimalKind> Add for DecimalValue<K> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_raw(self.raw.saturating_add(rhs.raw))
    }
}

impl<K: DecimalKind> Sub for DecimalValue<K> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_raw(self.raw.saturating_sub(rhs.raw))
    }
}

impl<K: DecimalKind> AddAssign for DecimalValue<K> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<K: DecimalKind> SubAssign for DecimalValue<K> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<K: DecimalKind> Neg for DecimalValue<K> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_raw(self.raw.saturating_neg())
    }
}

impl<K: DecimalKind> Sum for DecimalValue<K> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, v| acc + v)
    }
}

impl<'a, K: DecimalKind> Sum<&'a DecimalValue<K>> for DecimalValue<K> {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, v| acc + *v)
    }
}

// indexer convention: the scaled magnitude travels as a decimal string
impl<K: DecimalKind> Serialize for DecimalValue<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw.to_string())
    }
}

impl<'de, K: DecimalKind> Deserialize<'de> for DecimalValue<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawVisitor(PhantomData))
    }
}

struct RawVisitor<K>(PhantomData<K>);

impl<'de, K: DecimalKind> Visitor<'de> for RawVisitor<K> {
    type Value = DecimalValue<K>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a scaled integer for {} as string or number", K::NAME)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.trim()
            .parse::<i128>()
            .map(DecimalValue::from_raw)
            .map_err(|_| E::custom(format!("invalid scaled integer: {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(DecimalValue::from_raw(v as i128))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(DecimalValue::from_raw(v as i128))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
        Ok(DecimalValue::from_raw(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
        i128::try_from(v)
            .map(DecimalValue::from_raw)
            .map_err(|_| E::custom("scaled integer out of range"))
    }
}
