// 1.2: formula builder over tagged decimals.
// intermediates are BigInt with their own place count, nothing is rounded until calculate().
//
//   DecimalCalculator::first(size)
//       .multiply_by(price)
//       .divide_by(leverage)
//       .calculate::<UsdValue>()
//
// add/subtract rescale both sides up to the larger place count. multiply adds place counts.
// the terminal step rescales once to the output kind and truncates toward zero.

use super::{DecimalError, DecimalKind, DecimalValue};
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    value: BigInt,
    decimals: u32,
}

impl Term {
    fn of<K: DecimalKind>(v: DecimalValue<K>) -> Self {
        Self {
            value: BigInt::from(v.raw()),
            decimals: K::DECIMALS,
        }
    }

    fn integer(n: i128) -> Self {
        Self {
            value: BigInt::from(n),
            decimals: 0,
        }
    }

    fn rescaled(&self, decimals: u32) -> BigInt {
        &self.value * big_pow10(decimals - self.decimals)
    }

    fn add(self, other: Term) -> Term {
        let decimals = self.decimals.max(other.decimals);
        Term {
            value: self.rescaled(decimals) + other.rescaled(decimals),
            decimals,
        }
    }

    fn sub(self, other: Term) -> Term {
        let decimals = self.decimals.max(other.decimals);
        Term {
            value: self.rescaled(decimals) - other.rescaled(decimals),
            decimals,
        }
    }

    fn mul(self, other: Term) -> Term {
        Term {
            value: self.value * other.value,
            decimals: self.decimals + other.decimals,
        }
    }
}

fn big_pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

fn resolve<O: DecimalKind>(
    numerator: &Term,
    denominator: &Term,
) -> Result<DecimalValue<O>, DecimalError> {
    if denominator.value.is_zero() {
        return Err(DecimalError::DivisionByZero);
    }

    // result = n / d * 10^(out + dd - dn)
    let exp = O::DECIMALS as i64 + denominator.decimals as i64 - numerator.decimals as i64;
    let quotient = if exp >= 0 {
        (&numerator.value * big_pow10(exp as u32)) / &denominator.value
    } else {
        &numerator.value / (&denominator.value * big_pow10((-exp) as u32))
    };

    let raw = match quotient.to_i128() {
        Some(raw) => raw,
        None => {
            tracing::warn!(kind = O::NAME, "decimal result exceeds i128, saturating");
            if quotient.sign() == Sign::Minus {
                i128::MIN
            } else {
                i128::MAX
            }
        }
    };
    Ok(DecimalValue::from_raw(raw))
}

fn resolve_or_zero<O: DecimalKind>(numerator: &Term, denominator: &Term) -> DecimalValue<O> {
    match resolve(numerator, denominator) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(kind = O::NAME, error = %err, "unguarded formula, returning zero");
            DecimalValue::zero()
        }
    }
}

/// Entry point of the formula builder.
pub struct DecimalCalculator;

impl DecimalCalculator {
    pub fn first<K: DecimalKind>(value: DecimalValue<K>) -> Numerator {
        Numerator {
            term: Term::of(value),
        }
    }

    /// Starts a formula from a plain integer, e.g. `1 / imf`.
    pub fn integer(n: i128) -> Numerator {
        Numerator {
            term: Term::integer(n),
        }
    }

    pub fn one() -> Numerator {
        Self::integer(1)
    }
}

/// Numerator under construction. Every call returns a new state.
#[derive(Debug, Clone)]
pub struct Numerator {
    term: Term,
}

impl Numerator {
    pub fn add<K: DecimalKind>(self, value: DecimalValue<K>) -> Self {
        Self {
            term: self.term.add(Term::of(value)),
        }
    }

    pub fn subtract_by<K: DecimalKind>(self, value: DecimalValue<K>) -> Self {
        Self {
            term: self.term.sub(Term::of(value)),
        }
    }

    pub fn multiply_by<K: DecimalKind>(self, value: DecimalValue<K>) -> Self {
        Self {
            term: self.term.mul(Term::of(value)),
        }
    }

    pub fn multiply_by_integer(self, n: i128) -> Self {
        Self {
            term: self.term.mul(Term::integer(n)),
        }
    }

    /// Sign of the exact value built so far, before any truncation.
    pub fn signum(&self) -> i32 {
        match self.term.value.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    pub fn divide_by<K: DecimalKind>(self, value: DecimalValue<K>) -> Fraction {
        Fraction {
            numerator: self.term,
            denominator: Term::of(value),
        }
    }

    /// Builds a compound denominator, e.g. `a / (b * c)`.
    pub fn in_denominator<F>(self, build: F) -> Fraction
    where
        F: FnOnce(DenominatorBuilder) -> Denominator,
    {
        Fraction {
            numerator: self.term,
            denominator: build(DenominatorBuilder(())).term,
        }
    }

    /// Truncating result. A zero denominator cannot occur here, so this never fails.
    pub fn calculate<O: DecimalKind>(self) -> DecimalValue<O> {
        resolve_or_zero(&self.term, &Term::integer(1))
    }

    pub fn try_calculate<O: DecimalKind>(self) -> Result<DecimalValue<O>, DecimalError> {
        resolve(&self.term, &Term::integer(1))
    }
}

/// Empty denominator. The only way forward is seeding it with a value.
pub struct DenominatorBuilder(());

impl DenominatorBuilder {
    pub fn value<K: DecimalKind>(self, value: DecimalValue<K>) -> Denominator {
        Denominator {
            term: Term::of(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Denominator {
    term: Term,
}

impl Denominator {
    pub fn add<K: DecimalKind>(self, value: DecimalValue<K>) -> Self {
        Self {
            term: self.term.add(Term::of(value)),
        }
    }

    pub fn subtract_by<K: DecimalKind>(self, value: DecimalValue<K>) -> Self {
        Self {
            term: self.term.sub(Term::of(value)),
        }
    }

    pub fn multiply_by<K: DecimalKind>(self, value: DecimalValue<K>) -> Self {
        Self {
            term: self.term.mul(Term::of(value)),
        }
    }
}

/// Numerator over denominator. Only terminal operations remain.
#[derive(Debug, Clone)]
pub struct Fraction {
    numerator: Term,
    denominator: Term,
}

impl Fraction {
    /// Zero denominators are the caller's job to guard. An unguarded one logs a
    /// warning and yields zero of the output kind.
    pub fn calculate<O: DecimalKind>(self) -> DecimalValue<O> {
        resolve_or_zero(&self.numerator, &self.denominator)
    }

    pub fn try_calculate<O: DecimalKind>(self) -> Result<DecimalValue<O>, DecimalError> {
        resolve(&self.numerator, &self.denominator)
    }
}
