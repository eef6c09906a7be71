use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// round half away from zero to whole currency units
fn round_whole(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Money in whole units of the smallest currency denomination (won, cents, satoshis).
///
/// Every constructor and arithmetic operation rounds to a whole unit, so no
/// fractional currency ever leaks into a schedule or an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);

    /// create from decimal, rounding to a whole unit
    pub fn from_decimal(d: Decimal) -> Self {
        Money(round_whole(d))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(round_whole(Decimal::from_str(s.trim())?)))
    }

    /// create from an integer amount of minor units
    pub fn from_minor(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// integer amount of minor units, `None` if it does not fit in an i64
    pub fn to_minor(&self) -> Option<i64> {
        self.0.to_i64()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// apply a period rate and round, e.g. one month of interest on a balance
    pub fn apply_rate(&self, rate: Rate) -> Self {
        Money::from_decimal(self.0 * rate.as_decimal())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i64> for Money {
    fn from(i: i64) -> Self {
        Money::from_minor(i)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_minor(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money(round_whole(self.0 * other))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money(round_whole(self.0 / other))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// rate type for interest and fee rates, stored as a fraction (0.01 for 1%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from decimal fraction (e.g., 0.05 for 5%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 4.5 for 4.5%)
    pub fn from_percentage(p: Decimal) -> Self {
        Rate(p / Decimal::ONE_HUNDRED)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::ONE_HUNDRED
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// monthly rate from annual rate
    pub fn monthly_rate(&self) -> Rate {
        Rate(self.0 / Decimal::from(12))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

/// Split `total` into `n` whole-unit parts that sum to `total` exactly.
///
/// Every part is `round(total / n)` clamped to what is still undistributed, and
/// the last part takes the remainder. `total` must not be negative.
pub fn distribute_exact(total: Money, n: u32) -> Vec<Money> {
    if n == 0 {
        return Vec::new();
    }

    let base = total / Decimal::from(n);
    let mut remaining = total;
    let mut parts = Vec::with_capacity(n as usize);

    for i in 1..=n {
        let part = if i == n { remaining } else { base.min(remaining) };
        remaining -= part;
        parts.push(part);
    }

    parts
}
