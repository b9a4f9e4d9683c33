//! Integer minor-unit (paise) currency.
//!
//! Amounts are carried as whole paise so repeated summation cannot drift.
//! Display formatting goes through [`format_inr`], the only place the crate
//! knows about the rupee symbol or en-IN digit grouping. JSON carries rupee
//! numbers (the legacy snapshot format), converted at the serde boundary.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, LedgerResult};

/// A rupee amount in whole paise.
///
/// May be negative: payroll balances go negative on overpayment. Positivity
/// of user-entered amounts is a validation rule, not a property of the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Whole-rupee constructor, the common case for salaries and ledger entry.
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    pub const fn paise(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parses decimal rupee notation: `"2500"`, `"2500.5"`, `"2500.50"`,
    /// optionally signed. More than two fractional digits is rejected.
    pub fn parse_rupees(text: &str) -> LedgerResult<Money> {
        let trimmed = text.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = match unsigned.split_once('.') {
            Some((_, "")) => {
                return Err(LedgerError::validation(format!("not an amount: {text:?}")))
            }
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(LedgerError::validation(format!("not an amount: {text:?}")));
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
            || frac.len() > 2
        {
            return Err(LedgerError::validation(format!("not an amount: {text:?}")));
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| LedgerError::validation(format!("amount out of range: {text:?}")))?
        };
        let frac_paise = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().unwrap_or(0) * 10,
            _ => frac.parse::<i64>().unwrap_or(0),
        };
        let paise = whole
            .checked_mul(100)
            .and_then(|p| p.checked_add(frac_paise))
            .ok_or_else(|| LedgerError::validation(format!("amount out of range: {text:?}")))?;
        Ok(Money(if negative { -paise } else { paise }))
    }

    fn from_rupee_f64(value: f64) -> LedgerResult<Money> {
        if !value.is_finite() {
            return Err(LedgerError::validation("amount is not a finite number"));
        }
        let paise = (value * 100.0).round();
        if paise < i64::MIN as f64 || paise > i64::MAX as f64 {
            return Err(LedgerError::validation(format!("amount out of range: {value}")));
        }
        Ok(Money(paise as i64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

// Serialized as rupee numbers to stay readable and compatible with the legacy
// snapshot arrays: whole amounts as integers, fractional ones as decimals.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.0 as f64 / 100.0)
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        struct RupeeVisitor;

        impl Visitor<'_> for RupeeVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a rupee amount as a number or decimal string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                v.checked_mul(100)
                    .map(Money)
                    .ok_or_else(|| E::custom(format!("amount out of range: {v}")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(100))
                    .map(Money)
                    .ok_or_else(|| E::custom(format!("amount out of range: {v}")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::from_rupee_f64(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                Money::parse_rupees(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(RupeeVisitor)
    }
}

// ---------------------------------------------------------------------------
// Display formatting
// ---------------------------------------------------------------------------

/// Formats an amount the way the dashboards do: `₹1,23,456.50`.
///
/// en-IN grouping keeps the last three integer digits together and splits the
/// rest into pairs. The sign goes ahead of the symbol.
pub fn format_inr(amount: Money) -> String {
    let sign = if amount.paise() < 0 { "-" } else { "" };
    let abs = amount.paise().unsigned_abs();
    format!("{sign}₹{}.{:02}", group_indian(abs / 100), abs % 100)
}

fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut pairs = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (lead, pair) = rest.split_at(rest.len() - 2);
        pairs.push(pair);
        rest = lead;
    }
    pairs.push(rest);
    pairs.reverse();
    format!("{},{tail}", pairs.join(","))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
