//! 货币值对象
//!
//! 定点十进制，固定两位小数，不经过浮点运算

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};
use thiserror::Error;

/// 小数位数
pub const MONEY_SCALE: u32 = 2;

/// 单个金额允许的最大有效位数（对应 NUMERIC(10, 2)）
pub const MONEY_MAX_DIGITS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount must have at most 2 decimal places")]
    TooManyDecimalPlaces,
    #[error("amount must have at most 10 digits")]
    TooManyDigits,
}

/// 金额值对象
///
/// 内部始终保持 scale = 2，序列化为字符串（如 `"31.50"`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// 从十进制数创建，校验非负、小数位与总位数
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }

        let normalized = amount.normalize();
        if normalized.scale() > MONEY_SCALE {
            return Err(MoneyError::TooManyDecimalPlaces);
        }

        let limit = Decimal::from(10_i64.pow(MONEY_MAX_DIGITS - MONEY_SCALE));
        if normalized >= limit {
            return Err(MoneyError::TooManyDigits);
        }

        Ok(Self::scaled(normalized.abs()))
    }

    /// 以分为单位创建
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    pub fn zero() -> Self {
        Self::scaled(Decimal::ZERO)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    fn scaled(mut value: Decimal) -> Self {
        value.rescale(MONEY_SCALE);
        Self(value)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::scaled(self.0 + other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, multiplier: i64) -> Self {
        Self::scaled(self.0 * Decimal::from(multiplier))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_new_rescales_to_two_places() {
        let money = Money::new(dec("15.5")).unwrap();
        assert_eq!(money.to_string(), "15.50");
        assert_eq!(money.amount().scale(), 2);
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_places() {
        assert_eq!(Money::new(dec("0.750")).unwrap(), Money::from_cents(75));
    }

    #[test]
    fn test_rejects_invalid_amounts() {
        assert_eq!(Money::new(dec("-1.00")), Err(MoneyError::Negative));
        assert_eq!(Money::new(dec("1.005")), Err(MoneyError::TooManyDecimalPlaces));
        assert_eq!(Money::new(dec("100000000.00")), Err(MoneyError::TooManyDigits));
        assert!(Money::new(dec("99999999.99")).is_ok());
    }

    #[test]
    fn test_exact_arithmetic() {
        // 0.1 + 0.2 在浮点下不精确
        let sum = Money::from_cents(10) + Money::from_cents(20);
        assert_eq!(sum, Money::from_cents(30));

        let line = (Money::from_cents(1500) + Money::from_cents(75)) * 2;
        assert_eq!(line.to_string(), "31.50");
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let total: Money = Vec::<Money>::new().into_iter().sum();
        assert!(total.is_zero());
        assert_eq!(total.to_string(), "0.00");
    }

    #[test]
    fn test_serde_string_and_number_input() {
        let from_str: Money = serde_json::from_str("\"15.00\"").unwrap();
        let from_num: Money = serde_json::from_str("15").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "\"15.00\"");

        assert!(serde_json::from_str::<Money>("\"1.234\"").is_err());
        assert!(serde_json::from_str::<Money>("\"-3\"").is_err());
    }
}
