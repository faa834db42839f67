use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Declares an integer identifier newtype.
///
/// Identifiers assigned by the store start at 1, so a zero value never names a
/// persisted row.
macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw integer value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

integer_id!(
    /// Identifier of an order, assigned by the persistence layer.
    OrderId
);

integer_id!(
    /// Identifier of an order line item, assigned by the persistence layer.
    OrderItemId
);

integer_id!(
    /// Identifier of the user who placed an order.
    UserId
);

integer_id!(
    /// Identifier of a catalog product. Existence is not checked.
    ProductId
);

/// A monetary amount held as an exact decimal.
///
/// Serialized as a plain JSON number (`9.99`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// The smallest price a single unit may carry.
    pub const MIN_UNIT_PRICE: Money = Money(Decimal::from_parts(1, 0, 0, false, 1));

    /// Creates an amount from a decimal value.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the underlying decimal.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Multiplies by a quantity, or `None` if the product does not fit a decimal.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Sums amounts, or `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_id_display_and_parse() {
        let id = OrderId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<OrderId>().unwrap(), id);
        assert!("abc".parse::<OrderId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&UserId::new(7)).unwrap();
        assert_eq!(json, "7");
        let id: ProductId = serde_json::from_str("8").unwrap();
        assert_eq!(id.as_i64(), 8);
    }

    #[test]
    fn min_unit_price_is_one_tenth() {
        assert_eq!(Money::MIN_UNIT_PRICE.amount(), dec!(0.1));
    }

    #[test]
    fn money_multiply_is_exact() {
        let price = Money::new(dec!(9.99));
        assert_eq!(price.checked_multiply(2).unwrap().amount(), dec!(19.98));
    }

    #[test]
    fn money_sum() {
        let total = Money::checked_sum([dec!(19.98), dec!(5.00)].into_iter().map(Money::new));
        assert_eq!(total.unwrap().amount(), dec!(24.98));
    }

    #[test]
    fn multiply_beyond_decimal_range_is_none() {
        let price = Money::new(dec!(50000000000000000000000000));
        assert!(price.checked_multiply(4_000_000_000).is_none());
        assert!(Money::new(Decimal::MAX).checked_multiply(1).is_some());
    }

    #[test]
    fn sum_beyond_decimal_range_is_none() {
        let large = Money::new(dec!(30000000000000000000000000000));
        assert!(Money::checked_sum([large, large]).is_some());
        assert!(Money::checked_sum([large, large, large]).is_none());
        assert_eq!(Money::checked_sum([]), Some(Money::zero()));
    }

    #[test]
    fn money_json_is_a_number() {
        let money = Money::new(dec!(24.98));
        let value = serde_json::to_value(money).unwrap();
        assert!(value.is_number());
        let back: Money = serde_json::from_str("9.99").unwrap();
        assert_eq!(back.amount(), dec!(9.99));
    }

    #[test]
    fn money_comparison() {
        assert!(Money::new(dec!(0.01)).is_positive());
        assert!(Money::zero().is_zero());
        assert!(!Money::zero().is_positive());
    }
}
