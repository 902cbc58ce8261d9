use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use validator::Validate;

use super::Record;
use crate::errors::ServiceError;

/// Stock quantity with two decimal places, held as integer hundredths.
///
/// Converting from `f64` rounds to the nearest hundredth, so every ledger
/// mutation is rounded to 2 dp and sums never drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Largest magnitude accepted anywhere in the ledger: 10^12 units.
    pub const MAX: Quantity = Quantity(100_000_000_000_000);

    pub const fn from_hundredths(hundredths: i64) -> Self {
        Quantity(hundredths)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    pub fn from_f64(value: f64) -> Result<Self, ServiceError> {
        let scaled = (value * 100.0).round();
        if !scaled.is_finite() {
            return Err(ServiceError::ValidationError(format!(
                "quantity {} is not a finite number",
                value
            )));
        }
        if scaled.abs() > Self::MAX.0 as f64 {
            return Err(ServiceError::ValidationError(format!(
                "quantity {} exceeds the maximum of {}",
                value,
                Self::MAX
            )));
        }
        Ok(Quantity(scaled as i64))
    }

    /// `self + rhs`, or `None` when the result leaves `-MAX..=MAX`.
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0
            .checked_add(rhs.0)
            .filter(|sum| sum.abs() <= Self::MAX.0)
            .map(Quantity)
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity(self.0.saturating_neg())
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        iter.fold(Quantity::ZERO, Add::add)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_f64())
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Quantity::from_f64(value).map_err(serde::de::Error::custom)
    }
}

/// Stock movement direction: receipt (IN) or issue (OUT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Effect of `amount` moving in this direction on the item's stock.
    pub fn signed(self, amount: Quantity) -> Quantity {
        match self {
            Direction::In => amount,
            Direction::Out => -amount,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

impl FromStr for Direction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(Direction::In),
            "OUT" => Ok(Direction::Out),
            other => Err(ServiceError::SerializationError(format!(
                "unknown stock direction {:?}",
                other
            ))),
        }
    }
}

/// A stocked lubricant.
///
/// `stock` equals `opening_stock` plus the signed amounts of every stock
/// transaction that references this item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub stock: Quantity,
    pub opening_stock: Quantity,
    pub unit: String,
    pub min_threshold: Quantity,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_threshold
    }
}

impl Record for InventoryItem {
    const COLLECTION: &'static str = "inventory";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTransaction {
    pub id: String,
    pub inventory_id: String,
    /// Item name at the time of the movement
    pub inventory_name: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub amount: Quantity,
    pub timestamp: DateTime<Utc>,
    pub user: String,
}

impl StockTransaction {
    pub fn signed_amount(&self) -> Quantity {
        self.direction.signed(self.amount)
    }
}

impl Record for StockTransaction {
    const COLLECTION: &'static str = "transactions";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub opening_stock: Quantity,
    #[validate(length(min = 1, max = 20))]
    pub unit: String,
    #[serde(default)]
    pub min_threshold: Quantity,
}

/// Metadata edit of an item; stock only moves through transactions.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[validate(length(min = 1, max = 20))]
    pub unit: String,
    pub min_threshold: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub inventory_id: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub amount: Quantity,
    #[validate(length(min = 1, max = 100))]
    pub user: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub inventory_id: Option<String>,
}

/// Comparison of an item's stored stock against its transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReport {
    pub inventory_id: String,
    pub expected: Quantity,
    pub actual: Quantity,
    pub transaction_count: usize,
    pub consistent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_round_to_hundredths() {
        assert_eq!(Quantity::from_f64(0.1).unwrap().hundredths(), 10);
        assert_eq!(Quantity::from_f64(15.556).unwrap().hundredths(), 1556);
        assert_eq!(Quantity::from_f64(-0.005).unwrap().hundredths(), -1);
    }

    #[test]
    fn repeated_small_additions_do_not_drift() {
        let tenth = Quantity::from_f64(0.1).unwrap();
        let total: Quantity = std::iter::repeat(tenth).take(30).sum();
        assert_eq!(total.as_f64(), 3.0);
    }

    #[test]
    fn non_finite_quantities_are_rejected() {
        assert!(Quantity::from_f64(f64::NAN).is_err());
        assert!(Quantity::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn quantities_beyond_the_ledger_maximum_are_rejected() {
        assert!(Quantity::from_f64(1.0e12).is_ok());
        assert!(matches!(
            Quantity::from_f64(9.0e16),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(Quantity::from_f64(-1.0e13).is_err());
    }

    #[test]
    fn checked_add_stays_within_the_maximum() {
        let near = Quantity::from_hundredths(Quantity::MAX.hundredths() - 1);
        assert_eq!(
            near.checked_add(Quantity::from_hundredths(1)),
            Some(Quantity::MAX)
        );
        assert_eq!(near.checked_add(Quantity::from_hundredths(2)), None);
        assert_eq!(
            Quantity::from_hundredths(i64::MAX).checked_add(Quantity::from_hundredths(1)),
            None
        );
        assert_eq!(
            -Quantity::from_hundredths(i64::MIN),
            Quantity::from_hundredths(i64::MAX)
        );
    }

    #[test]
    fn direction_signs_amounts() {
        let amount = Quantity::from_hundredths(3000);
        assert_eq!(Direction::In.signed(amount).hundredths(), 3000);
        assert_eq!(Direction::Out.signed(amount).hundredths(), -3000);
    }

    #[test]
    fn transaction_uses_wire_names() {
        let tx = StockTransaction {
            id: "t1".into(),
            inventory_id: "1".into(),
            inventory_name: "EP2 grease".into(),
            direction: Direction::Out,
            amount: Quantity::from_hundredths(50),
            timestamp: "2024-06-02T08:00:00Z".parse().unwrap(),
            user: "Zhang".into(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "OUT");
        assert_eq!(json["amount"], 0.5);
        assert_eq!(json["inventoryName"], "EP2 grease");
    }
}
