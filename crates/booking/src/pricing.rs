//! Age-based seat pricing.
//!
//! Prices are always derived from a seat's immutable base price. A derived
//! price is never fed back in as a base, so repeated edits cannot compound
//! a discount.

use std::collections::BTreeMap;

use common::{Money, SeatId};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Multipliers are expressed in basis points so pricing stays in integers.
const BASIS_POINTS: i128 = 10_000;

/// Ticket category that determines the price modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeCategory {
    Adult,
    Child,
    Senior,
}

impl AgeCategory {
    /// Price multiplier in basis points (10_000 = 1.0).
    pub fn multiplier_bps(&self) -> i64 {
        match self {
            AgeCategory::Adult => 10_000,
            AgeCategory::Child => 5_000,
            AgeCategory::Senior => 8_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeCategory::Adult => "adult",
            AgeCategory::Child => "child",
            AgeCategory::Senior => "senior",
        }
    }
}

impl std::fmt::Display for AgeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgeCategory {
    type Err = BookingError;

    /// Parses a category name. Unknown names are rejected, never defaulted.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adult" => Ok(AgeCategory::Adult),
            "child" => Ok(AgeCategory::Child),
            "senior" => Ok(AgeCategory::Senior),
            _ => Err(BookingError::InvalidAgeCategory(s.to_string())),
        }
    }
}

/// The priced selection for one seat of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSelection {
    pub age_category: AgeCategory,
    pub price: Money,
}

/// Stateless pricing rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine;

impl PricingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Computes the price of a seat for an age category.
    ///
    /// The result is rounded to whole cents with round-half-to-even.
    pub fn price_for(&self, base_price: Money, category: AgeCategory) -> Result<Money> {
        if base_price.is_negative() {
            return Err(BookingError::Validation(format!(
                "base price must not be negative, got {base_price}"
            )));
        }

        let scaled = i128::from(base_price.cents()) * i128::from(category.multiplier_bps());
        let cents = round_half_even(scaled, BASIS_POINTS);
        let cents = i64::try_from(cents)
            .map_err(|_| BookingError::Validation("price out of range".to_string()))?;
        Ok(Money::from_cents(cents))
    }

    /// Like [`PricingEngine::price_for`] but takes the category by name.
    pub fn price_for_label(&self, base_price: Money, category: &str) -> Result<Money> {
        self.price_for(base_price, category.parse()?)
    }

    /// Prices a seat and pairs the result with its category.
    pub fn select(&self, base_price: Money, category: AgeCategory) -> Result<SeatSelection> {
        Ok(SeatSelection {
            age_category: category,
            price: self.price_for(base_price, category)?,
        })
    }

    /// Sums the computed prices of a set of selections.
    pub fn subtotal(&self, selections: &BTreeMap<SeatId, SeatSelection>) -> Result<Money> {
        selections.values().try_fold(Money::zero(), |total, s| {
            total
                .checked_add(s.price)
                .ok_or_else(|| BookingError::Validation("subtotal out of range".to_string()))
        })
    }
}

/// Divides a non-negative `value` by `divisor`, rounding ties to the even quotient.
fn round_half_even(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    let remainder = value % divisor;
    match (remainder * 2).cmp(&divisor) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 0 => quotient,
        std::cmp::Ordering::Equal => quotient + 1,
    }
}
