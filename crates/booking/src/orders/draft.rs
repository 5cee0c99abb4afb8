//! Order drafts: mutable, unconfirmed orders backed by a hold.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use common::{DraftId, HoldId, Money, OwnerToken, SeatId, ShowId};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::pricing::{AgeCategory, SeatSelection};

/// Contact details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Customer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Rejects a blank name or an email without `@`.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BookingError::Validation(
                "customer name must not be empty".to_string(),
            ));
        }
        if !self.email.contains('@') {
            return Err(BookingError::Validation(format!(
                "invalid customer email: {}",
                self.email
            )));
        }
        Ok(())
    }
}

/// An unconfirmed order. Shares its id with the hold it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDraft {
    pub draft_id: DraftId,
    pub hold_id: HoldId,
    pub show_id: ShowId,
    pub seat_selections: BTreeMap<SeatId, SeatSelection>,
    pub customer: Customer,
    #[serde(skip)]
    pub owner: OwnerToken,
    pub subtotal: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDraft {
    /// Returns the seat ids in the draft.
    pub fn seat_ids(&self) -> BTreeSet<SeatId> {
        self.seat_selections.keys().cloned().collect()
    }

    pub fn is_owned_by(&self, token: &OwnerToken) -> bool {
        &self.owner == token
    }
}

/// Changes to apply to an existing draft.
///
/// Seats in `add_seats` are held first; seats in `remove_seats` are released
/// after the draft is saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DraftPatch {
    /// New category for seats already in the draft.
    pub age_categories: BTreeMap<SeatId, AgeCategory>,
    pub customer: Option<Customer>,
    pub add_seats: BTreeMap<SeatId, AgeCategory>,
    pub remove_seats: BTreeSet<SeatId>,
}

impl DraftPatch {
    pub fn is_empty(&self) -> bool {
        self.age_categories.is_empty()
            && self.customer.is_none()
            && self.add_seats.is_empty()
            && self.remove_seats.is_empty()
    }

    /// Checks the patch against the current seat set before anything changes.
    pub(crate) fn validate(&self, current: &BTreeSet<SeatId>) -> Result<()> {
        if let Some(customer) = &self.customer {
            customer.validate()?;
        }

        let unexpected: Vec<SeatId> = self
            .age_categories
            .keys()
            .chain(self.remove_seats.iter())
            .filter(|id| !current.contains(*id))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !unexpected.is_empty() {
            return Err(BookingError::SeatSetMismatch {
                missing: Vec::new(),
                unexpected,
            });
        }

        let repriced_and_removed: Vec<&str> = self
            .age_categories
            .keys()
            .filter(|id| self.remove_seats.contains(*id))
            .map(SeatId::as_str)
            .collect();
        if !repriced_and_removed.is_empty() {
            return Err(BookingError::Validation(format!(
                "seats both repriced and removed in the same patch: {}",
                repriced_and_removed.join(", ")
            )));
        }

        let overlapping: Vec<&SeatId> = self
            .add_seats
            .keys()
            .filter(|id| current.contains(*id) || self.remove_seats.contains(*id))
            .collect();
        if !overlapping.is_empty() {
            return Err(BookingError::Validation(format!(
                "seats already in draft or removed in the same patch: {}",
                overlapping
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let remaining = current.len() + self.add_seats.len() - self.remove_seats.len();
        if remaining == 0 {
            return Err(BookingError::Validation(
                "a draft must keep at least one seat".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: &str) -> SeatId {
        SeatId::parse(id).unwrap()
    }

    fn current() -> BTreeSet<SeatId> {
        [seat("A1"), seat("A2")].into_iter().collect()
    }

    #[test]
    fn test_customer_validation() {
        assert!(Customer::new("Ada", "ada@example.com").validate().is_ok());
        assert!(Customer::new("  ", "ada@example.com").validate().is_err());
        assert!(Customer::new("Ada", "ada.example.com").validate().is_err());
        assert!(
            Customer::new("Ada", "ada@example.com")
                .with_phone("555-0100")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_patch_rejects_unknown_seats() {
        let mut patch = DraftPatch::default();
        patch.age_categories.insert(seat("B9"), AgeCategory::Child);

        let err = patch.validate(&current()).unwrap_err();
        assert_eq!(
            err,
            BookingError::SeatSetMismatch {
                missing: vec![],
                unexpected: vec![seat("B9")]
            }
        );
    }

    #[test]
    fn test_patch_cannot_empty_the_draft() {
        let patch = DraftPatch {
            remove_seats: current(),
            ..DraftPatch::default()
        };
        assert!(matches!(
            patch.validate(&current()),
            Err(BookingError::Validation(_))
        ));

        let swap = DraftPatch {
            remove_seats: current(),
            add_seats: [(seat("B1"), AgeCategory::Adult)].into_iter().collect(),
            ..DraftPatch::default()
        };
        assert!(swap.validate(&current()).is_ok());
    }

    #[test]
    fn test_patch_rejects_adding_held_seat() {
        let patch = DraftPatch {
            add_seats: [(seat("A1"), AgeCategory::Adult)].into_iter().collect(),
            ..DraftPatch::default()
        };
        assert!(matches!(
            patch.validate(&current()),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_patch_rejects_repricing_a_removed_seat() {
        let patch = DraftPatch {
            age_categories: [(seat("A1"), AgeCategory::Child)].into_iter().collect(),
            remove_seats: [seat("A1")].into_iter().collect(),
            ..DraftPatch::default()
        };
        assert!(matches!(
            patch.validate(&current()),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_patch_deserializes_with_defaults() {
        let patch: DraftPatch =
            serde_json::from_str(r#"{"age_categories":{"A1":"senior"}}"#).unwrap();
        assert_eq!(patch.age_categories[&seat("A1")], AgeCategory::Senior);
        assert!(patch.customer.is_none());
        assert!(!patch.is_empty());
        assert!(DraftPatch::default().is_empty());
    }
}
