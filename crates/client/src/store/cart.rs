//! Cart store: selected-but-unpurchased courses and the running total.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use coursedeck_core::{CourseId, CurrencyCode, Price};

use crate::api::types::Course;

/// One course selected for purchase.
///
/// Keyed by `course_id` within the cart; the cart never holds two items for
/// the same course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub course_id: CourseId,
    pub title: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
}

impl From<&Course> for CartItem {
    fn from(course: &Course) -> Self {
        Self {
            course_id: course.id.clone(),
            title: course.title.clone(),
            price: course.price,
            thumbnail: course.thumbnail.clone(),
            instructor_name: course.instructor_name.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct CartState {
    items: Vec<CartItem>,
    total: Decimal,
}

/// The cart container.
///
/// Invariant: `total` equals the sum of the prices of the items currently
/// present. Every mutation recomputes the total from the item list inside
/// the same write-lock critical section, so the invariant holds across any
/// operation sequence, not just after isolated calls.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    inner: Arc<RwLock<CartState>>,
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item; adding a course already in the cart is a silent no-op.
    pub fn add_item(&self, item: CartItem) {
        let mut state = self.write();
        if state.items.iter().any(|i| i.course_id == item.course_id) {
            return;
        }
        state.items.push(item);
        state.total = sum_prices(&state.items);
    }

    /// Remove the item for a course; absent ids are a no-op.
    pub fn remove_item(&self, course_id: &CourseId) {
        let mut state = self.write();
        if let Some(index) = state.items.iter().position(|i| &i.course_id == course_id) {
            state.items.remove(index);
            state.total = sum_prices(&state.items);
        }
    }

    /// Empty the cart. Called after a verified payment and on logout.
    pub fn clear(&self) {
        let mut state = self.write();
        state.items.clear();
        state.total = Decimal::ZERO;
    }

    /// Whether a course is already in the cart.
    #[must_use]
    pub fn contains(&self, course_id: &CourseId) -> bool {
        self.read().items.iter().any(|i| &i.course_id == course_id)
    }

    /// Current items, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.read().items.clone()
    }

    /// Sum of the prices of the items currently present.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.read().total
    }

    /// The total as a display price in the marketplace currency.
    #[must_use]
    pub fn total_price(&self) -> Price {
        Price::new(self.total(), CurrencyCode::INR)
    }

    /// Number of items in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    /// Whether the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Snapshot for the persistence vault.
    pub(crate) fn snapshot(&self) -> Vec<CartItem> {
        self.items()
    }

    /// Restore from a persisted snapshot; the total is recomputed, never
    /// trusted from storage.
    pub(crate) fn restore(&self, items: Vec<CartItem>) {
        let mut state = self.write();
        state.total = sum_prices(&items);
        state.items = items;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CartState> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CartState> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn sum_prices(items: &[CartItem]) -> Decimal {
    items.iter().map(|i| i.price).sum()
}
