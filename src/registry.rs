// src/registry.rs

use crate::model::{Item, clamp_price, subtotal};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Leading integer of a form field, the way a browser's `parseInt` reads it.
static LEADING_INT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").ok());

/// The ordered list of items on the bill currently being split.
#[derive(Debug, Default, Clone)]
pub struct BillRegistry {
    items: Vec<Item>,
}

impl BillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Negative or non-finite prices are stored as 0.
    pub fn add_item(&mut self, mut item: Item) {
        item.price = clamp_price(item.price);
        debug!(name = %item.name, price = item.price, quantity = item.quantity, "Item added");
        self.items.push(item);
    }

    /// Append a whole ingestion result.
    pub fn extend(&mut self, items: Vec<Item>) {
        info!(count = items.len(), "Items added to bill");
        self.items.extend(items.into_iter().map(|mut item| {
            item.price = clamp_price(item.price);
            item
        }));
    }

    /// Remove the item at `index`. A stale index is ignored.
    pub fn remove_item(&mut self, index: usize) -> Option<Item> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            debug!(index, len = self.items.len(), "Ignoring removal of missing item");
            None
        }
    }

    /// Set the quantity from raw form input. Negative or non-numeric input
    /// becomes 0. Returns false if `index` is out of range.
    pub fn update_quantity(&mut self, index: usize, raw: &str) -> bool {
        let parsed = LEADING_INT
            .as_ref()
            .and_then(|re| re.captures(raw))
            .and_then(|c| c[1].parse::<i64>().ok())
            .unwrap_or(0);
        self.set_quantity(index, parsed)
    }

    /// Typed variant of [`update_quantity`](Self::update_quantity).
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.quantity = quantity.clamp(0, u32::MAX as i64) as u32;
        true
    }

    /// Independent copies of the items at `indices`, in first-seen order.
    /// A repeated index is copied once. Out-of-range indices are skipped;
    /// use [`first_missing`](Self::first_missing) to reject them instead.
    pub fn select_snapshot(&self, indices: &[usize]) -> Vec<Item> {
        let mut seen = HashSet::with_capacity(indices.len());
        indices
            .iter()
            .filter(|&&i| seen.insert(i))
            .filter_map(|&i| self.items.get(i))
            .cloned()
            .collect()
    }

    /// The first index in `indices` with no item behind it.
    pub fn first_missing(&self, indices: &[usize]) -> Option<usize> {
        indices.iter().copied().find(|&i| i >= self.items.len())
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Grand total of every item on the bill.
    pub fn total(&self) -> f64 {
        subtotal(&self.items)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
