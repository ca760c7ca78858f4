// src/model.rs

use crate::error::{Result, SplitError};
use serde::{Deserialize, Serialize};

/// A single bill line. `price` is always the unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl Item {
    /// Negative or non-finite prices are stored as 0.
    pub fn new(name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price: clamp_price(price),
            quantity,
        }
    }

    /// Build an item from the raw text of a manual entry form.
    ///
    /// Manual entries are taken as typed: the price is a unit price and a
    /// quantity of 0 stays 0. Unparsable fields become 0.
    pub fn from_manual_entry(name: &str, price: &str, quantity: &str) -> Self {
        let price = price.trim().parse::<f64>().unwrap_or(0.0);
        let quantity = quantity
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|q| q.is_finite() && *q > 0.0)
            .map(|q| q.trunc().min(u32::MAX as f64) as u32)
            .unwrap_or(0);
        Self::new(name, price, quantity)
    }

    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

pub(crate) fn clamp_price(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        price
    } else {
        0.0
    }
}

/// Sum of `price * quantity` over a slice of items.
pub fn subtotal(items: &[Item]) -> f64 {
    items.iter().map(Item::line_total).sum()
}

/// Where a person should send their share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank_name: String,
    pub account_number: String,
}

impl BankAccount {
    pub fn new(bank_name: &str, account_number: &str) -> Result<Self> {
        let bank_name = bank_name.trim();
        let account_number = account_number.trim();
        if bank_name.is_empty() || account_number.is_empty() {
            return Err(SplitError::Validation(
                "bank name and account number are both required".into(),
            ));
        }
        Ok(Self {
            bank_name: bank_name.to_string(),
            account_number: account_number.to_string(),
        })
    }
}

/// A participant and the share they owe. Built by the allocation engine and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub(crate) name: String,
    pub(crate) phone: String,
    pub(crate) selected_items: Vec<Item>,
    pub(crate) tip_percent: f64,
    pub(crate) tip: f64,
    pub(crate) banks: Vec<BankAccount>,
    pub(crate) total_due: f64,
}

impl Person {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn selected_items(&self) -> &[Item] {
        &self.selected_items
    }

    /// The surcharge rate the person was created with, in percent.
    pub fn tip_percent(&self) -> f64 {
        self.tip_percent
    }

    /// The surcharge amount.
    pub fn tip(&self) -> f64 {
        self.tip
    }

    pub fn banks(&self) -> &[BankAccount] {
        &self.banks
    }

    pub fn total_due(&self) -> f64 {
        self.total_due
    }

    pub fn subtotal(&self) -> f64 {
        subtotal(&self.selected_items)
    }
}
