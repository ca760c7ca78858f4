// src/allocation.rs

use crate::error::{Result, SplitError};
use crate::model::{BankAccount, Item, Person, subtotal};
use tracing::info;

/// Compute a person's share from a snapshot of selected items.
///
/// `tip_percent` is a surcharge applied on top of the subtotal and must lie in
/// `0..=100`. Nothing is returned (and nothing can be stored) on invalid input.
pub fn create_person(
    name: &str,
    phone: &str,
    selected_items: Vec<Item>,
    tip_percent: f64,
    banks: Vec<BankAccount>,
) -> Result<Person> {
    if name.trim().is_empty() {
        return Err(SplitError::Validation("please enter a name".into()));
    }
    if selected_items.is_empty() {
        return Err(SplitError::Validation(
            "please select at least one item".into(),
        ));
    }
    if !tip_percent.is_finite() || !(0.0..=100.0).contains(&tip_percent) {
        return Err(SplitError::Validation(format!(
            "surcharge must be between 0 and 100 percent, got {tip_percent}"
        )));
    }

    let subtotal = subtotal(&selected_items);
    let tip = tip_percent / 100.0 * subtotal;
    let total_due = subtotal + tip;

    Ok(Person {
        name: name.to_string(),
        phone: phone.to_string(),
        selected_items,
        tip_percent,
        tip,
        banks,
        total_due,
    })
}

/// Everyone the bill has been assigned to, in the order they were added.
#[derive(Debug, Default, Clone)]
pub struct People {
    people: Vec<Person>,
}

impl People {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a person and append them. On error the list is untouched.
    pub fn add(
        &mut self,
        name: &str,
        phone: &str,
        selected_items: Vec<Item>,
        tip_percent: f64,
        banks: Vec<BankAccount>,
    ) -> Result<&Person> {
        let person = create_person(name, phone, selected_items, tip_percent, banks)?;
        info!(
            name = %person.name,
            items = person.selected_items.len(),
            subtotal = person.subtotal(),
            tip = person.tip,
            total_due = person.total_due,
            "Person added"
        );
        self.people.push(person);
        Ok(&self.people[self.people.len() - 1])
    }

    /// Remove the person at `index`. A stale index is ignored.
    pub fn remove(&mut self, index: usize) -> Option<Person> {
        (index < self.people.len()).then(|| self.people.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&Person> {
        self.people.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Person> {
        self.people.iter()
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Sum of every person's total due.
    pub fn total_assigned(&self) -> f64 {
        self.people.iter().map(Person::total_due).sum()
    }

    pub fn clear(&mut self) {
        self.people.clear();
    }
}

impl<'a> IntoIterator for &'a People {
    type Item = &'a Person;
    type IntoIter = std::slice::Iter<'a, Person>;

    fn into_iter(self) -> Self::IntoIter {
        self.people.iter()
    }
}
