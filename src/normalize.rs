// src/normalize.rs

use crate::model::{Item, clamp_price};
use serde::Deserialize;
use serde_json::Value;

/// One item record as returned by the structuring service. `price` and
/// `quantity` are kept untyped; the model may send strings, nulls or
/// line totals instead of unit prices.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawItem {
    pub name: String,
    pub price: Value,
    pub quantity: Value,
}

/// Turn raw records into canonical items, preserving order.
pub fn normalize_items(raw: &[RawItem]) -> Vec<Item> {
    raw.iter().map(normalize_item).collect()
}

/// Canonicalize a single record.
///
/// A positive whole quantity means `price` is the line total and is divided
/// down to a unit price. Anything else (missing, zero, negative, fractional)
/// leaves the price as given with a quantity of 1.
pub fn normalize_item(raw: &RawItem) -> Item {
    let price = raw.price.as_f64().unwrap_or(f64::NAN);

    let (unit_price, quantity) = match positive_count(&raw.quantity) {
        Some(qty) => (price / qty as f64, qty),
        None => (price, 1),
    };

    Item {
        name: raw.name.clone(),
        price: clamp_price(unit_price),
        quantity,
    }
}

fn positive_count(value: &Value) -> Option<u32> {
    let q = value.as_f64()?;
    if q.is_finite() && q > 0.0 && q.fract() == 0.0 && q <= u32::MAX as f64 {
        Some(q as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(name: &str, price: Value, quantity: Value) -> RawItem {
        RawItem {
            name: name.to_string(),
            price,
            quantity,
        }
    }

    #[test]
    fn test_line_total_divided_into_unit_price() {
        let item = normalize_item(&raw("Nasi Goreng", json!(20000), json!(2)));
        assert_eq!(item, Item::new("Nasi Goreng", 10000.0, 2));
    }

    #[test]
    fn test_zero_quantity_defaults_to_one() {
        let item = normalize_item(&raw("Sate", json!(15000), json!(0)));
        assert_eq!(item.price, 15000.0);
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_non_numeric_fields() {
        let item = normalize_item(&raw("Teh", json!("abc"), json!(null)));
        assert_eq!(item.price, 0.0);
        assert_eq!(item.quantity, 1);

        let item = normalize_item(&raw("Kopi", json!(null), json!(3)));
        assert_eq!(item.price, 0.0);
        assert_eq!(item.quantity, 3);

        let item = normalize_item(&raw("Roti", json!(8000), json!("2")));
        assert_eq!(item.price, 8000.0);
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_negative_and_fractional_inputs() {
        let discount = normalize_item(&raw("Diskon", json!(-5000), json!(1)));
        assert_eq!(discount.price, 0.0);

        let negative_qty = normalize_item(&raw("Es", json!(6000), json!(-2)));
        assert_eq!(negative_qty.price, 6000.0);
        assert_eq!(negative_qty.quantity, 1);

        let weighed = normalize_item(&raw("Udang", json!(45000), json!(0.5)));
        assert_eq!(weighed.price, 45000.0);
        assert_eq!(weighed.quantity, 1);
    }

    #[test]
    fn test_canonical_items_never_negative() {
        let inputs = vec![
            raw("a", json!(-1), json!(-1)),
            raw("b", json!(1e308), json!(1e-308)),
            raw("c", json!(f64::MAX), json!(1)),
            raw("d", json!({"x": 1}), json!([1])),
            raw("e", json!(true), json!(false)),
        ];
        for item in normalize_items(&inputs) {
            assert!(item.price >= 0.0 && item.price.is_finite(), "{item:?}");
        }
    }

    #[test]
    fn test_order_preserved() {
        let items = normalize_items(&[
            raw("first", json!(1), json!(1)),
            raw("second", json!(2), json!(1)),
            raw("third", json!(3), json!(1)),
        ]);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }
}
