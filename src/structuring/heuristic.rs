use super::ReceiptStructurer;
use crate::error::{Result, SplitError};
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

/// Offline backend: keyword-filtered regex line matching. Produces the same
/// JSON reply shape an LLM would, so it goes through the same validation.
pub struct HeuristicStructurer;

#[async_trait]
impl ReceiptStructurer for HeuristicStructurer {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn complete(&self, raw_text: &str) -> Result<String> {
        let items: Vec<_> = extract_lines(raw_text)?
            .into_iter()
            .map(|line| {
                json!({
                    "name": line.name,
                    "price": line.amount,
                    "quantity": line.quantity,
                })
            })
            .collect();
        Ok(json!({ "items": items }).to_string())
    }
}

#[derive(Debug, PartialEq)]
struct ReceiptLine {
    name: String,
    quantity: u32,
    /// The printed line amount.
    amount: f64,
}

/// Lines mentioning any of these are totals, taxes or payment info.
const SKIP_WORDS: &[&str] = &[
    "total", "subtotal", "sub total", "tax", "pajak", "ppn", "pb1", "service", "layanan", "cash",
    "tunai", "change", "kembali", "debit", "credit", "kartu", "bayar", "payment", "diskon",
    "discount", "rounding", "pembulatan",
];

fn extract_lines(text: &str) -> Result<Vec<ReceiptLine>> {
    let regex = |pattern: &str| {
        Regex::new(pattern).map_err(|e| SplitError::Structuring(format!("bad pattern: {e}")))
    };
    // "2 x Nasi Goreng 40.000" / "2 Nasi Goreng 40.000"
    let qty_first = regex(r"^(\d{1,3})\s*[xX]?\s+(.*?[A-Za-z].*?)\s+(?:Rp\.?\s*)?(\d[\d.,]*)$")?;
    // "Nasi Goreng 2 x 40.000" / "Nasi Goreng 2 40.000"
    let qty_after = regex(r"^(.*?[A-Za-z].*?)\s+(\d{1,3})\s*[xX]?\s+(?:Rp\.?\s*)?(\d[\d.,]*)$")?;
    // "Es Teh 5.000"
    let name_amount = regex(r"^(.*?[A-Za-z].*?)\s+(?:Rp\.?\s*)?(\d[\d.,]*)$")?;

    let mut lines = Vec::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if SKIP_WORDS.iter().any(|w| lower.contains(w)) {
            continue;
        }

        let parsed = if let Some(c) = qty_first.captures(line) {
            let quantity = c[1].parse::<u32>().unwrap_or(1);
            parse_amount(&c[3]).map(|amount| (c[2].to_string(), quantity, amount))
        } else if let Some(c) = qty_after.captures(line) {
            let quantity = c[2].parse::<u32>().unwrap_or(1);
            parse_amount(&c[3]).map(|amount| (c[1].to_string(), quantity, amount))
        } else if let Some(c) = name_amount.captures(line) {
            parse_amount(&c[2]).map(|amount| (c[1].to_string(), 1, amount))
        } else {
            None
        };

        if let Some((name, quantity, amount)) = parsed {
            lines.push(ReceiptLine {
                name: name.trim().to_string(),
                quantity,
                amount,
            });
        }
    }
    Ok(lines)
}

/// Parse "40.000", "40,000", "12.50" or "1.234,50".
///
/// A final separator followed by exactly three digits is a thousands
/// separator; otherwise it is the decimal point.
fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim_end_matches(['.', ',']);
    let Some(pos) = raw.rfind(['.', ',']) else {
        return raw.parse().ok();
    };

    let digits_after = raw.len() - pos - 1;
    let cleaned: String = if digits_after == 3 {
        raw.chars().filter(char::is_ascii_digit).collect()
    } else {
        let (int_part, frac_part) = raw.split_at(pos);
        let int_digits: String = int_part.chars().filter(char::is_ascii_digit).collect();
        format!("{int_digits}.{}", &frac_part[1..])
    };
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structuring::parse_structuring_response;

    #[test]
    fn test_amount_formats() {
        assert_eq!(parse_amount("40.000"), Some(40000.0));
        assert_eq!(parse_amount("40,000"), Some(40000.0));
        assert_eq!(parse_amount("1.234.500"), Some(1234500.0));
        assert_eq!(parse_amount("1.234,50"), Some(1234.5));
        assert_eq!(parse_amount("12.50"), Some(12.5));
        assert_eq!(parse_amount("5000"), Some(5000.0));
        assert_eq!(parse_amount("7.000,"), Some(7000.0));
    }

    #[test]
    fn test_line_shapes() {
        let text = "\
WARUNG MAKAN SEDERHANA
Jl. Merdeka No 10 Bandung
2 x Nasi Goreng 40.000
Es Teh Manis 3 15.000
Kerupuk 2.000
Subtotal 57.000
PB1 10% 5.700
TOTAL 62.700
Tunai 100.000
Kembali 37.300";
        let lines = extract_lines(text).unwrap();
        assert_eq!(
            lines,
            vec![
                ReceiptLine {
                    name: "Nasi Goreng".into(),
                    quantity: 2,
                    amount: 40000.0
                },
                ReceiptLine {
                    name: "Es Teh Manis".into(),
                    quantity: 3,
                    amount: 15000.0
                },
                ReceiptLine {
                    name: "Kerupuk".into(),
                    quantity: 1,
                    amount: 2000.0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_reply_passes_validation() {
        let reply = HeuristicStructurer
            .complete("Nasi Goreng 2 40.000\nnoise ~~ ###")
            .await
            .unwrap();
        let items = parse_structuring_response(&reply).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Nasi Goreng");
        assert_eq!(items[0].quantity, serde_json::json!(2));
    }
}
