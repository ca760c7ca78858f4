// src/message.rs

use crate::model::Person;

/// Country code prepended to every WhatsApp destination.
pub const COUNTRY_CODE: &str = "62";

/// Format an amount as Indonesian Rupiah, e.g. `Rp 22.000,00`.
pub fn format_idr(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}Rp {grouped},{frac:02}")
}

/// "BCA - 123, Mandiri - 456"
pub fn bank_list(person: &Person) -> String {
    person
        .banks()
        .iter()
        .map(|b| format!("{} - {}", b.bank_name, b.account_number))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The person's phone number with the country code in front, digits only.
pub fn whatsapp_destination(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("{COUNTRY_CODE}{digits}")
}

/// The payment request text sent to a person.
pub fn compose_request(person: &Person) -> String {
    let mut message = format!(
        "Halo, {}. Kamu ada bill yang belum dibayar sebanyak {}",
        person.name(),
        format_idr(person.total_due())
    );
    if !person.banks().is_empty() {
        message.push_str(&format!(" kamu bisa bayar melalui {}", bank_list(person)));
    }
    message.push_str(". Thank you. ~ Pesan digenerate pake SplitBill");
    message
}

/// `https://wa.me/<country code><phone>?text=<request>`
pub fn whatsapp_link(person: &Person) -> String {
    format!(
        "https://wa.me/{}?text={}",
        whatsapp_destination(person.phone()),
        urlencoding::encode(&compose_request(person))
    )
}
