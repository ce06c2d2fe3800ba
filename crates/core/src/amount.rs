use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a monetary token into a non-negative decimal.
/// Accepts `$45.00`, `45.00`, `1,234.56`; rejects negatives and garbage.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let clean = s.trim().trim_start_matches('$').replace(',', "");
    let dec = Decimal::from_str(&clean).ok()?;
    if dec.is_sign_negative() {
        return None;
    }
    Some(dec)
}

/// Render a decimal as the two-place string used in invoice artifacts.
pub fn format_amount(d: Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

/// Whether a line of text carries a discount-shaped amount: `$(97.00)` or
/// `-$97.00`. Invoices with a full discount legitimately total to zero.
pub fn has_discount_marker(text: &str) -> bool {
    let bytes = text.as_bytes();
    for (i, _) in text.match_indices('$') {
        // -$97.00
        if i > 0 && bytes[i - 1] == b'-' && looks_like_amount(&text[i + 1..]) {
            return true;
        }
        // $(97.00)
        if text[i + 1..].starts_with('(') {
            let inner = &text[i + 2..];
            if let Some(end) = inner.find(')') {
                if looks_like_amount(&inner[..end]) {
                    return true;
                }
            }
        }
    }
    false
}

fn looks_like_amount(s: &str) -> bool {
    let digits: String = s
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");
    !whole.is_empty() && frac.len() >= 2 && frac.chars().all(|c| c.is_ascii_digit())
}
