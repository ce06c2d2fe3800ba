use std::sync::OnceLock;

use chrono::NaiveDate;
use factura_core::{amount, EngineConfig};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;

use crate::types::Line;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_invoice_label, r"(?i)\binvoice\s*(?:number|no\.?|#)?\s*:?\s*#?(\d{4,})\b");
re!(re_date_token, r"^\d{1,2}/\d{1,2}/\d{2,4}$");
re!(re_date_in_text, r"\b(\d{1,2}/\d{1,2}/\d{4})\b");
re!(re_currency_token, r"^\$(\d+\.\d{2})$");
re!(re_bare_amount_token, r"^(\d+\.\d{2})$");

// ── Invoice number ────────────────────────────────────────────────────────────

/// Locate the invoice number. Rules in order, first validated match wins:
/// a labeled `Invoice #NNNN` anywhere in a line, then the first bare token
/// of 4+ digits (optionally `#`-prefixed) with no embedded separators.
pub fn extract_invoice_number(lines: &[Line]) -> Option<String> {
    for line in lines {
        if let Some(c) = re_invoice_label().captures(&line.text()) {
            let digits = c.get(1)?.as_str();
            tracing::debug!(invoice_number = digits, "invoice number from label");
            return Some(digits.to_string());
        }
    }

    for line in lines {
        for token in &line.tokens {
            let word = token.text.as_str();
            let digits = word.strip_prefix('#').unwrap_or(word);
            if digits.len() >= 4
                && digits.chars().all(|c| c.is_ascii_digit())
                && !word.contains(['-', '.', '/'])
            {
                tracing::debug!(invoice_number = digits, "invoice number from bare token");
                return Some(digits.to_string());
            }
        }
    }
    None
}

// ── Invoice date ──────────────────────────────────────────────────────────────

/// Locate the invoice date: first a whole token shaped like a slash date,
/// then a date embedded in joined line text. Matches must survive actual
/// calendar parsing; `13/45/2025` is not a date no matter how date-shaped.
pub fn extract_invoice_date(lines: &[Line]) -> Option<String> {
    for line in lines {
        for token in &line.tokens {
            if re_date_token().is_match(&token.text) && parse_slash_date(&token.text).is_some() {
                return Some(token.text.clone());
            }
        }
    }
    for line in lines {
        if let Some(c) = re_date_in_text().captures(&line.text()) {
            let raw = c.get(1)?.as_str();
            if parse_slash_date(raw).is_some() {
                return Some(raw.to_string());
            }
        }
    }
    None
}

/// Parse `M/D/YYYY` or `M/D/YY` with real calendar validation. The format
/// is picked by the year field's width: chrono's `%Y` accepts two digits
/// and would read `01/15/25` as the year 25.
pub fn parse_slash_date(s: &str) -> Option<NaiveDate> {
    let fmt = match s.trim().rsplit('/').next() {
        Some(year) if year.len() == 2 => "%m/%d/%y",
        _ => "%m/%d/%Y",
    };
    NaiveDate::parse_from_str(s.trim(), fmt).ok()
}

// ── Office location ───────────────────────────────────────────────────────────

/// Locate the office/clinic, preferring the "Customer ID" line, falling back
/// to any line naming a known office. OCR misreads common in these scans are
/// normalized before matching.
pub fn extract_office(lines: &[Line], cfg: &EngineConfig) -> Option<String> {
    let find_office = |text: &str| -> Option<String> {
        let cleaned = normalize_office_text(text);
        cfg.known_offices
            .iter()
            .find(|office| cleaned.contains(&office.to_lowercase()))
            .cloned()
    };

    for line in lines {
        let text = line.text().to_lowercase();
        if text.contains("customer id") {
            if let Some(office) = find_office(&text) {
                return Some(office);
            }
        }
    }
    lines.iter().find_map(|line| find_office(&line.text()))
}

fn normalize_office_text(text: &str) -> String {
    let mut txt = text.trim().to_lowercase().replace("denitel", "dental");
    for filler in ["pete", "ease", "corporate", "office"] {
        txt = txt.replace(filler, " ");
    }
    txt
}

// ── Total ─────────────────────────────────────────────────────────────────────

/// Locate the invoice total.
///
/// Preference order: a line carrying a total/amount-due/balance-due marker
/// (excluding "extended amount" lines, a known false-positive source); then
/// the lowest-positioned amount on the page among `$`-prefixed tokens and
/// bare amounts in a plausible invoice range; then `"0.00"` — a zero total
/// is a valid outcome when a full discount applies.
pub fn extract_total(lines: &[Line], cfg: &EngineConfig) -> String {
    for line in lines {
        let text = line.text().to_lowercase();
        let is_total_line = (text.contains("total")
            || text.contains("amount due")
            || text.contains("balance due"))
            && !text.contains("extended");
        if !is_total_line {
            continue;
        }
        for token in &line.tokens {
            if let Some(c) = re_currency_token().captures(&token.text) {
                if let Some(m) = c.get(1) {
                    tracing::debug!(total = m.as_str(), "total from marker line");
                    return m.as_str().to_string();
                }
            }
            if re_bare_amount_token().is_match(&token.text)
                && amount::parse_amount(&token.text).is_some()
            {
                tracing::debug!(total = %token.text, "total from marker line");
                return token.text.clone();
            }
        }
    }

    // No marker line: totals sit lowest on the page.
    let mut best: Option<(i32, String)> = None;
    for line in lines {
        for token in &line.tokens {
            let candidate = if let Some(c) = re_currency_token().captures(&token.text) {
                c.get(1).map(|m| m.as_str().to_string())
            } else if re_bare_amount_token().is_match(&token.text) {
                amount::parse_amount(&token.text)
                    .filter(|d| {
                        let v = d.to_f64().unwrap_or(0.0);
                        v >= cfg.plausible_total_min && v <= cfg.plausible_total_max
                    })
                    .map(|_| token.text.clone())
            } else {
                None
            };
            if let Some(value) = candidate {
                if best.as_ref().map_or(true, |(y, _)| token.y > *y) {
                    best = Some((token.y, value));
                }
            }
        }
    }
    if let Some((_, value)) = best {
        tracing::debug!(total = %value, "total from lowest amount on page");
        return value;
    }

    if lines.iter().any(|l| amount::has_discount_marker(&l.text())) {
        tracing::debug!("discount markers and no total line; zero-total invoice");
    } else {
        tracing::debug!("no total evidence found, defaulting");
    }
    "0.00".to_string()
}
