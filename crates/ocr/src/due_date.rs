use std::sync::OnceLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Exact due-date shapes, most to least specific.
re!(re_due_date, r"(?i)\bdue\s+date\s*:?\s*(\d{1,2}/\d{1,2}/\d{4})");
re!(re_due_by, r"(?i)\bdue\s+by\s*:?\s*(\d{1,2}/\d{1,2}/\d{4})");
re!(re_due, r"(?i)\bdue\s*:?\s*(\d{1,2}/\d{1,2}/\d{4})");
re!(re_payment_due, r"(?i)\bpayment\s+due\s*:?\s*(\d{1,2}/\d{1,2}/\d{4})");
re!(re_amount_due_date, r"(?i)\bamount\s+due\s*:?\s*\$?[\d,]+\.?\d*\s*(\d{1,2}/\d{1,2}/\d{4})");
re!(re_net_with_date, r"(?i)\bnet\s+\d+\s*:?\s*(\d{1,2}/\d{1,2}/\d{4})");
re!(re_terms_with_date, r"(?i)\bterms?\s*:?\s*net\s+\d+\s*(\d{1,2}/\d{1,2}/\d{4})");

// Relative terms expressed as a day count from the invoice date.
re!(re_due_days_from, r"(?i)\bdue\s+(\d+)\s+days?\s+from\s+date");
re!(re_net_days, r"(?i)\bnet\s+(\d+)\s+days?");
re!(re_payment_terms_days, r"(?i)\bpayment\s+terms?\s*:?\s*(\d+)\s+days?");
re!(re_terms_net, r"(?i)\bterms?\s*:?\s*net\s+(\d+)");
re!(re_days_from_invoice, r"(?i)\b(\d+)\s+days?\s+from\s+invoice\s+date");

/// Resolve a due date from invoice text: an explicit date first, otherwise a
/// relative term ("Net 60 days") applied to the invoice date. Returns
/// MM/DD/YYYY, or `None` when the text carries neither.
pub fn extract_due_date(text: &str, invoice_date: &str) -> Option<String> {
    if let Some(exact) = extract_exact(text) {
        return Some(exact);
    }
    extract_relative(text, invoice_date)
}

fn extract_exact(text: &str) -> Option<String> {
    let patterns = [
        re_due_date(),
        re_due_by(),
        re_due(),
        re_payment_due(),
        re_amount_due_date(),
        re_net_with_date(),
        re_terms_with_date(),
    ];
    for pattern in patterns {
        if let Some(c) = pattern.captures(text) {
            let raw = c.get(1)?.as_str();
            if NaiveDate::parse_from_str(raw, "%m/%d/%Y").is_ok() {
                return Some(raw.to_string());
            }
        }
    }
    None
}

fn extract_relative(text: &str, invoice_date: &str) -> Option<String> {
    let base = parse_invoice_date(invoice_date)?;
    let patterns = [
        re_due_days_from(),
        re_net_days(),
        re_payment_terms_days(),
        re_terms_net(),
        re_days_from_invoice(),
    ];
    for pattern in patterns {
        if let Some(c) = pattern.captures(text) {
            if let Some(due) = c
                .get(1)?
                .as_str()
                .parse::<i64>()
                .ok()
                .and_then(|days| add_days(base, days))
            {
                return Some(due.format("%m/%d/%Y").to_string());
            }
        }
    }
    None
}

/// Apply a vendor's default payment terms when the text yields nothing.
pub fn due_date_from_net_days(invoice_date: &str, net_days: u32) -> Option<String> {
    let base = parse_invoice_date(invoice_date)?;
    Some(add_days(base, net_days as i64)?.format("%m/%d/%Y").to_string())
}

/// Day arithmetic that treats absurd OCR digit runs as no evidence rather
/// than aborting.
fn add_days(base: NaiveDate, days: i64) -> Option<NaiveDate> {
    base.checked_add_signed(Duration::try_days(days)?)
}

fn parse_invoice_date(s: &str) -> Option<NaiveDate> {
    if s.contains('/') {
        crate::fields::parse_slash_date(s)
    } else {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }
}

/// Normalize a due date written in any of the accepted layouts to MM/DD/YYYY.
/// Unrecognized input passes through unchanged.
pub fn normalize_due_date(due_date: &str) -> String {
    if due_date.is_empty() {
        return String::new();
    }
    match parse_any_layout(due_date) {
        Some(d) => d.format("%m/%d/%Y").to_string(),
        None => due_date.to_string(),
    }
}

/// Slash dates, dashed dates, and ISO dates. As in `parse_slash_date`, the
/// year field's width decides between `%y` and `%Y`.
fn parse_any_layout(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.contains('/') {
        return crate::fields::parse_slash_date(s);
    }
    let fmt = if s.split('-').next()?.len() == 4 {
        "%Y-%m-%d"
    } else if s.rsplit('-').next()?.len() == 2 {
        "%m-%d-%y"
    } else {
        "%m-%d-%Y"
    };
    NaiveDate::parse_from_str(s, fmt).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_due_date_label() {
        let text = "Invoice Date: 01/15/2025\nDue Date: 02/15/2025";
        assert_eq!(extract_due_date(text, "01/15/2025"), Some("02/15/2025".to_string()));
    }

    #[test]
    fn exact_payment_due_label() {
        assert_eq!(
            extract_due_date("Payment Due: 03/01/2025", "01/15/2025"),
            Some("03/01/2025".to_string())
        );
    }

    #[test]
    fn relative_due_days_from_date() {
        let text = "Invoice Date: 01/15/2025\nDue 30 days from date";
        assert_eq!(extract_due_date(text, "01/15/2025"), Some("02/14/2025".to_string()));
    }

    #[test]
    fn relative_net_sixty_days() {
        assert_eq!(
            extract_due_date("Net 60 days", "01/15/2025"),
            Some("03/16/2025".to_string())
        );
    }

    #[test]
    fn relative_terms_net_without_days_word() {
        assert_eq!(
            extract_due_date("Terms: Net 30", "01/15/2025"),
            Some("02/14/2025".to_string())
        );
    }

    #[test]
    fn absurd_day_counts_yield_no_due_date() {
        // An OCR digit run can be arbitrarily long; it is noise, not terms.
        assert_eq!(extract_due_date("Net 200000000000000 days", "01/15/2025"), None);
        assert_eq!(
            extract_due_date("Net 999999999999999999999999 days", "01/15/2025"),
            None
        );
    }

    #[test]
    fn relative_requires_valid_invoice_date() {
        assert_eq!(extract_due_date("Net 30 days", ""), None);
        assert_eq!(extract_due_date("Net 30 days", "not a date"), None);
    }

    #[test]
    fn exact_wins_over_relative() {
        let text = "Net 30 days\nDue Date: 02/15/2025";
        assert_eq!(extract_due_date(text, "01/15/2025"), Some("02/15/2025".to_string()));
    }

    #[test]
    fn invalid_calendar_exact_date_is_skipped() {
        assert_eq!(extract_due_date("Due Date: 02/30/2025", ""), None);
    }

    #[test]
    fn iso_invoice_date_accepted_for_relative() {
        assert_eq!(
            extract_due_date("Net 30 days", "2025-01-15"),
            Some("02/14/2025".to_string())
        );
    }

    #[test]
    fn vendor_default_net_days() {
        assert_eq!(due_date_from_net_days("01/15/25", 30), Some("02/14/2025".to_string()));
        assert_eq!(due_date_from_net_days("garbage", 30), None);
    }

    #[test]
    fn normalize_handles_accepted_layouts() {
        assert_eq!(normalize_due_date("2/5/2025"), "02/05/2025");
        assert_eq!(normalize_due_date("02-15-25"), "02/15/2025");
        assert_eq!(normalize_due_date("2025-02-15"), "02/15/2025");
        assert_eq!(normalize_due_date(""), "");
        assert_eq!(normalize_due_date("soon"), "soon");
    }
}
