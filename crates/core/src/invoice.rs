use serde::{Deserialize, Serialize};

/// One reconstructed invoice row.
///
/// All numeric fields are decimal-strings; the queue format downstream keys
/// on text, and `Quantity` keeps its legacy capitalized wire name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_number: String,
    pub product_name: String,
    #[serde(rename = "Quantity")]
    pub quantity: String,
    pub unit_price: String,
    pub line_item_total: String,
}

impl LineItem {
    /// Key used to suppress OCR re-emissions of the same row: an item is a
    /// duplicate when product and unit price already exist in the record.
    pub fn dedup_key(&self) -> (&str, &str) {
        (self.product_number.as_str(), self.unit_price.as_str())
    }
}

/// The assembled output for one invoice document. Written once, never
/// mutated afterward; corrections happen out-of-core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub vendor: String,
    pub vendor_name: String,
    pub invoice_number: String,
    pub invoice_date: String,
    #[serde(default)]
    pub due_date: String,
    pub total: String,
    pub office_location: String,
    pub line_items: Vec<LineItem>,
}

impl InvoiceRecord {
    pub fn empty(vendor: impl Into<String>, vendor_name: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            vendor_name: vendor_name.into(),
            invoice_number: String::new(),
            invoice_date: String::new(),
            due_date: String::new(),
            total: "0.00".to_string(),
            office_location: String::new(),
            line_items: Vec::new(),
        }
    }

    /// Case-insensitive search over the document-derived text fields, used
    /// by vendor detection marker checks. The `vendor`/`vendor_name` stamps
    /// are deliberately excluded; they come from the profile, not the page.
    pub fn contains_marker(&self, marker: &str) -> bool {
        let needle = marker.to_lowercase();
        self.office_location.to_lowercase().contains(&needle)
            || self
                .line_items
                .iter()
                .any(|li| li.product_name.to_lowercase().contains(&needle))
    }
}
