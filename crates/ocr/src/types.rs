use serde::{Deserialize, Serialize};

/// One OCR-recognized text fragment with its pixel bounding box.
///
/// The wire names `left`/`top` follow the OCR engine's per-word output
/// contract; confidence is 0–100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordToken {
    pub text: String,
    #[serde(rename = "left")]
    pub x: i32,
    #[serde(rename = "top")]
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: i32,
}

impl WordToken {
    #[cfg(test)]
    pub fn new(text: &str, x: i32, y: i32) -> Self {
        Self { text: text.to_string(), x, y, width: 10, height: 10, confidence: 90 }
    }
}

/// Tokens judged to lie on the same visual row, ordered left to right.
#[derive(Debug, Clone)]
pub struct Line {
    /// Vertical key of the cluster this line was built from.
    pub y: i32,
    pub tokens: Vec<WordToken>,
}

impl Line {
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a candidate line relates to the numeric evidence it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Carries both a quantity-shaped token and a currency-shaped token.
    Complete,
    QuantityOnly,
    PriceOnly,
    /// Product keywords but no usable numeric evidence yet.
    ProductOnly,
    Unclassified,
}

/// A line considered for line-item extraction, tagged with its
/// classification and any numeric values pulled out of it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub line: Line,
    pub classification: Classification,
    pub quantity: Option<String>,
    pub price: Option<String>,
}
