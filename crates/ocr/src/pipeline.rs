use std::path::Path;

use factura_core::{EngineConfig, InvoiceRecord};
use thiserror::Error;

use crate::canonical::Canonicalizer;
use crate::cluster::cluster_lines;
use crate::due_date;
use crate::fields;
use crate::items::reconstruct_line_items;
use crate::source::{SourceError, TokenSource};
use crate::types::{Line, WordToken};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OCR token source failed: {0}")]
    Source(#[from] SourceError),
}

/// Reconstruct an invoice record from raw OCR tokens.
///
/// Infallible by design: a header field that cannot be found stays an empty
/// string, the total defaults to `"0.00"`, and the line-item tiers always
/// settle on a value. Vendor identity fields are left for the caller; the
/// optional `default_net_days` supplies vendor payment terms for the
/// due-date fallback.
pub fn reconstruct_invoice(
    tokens: &[WordToken],
    cfg: &EngineConfig,
    canon: &Canonicalizer,
    default_net_days: Option<u32>,
) -> InvoiceRecord {
    let lines = cluster_lines(tokens, cfg);
    let page_text = page_text(&lines);

    let mut record = InvoiceRecord::empty("", "");
    record.invoice_number = fields::extract_invoice_number(&lines).unwrap_or_default();
    record.invoice_date = fields::extract_invoice_date(&lines).unwrap_or_default();
    record.total = fields::extract_total(&lines, cfg);
    record.office_location = fields::extract_office(&lines, cfg).unwrap_or_default();
    record.line_items = reconstruct_line_items(&lines, cfg, canon);

    record.due_date = due_date::extract_due_date(&page_text, &record.invoice_date)
        .or_else(|| {
            default_net_days
                .and_then(|days| due_date::due_date_from_net_days(&record.invoice_date, days))
        })
        .map(|d| due_date::normalize_due_date(&d))
        .unwrap_or_default();

    tracing::info!(
        invoice_number = %record.invoice_number,
        total = %record.total,
        line_items = record.line_items.len(),
        "invoice reconstructed"
    );
    record
}

/// Joined cluster text, one visual row per line — the whole-page view the
/// due-date patterns search over.
pub fn page_text(lines: &[Line]) -> String {
    lines.iter().map(Line::text).collect::<Vec<_>>().join("\n")
}

/// Ties a `TokenSource` to the reconstruction engine for one document flow.
pub struct InvoicePipeline<S: TokenSource> {
    source: S,
    cfg: EngineConfig,
    canon: Canonicalizer,
}

impl<S: TokenSource> InvoicePipeline<S> {
    pub fn new(source: S, cfg: EngineConfig, canon: Canonicalizer) -> Self {
        Self { source, cfg, canon }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Tokenize a document and reconstruct its record. A failure here means
    /// the input was unreadable; the document is abandoned, not the batch.
    pub fn process_bytes(
        &self,
        data: &[u8],
        default_net_days: Option<u32>,
    ) -> Result<InvoiceRecord, PipelineError> {
        let tokens = self.source.tokenize(data)?;
        Ok(reconstruct_invoice(&tokens, &self.cfg, &self.canon, default_net_days))
    }

    pub fn process_file(
        &self,
        path: &Path,
        default_net_days: Option<u32>,
    ) -> Result<InvoiceRecord, PipelineError> {
        let data = std::fs::read(path)?;
        self.process_bytes(&data, default_net_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockTokenSource;

    fn tokens_from(rows: &[(&str, i32)]) -> Vec<WordToken> {
        let mut tokens = Vec::new();
        for (text, y) in rows {
            for (i, word) in text.split_whitespace().enumerate() {
                tokens.push(WordToken::new(word, 10 + 80 * i as i32, *y));
            }
        }
        tokens
    }

    fn run(rows: &[(&str, i32)]) -> InvoiceRecord {
        reconstruct_invoice(
            &tokens_from(rows),
            &EngineConfig::default(),
            &Canonicalizer::with_defaults(),
            None,
        )
    }

    #[test]
    fn full_page_reconstruction() {
        let record = run(&[
            ("Invoice #5206", 50),
            ("03/14/2025", 90),
            ("Customer ID Roseburg", 150),
            ("Qty Product Tooth", 200),
            ("1.00 Teeth LRPD $45.00", 300),
            ("Amount Due $45.00", 900),
        ]);
        assert_eq!(record.invoice_number, "5206");
        assert_eq!(record.invoice_date, "03/14/2025");
        assert_eq!(record.office_location, "Roseburg");
        assert_eq!(record.total, "45.00");
        assert_eq!(record.line_items.len(), 1);
        assert_eq!(record.line_items[0].product_number, "Teeth LRPD");
    }

    #[test]
    fn missing_fields_become_empty_strings() {
        let record = run(&[("nothing useful here", 100)]);
        assert_eq!(record.invoice_number, "");
        assert_eq!(record.invoice_date, "");
        assert_eq!(record.office_location, "");
        assert_eq!(record.due_date, "");
        assert_eq!(record.total, "0.00");
        assert!(record.line_items.is_empty());
    }

    #[test]
    fn due_date_found_across_split_tokens() {
        let record = run(&[
            ("01/15/2025", 90),
            ("Due Date: 02/15/2025", 700),
        ]);
        assert_eq!(record.due_date, "02/15/2025");
    }

    #[test]
    fn due_date_from_net_terms_in_text() {
        let record = run(&[
            ("01/15/2025", 90),
            ("Net 60 days", 700),
        ]);
        assert_eq!(record.due_date, "03/16/2025");
    }

    #[test]
    fn vendor_net_days_fallback_applies() {
        let record = reconstruct_invoice(
            &tokens_from(&[("Invoice 88112233 01/15/25", 90)]),
            &EngineConfig::default(),
            &Canonicalizer::with_defaults(),
            Some(30),
        );
        assert_eq!(record.invoice_date, "01/15/25");
        assert_eq!(record.due_date, "02/14/2025");
    }

    #[test]
    fn discount_only_page_totals_zero() {
        let record = run(&[
            ("Qty Product Tooth", 200),
            ("Courtesy discount $(97.00)", 400),
        ]);
        assert_eq!(record.total, "0.00");
    }

    #[test]
    fn identical_input_yields_byte_identical_output() {
        let rows = [
            ("Invoice #5206 03/14/2025", 50),
            ("Qty Product Tooth", 200),
            ("1.00 Teeth LRPD $45.00", 300),
            ("Amount Due $45.00", 900),
        ];
        let a = serde_json::to_vec(&run(&rows)).unwrap();
        let b = serde_json::to_vec(&run(&rows)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pipeline_process_bytes_uses_token_source() {
        let pipeline = InvoicePipeline::new(
            MockTokenSource::new(tokens_from(&[
                ("Invoice #5206", 50),
                ("Balance Due $12.00", 900),
            ])),
            EngineConfig::default(),
            Canonicalizer::with_defaults(),
        );
        let record = pipeline.process_bytes(b"ignored", None).unwrap();
        assert_eq!(record.invoice_number, "5206");
        assert_eq!(record.total, "12.00");
    }
}
