use thiserror::Error;

use crate::types::WordToken;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Token stream decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// Abstraction over the OCR collaborator: document bytes in, per-word
/// tokens out. The engine itself never rasterizes or recognizes anything.
pub trait TokenSource: Send + Sync {
    fn tokenize(&self, document: &[u8]) -> Result<Vec<WordToken>, SourceError>;
}

/// Decodes the OCR engine's per-document JSON word dump:
/// an array of `{text, left, top, width, height, confidence}` objects.
pub struct JsonTokenSource;

impl TokenSource for JsonTokenSource {
    fn tokenize(&self, document: &[u8]) -> Result<Vec<WordToken>, SourceError> {
        Ok(serde_json::from_slice(document)?)
    }
}

/// Returns a preset token list regardless of input — lets the pipeline be
/// exercised without any OCR output on disk.
pub struct MockTokenSource {
    pub tokens: Vec<WordToken>,
}

impl MockTokenSource {
    pub fn new(tokens: Vec<WordToken>) -> Self {
        Self { tokens }
    }
}

impl TokenSource for MockTokenSource {
    fn tokenize(&self, _document: &[u8]) -> Result<Vec<WordToken>, SourceError> {
        Ok(self.tokens.clone())
    }
}
