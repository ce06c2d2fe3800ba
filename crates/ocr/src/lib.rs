pub mod canonical;
pub mod cluster;
pub mod due_date;
pub mod fields;
pub mod items;
pub mod pipeline;
pub mod source;
pub mod types;

pub use canonical::{CanonRule, Canonicalizer};
pub use cluster::cluster_lines;
pub use pipeline::{InvoicePipeline, PipelineError};
pub use source::{JsonTokenSource, MockTokenSource, SourceError, TokenSource};
pub use types::{Candidate, Classification, Line, WordToken};
