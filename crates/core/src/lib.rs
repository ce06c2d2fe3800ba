pub mod amount;
pub mod config;
pub mod invoice;

pub use amount::{format_amount, has_discount_marker, parse_amount};
pub use config::EngineConfig;
pub use invoice::{InvoiceRecord, LineItem};
