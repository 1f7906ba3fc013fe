//! Extraction engine and per-file writer.

pub mod engine;
pub mod quota;
mod writer;

pub use engine::extract;
pub use engine::verify;
pub use quota::QuotaTracker;
