//! Utility modules for the query cache.

pub mod varint;

// Re-export commonly used types
pub use varint::*;
