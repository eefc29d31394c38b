// src/extractors/mod.rs
pub mod table;

// Re-export key extraction types for convenience
pub use table::{StatTable, TableExtractor};
