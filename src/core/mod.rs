//! Core data model: the comparison table and its cell values.

pub mod table;

pub use table::{CellValue, ComparisonTable, TableShape};
