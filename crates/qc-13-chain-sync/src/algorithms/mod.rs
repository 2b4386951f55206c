//! # Algorithms
//!
//! Pure sync algorithms: checkpoint partitioning, download validation and
//! common ancestor search.

pub mod ancestor;
pub mod checkpoints;
pub mod validation;

pub use ancestor::AncestorSearch;
pub use checkpoints::{checkpoint_numbers, partition_into_ranges};
pub use validation::{validate_body, validate_range_headers, validate_receipts};
