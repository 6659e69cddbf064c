//! Core minimizer algorithms.
//!
//! - 2-bit nucleotide encoding
//! - Canonical minimizer extraction with a monotonic deque
//! - Reusable workspace for avoiding allocations in hot loops

pub mod encoding;
pub mod extraction;
pub mod workspace;

pub use encoding::base_to_bits;
pub use extraction::{adjust_seed, extract_into};
pub use workspace::MinimizerWorkspace;
