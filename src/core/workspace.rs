//! Reusable workspace for minimizer extraction.
//!
//! The workspace pattern avoids repeated allocations in hot loops by
//! providing pre-allocated buffers reused across extraction calls.

use std::collections::VecDeque;

use crate::constants::DEFAULT_DEQUE_CAPACITY;

/// Workspace for the minimizer extraction kernel.
///
/// Holds the monotonic deque for the sliding window minimum and the output
/// buffer the extracted fingerprints land in. Reusing a workspace across
/// sequences of a file avoids per-sequence heap allocations.
pub struct MinimizerWorkspace {
    /// Monotonic deque of (k-mer position, canonical hash)
    pub(crate) window: VecDeque<(usize, u64)>,
    /// Output buffer for extracted fingerprints
    pub buffer: Vec<u64>,
}

impl MinimizerWorkspace {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(DEFAULT_DEQUE_CAPACITY),
            buffer: Vec::with_capacity(DEFAULT_DEQUE_CAPACITY),
        }
    }
}

impl Default for MinimizerWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
