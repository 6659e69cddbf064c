//! Bin sizing: find the smallest per-bin capacity meeting the target load.
//!
//! The global load for a candidate `bin_size` b is
//! `total / (bin_num(b) * b)` where `bin_num(b) = Σ ceil(count / b)`.
//! The load is monotonically non-increasing in b, so a binary search over
//! `[1, 2 * max_count]` finds the smallest feasible b. Smaller b means more
//! bins holding the same total tag slots, giving finer per-taxid
//! granularity.

use rayon::prelude::*;

use crate::manifest::HashCount;

/// Bin dimensions chosen by the sizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDims {
    pub bins: u64,
    pub bin_size: u64,
}

/// Compute filter dimensions for the finalized hash counts.
///
/// `mode` is accepted for forward compatibility and currently unused.
/// An empty corpus (no taxids, or all counts zero) yields zero bins with
/// `bin_size` defaulting to 1.
pub fn calculate_filter_size(hash_count: &HashCount, load_factor: f64, mode: &str) -> FilterDims {
    let _ = mode;

    let counts: Vec<u64> = hash_count.values().copied().collect();
    let max_count = counts.iter().copied().max().unwrap_or(0);
    let total: u64 = counts.iter().sum();

    if max_count == 0 {
        return FilterDims { bins: 0, bin_size: 1 };
    }

    let mut low = 1u64;
    let mut high = max_count * 2;
    let mut best = FilterDims {
        bins: 0,
        bin_size: high,
    };

    while low <= high {
        let bin_size = low + (high - low) / 2;
        let bin_num: u64 = counts.par_iter().map(|&c| c.div_ceil(bin_size)).sum();
        let load = total as f64 / (bin_num * bin_size) as f64;

        if load > load_factor {
            low = bin_size + 1;
        } else {
            best = FilterDims { bins: bin_num, bin_size };
            if load == load_factor {
                break;
            }
            high = bin_size - 1;
        }
    }

    log::debug!(
        "bin sizing: {} bins of {} tags for {} fingerprints (target load {})",
        best.bins,
        best.bin_size,
        total,
        load_factor
    );
    best
}
