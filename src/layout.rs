//! Bin layout: assign each taxid a contiguous range of bin indices.
//!
//! The iteration order of the hash-count map is frozen into a
//! lexicographically sorted vector, per-taxid bin widths are computed in
//! parallel, and exclusive end indices come from a two-pass parallel prefix
//! sum: per-chunk local scans, a sequential scan over chunk totals, then a
//! parallel offset add. The result is identical to a sequential scan.

use rayon::prelude::*;

use crate::manifest::HashCount;

/// Per-taxid exclusive end bin index, in the frozen build order.
///
/// The start bin of entry `i` is the end of entry `i - 1` (0 for the
/// first); the last entry's end equals the filter's total bin count.
pub type TaxidBins = Vec<(String, u64)>;

/// Compute the bin layout for the given counts and per-bin capacity.
///
/// Each taxid's width is `ceil(count / bin_size)`; a taxid with no
/// fingerprints owns zero bins.
pub fn assign_taxid_bins(hash_count: &HashCount, bin_size: u64) -> TaxidBins {
    let mut taxids: Vec<(&str, u64)> = hash_count
        .iter()
        .map(|(taxid, &count)| (taxid.as_str(), count))
        .collect();
    taxids.sort_unstable_by(|a, b| a.0.cmp(b.0));

    if taxids.is_empty() {
        return Vec::new();
    }

    let mut prefix: Vec<u64> = taxids
        .par_iter()
        .map(|&(_, count)| count.div_ceil(bin_size))
        .collect();

    let workers = rayon::current_num_threads().max(1);
    let chunk_len = prefix.len().div_ceil(workers);

    // Pass 1: inclusive scan within each chunk, collecting chunk totals
    let chunk_totals: Vec<u64> = prefix
        .par_chunks_mut(chunk_len)
        .map(|chunk| {
            let mut running = 0u64;
            for width in chunk.iter_mut() {
                running += *width;
                *width = running;
            }
            running
        })
        .collect();

    // Pass 2: exclusive scan over chunk totals
    let mut offsets = vec![0u64; chunk_totals.len()];
    for i in 1..offsets.len() {
        offsets[i] = offsets[i - 1] + chunk_totals[i - 1];
    }

    // Pass 3: shift each chunk by its offset
    prefix
        .par_chunks_mut(chunk_len)
        .zip(offsets.par_iter())
        .for_each(|(chunk, &offset)| {
            for end in chunk.iter_mut() {
                *end += offset;
            }
        });

    taxids
        .into_iter()
        .zip(prefix)
        .map(|((taxid, _), end)| (taxid.to_string(), end))
        .collect()
}

/// Expand a layout into `(taxid, start, end)` triples.
pub fn bin_ranges(taxid_bins: &TaxidBins) -> Vec<(&str, u64, u64)> {
    let mut ranges = Vec::with_capacity(taxid_bins.len());
    let mut previous_end = 0u64;
    for (taxid, end) in taxid_bins {
        ranges.push((taxid.as_str(), previous_end, *end));
        previous_end = *end;
    }
    ranges
}
