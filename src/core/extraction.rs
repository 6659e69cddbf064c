//! Canonical minimizer extraction.
//!
//! The kernel packs each k-mer into two bits per base, takes the canonical
//! value `min(forward ^ seed, reverse_complement ^ seed)`, and selects the
//! minimum over each sliding window of `w` consecutive k-mers using a
//! monotonic deque, for O(n) total work per sequence. Consecutive duplicate
//! minimizers are suppressed; ambiguous bases reset the window.

use super::encoding::base_to_bits;
use super::workspace::MinimizerWorkspace;

/// Adjust the seed for a given k-mer size.
///
/// A k-mer occupies the low `2k` bits, so the seed is shifted down to the
/// same width before it is XORed into k-mer values. `kmer_size` must be in
/// `[1, 31]`.
#[inline]
pub fn adjust_seed(kmer_size: u8, seed: u64) -> u64 {
    seed >> (64 - 2 * kmer_size as u32)
}

/// Extract canonical minimizer fingerprints from a DNA sequence.
///
/// # Arguments
/// * `seq` - DNA sequence as bytes (ACGT, case insensitive)
/// * `kmer_size` - k in `[1, 31]`
/// * `window_size` - number of consecutive k-mers per window; clamped to
///   the number of k-mers in the sequence so that any sequence holding at
///   least one k-mer yields at least one fingerprint
/// * `seed` - raw seed; adjusted internally via [`adjust_seed`]
/// * `ws` - workspace; extracted fingerprints land in `ws.buffer`
///   (cleared before use)
pub fn extract_into(
    seq: &[u8],
    kmer_size: u8,
    window_size: u16,
    seed: u64,
    ws: &mut MinimizerWorkspace,
) {
    ws.buffer.clear();
    ws.window.clear();

    let k = kmer_size as usize;
    let len = seq.len();
    if len < k {
        return;
    }

    let seed = adjust_seed(kmer_size, seed);
    let k_mask = (1u64 << (2 * k)) - 1;
    let rc_shift = 2 * (k - 1) as u32;
    let w = (window_size as usize).min(len - k + 1).max(1);

    let mut fwd: u64 = 0;
    let mut rc: u64 = 0;
    let mut valid_bases = 0usize;
    let mut last_min: Option<u64> = None;

    for (i, &byte) in seq.iter().enumerate() {
        let bits = base_to_bits(byte);

        if bits == u64::MAX {
            // Ambiguous base: restart k-mer and window accumulation
            valid_bases = 0;
            fwd = 0;
            rc = 0;
            ws.window.clear();
            last_min = None;
            continue;
        }

        fwd = ((fwd << 2) | bits) & k_mask;
        rc = (rc >> 2) | ((3 - bits) << rc_shift);
        valid_bases += 1;

        if valid_bases < k {
            continue;
        }

        let pos = i + 1 - k;
        let hash = (fwd ^ seed).min(rc ^ seed);

        while let Some(&(p, _)) = ws.window.front() {
            if p + w <= pos {
                ws.window.pop_front();
            } else {
                break;
            }
        }
        while let Some(&(_, v)) = ws.window.back() {
            if v >= hash {
                ws.window.pop_back();
            } else {
                break;
            }
        }
        ws.window.push_back((pos, hash));

        if valid_bases >= k + w - 1 {
            if let Some(&(_, min_hash)) = ws.window.front() {
                if last_min != Some(min_hash) {
                    ws.buffer.push(min_hash);
                    last_min = Some(min_hash);
                }
            }
        }
    }
}
