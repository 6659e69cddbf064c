//! Interleaved cuckoo filter.
//!
//! The filter is a single array of 16-bit fingerprint tags, partitioned
//! into `bins` bins of `bin_size` slots each. A fingerprint maps to a
//! nonzero tag and a hash-derived start slot; insertion probes the bin's
//! slots from the start position (wrapping) and claims the first empty slot
//! with a compare-exchange. Queries walk the same probe sequence and stop
//! at the first empty slot.
//!
//! Slots are atomics, so concurrent insertion into disjoint bins is safe:
//! callers partition bins among themselves and need no further locking.
//! Insertion into a bin holding fewer than `bin_size` tags always succeeds;
//! the populator's round-robin placement keeps every bin within that bound.

use anyhow::{Context, Result};
use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU16, Ordering};

use crate::constants::MAX_FILTER_SLOTS;

const EMPTY_TAG: u16 = 0;

/// Filter parameters persisted alongside the filter itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcfConfig {
    pub kmer_size: u8,
    pub window_size: u16,
    pub bins: u64,
    pub bin_size: u64,
}

/// 64-bit finalizer used for tag and slot derivation.
#[inline]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Reduce a fingerprint to its nonzero 16-bit tag.
#[inline]
fn tag_of(fingerprint: u64) -> u16 {
    let tag = (mix64(fingerprint) & 0xFFFF) as u16;
    if tag == EMPTY_TAG {
        1
    } else {
        tag
    }
}

pub struct InterleavedCuckooFilter {
    bins: u64,
    bin_size: u64,
    tags: Vec<AtomicU16>,
}

impl InterleavedCuckooFilter {
    /// Allocate an empty filter of `bins * bin_size` tag slots.
    pub fn new(bins: u64, bin_size: u64) -> Self {
        let slots = (bins * bin_size) as usize;
        let mut tags = Vec::with_capacity(slots);
        tags.resize_with(slots, || AtomicU16::new(EMPTY_TAG));
        Self {
            bins,
            bin_size,
            tags,
        }
    }

    pub fn bins(&self) -> u64 {
        self.bins
    }

    pub fn bin_size(&self) -> u64 {
        self.bin_size
    }

    /// Start slot of a fingerprint's probe sequence within a bin.
    #[inline]
    fn start_slot(&self, fingerprint: u64) -> u64 {
        (mix64(fingerprint) >> 16) % self.bin_size
    }

    /// Insert a fingerprint's tag into a bin.
    ///
    /// Returns false only if every slot of the bin is occupied by a
    /// different tag. Inserting a fingerprint whose tag is already present
    /// in its probe prefix is a no-op (reports success), so duplicate
    /// fingerprints do not consume extra slots.
    ///
    /// Safe to call concurrently for distinct `bin_index` values.
    pub fn insert_tag(&self, bin_index: u64, fingerprint: u64) -> bool {
        debug_assert!(bin_index < self.bins);
        let tag = tag_of(fingerprint);
        let base = bin_index * self.bin_size;
        let start = self.start_slot(fingerprint);

        for probe in 0..self.bin_size {
            let slot = (base + (start + probe) % self.bin_size) as usize;
            match self.tags[slot].compare_exchange(
                EMPTY_TAG,
                tag,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(existing) if existing == tag => return true,
                Err(_) => continue,
            }
        }
        false
    }

    /// Test whether a fingerprint's tag is present in a bin.
    ///
    /// Probabilistic: tag collisions within a bin yield false positives,
    /// never false negatives for inserted fingerprints.
    pub fn contains(&self, bin_index: u64, fingerprint: u64) -> bool {
        debug_assert!(bin_index < self.bins);
        let tag = tag_of(fingerprint);
        let base = bin_index * self.bin_size;
        let start = self.start_slot(fingerprint);

        for probe in 0..self.bin_size {
            let slot = (base + (start + probe) % self.bin_size) as usize;
            match self.tags[slot].load(Ordering::Relaxed) {
                t if t == tag => return true,
                EMPTY_TAG => return false,
                _ => continue,
            }
        }
        false
    }

    /// Test membership across a contiguous bin range `[start, end)`.
    pub fn contains_in_range(&self, start: u64, end: u64, fingerprint: u64) -> bool {
        (start..end).any(|bin| self.contains(bin, fingerprint))
    }

    /// Number of occupied tag slots.
    pub fn occupied_slots(&self) -> u64 {
        self.tags
            .iter()
            .filter(|slot| slot.load(Ordering::Relaxed) != EMPTY_TAG)
            .count() as u64
    }

    /// Write the filter payload: bins, bin_size, then the tag words.
    pub fn write_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.bins.to_le_bytes())?;
        writer.write_all(&self.bin_size.to_le_bytes())?;

        let mut buf = Vec::with_capacity(8192);
        for slot in &self.tags {
            buf.extend_from_slice(&slot.load(Ordering::Relaxed).to_le_bytes());
            if buf.len() >= 8192 {
                writer.write_all(&buf)?;
                buf.clear();
            }
        }
        if !buf.is_empty() {
            writer.write_all(&buf)?;
        }
        Ok(())
    }

    /// Read a filter payload written by [`write_payload`].
    pub fn read_payload<R: Read>(reader: &mut R) -> Result<Self> {
        let mut word = [0u8; 8];
        reader
            .read_exact(&mut word)
            .context("failed to read filter bin count")?;
        let bins = u64::from_le_bytes(word);
        reader
            .read_exact(&mut word)
            .context("failed to read filter bin size")?;
        let bin_size = u64::from_le_bytes(word);

        let slots = bins
            .checked_mul(bin_size)
            .filter(|&s| s <= MAX_FILTER_SLOTS)
            .context("filter dimensions exceed the supported size")?;

        let mut tags = Vec::with_capacity(slots as usize);
        let mut tag_word = [0u8; 2];
        for _ in 0..slots {
            reader
                .read_exact(&mut tag_word)
                .context("truncated filter payload")?;
            tags.push(AtomicU16::new(u16::from_le_bytes(tag_word)));
        }

        Ok(Self {
            bins,
            bin_size,
            tags,
        })
    }
}

impl fmt::Display for InterleavedCuckooFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capacity = self.bins * self.bin_size;
        let occupied = self.occupied_slots();
        let load = if capacity == 0 {
            0.0
        } else {
            occupied as f64 / capacity as f64
        };
        write!(
            f,
            "InterleavedCuckooFilter {{ bins: {}, bin_size: {}, occupied: {}/{} ({:.1}%) }}",
            self.bins,
            self.bin_size,
            occupied,
            capacity,
            load * 100.0
        )
    }
}
