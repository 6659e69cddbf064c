//! Input manifest parsing.
//!
//! A manifest is UTF-8 text with one record per line, each record two
//! whitespace-separated tokens: `<file_path> <taxid>`. Records sharing a
//! taxid accumulate into that taxid's file list. Malformed lines are
//! counted and skipped; only a manifest that cannot be opened aborts the
//! build.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Taxid → ordered reference file paths.
pub type InputManifest = FxHashMap<String, Vec<PathBuf>>;

/// Taxid → deduplicated fingerprint count.
///
/// Counts are per-(taxid, file) distinct sums: two files of the same taxid
/// sharing a k-mer each count it once, so the value is an upper bound on
/// the taxid's distinct fingerprints. Bin sizing relies on this bound.
pub type HashCount = FxHashMap<String, u64>;

/// Counters aggregated across the manifest and extraction phases.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Valid manifest records
    pub file_num: u64,
    /// Malformed manifest lines
    pub invalid_num: u64,
    /// Sequences fed to the extraction kernel
    pub sequence_num: u64,
    /// Sequences skipped for being shorter than `min_length`
    pub skipped_num: u64,
    /// Total base pairs of processed sequences
    pub bp_length: u64,
}

impl FileInfo {
    pub fn merge(&mut self, other: &FileInfo) {
        self.file_num += other.file_num;
        self.invalid_num += other.invalid_num;
        self.sequence_num += other.sequence_num;
        self.skipped_num += other.skipped_num;
        self.bp_length += other.bp_length;
    }
}

/// Parse a manifest file.
///
/// Returns the taxid → files mapping, a hash-count map with every taxid
/// initialized to zero, and the line counters. Blank lines are ignored;
/// one-token lines are counted as invalid and skipped. Tokens past the
/// second are ignored.
pub fn parse_manifest(path: &Path) -> Result<(InputManifest, HashCount, FileInfo)> {
    let file = File::open(path)
        .with_context(|| format!("failed to open manifest: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut input_files = InputManifest::default();
    let mut hash_count = HashCount::default();
    let mut file_info = FileInfo::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(file_path), Some(taxid)) => {
                hash_count.entry(taxid.to_string()).or_insert(0);
                input_files
                    .entry(taxid.to_string())
                    .or_default()
                    .push(PathBuf::from(file_path));
                file_info.file_num += 1;
            }
            _ => {
                log::warn!(
                    "skipping malformed manifest line {}: {:?}",
                    line_no + 1,
                    line
                );
                file_info.invalid_num += 1;
            }
        }
    }

    Ok((input_files, hash_count, file_info))
}
