//! Per-taxid fingerprint spill files.
//!
//! A spill file is a headerless concatenation of little-endian u64 words at
//! `<tmp_dir>/<taxid>.mini`. Writers append under a per-taxid lock held by
//! the caller; word order is unspecified and nothing downstream may rely on
//! it. EOF terminates the stream.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::constants::SPILL_EXTENSION;

/// Spill file path for a taxid.
pub fn spill_path(tmp_dir: &Path, taxid: &str) -> PathBuf {
    tmp_dir.join(format!("{}.{}", taxid, SPILL_EXTENSION))
}

/// Append fingerprints to a taxid's spill file, creating it if needed.
///
/// The caller must hold the taxid's spill lock: appends from concurrent
/// tasks must not interleave within a word.
pub fn append_fingerprints(path: &Path, fingerprints: &[u64]) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open spill file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for &fingerprint in fingerprints {
        writer.write_all(&fingerprint.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Sequential reader over a spill file's words.
pub struct SpillReader {
    reader: BufReader<File>,
    path: PathBuf,
}

impl SpillReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open spill file: {}", path.display()))?;
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Read the next fingerprint, or `None` at a clean end of file.
    /// A trailing partial word is an error.
    pub fn next_fingerprint(&mut self) -> Result<Option<u64>> {
        let mut word = [0u8; 8];
        let mut filled = 0;
        while filled < word.len() {
            match self.reader.read(&mut word[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    anyhow::bail!("truncated spill file: {}", self.path.display());
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("failed to read spill file: {}", self.path.display())
                    });
                }
            }
        }
        Ok(Some(u64::from_le_bytes(word)))
    }
}
