//! Filter archive serialization.
//!
//! The archive holds four records behind a magic/version header, all
//! little-endian:
//!
//! - Header: magic `TICF`, format version (u32)
//! - Record 0: filter payload (bins, bin_size, tag words)
//! - Record 1: `IcfConfig { kmer_size: u8, window_size: u16, bins: u64, bin_size: u64 }`
//! - Record 2: hash counts as `(taxid, u64)` pairs in the frozen build order
//! - Record 3: taxid bin ends as `(taxid, u64)` pairs in the same order
//!
//! Pair sequences are length-prefixed, as are taxid strings, so the format
//! is self-delimiting. Maps are persisted as ordered sequences to remove
//! any dependence on hash-map iteration order.

use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::constants::{ARCHIVE_MAGIC, ARCHIVE_VERSION, MAX_ARCHIVE_TAXIDS, MAX_TAXID_LEN};
use crate::filter::{IcfConfig, InterleavedCuckooFilter};

/// Contents of a loaded filter archive.
pub struct FilterArchive {
    pub icf: InterleavedCuckooFilter,
    pub config: IcfConfig,
    pub hash_count: Vec<(String, u64)>,
    pub taxid_bins: Vec<(String, u64)>,
}

/// Write the filter archive. Failure to create or write the output is
/// fatal to the build.
///
/// Returns the on-disk size in bytes.
pub fn save_filter(
    path: &Path,
    icf: &InterleavedCuckooFilter,
    config: &IcfConfig,
    hash_count: &[(String, u64)],
    taxid_bins: &[(String, u64)],
) -> Result<u64> {
    let file = File::create(path)
        .with_context(|| format!("failed to create filter archive: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writer.write_all(ARCHIVE_MAGIC)?;
    writer.write_all(&ARCHIVE_VERSION.to_le_bytes())?;

    icf.write_payload(&mut writer)?;

    writer.write_all(&[config.kmer_size])?;
    writer.write_all(&config.window_size.to_le_bytes())?;
    writer.write_all(&config.bins.to_le_bytes())?;
    writer.write_all(&config.bin_size.to_le_bytes())?;

    write_pairs(&mut writer, hash_count)?;
    write_pairs(&mut writer, taxid_bins)?;

    writer
        .flush()
        .with_context(|| format!("failed to write filter archive: {}", path.display()))?;

    let size = std::fs::metadata(path)
        .with_context(|| format!("failed to stat filter archive: {}", path.display()))?
        .len();
    Ok(size)
}

/// Load a filter archive written by [`save_filter`].
pub fn load_filter(path: &Path) -> Result<FilterArchive> {
    let file = File::open(path)
        .with_context(|| format!("failed to open filter archive: {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).context("truncated archive header")?;
    if &magic != ARCHIVE_MAGIC {
        bail!("not a filter archive: {}", path.display());
    }
    let version = read_u32(&mut reader)?;
    if version != ARCHIVE_VERSION {
        bail!(
            "unsupported archive version {} (expected {}): {}",
            version,
            ARCHIVE_VERSION,
            path.display()
        );
    }

    let icf = InterleavedCuckooFilter::read_payload(&mut reader)
        .with_context(|| format!("failed to read filter payload: {}", path.display()))?;

    let mut kmer_size = [0u8; 1];
    reader.read_exact(&mut kmer_size).context("truncated config record")?;
    let mut window = [0u8; 2];
    reader.read_exact(&mut window).context("truncated config record")?;
    let config = IcfConfig {
        kmer_size: kmer_size[0],
        window_size: u16::from_le_bytes(window),
        bins: read_u64(&mut reader)?,
        bin_size: read_u64(&mut reader)?,
    };

    let hash_count = read_pairs(&mut reader).context("failed to read hash counts")?;
    let taxid_bins = read_pairs(&mut reader).context("failed to read taxid bins")?;

    Ok(FilterArchive {
        icf,
        config,
        hash_count,
        taxid_bins,
    })
}

/// Format a byte count the way the build reports archive sizes.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn write_pairs<W: Write>(writer: &mut W, pairs: &[(String, u64)]) -> Result<()> {
    writer.write_all(&(pairs.len() as u64).to_le_bytes())?;
    for (taxid, value) in pairs {
        let bytes = taxid.as_bytes();
        writer.write_all(&(bytes.len() as u64).to_le_bytes())?;
        writer.write_all(bytes)?;
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_pairs<R: Read>(reader: &mut R) -> Result<Vec<(String, u64)>> {
    let len = read_u64(reader)?;
    if len > MAX_ARCHIVE_TAXIDS {
        bail!("implausible taxid count in archive: {}", len);
    }
    let mut pairs = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let name_len = read_u64(reader)?;
        if name_len > MAX_TAXID_LEN {
            bail!("implausible taxid length in archive: {}", name_len);
        }
        let mut name = vec![0u8; name_len as usize];
        reader.read_exact(&mut name).context("truncated taxid record")?;
        let taxid = String::from_utf8(name).map_err(|_| anyhow!("taxid is not valid UTF-8"))?;
        let value = read_u64(reader)?;
        pairs.push((taxid, value));
    }
    Ok(pairs)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut word = [0u8; 4];
    reader.read_exact(&mut word).context("unexpected end of archive")?;
    Ok(u32::from_le_bytes(word))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut word = [0u8; 8];
    reader.read_exact(&mut word).context("unexpected end of archive")?;
    Ok(u64::from_le_bytes(word))
}
