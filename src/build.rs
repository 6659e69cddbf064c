//! Build pipeline orchestration.
//!
//! Phases run strictly in order, each completing before the next begins:
//! manifest parsing, minimizer extraction (spilling per-taxid fingerprints
//! to disk), bin sizing, bin layout, filter population from the spill
//! files, and archive serialization. The orchestrator owns the tmp
//! directory: it is recreated empty at the start of extraction, the
//! populator deletes the spill files inside it, and the directory itself
//! is left behind.

use anyhow::{Context, Result};
use needletail::parse_fastx_file;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use crate::archive::{format_file_size, save_filter};
use crate::config::BuildConfig;
use crate::constants::DEFAULT_SEED;
use crate::core::{extract_into, MinimizerWorkspace};
use crate::filter::{IcfConfig, InterleavedCuckooFilter};
use crate::layout::{assign_taxid_bins, bin_ranges, TaxidBins};
use crate::logging::log_timing;
use crate::manifest::{parse_manifest, FileInfo, HashCount, InputManifest};
use crate::sizing::calculate_filter_size;
use crate::spill::{append_fingerprints, spill_path, SpillReader};

/// Run the full build.
///
/// Only two conditions abort: an unreadable manifest and an unwritable
/// output archive. Every other failure is logged and the build produces a
/// best-effort filter.
pub fn run(config: &BuildConfig) -> Result<()> {
    config.validate()?;
    if config.verbose {
        log::info!("{}", config);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .context("failed to build worker pool")?;
    pool.install(|| run_phases(config))
}

fn run_phases(config: &BuildConfig) -> Result<()> {
    let build_start = Instant::now();

    log::info!("Reading input manifest...");
    let phase_start = Instant::now();
    let (input_files, mut hash_count, mut file_info) = parse_manifest(&config.input_file)?;
    log_timing("Read", phase_start.elapsed().as_millis());

    log::info!("Calculating minimizers...");
    let phase_start = Instant::now();
    create_or_reset_dir(&config.tmp_dir, config.verbose);
    count_minimizers(config, &input_files, &mut hash_count, &mut file_info);
    log_timing("Calculate", phase_start.elapsed().as_millis());
    if config.verbose {
        log::info!("File information:");
        log::info!("  files: {}", file_info.file_num);
        log::info!("  invalid manifest lines: {}", file_info.invalid_num);
        log::info!("  sequences: {}", file_info.sequence_num);
        log::info!("  skipped sequences: {}", file_info.skipped_num);
        log::info!("  total base pairs: {}", file_info.bp_length);
    }

    log::info!("Calculating filter size...");
    let phase_start = Instant::now();
    let dims = calculate_filter_size(&hash_count, config.load_factor, &config.mode);
    let icf_config = IcfConfig {
        kmer_size: config.kmer_size,
        window_size: config.window_size,
        bins: dims.bins,
        bin_size: dims.bin_size,
    };
    log_timing("Calculate filter size", phase_start.elapsed().as_millis());

    log::info!("Creating filter...");
    let phase_start = Instant::now();
    let icf = InterleavedCuckooFilter::new(dims.bins, dims.bin_size);
    let taxid_bins = assign_taxid_bins(&hash_count, dims.bin_size);
    populate_filter(&config.tmp_dir, &taxid_bins, &icf);

    // Persist both maps in the frozen layout order
    let hash_count_ordered: Vec<(String, u64)> = taxid_bins
        .iter()
        .map(|(taxid, _)| (taxid.clone(), hash_count[taxid]))
        .collect();

    let size = save_filter(
        &config.output_file,
        &icf,
        &icf_config,
        &hash_count_ordered,
        &taxid_bins,
    )?;
    println!("Filter file size: {}", format_file_size(size));
    log_timing("Create filter", phase_start.elapsed().as_millis());

    log_timing("Total build", build_start.elapsed().as_millis());
    if config.verbose {
        log::info!("{}", icf);
    }
    Ok(())
}

/// Recreate `dir` as an empty directory.
///
/// Never aborts the build: a leftover directory that cannot be removed is
/// reused, and a non-directory occupant is reported and left alone (spill
/// writes will then fail per file and be skipped).
fn create_or_reset_dir(dir: &Path, verbose: bool) {
    if dir.exists() {
        if dir.is_dir() {
            match fs::remove_dir_all(dir) {
                Ok(()) => {
                    if verbose {
                        log::info!("removed existing tmp directory {}", dir.display());
                    }
                }
                Err(err) => {
                    log::warn!("could not reset tmp directory {}: {}", dir.display(), err);
                }
            }
        } else {
            log::error!(
                "'{}' exists but is not a directory; cannot use it for spill files",
                dir.display()
            );
            return;
        }
    }

    if let Err(err) = fs::create_dir_all(dir) {
        log::warn!("could not create tmp directory {}: {}", dir.display(), err);
    }
}

/// Extraction phase: stream every `(taxid, file)` pair in parallel,
/// deduplicate fingerprints per pair, spill them to the taxid's file, and
/// merge the per-worker counters at the end of the phase.
fn count_minimizers(
    config: &BuildConfig,
    input_files: &InputManifest,
    hash_count: &mut HashCount,
    file_info: &mut FileInfo,
) {
    let pairs: Vec<(&str, &Path)> = input_files
        .iter()
        .flat_map(|(taxid, files)| {
            files
                .iter()
                .map(move |file| (taxid.as_str(), file.as_path()))
        })
        .collect();

    // One lock per taxid: a taxid's spill file may receive appends from
    // several files processed concurrently
    let spill_locks: FxHashMap<&str, Mutex<()>> = input_files
        .keys()
        .map(|taxid| (taxid.as_str(), Mutex::new(())))
        .collect();

    let (local_counts, local_info) = pairs
        .par_iter()
        .fold(
            || (HashCount::default(), FileInfo::default()),
            |(mut counts, mut info), &(taxid, file)| {
                let (fingerprints, stats) = match extract_file_fingerprints(file, config) {
                    Ok(result) => result,
                    Err(err) => {
                        log::warn!("skipping {}: {:#}", file.display(), err);
                        return (counts, info);
                    }
                };
                info.merge(&stats);

                // The count is recorded before the spill write is attempted:
                // a failed append loses tags, not accounting
                *counts.entry(taxid.to_string()).or_insert(0) += fingerprints.len() as u64;

                if !fingerprints.is_empty() {
                    let _guard = spill_locks[taxid].lock().unwrap();
                    let path = spill_path(&config.tmp_dir, taxid);
                    if let Err(err) = append_fingerprints(&path, &fingerprints) {
                        log::warn!(
                            "dropping {} fingerprints for taxid {}: {:#}",
                            fingerprints.len(),
                            taxid,
                            err
                        );
                    }
                }

                (counts, info)
            },
        )
        .reduce(
            || (HashCount::default(), FileInfo::default()),
            |(mut counts_a, mut info_a), (counts_b, info_b)| {
                for (taxid, count) in counts_b {
                    *counts_a.entry(taxid).or_insert(0) += count;
                }
                info_a.merge(&info_b);
                (counts_a, info_a)
            },
        );

    for (taxid, count) in local_counts {
        *hash_count.entry(taxid).or_insert(0) += count;
    }
    file_info.merge(&local_info);
}

/// Extract the deduplicated fingerprints of one reference file.
///
/// Fingerprints are distinct within this `(taxid, file)` task only; the
/// same k-mer seen from two files of one taxid is counted and spilled
/// twice. Sequences shorter than `min_length` are skipped.
fn extract_file_fingerprints(
    path: &Path,
    config: &BuildConfig,
) -> Result<(Vec<u64>, FileInfo)> {
    let mut reader = parse_fastx_file(path)
        .with_context(|| format!("failed to open sequence file: {}", path.display()))?;

    let mut workspace = MinimizerWorkspace::new();
    let mut fingerprints: Vec<u64> = Vec::new();
    let mut stats = FileInfo::default();

    while let Some(record) = reader.next() {
        let record = record
            .with_context(|| format!("invalid record in {}", path.display()))?;
        let seq = record.seq();

        if (seq.len() as u64) < config.min_length {
            stats.skipped_num += 1;
            continue;
        }
        stats.sequence_num += 1;
        stats.bp_length += seq.len() as u64;

        extract_into(
            &seq,
            config.kmer_size,
            config.window_size,
            DEFAULT_SEED,
            &mut workspace,
        );
        fingerprints.extend_from_slice(&workspace.buffer);
    }

    fingerprints.sort_unstable();
    fingerprints.dedup();
    Ok((fingerprints, stats))
}

/// Population phase: stream each taxid's spill file and insert its tags
/// round-robin across the taxid's bin range, deleting the spill afterward.
///
/// Taxids run in parallel; their bin ranges are disjoint, which the filter
/// accepts without locking.
fn populate_filter(tmp_dir: &Path, taxid_bins: &TaxidBins, icf: &InterleavedCuckooFilter) {
    bin_ranges(taxid_bins)
        .par_iter()
        .for_each(|&(taxid, start, end)| {
            if let Err(err) = insert_taxid(tmp_dir, taxid, start, end, icf) {
                log::warn!("leaving bins of taxid {} unpopulated: {:#}", taxid, err);
            }
        });
}

fn insert_taxid(
    tmp_dir: &Path,
    taxid: &str,
    start: u64,
    end: u64,
    icf: &InterleavedCuckooFilter,
) -> Result<()> {
    let path = spill_path(tmp_dir, taxid);

    if start == end {
        // No bins: nothing was spilled for this taxid
        let _ = fs::remove_file(&path);
        return Ok(());
    }

    let mut reader = SpillReader::open(&path)?;
    let mut cursor = start;
    while let Some(fingerprint) = reader.next_fingerprint()? {
        if !icf.insert_tag(cursor, fingerprint) {
            log::warn!("bin {} of taxid {} is saturated; dropping a tag", cursor, taxid);
        }
        cursor += 1;
        if cursor == end {
            cursor = start;
        }
    }
    drop(reader);

    fs::remove_file(&path)
        .with_context(|| format!("failed to remove spill file: {}", path.display()))?;
    Ok(())
}
