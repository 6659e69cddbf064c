//! End-to-end build pipeline tests: manifest in, loadable archive out.

use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use taxicf::{
    build, extract_into, load_filter, BuildConfig, FilterArchive, MinimizerWorkspace,
};
use taxicf::constants::DEFAULT_SEED;

fn write_fasta(dir: &Path, name: &str, records: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    for (header, seq) in records {
        writeln!(file, ">{}", header).unwrap();
        writeln!(file, "{}", seq).unwrap();
    }
    path
}

fn write_manifest(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("manifest.txt");
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

fn base_config(dir: &TempDir) -> BuildConfig {
    BuildConfig {
        input_file: dir.path().join("manifest.txt"),
        output_file: dir.path().join("out.icf"),
        kmer_size: 4,
        window_size: 5,
        min_length: 10,
        load_factor: 0.5,
        mode: "normal".to_string(),
        threads: 1,
        tmp_dir: dir.path().join("tmp"),
        verbose: false,
    }
}

/// Recompute the fingerprints the kernel yields for a sequence.
fn fingerprints_of(seq: &str, config: &BuildConfig) -> Vec<u64> {
    let mut ws = MinimizerWorkspace::new();
    extract_into(
        seq.as_bytes(),
        config.kmer_size,
        config.window_size,
        DEFAULT_SEED,
        &mut ws,
    );
    let mut out = ws.buffer.clone();
    out.sort_unstable();
    out.dedup();
    out
}

fn bin_range_of<'a>(archive: &'a FilterArchive, taxid: &str) -> (u64, u64) {
    let mut start = 0u64;
    for (name, end) in &archive.taxid_bins {
        if name == taxid {
            return (start, *end);
        }
        start = *end;
    }
    panic!("taxid {} not in archive", taxid);
}

#[test]
fn test_single_taxid_build() -> Result<()> {
    let dir = TempDir::new()?;
    let seq = "ACGTACGGTTCAACGGTTAC"; // 20 bp
    let fasta = write_fasta(dir.path(), "a.fa", &[("seq1", seq)]);
    write_manifest(dir.path(), &[format!("{} t1", fasta.display())]);

    let config = base_config(&dir);
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    let count = archive.hash_count[0].1;
    assert!(count > 0, "a 20 bp sequence must yield fingerprints");
    assert_eq!(archive.hash_count[0].0, "t1");
    assert_eq!(
        archive.config.bins,
        count.div_ceil(archive.config.bin_size)
    );
    assert_eq!(archive.taxid_bins, vec![("t1".to_string(), archive.config.bins)]);
    Ok(())
}

#[test]
fn test_equal_taxids_get_equal_widths() -> Result<()> {
    let dir = TempDir::new()?;
    let seq = "ACGTACGGTTCAACGGTTACAGGTTACAGACCATTGCA";
    let fasta_a = write_fasta(dir.path(), "a.fa", &[("seq", seq)]);
    let fasta_b = write_fasta(dir.path(), "b.fa", &[("seq", seq)]);
    write_manifest(
        dir.path(),
        &[
            format!("{} t1", fasta_a.display()),
            format!("{} t2", fasta_b.display()),
        ],
    );

    let mut config = base_config(&dir);
    config.load_factor = 0.95;
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    let (start1, end1) = bin_range_of(&archive, "t1");
    let (start2, end2) = bin_range_of(&archive, "t2");
    let width = end1 - start1;
    assert!(width > 0);
    assert_eq!(end2 - start2, width);
    assert_eq!(
        archive.taxid_bins,
        vec![("t1".to_string(), width), ("t2".to_string(), 2 * width)]
    );
    Ok(())
}

#[test]
fn test_malformed_manifest_line_does_not_abort() -> Result<()> {
    let dir = TempDir::new()?;
    let seq = "ACGTACGGTTCAACGGTTAC";
    let fasta_a = write_fasta(dir.path(), "a.fa", &[("seq", seq)]);
    let fasta_b = write_fasta(dir.path(), "b.fa", &[("seq", seq)]);
    write_manifest(
        dir.path(),
        &[
            format!("{} t1", fasta_a.display()),
            "just_one_token".to_string(),
            format!("{} t2", fasta_b.display()),
        ],
    );

    let config = base_config(&dir);
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    assert_eq!(archive.taxid_bins.len(), 2);
    Ok(())
}

#[test]
fn test_all_sequences_below_min_length() -> Result<()> {
    let dir = TempDir::new()?;
    let fasta = write_fasta(dir.path(), "a.fa", &[("tiny", "ACGTACG")]);
    write_manifest(dir.path(), &[format!("{} t1", fasta.display())]);

    let mut config = base_config(&dir);
    config.min_length = 100;
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    assert_eq!(archive.hash_count, vec![("t1".to_string(), 0)]);
    assert_eq!(archive.config.bins, 0);
    assert_eq!(archive.taxid_bins, vec![("t1".to_string(), 0)]);
    Ok(())
}

#[test]
fn test_empty_manifest_builds_empty_archive() -> Result<()> {
    let dir = TempDir::new()?;
    write_manifest(dir.path(), &[]);

    let config = base_config(&dir);
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    assert_eq!(archive.config.bins, 0);
    assert!(archive.hash_count.is_empty());
    assert!(archive.taxid_bins.is_empty());
    Ok(())
}

#[test]
fn test_shared_kmers_across_files_counted_per_file() -> Result<()> {
    let dir = TempDir::new()?;
    // Both files hold the same sequence, so their k-mer content overlaps
    // completely
    let seq = "ACGGTTACAGGTTACAGACCATTGCAACGGTATTACCA";
    let fasta_a = write_fasta(dir.path(), "a.fa", &[("seq", seq)]);
    let fasta_b = write_fasta(dir.path(), "b.fa", &[("seq", seq)]);
    write_manifest(
        dir.path(),
        &[
            format!("{} t1", fasta_a.display()),
            format!("{} t1", fasta_b.display()),
        ],
    );

    let mut config = base_config(&dir);
    config.kmer_size = 5;
    config.window_size = 8;
    config.min_length = 0;
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    let per_file = fingerprints_of(seq, &config).len() as u64;
    assert!(per_file > 0);
    // Dedup is per file, not per taxid: the shared k-mers count twice
    assert_eq!(archive.hash_count, vec![("t1".to_string(), 2 * per_file)]);
    Ok(())
}

#[test]
fn test_membership_of_every_extracted_fingerprint() -> Result<()> {
    let dir = TempDir::new()?;
    let seq_t1 = "ACGTACGGTTCAACGGTTACAGGTTACAGACCATTGCA";
    let seq_t2 = "TTGACCATGGCATTGACCAGGCATTAACGGCATTGACA";
    let fasta_a = write_fasta(dir.path(), "a.fa", &[("seq", seq_t1)]);
    let fasta_b = write_fasta(dir.path(), "b.fa", &[("seq", seq_t2)]);
    write_manifest(
        dir.path(),
        &[
            format!("{} t1", fasta_a.display()),
            format!("{} t2", fasta_b.display()),
        ],
    );

    let mut config = base_config(&dir);
    config.threads = 2;
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    for (taxid, seq) in [("t1", seq_t1), ("t2", seq_t2)] {
        let (start, end) = bin_range_of(&archive, taxid);
        for fp in fingerprints_of(seq, &config) {
            assert!(
                archive.icf.contains_in_range(start, end, fp),
                "fingerprint of {} missing from its bin range",
                taxid
            );
        }
    }
    Ok(())
}

#[test]
fn test_spill_files_removed_after_build() -> Result<()> {
    let dir = TempDir::new()?;
    let seq = "ACGTACGGTTCAACGGTTACAGGTTACAG";
    let fasta = write_fasta(dir.path(), "a.fa", &[("seq", seq)]);
    write_manifest(dir.path(), &[format!("{} t1", fasta.display())]);

    let config = base_config(&dir);
    build::run(&config)?;

    let leftovers: Vec<_> = fs::read_dir(&config.tmp_dir)?
        .filter_map(|e| e.ok())
        .collect();
    assert!(
        leftovers.is_empty(),
        "spill files must be deleted: {:?}",
        leftovers
    );
    // The directory itself is left behind
    assert!(config.tmp_dir.is_dir());
    Ok(())
}

#[test]
fn test_rebuild_is_deterministic() -> Result<()> {
    let dir = TempDir::new()?;
    let seq_a = "ACGTACGGTTCAACGGTTACAGGTTACAGACCATTGCA";
    let seq_b = "TTGACCATGGCATTGACCAGGCATTAACGG";
    let fasta_a = write_fasta(dir.path(), "a.fa", &[("seq", seq_a)]);
    let fasta_b = write_fasta(dir.path(), "b.fa", &[("seq", seq_b)]);
    write_manifest(
        dir.path(),
        &[
            format!("{} t1", fasta_a.display()),
            format!("{} t2", fasta_b.display()),
        ],
    );

    let mut first = base_config(&dir);
    first.threads = 2;
    build::run(&first)?;

    let mut second = base_config(&dir);
    second.threads = 2;
    second.output_file = dir.path().join("out2.icf");
    second.tmp_dir = dir.path().join("tmp2");
    build::run(&second)?;

    let archive_a = load_filter(&first.output_file)?;
    let archive_b = load_filter(&second.output_file)?;
    assert_eq!(archive_a.config, archive_b.config);
    assert_eq!(archive_a.hash_count, archive_b.hash_count);
    assert_eq!(archive_a.taxid_bins, archive_b.taxid_bins);

    // Spill order may differ between runs, but membership answers agree
    // for every fingerprint of the inputs
    for (taxid, seq) in [("t1", seq_a), ("t2", seq_b)] {
        let (start, end) = bin_range_of(&archive_a, taxid);
        for fp in fingerprints_of(seq, &first) {
            assert!(archive_a.icf.contains_in_range(start, end, fp));
            assert!(archive_b.icf.contains_in_range(start, end, fp));
        }
    }
    Ok(())
}

#[test]
fn test_layout_invariants_hold() -> Result<()> {
    let dir = TempDir::new()?;
    let sequences = [
        ("t1", "ACGTACGGTTCAACGGTTACAGGTTACAGACCATTGCAACGGTATTACCAGGTAC"),
        ("t2", "TTGACCATGGCATTGACCAGGCATT"),
        ("t3", "GGCATTAACGGCATTGACATTGGCAACCATTGGCAGGTTACAGACC"),
    ];
    let mut lines = Vec::new();
    for (taxid, seq) in &sequences {
        let fasta = write_fasta(dir.path(), &format!("{}.fa", taxid), &[("seq", seq)]);
        lines.push(format!("{} {}", fasta.display(), taxid));
    }
    write_manifest(dir.path(), &lines);

    let mut config = base_config(&dir);
    config.load_factor = 0.8;
    config.min_length = 0;
    config.threads = 2;
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    let bin_size = archive.config.bin_size;

    // Widths are ceil(count / bin_size) and sum to the filter's bin count
    let mut previous_end = 0u64;
    let mut total_width = 0u64;
    for ((taxid, end), (count_taxid, count)) in
        archive.taxid_bins.iter().zip(archive.hash_count.iter())
    {
        assert_eq!(taxid, count_taxid, "records must share the frozen order");
        let width = end - previous_end;
        assert_eq!(width, count.div_ceil(bin_size));
        total_width += width;
        previous_end = *end;
    }
    assert_eq!(total_width, archive.config.bins);
    assert_eq!(previous_end, archive.config.bins);

    // The realized load respects the target, up to one bin of slack per
    // taxid from the ceiling
    let total: u64 = archive.hash_count.iter().map(|(_, c)| c).sum();
    let capacity = archive.config.bins * bin_size;
    assert!(total as f64 <= capacity as f64 * config.load_factor + (bin_size * 3) as f64);
    assert!(total <= capacity);
    Ok(())
}

#[test]
fn test_missing_sequence_file_is_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    let seq = "ACGTACGGTTCAACGGTTACAGGTTACAG";
    let fasta = write_fasta(dir.path(), "a.fa", &[("seq", seq)]);
    write_manifest(
        dir.path(),
        &[
            format!("{} t1", fasta.display()),
            format!("{} t2", dir.path().join("missing.fa").display()),
        ],
    );

    let config = base_config(&dir);
    build::run(&config)?;

    let archive = load_filter(&config.output_file)?;
    let counts: std::collections::HashMap<_, _> = archive.hash_count.iter().cloned().collect();
    assert!(counts["t1"] > 0);
    assert_eq!(counts["t2"], 0);
    Ok(())
}

#[test]
fn test_unwritable_output_is_fatal() -> Result<()> {
    let dir = TempDir::new()?;
    let seq = "ACGTACGGTTCAACGGTTACAGGTTACAG";
    let fasta = write_fasta(dir.path(), "a.fa", &[("seq", seq)]);
    write_manifest(dir.path(), &[format!("{} t1", fasta.display())]);

    let mut config = base_config(&dir);
    config.output_file = dir.path().join("no_such_dir").join("out.icf");
    assert!(build::run(&config).is_err());
    Ok(())
}

#[test]
fn test_missing_manifest_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = base_config(&dir);
    assert!(build::run(&config).is_err());
}
