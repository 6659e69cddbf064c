//! Command-line argument definitions for the taxicf CLI.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "taxicf")]
#[command(about = "Build interleaved cuckoo filters for taxonomic sequence classification")]
#[command(
    long_about = "taxicf builds a compact probabilistic index over reference sequences \
partitioned by taxonomic identifier. Each taxid owns a contiguous range of bins in an \
interleaved cuckoo filter; canonical minimizer fingerprints of the taxid's sequences are \
deposited into those bins, and a downstream query tool tests fingerprints against them.

MANIFEST FORMAT:
  One record per line, two whitespace-separated tokens:
    <file_path> <taxid>
  Malformed lines are counted and skipped. FASTA and FASTQ files are
  supported, gzipped or plain."
)]
#[command(after_help = "EXAMPLES:
  # Build a filter from a manifest
  taxicf build -i refs.tsv -o refs.icf

  # Tighter packing and custom minimizer scheme
  taxicf build -i refs.tsv -o refs.icf -k 21 -w 15 --load-factor 0.9

  # Keys from a TOML file, overridden per run
  taxicf build --config build.toml --threads 8

  # Show what an archive contains
  taxicf inspect refs.icf")]
pub struct Cli {
    /// Enable verbose progress output with timings
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a filter archive from a reference manifest
    Build(BuildArgs),

    /// Print the configuration and taxid layout of a filter archive
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Manifest of `<file_path> <taxid>` records
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output filter archive path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// K-mer size for minimizer computation, in [1, 31]
    #[arg(short = 'k', long)]
    pub kmer_size: Option<u8>,

    /// Window size: number of consecutive k-mers per minimizer window.
    /// Must be at least kmer_size
    #[arg(short = 'w', long)]
    pub window_size: Option<u16>,

    /// Skip sequences shorter than this many bases
    #[arg(long)]
    pub min_length: Option<u64>,

    /// Target global load factor in (0, 1]. Higher packs tighter at the
    /// cost of a higher false-positive rate
    #[arg(short = 'l', long)]
    pub load_factor: Option<f64>,

    /// Sizing mode (reserved; accepted but currently unused)
    #[arg(long)]
    pub mode: Option<String>,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Directory for fingerprint spill files
    #[arg(long)]
    pub tmp_dir: Option<PathBuf>,

    /// TOML config file supplying any of the above keys; explicit flags win
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Filter archive to inspect
    pub archive: PathBuf,
}
