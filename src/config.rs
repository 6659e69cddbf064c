//! Build configuration: CLI options, optional TOML companion file, and
//! validation.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_KMER_SIZE, DEFAULT_LOAD_FACTOR, DEFAULT_MIN_LENGTH, DEFAULT_MODE, DEFAULT_TMP_DIR,
    DEFAULT_WINDOW_SIZE,
};

/// Fully resolved build configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub kmer_size: u8,
    pub window_size: u16,
    pub min_length: u64,
    pub load_factor: f64,
    /// Accepted for forward compatibility; currently unused by bin sizing.
    pub mode: String,
    pub threads: usize,
    pub tmp_dir: PathBuf,
    pub verbose: bool,
}

impl BuildConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kmer_size == 0 || self.kmer_size > 31 {
            bail!("kmer_size must be in [1, 31] (got {})", self.kmer_size);
        }
        if self.window_size < self.kmer_size as u16 {
            bail!(
                "window_size must be at least kmer_size (got {} < {})",
                self.window_size,
                self.kmer_size
            );
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            bail!("load_factor must be in (0, 1] (got {})", self.load_factor);
        }
        if self.threads == 0 {
            bail!("threads must be at least 1");
        }
        Ok(())
    }
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "build configuration:")?;
        writeln!(f, "  input:       {}", self.input_file.display())?;
        writeln!(f, "  output:      {}", self.output_file.display())?;
        writeln!(f, "  kmer_size:   {}", self.kmer_size)?;
        writeln!(f, "  window_size: {}", self.window_size)?;
        writeln!(f, "  min_length:  {}", self.min_length)?;
        writeln!(f, "  load_factor: {}", self.load_factor)?;
        writeln!(f, "  mode:        {}", self.mode)?;
        writeln!(f, "  threads:     {}", self.threads)?;
        write!(f, "  tmp_dir:     {}", self.tmp_dir.display())
    }
}

/// Options gathered from the command line. `None` means the flag was not
/// passed and may be supplied by a config file or fall back to a default.
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub kmer_size: Option<u8>,
    pub window_size: Option<u16>,
    pub min_length: Option<u64>,
    pub load_factor: Option<f64>,
    pub mode: Option<String>,
    pub threads: Option<usize>,
    pub tmp_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub verbose: bool,
}

/// TOML companion file carrying the same keys as the CLI flags.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfigFile {
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub kmer_size: Option<u8>,
    pub window_size: Option<u16>,
    pub min_length: Option<u64>,
    pub load_factor: Option<f64>,
    pub mode: Option<String>,
    pub threads: Option<usize>,
    pub tmp_dir: Option<PathBuf>,
}

pub fn parse_config_file(path: &Path) -> Result<BuildConfigFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse TOML config: {}", path.display()))
}

/// Merge CLI options over the config file and defaults, then validate.
///
/// Precedence: explicit CLI flag, then config-file key, then built-in
/// default. `input_file` and `output_file` have no default and must come
/// from one of the first two.
pub fn resolve_build_config(cli: BuildOptions) -> Result<BuildConfig> {
    let file = match &cli.config_file {
        Some(path) => parse_config_file(path)?,
        None => BuildConfigFile::default(),
    };

    let config = BuildConfig {
        input_file: cli
            .input_file
            .or(file.input_file)
            .context("no input manifest given (pass --input or set input_file in the config)")?,
        output_file: cli
            .output_file
            .or(file.output_file)
            .context("no output path given (pass --output or set output_file in the config)")?,
        kmer_size: cli.kmer_size.or(file.kmer_size).unwrap_or(DEFAULT_KMER_SIZE),
        window_size: cli
            .window_size
            .or(file.window_size)
            .unwrap_or(DEFAULT_WINDOW_SIZE),
        min_length: cli.min_length.or(file.min_length).unwrap_or(DEFAULT_MIN_LENGTH),
        load_factor: cli
            .load_factor
            .or(file.load_factor)
            .unwrap_or(DEFAULT_LOAD_FACTOR),
        mode: cli
            .mode
            .or(file.mode)
            .unwrap_or_else(|| DEFAULT_MODE.to_string()),
        threads: cli.threads.or(file.threads).unwrap_or_else(default_threads),
        tmp_dir: cli
            .tmp_dir
            .or(file.tmp_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TMP_DIR)),
        verbose: cli.verbose,
    };

    config.validate()?;
    Ok(config)
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
