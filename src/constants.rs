//! Constants used throughout the taxicf library: build defaults, on-disk
//! format identifiers, and safety limits applied when loading archives.

/// Default minimizer seed, applied after the per-k adjustment
/// `seed >> (64 - 2k)`.
pub const DEFAULT_SEED: u64 = 0x8F3F_73B5_CF1C_9ADE;

pub const DEFAULT_KMER_SIZE: u8 = 19;
pub const DEFAULT_WINDOW_SIZE: u16 = 31;
pub const DEFAULT_MIN_LENGTH: u64 = 0;
pub const DEFAULT_LOAD_FACTOR: f64 = 0.95;
pub const DEFAULT_MODE: &str = "normal";
pub const DEFAULT_TMP_DIR: &str = "tmp";

/// File extension for per-taxid fingerprint spill files.
pub const SPILL_EXTENSION: &str = "mini";

/// Magic bytes and format version of the filter archive.
pub const ARCHIVE_MAGIC: &[u8; 4] = b"TICF";
pub const ARCHIVE_VERSION: u32 = 1;

// Safety limits when loading archives
pub(crate) const MAX_TAXID_LEN: u64 = 10_000; // 10KB per taxid label
pub(crate) const MAX_ARCHIVE_TAXIDS: u64 = 10_000_000;
pub(crate) const MAX_FILTER_SLOTS: u64 = 1 << 36; // 64G tags (~128GB)

// Workspace pre-allocation
pub(crate) const DEFAULT_DEQUE_CAPACITY: usize = 128; // typical window range
