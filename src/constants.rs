//! Global constants for logsnap.
//!
//! File-name and line grammars of the built-in log kinds live next to the
//! classifiers that compile them; this module only holds values shared by
//! more than one component.

// Buffer size constants
/// Default buffer size for copy operations (1MB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Read buffer used by the line scanner (256KB)
pub const LINE_READER_BUFFER_SIZE: usize = 256 * 1024;

// Archive constants
/// Upper bound on concurrent archive batches
pub const MAX_ARCHIVE_WORKERS: usize = 100;

/// Deflate level used for archive entries
pub const ARCHIVE_COMPRESSION_LEVEL: i32 = 6;

/// Unix permissions recorded on archive entries
pub const ARCHIVE_ENTRY_PERMISSIONS: u32 = 0o644;

/// Prefix of the final snapshot archive name
pub const ARCHIVE_NAME_PREFIX: &str = "logsnap";

/// Timestamp layout used inside the snapshot archive name
pub const ARCHIVE_NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

// Workspace constants
/// Prefix of per-run temporary directories
pub const TEMP_DIR_PREFIX: &str = "logsnap_";

// Output format constants
/// Timestamp layout of the `# time range:` header line
pub const HEADER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Suffix appended to the current server log when it is written out
pub const OUTPUT_SUFFIX_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

// Configuration constants
/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "logsnap.yaml";

/// Default root under which every application writes its logs
pub const DEFAULT_LOG_ROOT: &str = "~/.local/share";

/// Default directory receiving snapshot archives
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Default relative time span when none is given
pub const DEFAULT_TIME_SPAN: &str = "30m";
