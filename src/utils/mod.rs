//! Helpers shared by the collectors and the binary.
//!
//! ## Components
//!
//! - **Compression**: batched, multi-threaded ZIP archive creation
//! - **Time**: timestamp parsing and calendar windows
//! - **Summary**: JSON report of a collection run
//!
//! ### Creating a ZIP Archive
//!
//! ```no_run
//! use logsnap::utils::compress::zip_directory;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let stats = zip_directory(Path::new("/tmp/collected"), Path::new("/tmp/snap.zip"), None)?;
//! println!("Created archive with {} entries", stats.entries);
//! # Ok(())
//! # }
//! ```

/// Collection summary generation
pub mod summary;

/// Concurrent ZIP archive creation
pub mod compress;

/// Timestamp parsing and time windows
pub mod time;
