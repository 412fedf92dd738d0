//! ZNC log conversion.
//!
//! Converts a flat ZNC 1.4 log directory into the ZNC 1.6 directory hierarchy:
//! case-insensitive duplicates are merged by line timestamp,
//! everything is copied to an all-lowercase output directory,
//! and the output files are then moved into `<user>/<network>/<window>/<date>.log` style paths.

mod config;
mod duplicates;
mod fs_ops;
mod grammar;
mod hierarchy;
mod merge;
mod run;
mod stats;

pub use config::{ConvertArgs, ConvertConfig, LogConvertConfig};
pub use duplicates::{DuplicateGroup, DuplicateReport, ExcessGroup, detect_duplicates};
pub use fs_ops::{copy_metadata, copy_with_metadata, create_dir, list_log_files, move_file};
pub use grammar::{Grammar, GrammarMode, LogDate, ParsedName, SkipReason};
pub use hierarchy::{RearrangeSummary, rearrange};
pub use merge::{MergeSummary, SortedLines, merge_logs, sort_lines};
pub use run::LogConvert;
pub use stats::RunStats;

/// Default log file extension.
pub const DEFAULT_EXTENSION: &str = "log";

/// Default output directory name, relative to the source directory.
pub const DEFAULT_OUTPUT_DIR: &str = "output";
