//! Engine module: per-file conversion, worker pool, progress, stats, and the CLI surface.

pub mod arg_parser;
pub mod cli;
pub mod convert;
pub mod output_paths;
pub mod parallel;
pub mod progress;
pub mod stats;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands, CommonArgs};
pub use cli::handle_run;
pub use convert::{process_file, size_message};
pub use output_paths::{OutputPaths, map_output};
pub use parallel::{Processor, WorkerPool};
pub use progress::{DirectoryProgress, GlobalProgress, ProgressTracker, Tally, tracker_for};
pub use stats::StatsAccumulator;
pub use tools::{PathFilter, SkipPattern, format_size, parse_patterns, should_skip};
