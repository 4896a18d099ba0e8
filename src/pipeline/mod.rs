//! Pipeline components: context, tree walks, reporting, and the directory-by-directory driver.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod walk;

pub use context::PipelineContext;
pub use error_handler::{report_skip_stats, report_walk_errors};
pub use orchestrator::{DriverState, PipelineDriver, run_pipeline};
pub use walk::{collect_all, collect_one_level};
