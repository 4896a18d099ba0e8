pub mod config;
pub mod logger;
pub(crate) mod mediashrink_toml;
pub mod tempfiles;

pub use config::*;
pub use logger::{Colors, setup_logging};
pub use tempfiles::{discard_temp, remove_stale_temp, rename_temp_to_final, temp_path_for};
