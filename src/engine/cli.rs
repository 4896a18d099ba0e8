//! CLI command handler: merge config file and flags, build the encoder, run the pipeline.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::codec::{Encoder, HevcEncoder, HevcParams, WebpEncoder, WebpParams};
use crate::engine::arg_parser::{Cli, Commands, CommonArgs};
use crate::engine::tools::check_root_and_canonicalize;
use crate::pipeline::PipelineDriver;
use crate::utils::config::PackagePaths;
use crate::utils::mediashrink_toml::{MediashrinkToml, apply_file_to_opts, load_mediashrink_toml};
use crate::utils::setup_logging;
use crate::{Opts, ProgressMode, RunOutcome};

/// Build opts: defaults, then `.mediashrink.toml` in DIR, then CLI flags (CLI wins).
fn setup_opts(common: &CommonArgs, file: Option<&MediashrinkToml>) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    if let Some(n) = common.workers {
        opts.workers = Some(n);
    }
    if let Some(local) = common.local_progress {
        opts.progress = if local {
            ProgressMode::PerDirectory
        } else {
            ProgressMode::Global
        };
    }
    if !common.skip_dir.is_empty() {
        opts.skip_dir_patterns = common.skip_dir.clone();
    }
    if !common.skip_file.is_empty() {
        opts.skip_file_patterns = common.skip_file.clone();
    }
    if let Some(v) = common.follow_links {
        opts.follow_links = v;
    }
    if let Some(v) = common.strict {
        opts.strict = v;
    }
    if let Some(v) = common.verbose {
        opts.verbose = v;
    }
    if let Some(ref p) = common.log_file {
        opts.log_file = Some(p.clone());
    }
    opts
}

/// Encoder for the chosen subcommand; codec settings follow the same file-then-flag order.
fn build_encoder(command: &Commands, file: Option<&MediashrinkToml>) -> Result<Arc<dyn Encoder>> {
    match command {
        Commands::Webp { quality, .. } => {
            let mut params = WebpParams::default();
            if let Some(q) = file.and_then(|f| f.webp.quality) {
                params.quality = q;
            }
            if let Some(q) = *quality {
                params.quality = q;
            }
            Ok(Arc::new(WebpEncoder::new(params)?))
        }
        Commands::Hevc {
            bitrate,
            crf,
            preset,
            software,
            ..
        } => {
            let mut params = HevcParams::default();
            if let Some(section) = file.map(|f| &f.hevc) {
                params.bitrate = section.bitrate.clone();
                params.crf = section.crf;
                params.preset = section.preset.clone();
                params.software = section.software.unwrap_or(false);
            }
            // A rate given on the command line replaces both rate settings from the file.
            if bitrate.is_some() || crf.is_some() {
                params.bitrate = bitrate.clone();
                params.crf = *crf;
            }
            if preset.is_some() {
                params.preset = preset.clone();
            }
            if let Some(v) = *software {
                params.software = v;
            }
            Ok(Arc::new(HevcEncoder::new(params)?))
        }
    }
}

fn install_cancel_handler() -> Result<Arc<AtomicBool>> {
    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    Ok(cancel_requested)
}

/// Run the chosen conversion over DIR. Per-file failures are logged, not returned.
/// DIR is checked before anything is read or written (the default log file lives inside it).
pub fn handle_run(cli: &Cli) -> Result<RunOutcome> {
    let common = cli.command.common();
    let root = check_root_and_canonicalize(&common.dir)?;
    let file = load_mediashrink_toml(&root);
    let opts = setup_opts(common, file.as_ref());
    let encoder = build_encoder(&cli.command, file.as_ref())?;

    let log_path = opts
        .log_file
        .clone()
        .unwrap_or_else(|| root.join(PackagePaths::get().log_filename(encoder.name())));
    setup_logging(opts.verbose, Some(log_path.as_path()))?;
    debug!(
        "{} CONFIG:{:#?}",
        PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );

    let cancel = install_cancel_handler()?;
    run_with_cancel(&root, opts, encoder, cancel)
}

fn run_with_cancel(
    dir: &Path,
    opts: Opts,
    encoder: Arc<dyn Encoder>,
    cancel: Arc<AtomicBool>,
) -> Result<RunOutcome> {
    PipelineDriver::new(encoder, opts)
        .with_cancel(cancel)
        .run(dir)
}
