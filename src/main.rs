//! mediashrink CLI: `mediashrink webp DIR` or `mediashrink hevc DIR`.

use anyhow::Result;
use clap::Parser;
use mediashrink::RunOutcome;
use mediashrink::engine::arg_parser::Cli;
use mediashrink::engine::handle_run;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> Result<ExitCode> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let outcome = handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    match outcome {
        RunOutcome::NothingToDo => Ok(ExitCode::FAILURE),
        RunOutcome::Finished(_) => Ok(ExitCode::SUCCESS),
    }
}
