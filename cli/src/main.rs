use std::process::ExitCode;

use clap::Parser;
use unfake_batch::{BatchResult, Dispatcher, Result};

use crate::args::Args;

mod args;

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .format_target(false)
        .parse_default_env()
        .init();

    let outcome = run(&args);
    match &outcome {
        Ok(result) => summarise(result, args.verbose),
        Err(e) => log::error!("{}", e.chain()),
    }
    ExitCode::from(exit_status(&outcome))
}

/// Per-file failures still count as a completed batch; only fatal errors fail the run.
fn exit_status(outcome: &Result<BatchResult>) -> u8 {
    match outcome {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn run(args: &Args) -> Result<BatchResult> {
    let output = args.output_config();
    output.validate()?;
    let options = args.processing_options()?;
    let reducer = args.reducer()?;

    Dispatcher::new(&reducer, &options, &output)
        .jobs(args.jobs())
        .run(&args.input)
}

fn summarise(result: &BatchResult, verbose: bool) {
    if verbose {
        for report in result.reports.iter().filter(|r| !r.is_success()) {
            for error in &report.errors {
                log::debug!("{} [{}]: {:#?}", report.input.display(), error.kind(), error);
            }
        }
    }
    println!(
        "Processed {}/{} file(s) successfully",
        result.succeeded(),
        result.len()
    );
    if result.failed() > 0 {
        println!("{} file(s) failed", result.failed());
    }
}
