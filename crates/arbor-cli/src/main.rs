use std::process::ExitCode;

use arbor_core::ArborError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod io;
mod output;

fn main() -> ExitCode {
    let cli = args::Cli::parse();
    output::init(cli.json);
    init_tracing(cli.log.as_deref());

    match cmd::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}

/// `--log` wins over `ARBOR_LOG`; logs go to stderr so stdout stays parseable.
fn init_tracing(flag: Option<&str>) {
    let filter = flag
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_env("ARBOR_LOG").ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ArborError>() {
        Some(ArborError::Validation(_)) | Some(ArborError::InvalidArgument(_)) => 2,
        Some(ArborError::NotFound(_)) => 3,
        Some(ArborError::Storage(_)) => 4,
        _ => 1,
    }
}
