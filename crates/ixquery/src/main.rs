use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")); // fallback

    // stdout carries query output only
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    info!("logging setup");
    ixquery::cli::start()
}
