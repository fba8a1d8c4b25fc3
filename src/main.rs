//! skd - install agent skills into every AI coding tool you use.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use skill_deck::app::AppContext;
use skill_deck::cli::Cli;
use skill_deck::cli::output::report_error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = AppContext::from_cli(&cli)
        .and_then(|ctx| skill_deck::cli::commands::run(&ctx, &cli.command));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(code = err.code(), error = %err, "Command failed");
            report_error(cli.output_mode(), &err);
            ExitCode::FAILURE
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
const fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,skill_deck=info",
        1 => "info,skill_deck=debug",
        2 => "debug,skill_deck=trace",
        _ => "trace",
    }
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose)));
    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout is reserved for command output in both modes
    if cli.robot {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .without_time()
                    .with_target(cli.verbose > 0)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
