//! ttyclip entry point.

mod args;
mod driver;

use clap::Parser;
use tracing::error;
use ttyclip_core::session::SessionConfig;

use crate::args::Cli;

fn main() {
    // Initialize tracing. Stdout is reserved for clipboard contents, so all
    // diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let payload = match driver::tty::read_piped_payload() {
        Ok(payload) => payload,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    // Usage errors are reported before any session exists.
    let config = match args::build_config(&cli, payload) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    let exit_code = match run_session(config) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

/// Run the session on a tokio runtime and emit the result to stdout.
fn run_session(config: SessionConfig) -> anyhow::Result<i32> {
    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(driver::run(config))?;

    // The raw-mode guard is released by now; stdout is safe to use.
    driver::write_clipboard_output(&outcome, &mut std::io::stdout().lock())?;
    Ok(outcome.exit_code)
}
