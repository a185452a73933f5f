use anyhow::Result;
use clap::Parser;
use cma_dash::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.serve || args.json || args.text;

    // The TUI owns the terminal; only the non-interactive modes log.
    if is_non_tui {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
