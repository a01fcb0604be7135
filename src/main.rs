//! Entry point for ai, a command-line agent that can call tools exposed by
//! MCP servers.
//!
//! This binary loads environment variables, parses CLI arguments via [`cli`],
//! sets up logging on stderr and hands over to [`cli::run`].

mod agent;
mod cli;
mod config;
mod constants;
mod context;
mod mcp;
mod message;
mod output;
mod provider;
mod session;
mod tools;

use anyhow::Result;

/// Runs the ai CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments and initializes tracing. `RUST_LOG` takes precedence over `-v`.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    cli::run(cli).await
}
