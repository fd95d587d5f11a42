//! Binary crate for the `weather-fusion` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Human-friendly output formatting
//! - Hosting the HTTP forecast endpoint

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

mod cli;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = broken_dotenv(dotenvy::dotenv());

    let cmd = cli::Cli::parse();
    init_logging(cmd.log_json);

    if let Some(e) = dotenv {
        warn!(error = %e, "Failed to load .env file");
    }

    cmd.run().await
}

/// A missing `.env` is fine; an unreadable or malformed one is reported.
fn broken_dotenv(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    result.err().filter(|e| !e.not_found())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dotenv_is_ignored() {
        let missing = Err(dotenvy::Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound)));
        assert!(broken_dotenv(missing).is_none());

        assert!(broken_dotenv(Ok(PathBuf::from(".env"))).is_none());
    }

    #[test]
    fn malformed_dotenv_is_reported() {
        let malformed = Err(dotenvy::Error::LineParse("KEY VALUE".into(), 3));
        assert!(broken_dotenv(malformed).is_some());
    }
}
