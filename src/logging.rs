//! Tracing subscriber setup.
//!
//! `RUST_LOG` overrides the default filter (`greengrid_sim=info`).

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "greengrid_sim=info";

/// Where log events are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Human-readable lines on stderr.
    Stderr,
    /// Plain lines appended to a file (no ANSI colors).
    File(PathBuf),
    /// Drop everything; used by the dashboard when no log file is given.
    Discard,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// A second call is a no-op.
///
/// # Errors
///
/// Returns an `io::Error` if the log file cannot be opened.
pub fn init(target: &LogTarget) -> io::Result<()> {
    let layer = match target {
        LogTarget::Stderr => fmt::layer().with_writer(io::stderr).boxed(),
        LogTarget::File(path) => {
            let file = File::options().create(true).append(true).open(path)?;
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .boxed()
        }
        LogTarget::Discard => fmt::layer().with_writer(io::sink).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter())
        .with(layer)
        .try_init()
        .ok();
    Ok(())
}
