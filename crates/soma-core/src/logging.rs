//! tracing-subscriber setup for the embedding shell.
use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,soma_core=debug";

/// Install a global subscriber.  Logs go to `log_file` (appended, no ANSI) when
/// given, otherwise to stderr.  `RUST_LOG` overrides `DEFAULT_FILTER`.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(file)
                        .with_ansi(false),
                )
                .with(filter)
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
    };

    if result.is_ok() {
        tracing::info!("logging initialised (file: {:?})", log_file);
    }
    Ok(())
}
