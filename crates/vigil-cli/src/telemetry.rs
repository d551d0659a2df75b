//! Tracing subscriber installation for the CLI.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Installs the global tracing subscriber on first call.
///
/// `RUST_LOG` wins when set; otherwise the verbosity flag selects between
/// `info` and `debug`. Repeated calls are no-ops.
pub(crate) fn init(verbose: bool) {
    TELEMETRY_GUARD.get_or_init(|| {
        let fallback = if verbose { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .finish();
        // A pre-installed subscriber (tests, embedding) keeps precedence.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
