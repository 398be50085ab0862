//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. Output always goes to stderr:
//! stdout is reserved for the JSON the commands print, so
//! `ledgerline send ... | jq` works with logging turned up.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directive when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "ledgerline=info,ledgerline_client=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for terminals.
    Pretty,
    /// One JSON object per line for log shippers.
    Json,
}

impl LogFormat {
    /// `"json"` (any case) selects JSON; everything else is pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Initialize the global tracing subscriber. Call once, first thing in
/// `main()`.
///
/// `RUST_LOG` overrides `directive` when set, e.g.
/// `RUST_LOG=ledgerline_client=debug` to see nonce assignment and every
/// state transition.
pub fn init_logging(directive: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .init(),
    }

    tracing::debug!(?format, "logging initialized");
}
