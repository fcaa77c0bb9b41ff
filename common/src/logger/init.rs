use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, for local runs.
    Pretty,
    /// One JSON object per line, for production log shipping.
    Json,
}

/// Installs the global tracing subscriber. Safe to call more than once;
/// only the first call has an effect.
///
/// The filter is taken from `RUST_LOG` and falls back to `info`.
pub fn init_logger(service_name: &'static str, format: LogFormat) {
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let builder = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_span_events(fmt::format::FmtSpan::CLOSE);

        // try_init: a test harness may already own the global dispatcher.
        let installed = match format {
            LogFormat::Json => builder.json().try_init().is_ok(),
            LogFormat::Pretty => builder.try_init().is_ok(),
        };

        if installed {
            tracing::info!(service = service_name, ?format, "logger initialized");
        }
    });
}
