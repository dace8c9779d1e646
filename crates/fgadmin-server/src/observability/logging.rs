//! Log output driven by the `logging` section of [`ServerConfig`].
//!
//! JSON output writes one object per line:
//!
//! ```json
//! {"timestamp":"...","level":"WARN","fields":{"message":"partition read failed","partition":"role"},"target":"fgadmin_domain::fanout"}
//! ```
//!
//! `RUST_LOG` overrides the configured level when set.
//!
//! [`ServerConfig`]: crate::config::ServerConfig

use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan, MakeWriter},
    prelude::*,
    EnvFilter, Layer, Registry,
};

use crate::config::{ConfigLoadError, LoggingSettings};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Filter from the configured level, overridden by `RUST_LOG`.
pub fn env_filter(settings: &LoggingSettings) -> Result<EnvFilter, ConfigLoadError> {
    let level: LevelFilter = settings
        .level
        .parse()
        .map_err(|_| ConfigLoadError::Invalid {
            message: format!("unknown log level: {}", settings.level),
        })?;
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy())
}

fn output_layer<W>(settings: &LoggingSettings, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let span_events = if settings.spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if settings.json {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_span_events(span_events)
            .with_current_span(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_span_events(span_events)
            .with_target(true)
            .boxed()
    }
}

/// Installs the process-wide subscriber writing to stdout.
///
/// Returns `Ok(false)` when a global subscriber was already installed; the
/// existing one is kept.
pub fn init_logging(settings: &LoggingSettings) -> Result<bool, ConfigLoadError> {
    let filter = env_filter(settings)?;
    let installed = tracing_subscriber::registry()
        .with(output_layer(settings, std::io::stdout))
        .with(filter)
        .try_init()
        .is_ok();
    Ok(installed)
}
