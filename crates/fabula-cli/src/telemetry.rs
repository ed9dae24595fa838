//! Logging initialization.
//!
//! Structured logging with tracing, plain text or JSON, to stderr or a file.

use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

// The guard flushes the file writer on drop, so it lives until exit.
static LOG_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(None);

/// Formatting layer writing to `writer`, JSON or plain text.
fn fmt_layer<S, W>(json_format: bool, ansi: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json_format {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_ansi(ansi).with_writer(writer).boxed()
    }
}

/// Initialize logging on stderr, leaving stdout to command output.
pub fn init_telemetry(log_level: &str, json_format: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(json_format, true, std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Initialize logging with file output.
pub fn init_telemetry_with_file(
    log_level: &str,
    json_format: bool,
    log_file: &std::path::Path,
) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level)?;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(json_format, false, non_blocking))
        .try_init()?;

    if let Ok(mut g) = LOG_GUARD.lock() {
        *g = Some(guard);
    }

    Ok(())
}
