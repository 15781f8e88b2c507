// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified handling of tracing subscribers for the sink binaries.

use std::{
    env,
    fs::{File, OpenOptions},
    path::Path,
    sync::Arc,
};

use is_terminal::IsTerminal as _;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Format, Full},
        time::FormatTime,
        FormatFields, MakeWriter,
    },
    layer::{Layer, SubscriberExt as _},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Environment variable naming a directory for log files.
pub const LOG_DIR_ENV: &str = "DESO_SINK_LOG_DIR";

/// Initializes tracing in a standard way.
///
/// The environment variables `RUST_LOG`, `RUST_LOG_SPAN_EVENTS`, and `RUST_LOG_FORMAT`
/// control the verbosity, the span event verbosity, and the output format.
///
/// If `DESO_SINK_LOG_DIR` is set, logs are also appended to `<log_name>.log` in
/// that directory. A log file that cannot be opened is reported and skipped.
pub fn init(log_name: &str) {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let span_events = env::var("RUST_LOG_SPAN_EVENTS")
        .ok()
        .map_or(FmtSpan::NONE, |s| fmt_span_from_str(&s));

    let format = env::var("RUST_LOG_FORMAT").ok();
    let color_output =
        !env::var("NO_COLOR").is_ok_and(|x| !x.is_empty()) && std::io::stderr().is_terminal();

    let stderr_layer = prepare_formatted_layer(
        format.as_deref(),
        fmt::layer()
            .with_span_events(span_events.clone())
            .with_writer(std::io::stderr)
            .with_ansi(color_output),
    );

    let (log_file, log_file_error) = match open_log_file(log_name) {
        Ok(file) => (file, None),
        Err(error) => (None, Some(error)),
    };
    let maybe_log_file_layer = log_file.map(|file_writer| {
        prepare_formatted_layer(
            format.as_deref(),
            fmt::layer()
                .with_span_events(span_events)
                .with_writer(Arc::new(file_writer))
                .with_ansi(false),
        )
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(maybe_log_file_layer)
        .with(stderr_layer)
        .init();

    if let Some(error) = log_file_error {
        tracing::warn!(%error, "failed to open the log file; logging to stderr only");
    }
}

/// Opens `<log_name>.log` for appending inside [`LOG_DIR_ENV`], if set.
fn open_log_file(log_name: &str) -> std::io::Result<Option<File>> {
    let Some(log_directory) = env::var_os(LOG_DIR_ENV) else {
        return Ok(None);
    };
    let mut log_file_path = Path::new(&log_directory).join(log_name);
    log_file_path.set_extension("log");
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(log_file_path)?;
    Ok(Some(file))
}

/// Applies a requested `formatting` to the log output of the provided `layer`.
///
/// Unknown formats fall back to `plain`.
fn prepare_formatted_layer<S, N, W, T>(
    formatting: Option<&str>,
    layer: fmt::Layer<S, N, Format<Full, T>, W>,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    N: for<'writer> FormatFields<'writer> + Send + Sync + 'static,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
    T: FormatTime + Send + Sync + 'static,
{
    match formatting.unwrap_or("plain") {
        "json" => layer.json().boxed(),
        "pretty" => layer.pretty().boxed(),
        _ => layer.boxed(),
    }
}

fn fmt_span_from_str(events: &str) -> FmtSpan {
    let mut fmt_span = FmtSpan::NONE;
    for event in events.split(',') {
        fmt_span |= match event.trim() {
            "new" => FmtSpan::NEW,
            "enter" => FmtSpan::ENTER,
            "exit" => FmtSpan::EXIT,
            "close" => FmtSpan::CLOSE,
            "active" => FmtSpan::ACTIVE,
            "full" => FmtSpan::FULL,
            _ => FmtSpan::NONE,
        };
    }
    fmt_span
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::fmt::format::FmtSpan;

    use super::fmt_span_from_str;

    #[test]
    fn test_span_events_are_combined() {
        assert_eq!(fmt_span_from_str("new, close"), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(fmt_span_from_str("bogus"), FmtSpan::NONE);
    }
}
