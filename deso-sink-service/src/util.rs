// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{io, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels `shutdown_sender` on the first termination signal.
///
/// Failing to install the handlers also cancels it, since the process could not be
/// stopped cleanly otherwise.
pub async fn listen_for_shutdown_signals(shutdown_sender: CancellationToken) {
    match wait_for_shutdown_signal().await {
        Ok(signal) => info!(signal, "shutting down"),
        Err(error) => error!(%error, "failed to listen for shutdown signals"),
    }
    shutdown_sender.cancel();
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix;

    let mut sigint = unix::signal(unix::SignalKind::interrupt())?;
    let mut sigterm = unix::signal(unix::SignalKind::terminate())?;
    let mut sighup = unix::signal(unix::SignalKind::hangup())?;

    let signal = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sighup.recv() => "SIGHUP",
    };
    Ok(signal)
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}

pub fn parse_millis(s: &str) -> Result<Duration, std::num::ParseIntError> {
    Ok(Duration::from_millis(s.parse()?))
}
