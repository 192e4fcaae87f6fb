// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Cross-platform SIGTERM/SIGINT/SIGHUP (Unix) and Ctrl+C (Windows)
//! handling. Receiving any of them cancels the
//! [`docuflow::application::CancellationToken`] threaded through the
//! composition root so in-flight stage handlers and the batch controller
//! get a chance to stop between stages rather than having the process
//! killed out from under them.

use std::future::Future;
use std::pin::Pin;

use docuflow::application::CancellationToken;
use tracing::info;

/// Abstracts over platform signal APIs so [`spawn_signal_listener`] doesn't
/// need `#[cfg]` attributes at every call site.
pub trait SystemSignals: Send + Sync {
    fn wait_for_signal(&self) -> Pin<Box<dyn Future<Output = &'static str> + Send + '_>>;
}

#[cfg(unix)]
pub struct UnixSignalHandler;

#[cfg(unix)]
impl SystemSignals for UnixSignalHandler {
    fn wait_for_signal(&self) -> Pin<Box<dyn Future<Output = &'static str> + Send + '_>> {
        Box::pin(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
            let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

            tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
                _ = sighup.recv() => "SIGHUP",
            }
        })
    }
}

#[cfg(windows)]
pub struct WindowsSignalHandler;

#[cfg(windows)]
impl SystemSignals for WindowsSignalHandler {
    fn wait_for_signal(&self) -> Pin<Box<dyn Future<Output = &'static str> + Send + '_>> {
        Box::pin(async move {
            tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
            "CTRL_C"
        })
    }
}

/// Never completes. Used by tests that need a [`SystemSignals`] but must
/// never actually be cancelled.
pub struct NoOpSignalHandler;

impl SystemSignals for NoOpSignalHandler {
    fn wait_for_signal(&self) -> Pin<Box<dyn Future<Output = &'static str> + Send + '_>> {
        Box::pin(std::future::pending())
    }
}

pub fn create_signal_handler() -> Box<dyn SystemSignals> {
    #[cfg(unix)]
    {
        Box::new(UnixSignalHandler)
    }
    #[cfg(windows)]
    {
        Box::new(WindowsSignalHandler)
    }
    #[cfg(not(any(unix, windows)))]
    {
        Box::new(NoOpSignalHandler)
    }
}

/// Spawns a background task that cancels `token` the first time a shutdown
/// signal arrives, and returns its `JoinHandle` so `main` can let it be
/// dropped on normal exit.
pub fn spawn_signal_listener(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let handler = create_signal_handler();
        let signal_name = handler.wait_for_signal().await;
        info!(signal = signal_name, "received shutdown signal, cancelling in-flight work");
        token.cancel();
    })
}
