// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Link-state flag and operator interrupt handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared online/offline flag, checked once per sample loop iteration.
/// Starts online.
#[derive(Clone)]
pub struct LinkState {
    online: Arc<AtomicBool>,
}

impl LinkState {
    pub fn new() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// A handle that flips this link's state, decoupled from the state
    /// itself so a watcher task can hold only the toggle half.
    pub fn toggle_handle(&self) -> LinkToggleHandle {
        LinkToggleHandle {
            online: self.online.clone(),
        }
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

/// Flips a [`LinkState`] on or off. Held by the stdin watcher task.
pub struct LinkToggleHandle {
    online: Arc<AtomicBool>,
}

impl LinkToggleHandle {
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Flip the link state, as each stdin line does.
    pub fn toggle(&self) {
        self.online.fetch_xor(true, Ordering::SeqCst);
    }
}

/// Spawn the link-toggle task: each line on stdin flips `link_state`.
/// Reading never blocks the main sample loop since this runs as its own
/// task.
pub fn spawn_stdin_toggle(handle: LinkToggleHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        use tokio::io::{AsyncBufReadExt, BufReader};
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            handle.toggle();
            tracing::debug!("link state toggled");
        }
    })
}

/// Operator shutdown flag, set once by a Ctrl-C handler and observed at
/// per-sample granularity. Reuses the same atomic-flag idiom as
/// [`LinkState`] rather than a channel, since both are single-bit state
/// polled from the hot loop.
#[derive(Clone)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_set(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a Ctrl-C handler that sets `flag`. Mirrors this project's
/// `ctrlc_handler` wiring: a single process-wide handler, set once at
/// startup, racing safely with the main loop via the atomic flag.
pub fn install_interrupt_handler(flag: ShutdownFlag) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, shutting down after the current sample");
        flag.request();
    })
}
