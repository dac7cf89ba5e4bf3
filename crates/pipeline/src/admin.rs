//! Admin control plane: a closed set of operator commands over the runtime
//! state and the fingerprint store.
//!
//! The channel adapter parses operator input into [`AdminCommand`] and calls
//! [`ControlPlane::dispatch`]; there is no dynamic command registration.

use std::sync::Arc;

use tracing::info;

use tgrelay_store::FingerprintStore;

use crate::runtime::RuntimeState;

/// Operator commands. The name table below is the complete surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Pause,
    Resume,
    Stats,
    ClearDupes,
    Health,
}

/// Static name → command table, single source of truth for parsing and help.
pub const COMMANDS: &[(&str, AdminCommand)] = &[
    ("pause", AdminCommand::Pause),
    ("resume", AdminCommand::Resume),
    ("stats", AdminCommand::Stats),
    ("cleardupes", AdminCommand::ClearDupes),
    ("health", AdminCommand::Health),
];

impl AdminCommand {
    /// Parse an operator message like `/pause` or `/stats@relay_bot`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text
            .trim()
            .strip_prefix('/')?
            .split_whitespace()
            .next()
            .unwrap_or("");
        // Commands in group contexts arrive suffixed with the bot handle.
        let name = word.split('@').next().unwrap_or(word).to_lowercase();
        COMMANDS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, command)| *command)
    }
}

/// Typed surface the operator shim drives.
pub struct ControlPlane {
    state: Arc<RuntimeState>,
    store: Arc<dyn FingerprintStore>,
}

impl ControlPlane {
    #[must_use]
    pub fn new(state: Arc<RuntimeState>, store: Arc<dyn FingerprintStore>) -> Self {
        Self { state, store }
    }

    /// Execute a command and render the operator-facing reply.
    pub async fn dispatch(&self, command: AdminCommand) -> String {
        match command {
            AdminCommand::Pause => {
                self.state.pause();
                info!("relay paused by admin");
                "Relay paused. New posts will be skipped until /resume.".into()
            },
            AdminCommand::Resume => {
                self.state.resume();
                info!("relay resumed by admin");
                "Relay resumed.".into()
            },
            AdminCommand::Stats => {
                let snap = self.state.snapshot();
                format!(
                    "Relay stats\nstate: {}\nforwarded: {}\nduplicates blocked: {}\nskipped: {}\nrate limited: {}\nerrors: {}",
                    if snap.paused { "paused" } else { "running" },
                    snap.forwarded,
                    snap.duplicates_blocked,
                    snap.skipped,
                    snap.rate_limited,
                    snap.errors,
                )
            },
            AdminCommand::ClearDupes => match self.store.clear().await {
                Ok(count) => {
                    info!(count, "fingerprint store cleared by admin");
                    format!("Cleared {count} delivery records.")
                },
                Err(e) => format!("Failed to clear records: {e}"),
            },
            AdminCommand::Health => match self.store.ping().await {
                Ok(()) if self.state.is_ready() => "Healthy: pipeline up, store reachable.".into(),
                Ok(()) => "Degraded: store reachable, pipeline not ready.".into(),
                Err(e) => format!("Unhealthy: store unreachable ({e})."),
            },
        }
    }
}
