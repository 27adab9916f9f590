//! Startup validation of a loaded configuration.
//!
//! Each process role needs a different subset of settings; errors here are
//! fatal and stop the process before it connects to anything.

use secrecy::ExposeSecret;

use crate::{
    error::{Error, Result},
    schema::{CourierConfig, DmPolicy, is_unset},
};

/// Discord caps a single history fetch at 100 messages.
const MAX_HISTORY_LIMIT: u8 = 100;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Which process the config is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Bridge,
    Worker,
    /// Bridge and worker in one process.
    Standalone,
}

impl Role {
    fn runs_bridge(self) -> bool {
        matches!(self, Self::Bridge | Self::Standalone)
    }

    fn runs_worker(self) -> bool {
        matches!(self, Self::Worker | Self::Standalone)
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "discord.token".
    pub path: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Turn error-level diagnostics into a single fatal [`Error`].
    pub fn into_result(self) -> Result<Self> {
        if !self.has_errors() {
            return Ok(self);
        }
        let joined = self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| format!("{}: {}", d.path, d.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Invalid(joined))
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Check `config` for everything `role` needs.
pub fn validate(config: &CourierConfig, role: Role) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.broker.inbox_queue.trim().is_empty() {
        result.push(Severity::Error, "broker.inbox_queue", "must not be empty");
    }
    if config.broker.reply_queue.trim().is_empty() {
        result.push(Severity::Error, "broker.reply_queue", "must not be empty");
    }
    if config.broker.inbox_queue == config.broker.reply_queue {
        result.push(
            Severity::Error,
            "broker.reply_queue",
            "must differ from broker.inbox_queue",
        );
    }

    if role.runs_bridge() {
        if config.discord.usable_token().is_none() {
            result.push(
                Severity::Error,
                "discord.token",
                "DISCORD_APP_TOKEN not set",
            );
        }
        if config.discord.history_limit == 0 || config.discord.history_limit > MAX_HISTORY_LIMIT {
            result.push(
                Severity::Error,
                "discord.history_limit",
                format!("must be between 1 and {MAX_HISTORY_LIMIT}"),
            );
        }
        if config.discord.pending_ttl_secs == 0 {
            result.push(Severity::Error, "discord.pending_ttl_secs", "must be positive");
        } else if config.discord.pending_ttl_secs > 900 {
            result.push(
                Severity::Warning,
                "discord.pending_ttl_secs",
                "exceeds Discord's 15 minute interaction token lifetime",
            );
        }
        if config.discord.sweep_interval_secs == 0 {
            result.push(
                Severity::Error,
                "discord.sweep_interval_secs",
                "must be positive",
            );
        }
        if config.discord.dm_policy == DmPolicy::Open {
            result.push(
                Severity::Info,
                "discord.dm_policy",
                "every direct message will be forwarded to the workers",
            );
        }
    }

    if role.runs_worker() {
        if config.ai.enabled && is_unset(config.ai.api_key.expose_secret()) {
            result.push(
                Severity::Error,
                "ai.api_key",
                "OPENAI_API_KEY environment variable is not set",
            );
        }
        if config.storage.database_url.trim().is_empty() {
            result.push(Severity::Error, "storage.database_url", "must not be empty");
        }
    }

    result
}
