//! Global slash command registration.

use {
    async_trait::async_trait,
    serde_json::Value,
    serenity::http::Http,
    tracing::{debug, info, warn},
};

use crate::{Error, Result};

/// Something that can create (or overwrite) a global slash command.
#[async_trait]
pub trait CommandRegistrar: Send + Sync {
    /// Register one command manifest, returning the registered name.
    async fn register(&self, manifest: &Value) -> Result<String>;
}

#[async_trait]
impl CommandRegistrar for Http {
    async fn register(&self, manifest: &Value) -> Result<String> {
        let command = self
            .create_global_command(manifest)
            .await
            .map_err(|e| Error::discord("register command", e))?;
        Ok(command.name)
    }
}

/// Register every manifest. A failure is logged and does not stop the rest.
/// Returns how many commands were registered.
pub async fn register_all(registrar: &dyn CommandRegistrar, manifests: &[Value]) -> usize {
    let mut registered = 0;
    for manifest in manifests {
        let name = manifest
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>");
        match registrar.register(manifest).await {
            Ok(_) => {
                debug!(command = name, "registered command");
                registered += 1;
            },
            Err(e) => warn!(command = name, error = %e, "failed to register command"),
        }
    }
    info!(registered, total = manifests.len(), "slash commands registered");
    registered
}
