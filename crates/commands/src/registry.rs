use std::collections::HashMap;

use {
    courier_config::HandlerSet,
    courier_protocol::InteractionRecord,
    tracing::{info, warn},
};

use crate::{
    descriptor::CommandDescriptor,
    error::{Error, Result},
    handlers::{Allow, CommandHandler, Dedicate, HandlerContext, Help, Settings},
};

/// Every command this crate has a handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Help,
    Allow,
    Settings,
    Dedicate,
}

impl CommandKind {
    pub const ALL: [Self; 4] = [Self::Help, Self::Allow, Self::Settings, Self::Dedicate];

    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Allow => "allow",
            Self::Settings => "settings",
            Self::Dedicate => "dedicate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Commands that need a guild and are refused in direct messages.
    pub fn is_server_only(self) -> bool {
        !matches!(self, Self::Help)
    }

    pub fn enabled_in(self, set: HandlerSet) -> bool {
        match set {
            HandlerSet::Minimal => matches!(self, Self::Help),
            HandlerSet::Full => true,
        }
    }
}

fn set_name(set: HandlerSet) -> &'static str {
    match set {
        HandlerSet::Minimal => "minimal",
        HandlerSet::Full => "full",
    }
}

/// Command name → handler kind, checked against the loaded descriptors at
/// startup.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    descriptors: Vec<CommandDescriptor>,
    kinds: HashMap<String, CommandKind>,
}

impl CommandRegistry {
    pub fn build(descriptors: Vec<CommandDescriptor>, set: HandlerSet) -> Result<Self> {
        let mut kinds = HashMap::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let name = descriptor.name.as_str();
            let kind = CommandKind::from_name(name).ok_or_else(|| Error::NoHandler {
                name: name.to_string(),
            })?;
            if !kind.enabled_in(set) {
                return Err(Error::NotEnabled {
                    name: name.to_string(),
                    set: set_name(set),
                });
            }
            if kinds.insert(name.to_string(), kind).is_some() {
                return Err(Error::Duplicate {
                    name: name.to_string(),
                });
            }
        }

        for kind in CommandKind::ALL {
            if kind.enabled_in(set) && !kinds.contains_key(kind.name()) {
                warn!(command = kind.name(), "handler has no command descriptor");
            }
        }

        info!(
            commands = kinds.len(),
            handler_set = set_name(set),
            "command registry built"
        );
        Ok(Self { descriptors, kinds })
    }

    pub fn resolve(&self, name: &str) -> Option<CommandKind> {
        self.kinds.get(name).copied()
    }

    /// Descriptors in load order.
    pub fn descriptors(&self) -> &[CommandDescriptor] {
        &self.descriptors
    }

    pub fn instantiate(
        kind: CommandKind,
        ctx: HandlerContext,
        interaction: InteractionRecord,
    ) -> Box<dyn CommandHandler> {
        match kind {
            CommandKind::Help => Box::new(Help::new(ctx, interaction)),
            CommandKind::Allow => Box::new(Allow::new(ctx, interaction)),
            CommandKind::Settings => Box::new(Settings::new(ctx, interaction)),
            CommandKind::Dedicate => Box::new(Dedicate::new(ctx, interaction)),
        }
    }
}
