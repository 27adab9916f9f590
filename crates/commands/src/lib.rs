//! Slash commands: descriptor and locale loading, the command registry, and
//! the handlers the workers run.

pub mod descriptor;
pub mod error;
pub mod handlers;
pub mod locale;
pub mod registry;

pub use {
    descriptor::{CommandDescriptor, load_commands},
    error::{Error, Result},
    handlers::{CommandHandler, HandlerContext, SERVER_ONLY_FALLBACK},
    locale::{LocaleBundle, fill},
    registry::{CommandKind, CommandRegistry},
};
