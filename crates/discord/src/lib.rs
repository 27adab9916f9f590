//! Discord side of courier: the bridge loop between the gateway and the
//! broker, its serenity adapter, and the outbound message splitter.

pub mod bridge;
pub mod client;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod pending;
pub mod register;
pub mod split;

pub use {
    bridge::{Bridge, BridgeConfig, FAILURE_REPLY, TIMEOUT_REPLY},
    client::{ClientOptions, DiscordClient, SerenityGateway},
    error::{Error, Result},
    gateway::{
        Gateway, GatewayEvent, InboundInteraction, InboundMessage, InteractionHandle,
        InteractionReply,
    },
    pending::PendingInteractions,
    split::split,
};
