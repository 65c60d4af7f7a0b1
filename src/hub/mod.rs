//! Client registry, message fan-out and per-client command sessions.

mod command;
mod messages;
mod registry;

pub use command::{CommandSession, DEFAULT_COMMAND_TIMEOUT};
pub use messages::{ClientId, ClientMessage, ServerMessage};
pub use registry::{BroadcastHub, DEFAULT_CLIENT_BUFFER};
