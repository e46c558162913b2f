pub mod error;
pub mod middleware;
pub mod rendezvous;
pub mod structs;
pub mod utility;

pub const DEFAULT_INTERACTION_ENDPOINT: &str = "/api/discord/interaction";

/// Sent when the platform invokes a command missing from the local table,
/// which means the registered commands and this process have drifted apart.
pub const COMMAND_NOT_REGISTERED_MESSAGE: &str = "Oh snap! It looks like you tried to trigger a (/) command which is not registered within local cache. Please report this bug to the bot's maintainers.";
