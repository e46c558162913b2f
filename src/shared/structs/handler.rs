use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::shared::structs::discord::interaction::{
    AutocompleteInteraction, CommandInteraction, Interaction,
};
use crate::shared::structs::discord::response::Choice;

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Long-lived handler for interactions carrying data `D`.
pub type InteractionHandler<D> = Arc<dyn Fn(Interaction<D>) -> HandlerFuture + Send + Sync>;

pub type CommandHandler = Arc<dyn Fn(CommandInteraction) -> HandlerFuture + Send + Sync>;
pub type AutocompleteHandler = Arc<dyn Fn(&AutocompleteInteraction) -> Vec<Choice> + Send + Sync>;
/// Gate consulted before every resolved command; `false` stops the command.
pub type CommandMiddleware = Arc<dyn Fn(&CommandInteraction) -> bool + Send + Sync>;

pub fn into_interaction_handler<D, F, Fut>(handler: F) -> InteractionHandler<D>
where
    D: 'static,
    F: Fn(Interaction<D>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |interaction: Interaction<D>| -> HandlerFuture {
        Box::pin(handler(interaction))
    })
}

pub fn into_command_handler<F, Fut>(handler: F) -> CommandHandler
where
    F: Fn(CommandInteraction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    into_interaction_handler(handler)
}
