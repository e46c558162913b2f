pub mod confirm;
pub mod feedback;
pub mod interaction;
pub mod ping;

use crate::shared::structs::client::ClientBuilder;
use crate::shared::structs::discord::interaction::ComponentInteraction;

/// Registers the bot's commands and persistent component handlers.
pub fn register_interactions(builder: ClientBuilder) -> ClientBuilder {
    builder
        .command(ping::command())
        .command(confirm::command())
        .command(feedback::command())
        .component(feedback::DISMISS_CUSTOM_ID, feedback::dismiss)
        .component_fallback(acknowledge_stale_component)
}

// Buttons outliving their waiter (e.g. across a restart) would otherwise
// show "interaction failed" to the user.
async fn acknowledge_stale_component(interaction: ComponentInteraction) -> anyhow::Result<()> {
    tracing::debug!(
        "Acknowledging component `{}` nobody is waiting for.",
        &interaction.data.custom_id
    );
    interaction.defer_update().await
}
