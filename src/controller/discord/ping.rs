use command_macros::command_handler;
use std::time::Instant;

use crate::shared::structs::command::Command;
use crate::shared::structs::discord::interaction::CommandInteraction;
use crate::shared::structs::discord::response::MessageData;

#[command_handler]
pub async fn ping(interaction: CommandInteraction) -> anyhow::Result<()> {
    let start = Instant::now();
    interaction.defer(false).await?;
    let elapsed = start.elapsed();

    interaction
        .edit_reply(MessageData::new().content(format!(
            "Pong! Callback round trip took {} ms.",
            elapsed.as_millis()
        )))
        .await?;

    Ok(())
}

pub fn command() -> Command {
    Command::new("ping", ping_handler())
        .description("Measures the round trip to the platform.")
        .available_in_dm(true)
}
