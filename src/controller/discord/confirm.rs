use command_macros::command_handler;
use serenity::all::{ButtonStyle, CreateActionRow, CreateButton};
use std::time::Duration;

use crate::shared::error::RendezvousError;
use crate::shared::structs::command::{Command, CommandOptionSpec};
use crate::shared::structs::discord::interaction::{
    CommandDataOption, CommandInteraction, STRING_OPTION_TYPE,
};
use crate::shared::structs::discord::response::MessageData;
use crate::shared::utility::new_custom_id;

const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_QUESTION: &str = "Are you sure?";

#[command_handler]
pub async fn confirm(interaction: CommandInteraction) -> anyhow::Result<()> {
    let client = interaction.client()?;

    let confirm_id = new_custom_id("confirm");
    let cancel_id = new_custom_id("cancel");
    // Waiters exist before the buttons do, so no click can slip past them.
    let confirmed = client.await_component(&confirm_id)?;
    let cancelled = client.await_component(&cancel_id)?;

    let question = interaction
        .data
        .option("question")
        .and_then(CommandDataOption::as_str)
        .unwrap_or(DEFAULT_QUESTION);

    interaction
        .send_reply(
            MessageData::new()
                .content(question)
                .ephemeral(true)
                .components(vec![buttons(&confirm_id, &cancel_id)]),
        )
        .await?;

    let answer = tokio::select! {
        click = confirmed.recv_timeout(CONFIRMATION_TIMEOUT) => click.map(|click| (true, click)),
        click = cancelled.recv_timeout(CONFIRMATION_TIMEOUT) => click.map(|click| (false, click)),
    };

    match answer {
        Ok((accepted, click)) => {
            let content = if accepted { "Confirmed." } else { "Cancelled." };
            click
                .update_message(MessageData::new().content(content).components(vec![]))
                .await?;
        }
        Err(RendezvousError::Timeout(_)) => {
            interaction
                .edit_reply(
                    MessageData::new()
                        .content("No answer, nothing was done.")
                        .components(vec![]),
                )
                .await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn buttons(confirm_id: &str, cancel_id: &str) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(confirm_id)
            .label("Confirm")
            .style(ButtonStyle::Success),
        CreateButton::new(cancel_id)
            .label("Cancel")
            .style(ButtonStyle::Danger),
    ])
}

pub fn command() -> Command {
    Command::new("confirm", confirm_handler())
        .description("Asks a yes/no question with buttons.")
        .option(CommandOptionSpec::new(
            "question",
            "What to ask",
            STRING_OPTION_TYPE,
        ))
}
