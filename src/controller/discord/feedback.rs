use command_macros::command_handler;
use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, CreateInputText, InputTextStyle};
use std::time::Duration;

use crate::shared::error::RendezvousError;
use crate::shared::structs::command::{Command, CommandOptionSpec};
use crate::shared::structs::discord::interaction::{
    AutocompleteInteraction, CommandDataOption, CommandInteraction, ComponentInteraction,
    STRING_OPTION_TYPE,
};
use crate::shared::structs::discord::response::{Choice, MessageData, ModalData};
use crate::shared::utility::new_custom_id;

pub const DISMISS_CUSTOM_ID: &str = "feedback:dismiss";

const FEEDBACK_FIELD: &str = "feedback_body";
const MODAL_TIMEOUT: Duration = Duration::from_secs(300);
const TOPICS: [&str; 6] = [
    "Bugs",
    "Billing",
    "Commands",
    "Documentation",
    "Performance",
    "Other",
];

pub fn suggest_topics(interaction: &AutocompleteInteraction) -> Vec<Choice> {
    let typed = interaction
        .data
        .focused_option()
        .and_then(CommandDataOption::as_str)
        .unwrap_or_default()
        .to_lowercase();

    TOPICS
        .iter()
        .filter(|topic| topic.to_lowercase().contains(&typed))
        .map(|topic| Choice::new(*topic, topic.to_lowercase()))
        .collect()
}

#[command_handler]
pub async fn feedback(interaction: CommandInteraction) -> anyhow::Result<()> {
    let client = interaction.client()?;
    let topic = interaction
        .data
        .option("topic")
        .and_then(CommandDataOption::as_str)
        .unwrap_or("other")
        .to_string();

    let modal_id = new_custom_id("feedback");
    let submission = client.await_modal(&modal_id)?;

    interaction
        .show_modal(ModalData {
            custom_id: modal_id.clone(),
            title: format!("Feedback about {topic}"),
            components: vec![CreateActionRow::InputText(
                CreateInputText::new(InputTextStyle::Paragraph, "Your feedback", FEEDBACK_FIELD)
                    .required(true),
            )],
        })
        .await?;

    let submission = match submission.recv_timeout(MODAL_TIMEOUT).await {
        Ok(submission) => submission,
        Err(RendezvousError::Timeout(_)) => {
            tracing::debug!("Feedback form `{}` was never submitted.", &modal_id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let text = submission.data.field(FEEDBACK_FIELD).unwrap_or_default();
    tracing::info!(
        "Received {} characters of feedback about {} from {:?}.",
        text.chars().count(),
        &topic,
        submission.invoker().map(|user| user.id)
    );

    submission
        .send_reply(
            MessageData::new()
                .content("Thanks, your feedback was recorded.")
                .ephemeral(true)
                .components(vec![CreateActionRow::Buttons(vec![
                    CreateButton::new(DISMISS_CUSTOM_ID)
                        .label("Dismiss")
                        .style(ButtonStyle::Secondary),
                ])]),
        )
        .await?;

    Ok(())
}

pub async fn dismiss(interaction: ComponentInteraction) -> anyhow::Result<()> {
    interaction.defer_update().await?;
    interaction.delete_reply().await?;
    Ok(())
}

pub fn command() -> Command {
    Command::new("feedback", feedback_handler())
        .description("Sends feedback to the bot's maintainers.")
        .option(
            CommandOptionSpec::new("topic", "What your feedback is about", STRING_OPTION_TYPE)
                .required(true)
                .autocomplete(true),
        )
        .autocomplete(suggest_topics)
}
