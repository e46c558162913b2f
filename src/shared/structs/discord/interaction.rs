use serde::Deserialize;
use serenity::all::{
    ApplicationId, ChannelId, CommandId, GuildId, InteractionId, RoleId, UserId,
};

use crate::shared::error::DispatchError;
use crate::shared::structs::client::Client;

pub const SUB_COMMAND_OPTION_TYPE: u8 = 1;
pub const SUB_COMMAND_GROUP_OPTION_TYPE: u8 = 2;
pub const STRING_OPTION_TYPE: u8 = 3;

/// The `type` discriminant of an inbound interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub enum InteractionKind {
    Ping = 1,
    Command = 2,
    Component = 3,
    Autocomplete = 4,
    ModalSubmit = 5,
}

impl TryFrom<u8> for InteractionKind {
    type Error = DispatchError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(InteractionKind::Ping),
            2 => Ok(InteractionKind::Command),
            3 => Ok(InteractionKind::Component),
            4 => Ok(InteractionKind::Autocomplete),
            5 => Ok(InteractionKind::ModalSubmit),
            other => Err(DispatchError::UnknownInteractionKind(Some(other.into()))),
        }
    }
}

#[derive(Deserialize)]
struct InteractionKindProbe {
    r#type: Option<serde_json::Value>,
}

/// Reads only the `type` field of a raw body.
pub fn classify(body: &[u8]) -> Result<InteractionKind, DispatchError> {
    let probe = serde_json::from_slice::<InteractionKindProbe>(body)?;

    let raw = probe.r#type.as_ref().and_then(serde_json::Value::as_u64);
    match raw.and_then(|t| u8::try_from(t).ok()) {
        Some(t) => InteractionKind::try_from(t).map_err(|_| DispatchError::UnknownInteractionKind(raw)),
        None => Err(DispatchError::UnknownInteractionKind(raw)),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub user: Option<User>,
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    pub permissions: Option<String>,
}

/// A decoded interaction sharing the envelope common to every kind.
///
/// `client` is never part of the payload; the dispatcher attaches the owning
/// [`Client`] before handing the value to application code.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction<D> {
    pub id: InteractionId,
    pub application_id: ApplicationId,
    pub r#type: InteractionKind,
    pub data: D,
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<ChannelId>,
    pub member: Option<Member>,
    pub user: Option<User>,
    /// Continuation token for replying. Not the bot token.
    pub token: String,
    #[serde(default)]
    pub version: u8,
    /// For components, the message they were attached to.
    pub message: Option<serde_json::Value>,
    pub app_permissions: Option<String>,
    pub locale: Option<String>,
    pub guild_locale: Option<String>,
    #[serde(skip)]
    pub client: Option<Client>,
}

impl<D> Interaction<D> {
    /// The user who triggered the interaction, in guilds or in DMs.
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
    }

    pub fn client(&self) -> anyhow::Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Interaction {} is not attached to a client.", self.id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingInteraction {
    pub id: Option<InteractionId>,
    pub application_id: Option<ApplicationId>,
    pub r#type: InteractionKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub id: CommandId,
    pub name: String,
    #[serde(default = "default_command_type")]
    pub r#type: u8,
    #[serde(default)]
    pub options: Vec<CommandDataOption>,
    pub guild_id: Option<GuildId>,
    pub target_id: Option<String>,
}

fn default_command_type() -> u8 {
    1
}

impl CommandData {
    pub fn option(&self, name: &str) -> Option<&CommandDataOption> {
        self.options.iter().find(|option| option.name == name)
    }

    /// The option the user is typing into during autocomplete.
    pub fn focused_option(&self) -> Option<&CommandDataOption> {
        fn search(options: &[CommandDataOption]) -> Option<&CommandDataOption> {
            options
                .iter()
                .find_map(|option| if option.focused { Some(option) } else { search(&option.options) })
        }

        search(&self.options)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandDataOption {
    pub name: String,
    pub r#type: u8,
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub options: Vec<CommandDataOption>,
    #[serde(default)]
    pub focused: bool,
}

impl CommandDataOption {
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentData {
    pub custom_id: String,
    pub component_type: u8,
    /// Selected values of a select menu.
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalSubmitData {
    pub custom_id: String,
    #[serde(default)]
    pub components: Vec<ModalActionRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalActionRow {
    #[serde(default)]
    pub components: Vec<ModalField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalField {
    pub custom_id: String,
    pub r#type: u8,
    pub value: Option<String>,
}

impl ModalSubmitData {
    /// Submitted text of the input whose custom id is `custom_id`.
    pub fn field(&self, custom_id: &str) -> Option<&str> {
        self.components
            .iter()
            .flat_map(|row| row.components.iter())
            .find(|field| field.custom_id == custom_id)
            .and_then(|field| field.value.as_deref())
    }
}

/// Data that can be routed by its custom identifier.
pub trait CustomIdentified {
    fn custom_id(&self) -> &str;
}

impl CustomIdentified for ComponentData {
    fn custom_id(&self) -> &str {
        &self.custom_id
    }
}

impl CustomIdentified for ModalSubmitData {
    fn custom_id(&self) -> &str {
        &self.custom_id
    }
}

pub type CommandInteraction = Interaction<CommandData>;
pub type AutocompleteInteraction = Interaction<CommandData>;
pub type ComponentInteraction = Interaction<ComponentData>;
pub type ModalInteraction = Interaction<ModalSubmitData>;

/// One fully decoded request body.
#[derive(Debug, Clone)]
pub enum DecodedInteraction {
    Ping(PingInteraction),
    Command(CommandInteraction),
    Component(ComponentInteraction),
    Autocomplete(AutocompleteInteraction),
    ModalSubmit(ModalInteraction),
}

impl DecodedInteraction {
    /// Decodes `body` with the decoder selected by `kind`.
    pub fn decode(kind: InteractionKind, body: &[u8]) -> Result<Self, DispatchError> {
        let decoded = match kind {
            InteractionKind::Ping => DecodedInteraction::Ping(serde_json::from_slice(body)?),
            InteractionKind::Command => DecodedInteraction::Command(serde_json::from_slice(body)?),
            InteractionKind::Component => {
                DecodedInteraction::Component(serde_json::from_slice(body)?)
            }
            InteractionKind::Autocomplete => {
                DecodedInteraction::Autocomplete(serde_json::from_slice(body)?)
            }
            InteractionKind::ModalSubmit => {
                DecodedInteraction::ModalSubmit(serde_json::from_slice(body)?)
            }
        };

        Ok(decoded)
    }

    pub fn kind(&self) -> InteractionKind {
        match self {
            DecodedInteraction::Ping(_) => InteractionKind::Ping,
            DecodedInteraction::Command(_) => InteractionKind::Command,
            DecodedInteraction::Component(_) => InteractionKind::Component,
            DecodedInteraction::Autocomplete(_) => InteractionKind::Autocomplete,
            DecodedInteraction::ModalSubmit(_) => InteractionKind::ModalSubmit,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(json!({"type": 1}), InteractionKind::Ping)]
    #[case(json!({"type": 2, "data": "not inspected"}), InteractionKind::Command)]
    #[case(json!({"type": 3}), InteractionKind::Component)]
    #[case(json!({"type": 4}), InteractionKind::Autocomplete)]
    #[case(json!({"type": 5, "token": 12}), InteractionKind::ModalSubmit)]
    fn classifies_known_kinds(#[case] body: serde_json::Value, #[case] expected: InteractionKind) {
        let bytes = serde_json::to_vec(&body).unwrap();
        assert_eq!(classify(&bytes).unwrap(), expected);
    }

    #[rstest]
    #[case(json!({"type": 9}), Some(9))]
    #[case(json!({"type": 300}), Some(300))]
    #[case(json!({"type": "2"}), None)]
    #[case(json!({"id": "1"}), None)]
    fn rejects_unknown_kinds(#[case] body: serde_json::Value, #[case] found: Option<u64>) {
        let bytes = serde_json::to_vec(&body).unwrap();
        match classify(&bytes) {
            Err(DispatchError::UnknownInteractionKind(raw)) => assert_eq!(raw, found),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_json_bodies() {
        assert!(matches!(
            classify(b"{not json"),
            Err(DispatchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn decodes_command_with_nested_options() {
        let body = json!({
            "id": "100",
            "application_id": "200",
            "type": 4,
            "token": "continuation",
            "version": 1,
            "guild_id": "300",
            "member": {"user": {"id": "400", "username": "tester"}, "roles": ["500"]},
            "data": {
                "id": "600",
                "name": "feedback",
                "options": [
                    {"name": "topic", "type": 3, "value": "bu", "focused": true}
                ]
            }
        });
        let bytes = serde_json::to_vec(&body).unwrap();

        let decoded = DecodedInteraction::decode(InteractionKind::Autocomplete, &bytes).unwrap();
        let DecodedInteraction::Autocomplete(interaction) = decoded else {
            panic!("expected an autocomplete interaction");
        };

        assert_eq!(interaction.data.name, "feedback");
        assert_eq!(interaction.data.r#type, 1);
        assert_eq!(interaction.invoker().unwrap().username, "tester");
        assert_eq!(interaction.data.focused_option().unwrap().as_str(), Some("bu"));
        assert!(interaction.client.is_none());
    }

    #[test]
    fn decoder_rejects_structurally_invalid_component() {
        let body = json!({"id": "1", "application_id": "2", "type": 3, "token": "t", "data": {}});
        let bytes = serde_json::to_vec(&body).unwrap();

        assert!(matches!(
            DecodedInteraction::decode(InteractionKind::Component, &bytes),
            Err(DispatchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn looks_up_modal_fields() {
        let data: ModalSubmitData = serde_json::from_value(json!({
            "custom_id": "feedback-form",
            "components": [
                {"type": 1, "components": [{"type": 4, "custom_id": "title", "value": "Great"}]},
                {"type": 1, "components": [{"type": 4, "custom_id": "body", "value": "Works well"}]}
            ]
        }))
        .unwrap();

        assert_eq!(data.custom_id(), "feedback-form");
        assert_eq!(data.field("body"), Some("Works well"));
        assert_eq!(data.field("missing"), None);
    }
}
