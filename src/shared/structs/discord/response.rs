use serde::Serialize;
use serenity::all::{CreateActionRow, CreateEmbed};
use std::collections::HashMap;

use crate::shared::error::DispatchError;

pub const EPHEMERAL_FLAG: u64 = 1 << 6;
pub const MAX_AUTOCOMPLETE_CHOICES: usize = 25;

/// The `type` tag of an interaction response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum ResponseKind {
    Pong = 1,
    Acknowledge = 2,
    ChannelMessage = 3,
    ChannelMessageWithSource = 4,
    DeferredChannelMessageWithSource = 5,
    /// Only valid for component interactions.
    DeferredUpdateMessage = 6,
    /// Only valid for component interactions.
    UpdateMessage = 7,
    Autocomplete = 8,
    /// Not available for modal submissions and pings.
    Modal = 9,
}

impl From<ResponseKind> for u8 {
    fn from(kind: ResponseKind) -> Self {
        kind as u8
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    pub r#type: ResponseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Message(MessageData),
    Autocomplete(AutocompleteData),
    Modal(ModalData),
}

impl InteractionResponse {
    pub fn pong() -> Self {
        InteractionResponse {
            r#type: ResponseKind::Pong,
            data: None,
        }
    }

    pub fn message(data: MessageData) -> Self {
        InteractionResponse {
            r#type: ResponseKind::ChannelMessageWithSource,
            data: Some(ResponseData::Message(data)),
        }
    }

    pub fn deferred(ephemeral: bool) -> Self {
        InteractionResponse {
            r#type: ResponseKind::DeferredChannelMessageWithSource,
            data: ephemeral.then(|| ResponseData::Message(MessageData::new().ephemeral(true))),
        }
    }

    pub fn deferred_update() -> Self {
        InteractionResponse {
            r#type: ResponseKind::DeferredUpdateMessage,
            data: None,
        }
    }

    pub fn update(data: MessageData) -> Self {
        InteractionResponse {
            r#type: ResponseKind::UpdateMessage,
            data: Some(ResponseData::Message(data)),
        }
    }

    pub fn autocomplete(choices: Vec<Choice>) -> Self {
        InteractionResponse {
            r#type: ResponseKind::Autocomplete,
            data: Some(ResponseData::Autocomplete(AutocompleteData { choices })),
        }
    }

    pub fn modal(modal: ModalData) -> Self {
        InteractionResponse {
            r#type: ResponseKind::Modal,
            data: Some(ResponseData::Modal(modal)),
        }
    }

    /// Serializes the response for the wire.
    ///
    /// Non-finite numeric choices and oversized choice lists are rejected
    /// instead of being silently mangled by the encoder.
    pub fn encode(&self) -> Result<Vec<u8>, DispatchError> {
        if let Some(ResponseData::Autocomplete(data)) = &self.data {
            if data.choices.len() > MAX_AUTOCOMPLETE_CHOICES {
                return Err(DispatchError::ApplicationEncoding(format!(
                    "{} autocomplete choices exceed the limit of {}",
                    data.choices.len(),
                    MAX_AUTOCOMPLETE_CHOICES
                )));
            }

            if let Some(choice) = data
                .choices
                .iter()
                .find(|choice| matches!(choice.value, ChoiceValue::Number(n) if !n.is_finite()))
            {
                return Err(DispatchError::ApplicationEncoding(format!(
                    "autocomplete choice `{}` has a non-finite numeric value",
                    choice.name
                )));
            }
        }

        serde_json::to_vec(self).map_err(|e| DispatchError::ApplicationEncoding(e.to_string()))
    }
}

/// Message payload for replies, edits and follow-ups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageData {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<CreateEmbed>>,
    /// `Some(vec![])` clears the components of an edited message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<CreateActionRow>>,
    #[serde(skip_serializing_if = "is_zero")]
    pub flags: u64,
}

fn is_zero(flags: &u64) -> bool {
    *flags == 0
}

impl MessageData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn tts(mut self, tts: bool) -> Self {
        self.tts = tts;
        self
    }

    pub fn embeds(mut self, embeds: Vec<CreateEmbed>) -> Self {
        self.embeds = Some(embeds);
        self
    }

    pub fn components(mut self, components: Vec<CreateActionRow>) -> Self {
        self.components = Some(components);
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        if ephemeral {
            self.flags |= EPHEMERAL_FLAG;
        } else {
            self.flags &= !EPHEMERAL_FLAG;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AutocompleteData {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub name: String,
    pub value: ChoiceValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_localizations: Option<HashMap<String, String>>,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        Choice {
            name: name.into(),
            value: value.into(),
            name_localizations: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    String(String),
    Integer(i64),
    Number(f64),
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        ChoiceValue::String(value.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(value: String) -> Self {
        ChoiceValue::String(value)
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        ChoiceValue::Integer(value)
    }
}

impl From<f64> for ChoiceValue {
    fn from(value: f64) -> Self {
        ChoiceValue::Number(value)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModalData {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<CreateActionRow>,
}
