use serenity::all::Message;

use crate::shared::structs::discord::interaction::{
    CommandInteraction, ComponentInteraction, Interaction,
};
use crate::shared::structs::discord::response::{InteractionResponse, MessageData, ModalData};

// The webhook answer is a bare 204, so the visible reply always goes through
// the interaction callback and webhook endpoints.
impl<D> Interaction<D> {
    pub async fn respond(&self, response: &InteractionResponse) -> anyhow::Result<()> {
        let client = self.client()?;
        client
            .http()
            .create_interaction_response(self.id, &self.token, response, Vec::new())
            .await?;
        Ok(())
    }

    /// Shows a "thinking" state; finish it with [`Self::edit_reply`].
    pub async fn defer(&self, ephemeral: bool) -> anyhow::Result<()> {
        self.respond(&InteractionResponse::deferred(ephemeral)).await
    }

    pub async fn send_reply(&self, data: MessageData) -> anyhow::Result<()> {
        self.respond(&InteractionResponse::message(data)).await
    }

    pub async fn edit_reply(&self, data: MessageData) -> anyhow::Result<Message> {
        let client = self.client()?;
        let message = client
            .http()
            .edit_original_interaction_response(&self.token, &data, Vec::new())
            .await?;
        Ok(message)
    }

    pub async fn delete_reply(&self) -> anyhow::Result<()> {
        let client = self.client()?;
        client
            .http()
            .delete_original_interaction_response(&self.token)
            .await?;
        Ok(())
    }

    pub async fn send_followup(&self, data: MessageData) -> anyhow::Result<Message> {
        let client = self.client()?;
        let message = client
            .http()
            .create_followup_message(&self.token, &data, Vec::new())
            .await?;
        Ok(message)
    }
}

impl ComponentInteraction {
    /// Acknowledges the click without changing the message yet.
    pub async fn defer_update(&self) -> anyhow::Result<()> {
        self.respond(&InteractionResponse::deferred_update()).await
    }

    pub async fn update_message(&self, data: MessageData) -> anyhow::Result<()> {
        self.respond(&InteractionResponse::update(data)).await
    }

    pub async fn show_modal(&self, modal: ModalData) -> anyhow::Result<()> {
        self.respond(&InteractionResponse::modal(modal)).await
    }
}

impl CommandInteraction {
    pub async fn show_modal(&self, modal: ModalData) -> anyhow::Result<()> {
        self.respond(&InteractionResponse::modal(modal)).await
    }
}
