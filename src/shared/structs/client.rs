use serenity::all::{ApplicationId, Http};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::shared::error::RendezvousError;
use crate::shared::middleware::discord_validation::Authenticator;
use crate::shared::rendezvous::{Delivery, RendezvousRegistry, Waiter};
use crate::shared::structs::command::{Command, CommandRegistry};
use crate::shared::structs::discord::interaction::{
    CommandInteraction, ComponentData, ComponentInteraction, Interaction, ModalInteraction,
    ModalSubmitData,
};
use crate::shared::structs::handler::{
    CommandHandler, CommandMiddleware, InteractionHandler, into_command_handler,
    into_interaction_handler,
};

/// Handlers and waiters for one family of custom-id routed interactions.
pub struct CustomIdRoutes<D> {
    handlers: HashMap<String, InteractionHandler<D>>,
    fallback: Option<InteractionHandler<D>>,
    queue: RendezvousRegistry<Interaction<D>>,
}

impl<D> Default for CustomIdRoutes<D> {
    fn default() -> Self {
        CustomIdRoutes {
            handlers: HashMap::new(),
            fallback: None,
            queue: RendezvousRegistry::new(),
        }
    }
}

impl<D> CustomIdRoutes<D> {
    pub fn handler(&self, custom_id: &str) -> Option<&InteractionHandler<D>> {
        self.handlers.get(custom_id)
    }

    pub fn fallback(&self) -> Option<&InteractionHandler<D>> {
        self.fallback.as_ref()
    }

    pub fn deliver(&self, custom_id: &str, interaction: Interaction<D>) -> Delivery<Interaction<D>> {
        self.queue.deliver(custom_id, interaction)
    }

    pub fn pending(&self) -> &RendezvousRegistry<Interaction<D>> {
        &self.queue
    }

    fn wait_for(&self, custom_id: &str) -> Result<Waiter<Interaction<D>>, RendezvousError> {
        if self.handlers.contains_key(custom_id) {
            return Err(RendezvousError::HandlerConflict(custom_id.to_string()));
        }

        self.queue.register(custom_id)
    }
}

struct ClientInner {
    http: Arc<Http>,
    authenticator: Arc<dyn Authenticator>,
    commands: CommandRegistry,
    command_middleware: Option<CommandMiddleware>,
    command_not_found: Option<CommandHandler>,
    components: CustomIdRoutes<ComponentData>,
    modals: CustomIdRoutes<ModalSubmitData>,
}

/// The interaction server instance.
///
/// Handler tables are frozen at [`ClientBuilder::build`]; the only state
/// mutated while serving is the pair of rendezvous registries.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("application_id", &self.application_id())
            .field("commands", &self.inner.commands.len())
            .field("pending_components", &self.inner.components.queue.len())
            .field("pending_modals", &self.inner.modals.queue.len())
            .finish()
    }
}

impl Client {
    pub fn builder(http: Arc<Http>, authenticator: impl Authenticator + 'static) -> ClientBuilder {
        ClientBuilder::new(http, authenticator)
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.inner.http
    }

    pub fn application_id(&self) -> Option<ApplicationId> {
        self.inner.http.application_id()
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.inner.authenticator.as_ref()
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.inner.commands
    }

    pub fn command_middleware(&self) -> Option<&CommandMiddleware> {
        self.inner.command_middleware.as_ref()
    }

    pub fn command_not_found(&self) -> Option<&CommandHandler> {
        self.inner.command_not_found.as_ref()
    }

    pub fn components(&self) -> &CustomIdRoutes<ComponentData> {
        &self.inner.components
    }

    pub fn modals(&self) -> &CustomIdRoutes<ModalSubmitData> {
        &self.inner.modals
    }

    /// Waits for the next component interaction carrying `custom_id`.
    ///
    /// Ids served by a persistent component handler cannot be awaited, and an
    /// id can only have one waiter at a time. Drop the returned waiter (or
    /// let [`Waiter::recv_timeout`] expire) to release the id.
    pub fn await_component(
        &self,
        custom_id: &str,
    ) -> Result<Waiter<ComponentInteraction>, RendezvousError> {
        self.inner.components.wait_for(custom_id)
    }

    /// Waits for the next modal submission carrying `custom_id`.
    pub fn await_modal(&self, custom_id: &str) -> Result<Waiter<ModalInteraction>, RendezvousError> {
        self.inner.modals.wait_for(custom_id)
    }

    pub fn cancel_component(&self, custom_id: &str) -> bool {
        self.inner.components.queue.cancel(custom_id)
    }

    pub fn cancel_modal(&self, custom_id: &str) -> bool {
        self.inner.modals.queue.cancel(custom_id)
    }
}

pub struct ClientBuilder {
    http: Arc<Http>,
    authenticator: Arc<dyn Authenticator>,
    commands: CommandRegistry,
    command_middleware: Option<CommandMiddleware>,
    command_not_found: Option<CommandHandler>,
    components: CustomIdRoutes<ComponentData>,
    modals: CustomIdRoutes<ModalSubmitData>,
}

impl ClientBuilder {
    pub fn new(http: Arc<Http>, authenticator: impl Authenticator + 'static) -> Self {
        ClientBuilder {
            http,
            authenticator: Arc::new(authenticator),
            commands: CommandRegistry::new(),
            command_middleware: None,
            command_not_found: None,
            components: CustomIdRoutes::default(),
            modals: CustomIdRoutes::default(),
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        let name = command.name.clone();
        if self.commands.register(command).is_some() {
            tracing::warn!("Command `{}` was registered twice; keeping the latest.", name);
        }
        self
    }

    /// Persistent handler for every component interaction with `custom_id`.
    pub fn component<F, Fut>(mut self, custom_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ComponentInteraction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.components
            .handlers
            .insert(custom_id.into(), into_interaction_handler(handler));
        self
    }

    /// Persistent handler for every modal submission with `custom_id`.
    pub fn modal<F, Fut>(mut self, custom_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ModalInteraction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.modals
            .handlers
            .insert(custom_id.into(), into_interaction_handler(handler));
        self
    }

    pub fn command_middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(&CommandInteraction) -> bool + Send + Sync + 'static,
    {
        self.command_middleware = Some(Arc::new(middleware));
        self
    }

    /// Observes commands the platform knows about but this process does not.
    pub fn command_not_found<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(CommandInteraction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.command_not_found = Some(into_command_handler(handler));
        self
    }

    /// Catch-all for component interactions nothing else claimed.
    pub fn component_fallback<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ComponentInteraction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.components.fallback = Some(into_interaction_handler(handler));
        self
    }

    /// Catch-all for modal submissions nothing else claimed.
    pub fn modal_fallback<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ModalInteraction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.modals.fallback = Some(into_interaction_handler(handler));
        self
    }

    pub fn build(self) -> Client {
        tracing::debug!(
            "Built interaction client with {} commands, {} component handlers and {} modal handlers.",
            self.commands.len(),
            self.components.handlers.len(),
            self.modals.handlers.len()
        );

        Client {
            inner: Arc::new(ClientInner {
                http: self.http,
                authenticator: self.authenticator,
                commands: self.commands,
                command_middleware: self.command_middleware,
                command_not_found: self.command_not_found,
                components: self.components,
                modals: self.modals,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;

    use super::*;

    struct AcceptAll;

    impl Authenticator for AcceptAll {
        fn verify(&self, _body: &[u8], _headers: &HeaderMap) -> bool {
            true
        }
    }

    fn builder() -> ClientBuilder {
        ClientBuilder::new(Arc::new(Http::new("test-token")), AcceptAll)
    }

    #[tokio::test]
    async fn persistent_handler_blocks_awaiting_same_id() {
        let client = builder()
            .component("dismiss", |_| async { anyhow::Ok(()) })
            .build();

        assert_eq!(
            client.await_component("dismiss").unwrap_err(),
            RendezvousError::HandlerConflict("dismiss".into())
        );
        assert!(client.await_modal("dismiss").is_ok());
    }

    #[tokio::test]
    async fn persistent_modal_handler_blocks_awaiting_same_id() {
        let client = builder()
            .modal("feedback", |_| async { anyhow::Ok(()) })
            .build();

        assert_eq!(
            client.await_modal("feedback").unwrap_err(),
            RendezvousError::HandlerConflict("feedback".into())
        );
        assert!(!client.modals().pending().is_awaiting("feedback"));
        assert!(client.await_component("feedback").is_ok());
    }

    #[tokio::test]
    async fn cancel_releases_awaited_id() {
        let client = builder().build();
        let waiter = client.await_component("confirm").unwrap();

        assert!(client.cancel_component("confirm"));
        assert_eq!(
            waiter.recv().await.unwrap_err(),
            RendezvousError::Cancelled("confirm".into())
        );
        assert!(client.await_component("confirm").is_ok());
    }

    #[test]
    fn component_and_modal_waiters_are_independent() {
        let client = builder().build();
        let _component = client.await_component("shared-id").unwrap();
        let _modal = client.await_modal("shared-id").unwrap();

        assert!(client.components().pending().is_awaiting("shared-id"));
        assert!(client.modals().pending().is_awaiting("shared-id"));
    }
}
