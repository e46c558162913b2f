use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::shared::COMMAND_NOT_REGISTERED_MESSAGE;
use crate::shared::error::DispatchError;
use crate::shared::rendezvous::Delivery;
use crate::shared::structs::client::{Client, CustomIdRoutes};
use crate::shared::structs::discord::interaction::{
    AutocompleteInteraction, CommandInteraction, CustomIdentified, DecodedInteraction, Interaction,
    classify,
};
use crate::shared::structs::discord::response::{InteractionResponse, MessageData};
use crate::shared::structs::handler::HandlerFuture;

/// Application work to run once the HTTP answer is settled.
pub struct FollowUp {
    pub label: String,
    pub task: HandlerFuture,
}

impl FollowUp {
    fn new(label: String, task: HandlerFuture) -> Self {
        FollowUp { label, task }
    }
}

/// Result of dispatching one request: the synchronous answer, and possibly a
/// handler that must only start after that answer exists.
pub struct Dispatched {
    pub response: Response,
    pub follow_up: Option<FollowUp>,
}

impl Dispatched {
    fn respond(response: Response) -> Self {
        Dispatched {
            response,
            follow_up: None,
        }
    }

    fn acknowledge(follow_up: Option<FollowUp>) -> Self {
        Dispatched {
            response: StatusCode::NO_CONTENT.into_response(),
            follow_up,
        }
    }
}

pub async fn handle_interaction(State(client): State<Client>, request: Bytes) -> Response {
    match dispatch(&client, &request) {
        Ok(Dispatched {
            response,
            follow_up: Some(follow_up),
        }) => {
            let (parts, body) = response.into_parts();
            let (sent, acknowledged) = oneshot::channel();
            spawn_follow_up(follow_up, acknowledged);
            Response::from_parts(parts, Body::new(AcknowledgedBody::new(body, sent)))
        }
        Ok(Dispatched { response, .. }) => response,
        Err(e) => e.into_response(),
    }
}

/// Response body that signals once the server is done with it, either by
/// reaching the end of the stream or by dropping it after the write.
struct AcknowledgedBody {
    inner: Body,
    sent: Option<oneshot::Sender<()>>,
}

impl AcknowledgedBody {
    fn new(inner: Body, sent: oneshot::Sender<()>) -> Self {
        AcknowledgedBody {
            inner,
            sent: Some(sent),
        }
    }

    fn notify(&mut self) {
        if let Some(sent) = self.sent.take() {
            let _ = sent.send(());
        }
    }
}

impl HttpBody for AcknowledgedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if let Poll::Ready(None) = polled {
            this.notify();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for AcknowledgedBody {
    fn drop(&mut self) {
        self.notify();
    }
}

/// Classifies, decodes and routes one authenticated request body.
///
/// Never waits on application code: handlers are returned as a
/// [`FollowUp`] and rendezvous deliveries do not block.
pub fn dispatch(client: &Client, body: &[u8]) -> Result<Dispatched, DispatchError> {
    let kind = classify(body)?;
    let interaction = DecodedInteraction::decode(kind, body)?;
    tracing::debug!("Received incoming {:?} interaction.", interaction.kind());

    match interaction {
        DecodedInteraction::Ping(_) => Ok(Dispatched::respond(json_response(
            InteractionResponse::pong().encode()?,
        ))),
        DecodedInteraction::Command(interaction) => handle_command(client, interaction),
        DecodedInteraction::Component(interaction) => Ok(route_by_custom_id(
            client,
            client.components(),
            interaction,
            "component",
        )),
        DecodedInteraction::Autocomplete(interaction) => handle_autocomplete(client, interaction),
        DecodedInteraction::ModalSubmit(interaction) => Ok(route_by_custom_id(
            client,
            client.modals(),
            interaction,
            "modal",
        )),
    }
}

fn handle_command(
    client: &Client,
    interaction: CommandInteraction,
) -> Result<Dispatched, DispatchError> {
    let Some((command, mut itx)) = client.commands().resolve(&interaction) else {
        tracing::warn!(
            "Received command `{}` which is not registered locally.",
            &interaction.data.name
        );

        let body = InteractionResponse::message(
            MessageData::new()
                .content(COMMAND_NOT_REGISTERED_MESSAGE)
                .ephemeral(true),
        )
        .encode()?;

        let follow_up = client.command_not_found().map(|hook| {
            let label = format!("unregistered command `{}`", &interaction.data.name);
            let mut interaction = interaction;
            interaction.client = Some(client.clone());
            FollowUp::new(label, hook(interaction))
        });

        return Ok(Dispatched {
            response: json_response(body),
            follow_up,
        });
    };

    if !command.available_in_dm && itx.guild_id.is_none() {
        tracing::debug!("Ignored guild-only command `{}` outside a guild.", &command.name);
        return Ok(Dispatched::acknowledge(None));
    }

    itx.client = Some(client.clone());

    if let Some(middleware) = client.command_middleware()
        && !middleware(&itx)
    {
        tracing::debug!("Command middleware stopped `{}`.", &command.name);
        return Ok(Dispatched::acknowledge(None));
    }

    let label = format!("command `{}`", &command.name);
    Ok(Dispatched::acknowledge(Some(FollowUp::new(
        label,
        (command.handler)(itx),
    ))))
}

fn handle_autocomplete(
    client: &Client,
    interaction: AutocompleteInteraction,
) -> Result<Dispatched, DispatchError> {
    let Some((command, mut itx)) = client.commands().resolve(&interaction) else {
        tracing::debug!(
            "No suggestions for unregistered command `{}`.",
            &interaction.data.name
        );
        return Ok(Dispatched::acknowledge(None));
    };

    let Some(handler) = command.autocomplete.as_ref() else {
        return Ok(Dispatched::acknowledge(None));
    };

    if command.options.is_empty() {
        return Ok(Dispatched::acknowledge(None));
    }

    itx.client = Some(client.clone());
    let choices = handler(&itx);
    let body = InteractionResponse::autocomplete(choices).encode()?;

    Ok(Dispatched::respond(json_response(body)))
}

/// Persistent handler first, then a pending waiter, then the catch-all.
fn route_by_custom_id<D: CustomIdentified>(
    client: &Client,
    routes: &CustomIdRoutes<D>,
    mut itx: Interaction<D>,
    family: &str,
) -> Dispatched {
    itx.client = Some(client.clone());
    let custom_id = itx.data.custom_id().to_string();

    if let Some(handler) = routes.handler(&custom_id) {
        let label = format!("{family} `{custom_id}`");
        return Dispatched::acknowledge(Some(FollowUp::new(label, handler(itx))));
    }

    let itx = match routes.deliver(&custom_id, itx) {
        Delivery::Delivered => {
            tracing::debug!("Delivered {family} `{custom_id}` to its waiter.");
            return Dispatched::acknowledge(None);
        }
        Delivery::Abandoned(itx) => {
            tracing::debug!("Waiter for {family} `{custom_id}` left before delivery.");
            itx
        }
        Delivery::Vacant(itx) => itx,
    };

    match routes.fallback() {
        Some(handler) => {
            let label = format!("{family} fallback for `{custom_id}`");
            Dispatched::acknowledge(Some(FollowUp::new(label, handler(itx))))
        }
        None => {
            tracing::debug!("No handler claimed {family} `{custom_id}`.");
            Dispatched::acknowledge(None)
        }
    }
}

fn json_response(body: Vec<u8>) -> Response {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

/// Runs the handler once the acknowledgement has left the server.
fn spawn_follow_up(follow_up: FollowUp, acknowledged: oneshot::Receiver<()>) {
    let FollowUp { label, task } = follow_up;
    tokio::spawn(async move {
        // A dropped sender also means the response is gone.
        let _ = acknowledged.await;
        if let Err(e) = task.await {
            tracing::error!("Handler for {} failed: {e:?}", &label);
        }
    });
}
