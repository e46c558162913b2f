use axum::{Router, middleware::from_fn_with_state, routing::post};

use crate::controller::discord::interaction::handle_interaction;
use crate::shared::middleware::discord_validation::validate_interaction;
use crate::shared::structs::client::Client;

pub mod discord;

/// The single interaction endpoint, guarded by signature validation.
pub fn build_router(client: Client, endpoint: &str) -> Router {
    Router::new()
        .route(endpoint, post(handle_interaction))
        .layer(from_fn_with_state(client.clone(), validate_interaction))
        .with_state(client)
}
