use serenity::all::{ApplicationId, Http};
use std::sync::Arc;

use interaction_relay::{
    Client, build_router,
    controller::discord::register_interactions,
    shared::middleware::discord_validation::Ed25519Authenticator,
    shared::structs::config::{Configuration, LogFormat},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Configuration::load_from_config_file()?;
    initialize_tracing(&config);

    let http = Arc::new(Http::new(&config.bot_token));
    http.set_application_id(ApplicationId::new(config.application_id));

    let authenticator = Ed25519Authenticator::from_hex(&config.public_key)?;
    let client = register_interactions(Client::builder(http, authenticator)).build();
    let app = build_router(client, &config.interaction_endpoint);

    let server_bind_point = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&server_bind_point).await?;
    tracing::info!(
        "Serving interactions on {}{}",
        &server_bind_point,
        &config.interaction_endpoint
    );
    axum::serve(listener, app).await?;

    Ok(())
}

fn initialize_tracing(config: &Configuration) {
    let builder = tracing_subscriber::FmtSubscriber::builder().with_max_level(config.tracing_level());

    let result = match config.log_format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };

    if let Err(e) = result {
        eprintln!(
            "Initialization of tracing subscriber failed with error: {}",
            e
        );
    }
}
