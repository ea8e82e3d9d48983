//! Persona chat - a small HTTP backend relaying chat messages to Gemini
//!
//! One conversation thread, seeded from a JSON file at startup, is shared by
//! every request to `POST /chat`.

mod api;
mod config;
mod history;
mod llm;
mod persona;
mod session;

use api::{cors_layer, create_router, AppState};
use axum::http::HeaderValue;
use config::ServerConfig;
use llm::{GeminiService, LoggingService};
use session::ChatSession;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal in production
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persona_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    // Configuration
    let config = ServerConfig::from_env()?;
    if config.llm.api_key.is_none() {
        tracing::warn!("No API key configured. Set API_KEY; chat requests will fail until then.");
    }

    let persona = persona::load_persona(config.persona_path.as_deref());
    let seed = history::load_history(&config.history_path);

    // Initialize LLM client
    let gemini = Arc::new(GeminiService::new(&config.llm)?);
    let llm = Arc::new(LoggingService::new(gemini));
    tracing::info!(
        model = %config.llm.model,
        seed_turns = seed.turns.len(),
        seed = seed.status.label(),
        window = ?config.history_window,
        "Starting chat session"
    );
    let session = ChatSession::new(llm, persona, seed.turns)
        .with_window(config.history_window)
        .with_max_tokens(config.max_output_tokens);

    // Create application state
    let state = AppState::new(session, seed.status, config.static_dir.clone());

    // Create router
    let origin = HeaderValue::from_str(&config.allowed_origin)?;
    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors_layer(origin)),
    );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, origin = %config.allowed_origin, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}
