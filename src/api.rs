//! HTTP API: `POST /chat`, the landing page and static assets

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::history::SeedStatus;
use crate::session::ChatSession;
use axum::http::{header, HeaderValue, Method};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ChatSession>,
    pub seed_status: Arc<SeedStatus>,
    pub static_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(session: ChatSession, seed_status: SeedStatus, static_dir: PathBuf) -> Self {
        Self {
            session: Arc::new(session),
            seed_status: Arc::new(seed_status),
            static_dir: Arc::new(static_dir),
        }
    }
}

/// CORS policy admitting browser calls from a single origin
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
