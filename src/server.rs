//! Local-network file server for browsing cards.
//!
//! Serves `server.root` (normally the directory holding `data.json` and
//! `images/`) as static files so a tablet on the same network can browse the
//! collection.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/recipes` | The store, as loaded from disk |
//! | `GET`  | `/*` | Files under `server.root` |
//!
//! With `server.no_cache = true` every response carries headers that stop
//! browsers and service workers from keeping stale copies of the store.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "store_unavailable", "message": "..." } }
//! ```

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::config::Config;
use crate::store::{JsonFileStore, RecipeStore, StorePort};

pub const NO_CACHE_CONTROL: &str =
    "no-store, no-cache, must-revalidate, proxy-revalidate, max-age=0";
/// `Expires` set to the Unix epoch.
pub const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Shared application state passed to route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<JsonFileStore>,
}

/// Starts the file server and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(config);

    info!(
        root = %config.server.root.display(),
        no_cache = config.server.no_cache,
        "serving files"
    );
    println!("Recipe cards serving on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes plus the CORS and cache-header layers.
pub fn build_router(config: &Config) -> Router {
    let state = AppState {
        store: Arc::new(JsonFileStore::new(&config.store.path)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(handle_health))
        .route("/api/recipes", get(handle_recipes))
        .fallback_service(ServeDir::new(&config.server.root))
        .with_state(state)
        .layer(cors);

    if !config.server.no_cache {
        return router;
    }
    router
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE_CONTROL),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static(EPOCH_EXPIRES),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn store_unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "store_unavailable".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/recipes ============

/// Reads the store on every request so a running batch's progress shows up
/// without restarting the server.
async fn handle_recipes(State(state): State<AppState>) -> Result<Json<RecipeStore>, AppError> {
    let store = state.store.clone();
    let loaded = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|e| store_unavailable(e.to_string()))?
        .map_err(|e| store_unavailable(format!("{:#}", e)))?;
    Ok(Json(loaded))
}
