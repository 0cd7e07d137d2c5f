//! HTTP surface for the streaming path
//!
//! Routes:
//! - `POST /analyze`: multipart `image` (file), `prompt` (text) and optional
//!   `model` (text). The response is a chunked `text/plain` body holding the
//!   fragments in order with no framing.
//! - `GET /history`: completed streaming exchanges, in order
//! - `GET /history/{index}`: one exchange, 404 if out of range
//!
//! Backend failures never change the status code; they arrive as the final
//! `Error: ...` text of a 200 body.

use crate::analysis::{RequestBuilder, StreamingDelivery};
use crate::config::{Config, ServerConfig};
use crate::error::{Result, VisionChatError};
use crate::history::{HistoryEntry, HistoryStore};
use crate::providers::{create_provider, Provider};

use axum::body::{Body, Bytes};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    delivery: StreamingDelivery,
    builder: RequestBuilder,
    history: Arc<Mutex<HistoryStore>>,
}

impl AppState {
    /// State serving `provider` with `default_model` for requests that name none
    pub fn new(provider: Arc<dyn Provider>, default_model: impl Into<String>) -> Self {
        Self {
            delivery: StreamingDelivery::new(provider),
            builder: RequestBuilder::new(default_model),
            history: Arc::new(Mutex::new(HistoryStore::new())),
        }
    }

    fn history_snapshot(&self) -> Vec<HistoryEntry> {
        match self.history.lock() {
            Ok(history) => history.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    fn history_entry(&self, index: usize) -> std::result::Result<HistoryEntry, VisionChatError> {
        let history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.get(index).cloned()
    }
}

/// Error response: status plus a plain-text message
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<VisionChatError> for ApiError {
    fn from(err: VisionChatError) -> Self {
        let status = match &err {
            VisionChatError::Validation(_) => StatusCode::BAD_REQUEST,
            VisionChatError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/history", get(list_history))
        .route("/history/{index}", get(get_history))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let mut image = Vec::new();
    let mut prompt = String::new();
    let mut model: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => image = field.bytes().await?.to_vec(),
            Some("prompt") => prompt = field.text().await?,
            Some("model") => model = Some(field.text().await?),
            Some(other) => tracing::debug!("Ignoring multipart field {}", other),
            None => {}
        }
    }

    let request = state.builder.build(&prompt, image, model.as_deref())?;
    tracing::info!("Streaming analysis with model {}", request.model());

    let history = Arc::clone(&state.history);
    let fragments = state.delivery.stream_with_completion(request, move |result| {
        if !result.is_success() {
            return;
        }
        match history.lock() {
            Ok(mut history) => {
                history.append(result);
            }
            Err(e) => tracing::error!("History lock poisoned: {}", e),
        }
    });

    let body = Body::from_stream(
        fragments.map(|fragment| Ok::<_, Infallible>(Bytes::from(fragment.text))),
    );

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

async fn list_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.history_snapshot())
}

async fn get_history(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> std::result::Result<Json<HistoryEntry>, ApiError> {
    Ok(Json(state.history_entry(index)?))
}

/// Serve the HTTP surface until Ctrl-C
///
/// # Errors
///
/// Returns error if the provider cannot be created or the address cannot be bound
pub async fn serve(config: &Config) -> Result<()> {
    let provider = create_provider(&config.provider)?;
    let state = AppState::new(provider, config.provider.ollama.model.clone());
    let app = router(state, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        "Listening on {} (model {}, backend {})",
        listener.local_addr()?,
        config.provider.ollama.model,
        config.provider.ollama.host
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    Ok(())
}
