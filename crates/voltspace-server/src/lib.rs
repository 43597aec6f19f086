//! VoltSpace Web Server
//!
//! Axum-based REST API for the VoltSpace home energy dashboard.
//!
//! - Rule-based and model-augmented insights over device snapshots
//! - Energy assistant
//! - Image-to-3D conversion with generated models served under `/static`
//! - Restrictive CORS policy and upload size limits
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use voltspace_core::{
    AIBackend, AIClient, Assistant, AssetStore, Config, Error as CoreError, MeshConverter,
    Provider, ServerSettings,
};

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Source of "now" for the insight rules
pub type Clock = fn() -> DateTime<FixedOffset>;

fn local_now() -> DateTime<FixedOffset> {
    chrono::Local::now().fixed_offset()
}

/// Shared application state
pub struct AppState {
    pub settings: ServerSettings,
    /// Client for augmented insights (insights model); `None` without a credential
    pub insights_ai: Option<AIClient>,
    pub assistant: Assistant,
    pub mesh: Provider<MeshConverter>,
    pub store: AssetStore,
    pub clock: Clock,
}

impl AppState {
    /// Build state from resolved configuration
    pub fn from_config(config: &Config) -> Self {
        let store = AssetStore::from_settings(&config.server);
        let chat = config.text_generation.as_option().map(AIClient::from_config);
        let insights_ai = config
            .text_generation
            .as_option()
            .zip(chat.as_ref())
            .map(|(settings, client)| client.with_model(&settings.insights_model));
        let mesh = config
            .mesh
            .clone()
            .map(|mesh| MeshConverter::from_config(&mesh, store.clone()));

        Self {
            settings: config.server.clone(),
            insights_ai,
            assistant: Assistant::new(chat),
            mesh,
            store,
            clock: local_now,
        }
    }

    /// Override the clock used by the insight rules
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

/// Create the application router
pub fn create_router(config: &Config) -> Router {
    create_router_with_state(AppState::from_config(config))
}

/// Create the router from prepared state (for testing)
pub fn create_router_with_state(state: AppState) -> Router {
    let static_dir = state.store.static_dir().to_path_buf();
    let cors = cors_layer(&state.settings.allowed_origins);
    let state = Arc::new(state);

    Router::new()
        // Insights
        .route("/insights", post(handlers::rule_insights))
        .route("/insights_ai", post(handlers::ai_insights))
        // Assistant
        .route("/agent", post(handlers::ask_agent))
        // Image-to-3D
        .route("/meshify", post(handlers::meshify))
        .route("/meshify/submit", post(handlers::submit_mesh))
        .route("/meshify/status/:task_id", get(handlers::mesh_status))
        .route("/meshify/fetch_glb/:task_id", post(handlers::fetch_glb))
        // Health
        .route("/health", get(handlers::health))
        .with_state(state)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Start the server
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config);
    state.store.ensure_dirs().await?;

    check_collaborators(&state).await;

    let app = create_router_with_state(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting server at http://{}", addr);
    info!("Publishing models under {}/static/models/", config.server.public_url);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log which collaborators are configured and whether the model server answers
async fn check_collaborators(state: &AppState) {
    match &state.insights_ai {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ Text generation connected: {} (insights model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  Text generation configured but not responding: {}",
                    client.host()
                );
            }
        }
        None => {
            info!("ℹ️  Text generation not configured (set OPENAI_API_KEY to enable AI insights and the assistant)");
        }
    }

    match &state.mesh {
        Provider::Configured(converter) => {
            info!("✅ Image-to-3D configured: {}", converter.host());
        }
        Provider::Unconfigured { missing } => {
            info!("ℹ️  Image-to-3D not configured (set {} to enable /meshify)", missing);
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error onto a status and client-facing message
    fn from_core(err: CoreError) -> Self {
        let Some(status) = client_status(&err) else {
            return Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(err.into()),
            };
        };

        let message = match err {
            CoreError::UnsupportedMediaType(msg)
            | CoreError::InvalidInput(msg)
            | CoreError::NotFound(msg) => msg,
            other => other.to_string(),
        };
        warn!(status = status.as_u16(), error = %message, "Request failed");
        Self {
            status,
            message,
            internal: None,
        }
    }
}

/// Status for core errors whose message is safe to show; `None` hides it
fn client_status(err: &CoreError) -> Option<StatusCode> {
    match err {
        CoreError::UnsupportedMediaType(_) | CoreError::InvalidInput(_) => {
            Some(StatusCode::BAD_REQUEST)
        }
        CoreError::NotFound(_) => Some(StatusCode::NOT_FOUND),
        CoreError::NotConfigured(_) | CoreError::TaskFailed(_) | CoreError::InvalidData(_) => {
            Some(StatusCode::INTERNAL_SERVER_ERROR)
        }
        CoreError::Upstream { status, .. } => {
            Some(StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY))
        }
        CoreError::DeadlineExceeded { .. } | CoreError::Timeout(_) => {
            Some(StatusCode::GATEWAY_TIMEOUT)
        }
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        match err.into().downcast::<CoreError>() {
            Ok(core) => Self::from_core(core),
            Err(err) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(err),
            },
        }
    }
}
