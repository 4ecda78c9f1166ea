//! HTTP API for the medical tutor.
//!
//! Exposes the chat endpoints (send a message, read or clear a session's
//! history, suggested questions) and the knowledge base endpoints (term
//! lookup, search, practice quizzes) under `/api`.
//!
//! Built on Axum; every handler is a thin adapter over
//! [`ChatService`] and [`MedicalService`].

pub mod chat_api;
pub mod medical_api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use medtutor_chat::{ChatService, MedicalLimits, MedicalService};
use medtutor_config::AppConfig;
use medtutor_core::knowledge::KnowledgeStore;
use medtutor_core::provider::Provider;
use medtutor_core::session::SessionStore;
use medtutor_store::SqliteDatabase;

/// Services shared by every request.
pub struct AppState {
    pub chat: ChatService,
    pub medical: MedicalService,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire both services over the given provider and stores.
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn Provider>,
        knowledge: Arc<dyn KnowledgeStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> SharedState {
        let chat = ChatService::from_config(&config, provider, Arc::clone(&knowledge), sessions);
        let medical = MedicalService::new(knowledge, MedicalLimits::from_config(&config));
        Arc::new(Self {
            chat,
            medical,
            config,
        })
    }
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Build the router with every `/api` route and the HTTP layers.
///
/// Layers applied:
/// - CORS for the configured frontend origin
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.frontend_origin);
    let body_limit = state.config.gateway.body_limit_bytes;

    Router::new()
        .route("/api/health", get(health_handler))
        .merge(chat_api::chat_router())
        .merge(medical_api::medical_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                warn!(origin, error = %e, "Invalid frontend origin, allowing any origin");
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Medical Chatbot API is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Open the database, wire the services and serve until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let db = SqliteDatabase::open(&config.database.url, config.database.max_connections).await?;
    let provider = medtutor_providers::build_from_config(&config);
    info!(
        provider = provider.name(),
        model = config.llm.model(),
        database = %config.database.url,
        "Services ready"
    );

    let state = AppState::new(
        config,
        provider,
        Arc::new(db.knowledge()),
        Arc::new(db.sessions()),
    );
    let app = build_router(state);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}


#[cfg(test)]
mod tests {
    use super::test_support::{app, body_json};
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let response = app().await.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "OK");
        assert_eq!(json["message"], "Medical Chatbot API is running");
        assert!(json["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let req = Request::builder()
            .uri("/api/nothing")
            .body(Body::empty())
            .unwrap();

        let response = app().await.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let req = Request::builder()
            .uri("/api/health")
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();

        let response = app().await.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let big = "x".repeat(2 * 1024 * 1024);
        let body = serde_json::json!({ "message": big, "sessionId": "s" });
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat/message")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app().await.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn invalid_origin_does_not_panic() {
        let _ = cors_layer("not a\nvalid origin");
        let _ = cors_layer("*");
    }
}
