//! `/api/chat` routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::error;

use medtutor_chat::{ChatReply, ChatRequest, suggestions_for};
use medtutor_core::message::ConversationTurn;

use crate::{ApiError, SharedState, api_error};

pub fn chat_router() -> Router<SharedState> {
    Router::new()
        .route("/api/chat/message", post(send_message))
        .route(
            "/api/chat/history/{session_id}",
            get(get_history).delete(clear_history),
        )
        .route("/api/chat/suggestions", get(get_suggestions))
}

/// Body of `POST /api/chat/message`. A missing `sessionId` starts a new session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

async fn send_message(
    State(state): State<SharedState>,
    body: Result<Json<SendMessageBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        api_error(status, rejection.body_text())
    })?;

    let Some(message) = body.message.filter(|m| !m.trim().is_empty()) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message is required"));
    };

    let session_id = body
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let request = ChatRequest {
        message,
        session_id,
        user_id: body.user_id,
    };

    state.chat.send_message(request).await.map(Json).map_err(|e| {
        error!(error = %e, "Chat message failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process message")
    })
}

async fn get_history(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ConversationTurn>>, ApiError> {
    state.chat.history(&session_id).await.map(Json).map_err(|e| {
        error!(session_id = %session_id, error = %e, "History read failed");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to retrieve chat history",
        )
    })
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    message: &'static str,
}

async fn clear_history(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    match state.chat.clear(&session_id).await {
        Ok(()) => Ok(Json(ClearResponse {
            message: "Chat history cleared successfully",
        })),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "History clear failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to clear chat history",
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct SuggestionsQuery {
    category: Option<String>,
}

async fn get_suggestions(Query(query): Query<SuggestionsQuery>) -> Json<Vec<String>> {
    Json(suggestions_for(query.category.as_deref()))
}

#[cfg(test)]
mod tests {
    use crate::build_router;
    use crate::test_support::{app, body_json, state_with};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    fn post_message(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat/message")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(post_message(body)).await.unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    #[tokio::test]
    async fn message_returns_reply_and_metadata() {
        let app = app().await;
        let (status, json) = send(
            &app,
            serde_json::json!({
                "message": "What causes a fever?",
                "userId": "u1",
                "sessionId": "s1"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "Fever is a raised temperature.");
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["metadata"]["category"], "symptom");
        assert_eq!(json["suggestions"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn missing_session_id_gets_generated() {
        let app = app().await;
        let (status, json) = send(&app, serde_json::json!({ "message": "hello" })).await;

        assert_eq!(status, StatusCode::OK);
        let id = json["sessionId"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn blank_message_is_bad_request() {
        let app = app().await;
        let (status, json) = send(
            &app,
            serde_json::json!({ "message": "   ", "sessionId": "s1" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Message is required");
    }

    #[tokio::test]
    async fn missing_message_field_is_bad_request() {
        let app = app().await;
        let (status, json) = send(&app, serde_json::json!({ "sessionId": "s1" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Message is required");

        let (status, json) = send(&app, serde_json::json!({ "message": 42 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_gets_json_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat/message")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app().await.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("application/json"));
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn provider_failure_still_answers_with_fallback() {
        let app = build_router(state_with(None).await);
        let (status, json) = send(
            &app,
            serde_json::json!({ "message": "I have a fever", "sessionId": "s1" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let text = json["response"].as_str().unwrap();
        assert!(text.starts_with("Educational summary based on local knowledge base"));
        assert!(text.contains("fever"));
    }

    #[tokio::test]
    async fn history_then_clear() {
        let app = app().await;
        send(
            &app,
            serde_json::json!({ "message": "What is hypertension?", "sessionId": "h1" }),
        )
        .await;

        let req = Request::builder()
            .uri("/api/chat/history/h1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let turns = body_json(response).await;
        let turns = turns.as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[0]["content"], "What is hypertension?");
        assert_eq!(turns[1]["role"], "assistant");

        let req = Request::builder()
            .method("DELETE")
            .uri("/api/chat/history/h1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "Chat history cleared successfully"
        );

        let req = Request::builder()
            .uri("/api/chat/history/h1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_session_history_is_empty() {
        let req = Request::builder()
            .uri("/api/chat/history/never-seen")
            .body(Body::empty())
            .unwrap();
        let response = app().await.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn suggestions_by_category() {
        let req = Request::builder()
            .uri("/api/chat/suggestions?category=anatomy")
            .body(Body::empty())
            .unwrap();
        let json = body_json(app().await.oneshot(req).await.unwrap()).await;
        assert_eq!(json[0], "Describe the structure and function of the heart");

        let req = Request::builder()
            .uri("/api/chat/suggestions?category=surgery")
            .body(Body::empty())
            .unwrap();
        let json = body_json(app().await.oneshot(req).await.unwrap()).await;
        assert_eq!(json[0], "What are the vital signs and their normal ranges?");

        let req = Request::builder()
            .uri("/api/chat/suggestions")
            .body(Body::empty())
            .unwrap();
        let json = body_json(app().await.oneshot(req).await.unwrap()).await;
        assert_eq!(json.as_array().unwrap().len(), 3);
    }
}
