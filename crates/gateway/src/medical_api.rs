//! `/api/medical` routes: term lookup, search and quizzes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::error;

use medtutor_chat::medical::{DEFAULT_DIFFICULTY, DEFAULT_QUIZ_COUNT};
use medtutor_chat::{QuizQuestion, SearchHit, TermInfo};
use medtutor_core::knowledge::Category;

use crate::{ApiError, SharedState, api_error};

pub fn medical_router() -> Router<SharedState> {
    Router::new()
        .route("/api/medical/search", get(search))
        .route("/api/medical/symptoms/{term}", get(lookup_symptom))
        .route("/api/medical/diseases/{term}", get(lookup_disease))
        .route("/api/medical/medications/{term}", get(lookup_medication))
        .route("/api/medical/anatomy/{term}", get(lookup_anatomy))
        .route("/api/medical/quiz/{category}", get(quiz))
}

fn parse_category(name: &str) -> Result<Category, ApiError> {
    name.parse::<Category>()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("Invalid category: {name}")))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub category: Option<String>,
}

async fn search(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let category = match params.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) => Some(parse_category(name)?),
    };

    state
        .medical
        .search(params.query.trim(), category)
        .await
        .map(Json)
        .map_err(|e| {
            error!(query = %params.query, error = %e, "Search failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to search knowledge base")
        })
}

async fn lookup(state: &SharedState, category: Category, term: &str) -> Result<Json<TermInfo>, ApiError> {
    state.medical.lookup(category, term).await.map(Json).map_err(|e| {
        error!(term, category = %category, error = %e, "Lookup failed");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to retrieve {category} information"),
        )
    })
}

async fn lookup_symptom(
    State(state): State<SharedState>,
    Path(term): Path<String>,
) -> Result<Json<TermInfo>, ApiError> {
    lookup(&state, Category::Symptom, &term).await
}

async fn lookup_disease(
    State(state): State<SharedState>,
    Path(term): Path<String>,
) -> Result<Json<TermInfo>, ApiError> {
    lookup(&state, Category::Disease, &term).await
}

async fn lookup_medication(
    State(state): State<SharedState>,
    Path(term): Path<String>,
) -> Result<Json<TermInfo>, ApiError> {
    lookup(&state, Category::Medication, &term).await
}

async fn lookup_anatomy(
    State(state): State<SharedState>,
    Path(term): Path<String>,
) -> Result<Json<TermInfo>, ApiError> {
    lookup(&state, Category::Anatomy, &term).await
}

#[derive(Debug, Deserialize)]
pub struct QuizParams {
    pub difficulty: Option<String>,
    pub count: Option<usize>,
}

async fn quiz(
    State(state): State<SharedState>,
    Path(category): Path<String>,
    Query(params): Query<QuizParams>,
) -> Result<Json<Vec<QuizQuestion>>, ApiError> {
    let category = parse_category(&category)?;
    let difficulty = params
        .difficulty
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_DIFFICULTY);
    let count = params.count.unwrap_or(DEFAULT_QUIZ_COUNT);

    state
        .medical
        .quiz(category, difficulty, count)
        .await
        .map(Json)
        .map_err(|e| {
            error!(category = %category, error = %e, "Quiz generation failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate quiz")
        })
}
