//! API routes for the question-answering server

pub mod clear;
pub mod qna;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/qna", post(qna::ask))
        .route("/clear", get(clear::clear_index))
        .route("/info", get(info))
}

/// Service info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let index = state.store().current().await.ok();

    Json(serde_json::json!({
        "name": "pdf-qna",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over a single uploaded PDF",
        "endpoints": {
            "POST /upload": "Upload a PDF (multipart field 'file'), replacing the current index",
            "POST /qna": "Ask a question: {\"query\": string}",
            "GET /clear": "Delete the current index",
            "GET /health": "Liveness",
            "GET /ready": "Readiness"
        },
        "embeddings": {
            "provider": state.embedder().name(),
            "model": state.embedder().model(),
            "dimensions": state.embedder().dimensions()
        },
        "llm": {
            "provider": state.llm().name(),
            "model": state.llm().model()
        },
        "index": index.map(|index| serde_json::to_value(index.manifest()).unwrap_or_default())
    }))
}
