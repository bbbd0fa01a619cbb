//! Question endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /qna - Answer a question from the current index
pub async fn ask(
    State(state): State<AppState>,
    request: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let Json(request) =
        request.map_err(|e| Error::BadRequest(format!("Expected {{\"query\": string}}: {}", e)))?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(Error::BadRequest("query must not be empty".to_string()));
    }

    tracing::info!("Query: \"{}\"", query);

    let index = state.store().current().await?;

    let response = state
        .qa()
        .answer(&index, query)
        .await
        .map_err(Error::into_generation)?;

    Ok(Json(QueryResponse { response }))
}
