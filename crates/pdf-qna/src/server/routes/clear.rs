//! Index reset endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::ClearResponse;

/// GET /clear - Remove the persisted index
pub async fn clear_index(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    state.store().clear().await?;
    Ok(Json(ClearResponse::default()))
}
