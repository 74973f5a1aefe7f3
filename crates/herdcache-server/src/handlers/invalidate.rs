//! Cache invalidation endpoint handler.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::QueryPath;
use crate::state::AppState;

/// Response para operaciones de invalidación.
#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    /// Número de entries invalidadas.
    pub invalidated: usize,
    /// Mensaje descriptivo.
    pub message: String,
}

/// DELETE /cache/{query}
/// Invalida la entry de una query en el store remoto y en la cache local.
#[instrument(skip_all, fields(query = %path.query))]
pub async fn invalidate_query(
    State(state): State<AppState>,
    Path(path): Path<QueryPath>,
) -> Result<Json<InvalidateResponse>, AppError> {
    path.validate().map_err(AppError::BadRequest)?;

    let existed = state.cache().invalidate(&path.query).await?;
    let invalidated = usize::from(existed);

    Ok(Json(InvalidateResponse {
        invalidated,
        message: format!(
            "Invalidated {} cache entries for query '{}'",
            invalidated, path.query
        ),
    }))
}
