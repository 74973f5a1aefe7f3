//! Entity lookup handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use herdcache_core::Student;
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::{EntitiesQuery, QueryPath};
use crate::state::AppState;

/// Query served by `GET /students`.
pub const ALL_STUDENTS: &str = "all";

/// Handler for GET /entities/{query}.
#[instrument(skip_all, fields(query = %path.query))]
pub async fn get_entities(
    State(state): State<AppState>,
    Path(path): Path<QueryPath>,
    Query(params): Query<EntitiesQuery>,
) -> Result<Json<Vec<Student>>, AppError> {
    path.validate().map_err(AppError::BadRequest)?;
    resolve(&state, &path.query, params).await
}

/// Handler for GET /students.
#[instrument(skip_all)]
pub async fn get_students(
    State(state): State<AppState>,
    Query(params): Query<EntitiesQuery>,
) -> Result<Json<Vec<Student>>, AppError> {
    resolve(&state, ALL_STUDENTS, params).await
}

async fn resolve(
    state: &AppState,
    query: &str,
    params: EntitiesQuery,
) -> Result<Json<Vec<Student>>, AppError> {
    let cache = state.cache();
    let strategy = params.strategy.unwrap_or(cache.config().strategy);

    let students = cache.get_with(strategy, query).await?;
    tracing::debug!(count = students.len(), %strategy, "Resolved entities");

    Ok(Json(students))
}
