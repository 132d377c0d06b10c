//! Catalog route handlers.
//!
//! Reads are public. Writes go through [`RequireAdmin`], which is a no-op
//! unless an admin token is configured.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use instant_meal_core::{Meal, MealCategory, MealDraft, MealId, MealPatch};

use crate::db::{MealOrder, MealRepository, MealSortKey, SortDirection};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Banner served at `/`.
pub const WELCOME_MESSAGE: &str = "Welcome to Instant Meal API!";

/// Default number of related meals.
const DEFAULT_RELATED_LIMIT: i64 = 6;

/// Default number of search results.
const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// Upper bound on any `limit` parameter.
const MAX_LIMIT: i64 = 50;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for `/all-meals`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort: Option<MealSortKey>,
    pub direction: Option<SortDirection>,
}

impl From<ListQuery> for MealOrder {
    fn from(query: ListQuery) -> Self {
        Self {
            key: query.sort.unwrap_or_default(),
            direction: query.direction,
        }
    }
}

/// `?limit=` on related and search listings.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    fn resolve(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }
}

/// Response of a delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: u64,
}

fn parse_meal_id(raw: &str) -> Result<MealId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid meal id: {raw}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /`
pub async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

/// `POST /upload-meal`
#[instrument(skip_all)]
pub async fn upload_meal(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(draft): Json<MealDraft>,
) -> Result<(StatusCode, Json<Meal>)> {
    let draft = draft.validate()?;
    let meal = MealRepository::new(state.pool()).create(&draft).await?;

    tracing::info!(meal_id = %meal.id, name = %meal.name, "Meal created");
    Ok((StatusCode::CREATED, Json(meal)))
}

/// `GET /all-meals`
#[instrument(skip(state))]
pub async fn all_meals(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Meal>>> {
    let meals = MealRepository::new(state.pool())
        .list(query.into())
        .await?;
    Ok(Json(meals))
}

/// `GET /meal/{id}`
#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Meal>> {
    let id = parse_meal_id(&id)?;
    let meal = MealRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal".to_string()))?;
    Ok(Json(meal))
}

/// `GET /meal/{id}/related`
#[instrument(skip(state))]
pub async fn related_meals(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Meal>>> {
    let id = parse_meal_id(&id)?;
    let repo = MealRepository::new(state.pool());

    let meal = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal".to_string()))?;
    let related = repo
        .related(&meal, query.resolve(DEFAULT_RELATED_LIMIT))
        .await?;

    Ok(Json(related))
}

/// `PATCH /update-meal/{id}`
#[instrument(skip(state, patch))]
pub async fn update_meal(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<MealPatch>,
) -> Result<Json<Meal>> {
    let id = parse_meal_id(&id)?;
    let patch = patch.validate()?;

    let meal = MealRepository::new(state.pool())
        .update(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal".to_string()))?;

    tracing::info!(meal_id = %meal.id, "Meal updated");
    Ok(Json(meal))
}

/// `DELETE /delete-meal/{id}`
#[instrument(skip(state))]
pub async fn delete_meal(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let id = parse_meal_id(&id)?;
    let deleted_count = MealRepository::new(state.pool()).delete(id).await?;

    if deleted_count > 0 {
        tracing::info!(meal_id = %id, "Meal deleted");
    }
    Ok(Json(DeleteResponse { deleted_count }))
}

/// `GET /meals/category/{category}`
#[instrument(skip(state))]
pub async fn meals_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Meal>>> {
    let category: MealCategory = category.parse()?;
    let meals = MealRepository::new(state.pool())
        .list_by_category(category)
        .await?;
    Ok(Json(meals))
}

/// `GET /meals/search/{term}`
#[instrument(skip(state))]
pub async fn search_meals(
    State(state): State<AppState>,
    Path(term): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Meal>>> {
    if term.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }

    let meals = MealRepository::new(state.pool())
        .search(&term, query.resolve(DEFAULT_SEARCH_LIMIT))
        .await?;
    Ok(Json(meals))
}
