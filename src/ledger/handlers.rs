use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{
    ByDateQuery, EditPortionRequest, GoalRequest, LookupIntakeRequest, NewIntakeRequest,
};
use super::model::IntakeRecord;
use super::mutations::LogTouch;
use super::projections::{DatedEntry, TodaySummary, WeeklyAggregate};
use super::service::NewIntake;
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

pub fn intake_routes() -> Router<AppState> {
    Router::new()
        .route("/intakes", post(append_intake))
        .route("/intakes/lookup", post(append_from_lookup))
        .route("/intakes/daily", get(daily_intakes))
        .route("/intakes/today", get(today))
        .route("/intakes/by-date", get(by_date))
        .route("/intakes/weekly", get(weekly))
        .route(
            "/intakes/:confirm_time",
            patch(edit_portion).delete(delete_intake),
        )
}

pub fn goal_routes() -> Router<AppState> {
    Router::new().route("/goal", put(set_goal))
}

#[instrument(skip(state, payload))]
pub async fn append_intake(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<NewIntakeRequest>,
) -> Result<(StatusCode, Json<IntakeRecord>), AppError> {
    let record = state.ledger.append(user_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Fetches nutrients for a chosen food and records them. Nothing is written
/// when the lookup fails.
#[instrument(skip(state, payload))]
pub async fn append_from_lookup(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<LookupIntakeRequest>,
) -> Result<(StatusCode, Json<IntakeRecord>), AppError> {
    let profile = state.nutrition.fetch_detail(payload.fdc_id).await.map_err(|e| {
        warn!(%user_id, fdc_id = payload.fdc_id, error = %e, "lookup failed, intake not recorded");
        e
    })?;
    let values = profile.extract();

    let intake = NewIntake {
        food_name: payload.food_name,
        calories: values.calories,
        fat: values.fat,
        carbohydrates: values.carbohydrates,
        protein: values.protein,
        portion: payload.portion.unwrap_or(1.0),
    };
    let record = state.ledger.append(user_id, intake).await?;
    info!(%user_id, fdc_id = payload.fdc_id, "intake recorded from lookup");
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state))]
pub async fn daily_intakes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<IntakeRecord>>, AppError> {
    Ok(Json(state.ledger.daily_intakes(user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn edit_portion(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(confirm_time): Path<i64>,
    Json(payload): Json<EditPortionRequest>,
) -> Result<Json<LogTouch>, AppError> {
    let touched = state
        .ledger
        .edit_portion(user_id, confirm_time, payload.portion)
        .await?;
    Ok(Json(touched))
}

#[instrument(skip(state))]
pub async fn delete_intake(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(confirm_time): Path<i64>,
) -> Result<Json<LogTouch>, AppError> {
    Ok(Json(
        state.ledger.delete_by_correlation(user_id, confirm_time).await?,
    ))
}

#[instrument(skip(state))]
pub async fn today(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TodaySummary>, AppError> {
    Ok(Json(state.ledger.project_today(user_id).await?))
}

#[instrument(skip(state))]
pub async fn by_date(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ByDateQuery>,
) -> Result<Json<Vec<DatedEntry>>, AppError> {
    let date = q.parse()?;
    Ok(Json(state.ledger.project_by_date(user_id, date).await?))
}

#[instrument(skip(state))]
pub async fn weekly(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<WeeklyAggregate>, AppError> {
    Ok(Json(state.ledger.project_weekly_aggregate(user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn set_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<GoalRequest>,
) -> Result<StatusCode, AppError> {
    state.ledger.set_goal(user_id, payload.calorie_goal).await?;
    Ok(StatusCode::NO_CONTENT)
}
