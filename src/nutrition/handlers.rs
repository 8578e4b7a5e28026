use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::client::FoodCandidate;
use super::extract::{NutrientProfile, NutrientValues};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct FoodDetail {
    pub fdc_id: u64,
    pub values: NutrientValues,
    pub profile: NutrientProfile,
}

#[derive(Debug, Serialize)]
pub struct Recognition {
    pub label: String,
    pub candidates: Vec<FoodCandidate>,
}

pub fn food_routes() -> Router<AppState> {
    Router::new()
        .route("/foods/search", get(search))
        .route("/foods/:fdc_id", get(detail))
        .route(
            "/foods/recognize",
            post(recognize).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<FoodCandidate>>, AppError> {
    Ok(Json(state.nutrition.search(&q.query).await?))
}

#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(fdc_id): Path<u64>,
) -> Result<Json<FoodDetail>, AppError> {
    let profile = state.nutrition.fetch_detail(fdc_id).await?;
    Ok(Json(FoodDetail {
        fdc_id,
        values: profile.extract(),
        profile,
    }))
}

/// Multipart field `image`. Answers the recognised label and the foods
/// matching it.
#[instrument(skip(state, mp))]
pub async fn recognize(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<Recognition>, AppError> {
    let recognizer = state.recognizer.clone().ok_or_else(|| {
        AppError::ClassificationUnavailable("image recognition is not configured".into())
    })?;

    let mut image: Option<(Bytes, String)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.to_string()))?
    {
        if field.name() == Some("image") {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(e.to_string()))?;
            image = Some((data, content_type));
        }
    }
    let (data, content_type) = image
        .ok_or_else(|| AppError::ClassificationUnavailable("no image provided".into()))?;

    let label = recognizer.recognize(data, &content_type).await?;
    let candidates = state.nutrition.search(&label).await?;
    if candidates.is_empty() {
        warn!(%user_id, %label, "no foods match recognised label");
        return Err(AppError::lookup(format!("no foods found for {label}")));
    }
    info!(%user_id, %label, found = candidates.len(), "image recognised");
    Ok(Json(Recognition { label, candidates }))
}
