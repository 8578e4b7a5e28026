use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MeResponse, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LEN},
        repo::{is_unique_violation, User},
    },
    error::AppError,
    ledger::model::UserLedger,
    state::AppState,
};

type HandlerError = (StatusCode, String);

fn internal<E: std::fmt::Display>(e: E) -> HandlerError {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn create_failure(e: anyhow::Error) -> HandlerError {
    if is_unique_violation(&e) {
        warn!("email registered concurrently");
        return (StatusCode::CONFLICT, "Email already registered".into());
    }
    internal(e)
}

fn app_error(e: AppError) -> HandlerError {
    (e.status(), e.to_string())
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, HandlerError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id).map_err(internal)?;
    let refresh_token = keys.sign_refresh(user.id).map_err(internal)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: user.id,
            email: user.email,
        },
    })
}

/// Creates the login identity and the user's empty ledger together. If the
/// ledger cannot be opened the identity is removed again.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), HandlerError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(internal)?;
    let user = User::create(&state.db, &payload.email, &hash)
        .await
        .map_err(create_failure)?;

    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(user.email.as_str())
        .to_string();
    let ledger = UserLedger::new(user.id, username, payload.gender);
    if let Err(e) = state.ledger.open(&ledger).await {
        error!(user_id = %user.id, error = %e, "ledger open failed, rolling back user");
        if let Err(rollback) = User::delete(&state.db, user.id).await {
            error!(user_id = %user.id, error = %rollback, "rollback of user failed");
        }
        return Err(app_error(e));
    }

    info!(user_id = %user.id, email = %user.email, gender = ?payload.gender, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, HandlerError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let Some(user) = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
    else {
        warn!(email = %payload.email, "login unknown email");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash).map_err(internal)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, HandlerError> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            (StatusCode::UNAUTHORIZED, e.to_string())
        })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MeResponse>, HandlerError> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(%user_id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;
    let ledger = state.ledger.profile(user_id).await.map_err(app_error)?;
    Ok(Json(me_response(user.id, user.email, &ledger)))
}

fn me_response(id: Uuid, email: String, ledger: &UserLedger) -> MeResponse {
    MeResponse {
        id,
        email,
        username: ledger.username.clone(),
        gender: ledger.gender,
        calorie_goal: ledger.user_calorie_goal,
    }
}
