mod dto;
pub mod handlers;
pub mod memory_store;
pub mod model;
pub mod mutations;
pub mod pg_store;
pub mod projections;
pub mod service;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::intake_routes())
        .merge(handlers::goal_routes())
}
