mod dto;
mod handlers;
pub mod repo;
mod services;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::router()
}
