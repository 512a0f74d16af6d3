use crate::state::AppState;
use axum::Router;

mod converters;
pub mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory_repo;
pub mod password;
pub mod pg_repo;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
