use axum::Router;
use axum::routing::post;

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/encoreCallback", post(handler::encore_callback))
        .route("/packagerCallback/success", post(handler::packaging_success))
        .route("/packagerCallback/failure", post(handler::packaging_failure))
}
