use axum::Router;
use axum::routing::get;

use crate::state::AppState;

pub mod handler;
pub mod resolver;
pub mod service;
pub mod upstream;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vast", get(handler::get_vast).post(handler::post_vast))
        .route("/vmap", get(handler::get_vmap).post(handler::post_vmap))
}
