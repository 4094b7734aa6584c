//! API route definitions.

use axum::Router;

use crate::{AppState, BodyLimits};

pub mod health;
pub mod upload;

/// Creates the API router with all routes.
pub fn api_routes(limits: BodyLimits) -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(upload::routes(limits))
}
