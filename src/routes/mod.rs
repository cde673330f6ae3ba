// HTTP routes: shift CRUD plus the rollup read path

mod http;
mod shifts;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::service::ShiftService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: Arc<ShiftService>,
}

pub fn app(service: Arc<ShiftService>) -> Router {
    let state = AppState { service };
    Router::new()
        .route("/", get(|| async { "Welcome to the System Metrics API!" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/add", post(shifts::add_shift)) // POST /add
        .route("/get", get(shifts::get_all_shifts)) // GET /get
        .route("/get/{date}/{shift}", get(shifts::get_shift)) // GET /get/2024-01-01/1
        .route("/get-daily-max/{date}", get(shifts::get_daily_max)) // GET /get-daily-max/2024-01-01
        .route("/update/{date}/{shift}", put(shifts::update_shift)) // PUT /update/2024-01-01/1
        .route("/delete/{date}/{shift}", delete(shifts::delete_shift)) // DELETE /delete/2024-01-01/1
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
