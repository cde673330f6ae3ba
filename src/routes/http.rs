// GET handlers: version

use axum::response::IntoResponse;

use crate::version::{NAME, VERSION};

/// GET /version: service name and version, baked in at build time.
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}
