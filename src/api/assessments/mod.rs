mod handlers;
mod templates;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::core::state::AppState;

/// Slack on top of the file limit for multipart framing and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn router(max_upload_size_mb: u64) -> Router<AppState> {
    let body_limit = (max_upload_size_mb as usize) * 1024 * 1024 + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/questions/upload",
            post(handlers::upload_questions).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/subjects/:subject_id/questions", get(handlers::list_questions))
        .route("/generate", post(handlers::generate_paper))
        .route("/papers/:paper_id", get(handlers::get_paper))
        .route("/templates", get(templates::list_templates).post(templates::create_template))
        .route(
            "/templates/:template_id",
            patch(templates::update_template).delete(templates::delete_template),
        )
}
