//! Router assembly

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{
    handle_compress, handle_convert, handle_health, handle_images_to_pdf, handle_merge_pdfs,
    handle_split_pdf,
};
use crate::AppState;

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Image endpoints, also served under /api
        .route("/image/compress", post(handle_compress))
        .route("/image/convert", post(handle_convert))
        .route("/api/image/compress", post(handle_compress))
        .route("/api/image/convert", post(handle_convert))
        // PDF endpoints
        .route("/pdf/imgtopdf", post(handle_images_to_pdf))
        .route("/pdf/split-pdf", post(handle_split_pdf))
        .route("/pdf/merge-pdfs", post(handle_merge_pdfs))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
