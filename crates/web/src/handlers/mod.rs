use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use current_market_images::{get_og, get_og_svg, get_og_webp};

use crate::AppState;

mod contact;

const CONTACT_BODY_LIMIT: usize = 64 * 1024;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/og", get(get_og))
        .route("/og.png", get(get_og))
        .route("/og.webp", get(get_og_webp))
        .route("/og.svg", get(get_og_svg))
        .route(
            "/api/contact",
            post(contact::post_contact).layer(DefaultBodyLimit::max(CONTACT_BODY_LIMIT)),
        )
}
