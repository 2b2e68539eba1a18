pub mod auth;
pub mod middleware;
pub mod respond;
pub mod rest;
pub mod session;
pub mod state;

pub use middleware::require_auth;
pub use session::SessionStore;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Assembles the API router: public auth routes, everything else behind
/// `require_auth`. The body limit mirrors the 10 MB upload boundary the
/// client enforces.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler));

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/user", get(auth::current_user_handler))
        .route(
            "/api/pdfs",
            post(rest::create_pdf_handler).get(rest::list_pdfs_handler),
        )
        .route(
            "/api/chats",
            post(rest::create_chat_handler).get(rest::list_chats_handler),
        )
        .route("/api/chats/{id}", get(rest::get_chat_handler))
        .route("/api/chats/{id}/messages", get(rest::list_messages_handler))
        .route("/api/messages", post(rest::create_message_handler))
        .route("/api/gemini", post(rest::gemini_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state)
}
