use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{
    config::HttpConfig,
    handlers::{
        health_check,
        tutorials::{
            create_tutorial, delete_all_tutorials, delete_tutorial, find_all_published,
            find_all_tutorials, find_one_tutorial, update_tutorial,
        },
    },
    middleware::create_middleware_stack,
    pagination::CursorCodec,
    store::TutorialStore,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TutorialStore>,
    pub cursors: Arc<CursorCodec>,
}

impl AppState {
    pub fn new(store: Arc<dyn TutorialStore>, cursors: CursorCodec) -> Self {
        Self {
            store,
            cursors: Arc::new(cursors),
        }
    }
}

/// Create the Axum router with all endpoints and middleware
pub fn create_router(state: AppState, http: &HttpConfig) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Tutorial endpoints
        .route(
            "/api/tutorials",
            get(find_all_tutorials)
                .post(create_tutorial)
                .delete(delete_all_tutorials),
        )
        .route("/api/tutorials/published", get(find_all_published))
        .route(
            "/api/tutorials/:id",
            get(find_one_tutorial)
                .put(update_tutorial)
                .delete(delete_tutorial),
        )
        .with_state(state)
        .layer(create_middleware_stack(http))
}
