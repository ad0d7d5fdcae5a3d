pub mod auth;
pub mod error;
pub mod response;
mod habits;
mod users;
mod validation;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh-token", get(auth::refresh_token));

    let user_routes = Router::new()
        .route("/create", post(users::create_user))
        .route("/update", patch(users::update_user))
        .route("/deactivate", put(users::deactivate_user))
        .route("/activate", put(users::activate_user))
        .route("/all-users", get(users::all_users))
        .route("/", get(users::get_user));

    let habit_routes = Router::new()
        .route("/create", post(habits::create_habit))
        .route("/completed", get(habits::completed))
        .route("/upcoming", get(habits::upcoming))
        .route("/mark-done/:id", post(habits::mark_done))
        .route("/unmark-done/:id", delete(habits::unmark_done))
        .route("/:id", get(habits::get_habit))
        .route("/:id", patch(habits::update_habit))
        .route("/:id", delete(habits::delete_habit))
        .route("/", get(habits::list_habits));

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/user", user_routes)
        .nest("/habit", habit_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
