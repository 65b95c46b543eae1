mod handlers;
mod middleware;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::Database;

pub use middleware::{AccessPolicy, SecurityConfig, Throttle};

pub fn create_router(db: Database) -> Router {
    create_router_with_security(db, SecurityConfig::disabled())
}

pub fn create_router_with_security(db: Database, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Users
        .route("/users", get(handlers::list_users))
        .route("/users", post(handlers::create_user))
        .route("/users/{id}", get(handlers::get_user))
        .route("/users/{id}", put(handlers::update_user))
        .route("/users/{id}", delete(handlers::delete_user))
        .route("/users/{id}/notifications", get(handlers::list_notifications))
        // Notifications
        .route("/notifications/{id}/read", put(handlers::mark_notification_read))
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/projects", post(handlers::create_project))
        .route("/projects/{id}", get(handlers::get_project))
        .route("/projects/{id}", put(handlers::update_project))
        .route("/projects/{id}", delete(handlers::delete_project))
        .route("/projects/{id}/tickets", get(handlers::list_project_tickets))
        .route("/projects/{id}/tickets", post(handlers::create_ticket))
        .route("/projects/{id}/tasks", get(handlers::list_project_tasks))
        .route("/projects/{id}/tasks", post(handlers::create_task))
        .route("/projects/{id}/tasks/levels", get(handlers::get_task_levels))
        .route("/projects/{id}/gantt", get(handlers::get_gantt_chart))
        // Tickets
        .route("/tickets/{id}", get(handlers::get_ticket))
        .route("/tickets/{id}", put(handlers::update_ticket))
        .route("/tickets/{id}", delete(handlers::delete_ticket))
        .route("/tickets/{id}/comments", get(handlers::list_comments))
        .route("/tickets/{id}/comments", post(handlers::create_comment))
        // Tasks
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/tasks/{id}", put(handlers::update_task))
        .route("/tasks/{id}", delete(handlers::delete_task))
        .route("/tasks/{id}/dependencies", get(handlers::list_task_dependencies))
        .route("/tasks/{id}/dependencies", post(handlers::add_task_dependency))
        // Dependencies (for delete by edge id)
        .route("/dependencies/{id}", delete(handlers::remove_task_dependency))
        // Health
        .route("/health", get(handlers::health));

    let cors = match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    let mut api = api.with_state(db);

    if let Some(throttle) = security.throttle.clone() {
        api = api.layer(axum::middleware::from_fn_with_state(
            throttle,
            middleware::throttle_requests,
        ));
    }
    if security.requires_token() {
        api = api.layer(axum::middleware::from_fn_with_state(
            security.policy.clone(),
            middleware::require_token,
        ));
    }

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
