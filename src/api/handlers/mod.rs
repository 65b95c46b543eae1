use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{Database, ValidationError};
use crate::gantt::GanttChart;
use crate::levels::LevelView;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Translate a database error into a response.
///
/// [`ValidationError`]s are client-attributable and returned as-is with a
/// 404 or 400 status. Everything else is logged server-side and sanitized
/// to a generic message so internal details never reach the client.
fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    if let Some(validation) = e.downcast_ref::<ValidationError>() {
        let status = if validation.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        };
        tracing::warn!("Validation error: {}", validation);
        return (status, validation.to_string());
    }

    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Users
// ============================================================

pub async fn list_users(
    State(db): State<Database>,
) -> Result<Json<Vec<User>>, (StatusCode, String)> {
    db.get_all_users().map(Json).map_err(internal_error)
}

pub async fn get_user(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, (StatusCode, String)> {
    db.get_user(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))
}

pub async fn create_user(
    State(db): State<Database>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    db.create_user(input)
        .map(|u| (StatusCode::CREATED, Json(u)))
        .map_err(internal_error)
}

pub async fn update_user(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<User>, (StatusCode, String)> {
    db.update_user(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))
}

pub async fn delete_user(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_user(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "User not found".to_string()))
    }
}

// ============================================================
// Notifications
// ============================================================

/// Query parameters for listing a user's notifications.
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    /// Only return unread notifications.
    #[serde(default)]
    pub unread: bool,
}

pub async fn list_notifications(
    State(db): State<Database>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<Notification>>, (StatusCode, String)> {
    // First verify the user exists
    db.get_user(user_id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    db.get_notifications_for_user(user_id, query.unread)
        .map(Json)
        .map_err(internal_error)
}

pub async fn mark_notification_read(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.mark_notification_read(id).map_err(internal_error)? {
        Ok(StatusCode::OK)
    } else {
        Err((StatusCode::NOT_FOUND, "Notification not found".to_string()))
    }
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(db): State<Database>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    db.get_all_projects().map(Json).map_err(internal_error)
}

pub async fn get_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, (StatusCode, String)> {
    db.get_project(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn create_project(
    State(db): State<Database>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), (StatusCode, String)> {
    db.create_project(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn update_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<Json<Project>, (StatusCode, String)> {
    db.update_project(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn delete_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_project(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Project not found".to_string()))
    }
}

// ============================================================
// Tickets
// ============================================================

/// Query parameters for listing a project's tickets.
#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    /// Filter to tickets in this status.
    pub status: Option<TicketStatus>,
}

pub async fn list_project_tickets(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Json<Vec<Ticket>>, (StatusCode, String)> {
    db.get_tickets_by_project(project_id, query.status)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_ticket(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ticket>, (StatusCode, String)> {
    db.get_ticket(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Ticket not found".to_string()))
}

pub async fn create_ticket(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateTicketInput>,
) -> Result<(StatusCode, Json<Ticket>), (StatusCode, String)> {
    db.create_ticket(project_id, input)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(internal_error)
}

pub async fn update_ticket(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTicketInput>,
) -> Result<Json<Ticket>, (StatusCode, String)> {
    db.update_ticket(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Ticket not found".to_string()))
}

pub async fn delete_ticket(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_ticket(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Ticket not found".to_string()))
    }
}

// ============================================================
// Comments
// ============================================================

pub async fn list_comments(
    State(db): State<Database>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, (StatusCode, String)> {
    // First verify the ticket exists
    db.get_ticket(ticket_id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Ticket not found".to_string()))?;

    db.get_comments_by_ticket(ticket_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_comment(
    State(db): State<Database>,
    Path(ticket_id): Path<Uuid>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), (StatusCode, String)> {
    db.create_comment(ticket_id, input)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(internal_error)
}

// ============================================================
// Tasks
// ============================================================

/// Query parameters for listing a project's tasks.
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    /// Filter to tasks in this status.
    pub status: Option<TaskStatus>,
}

pub async fn list_project_tasks(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    db.get_tasks_by_project(project_id, query.status)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, (StatusCode, String)> {
    db.get_task(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Task not found".to_string()))
}

pub async fn create_task(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    db.create_task(project_id, input)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(internal_error)
}

pub async fn update_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<Task>, (StatusCode, String)> {
    db.update_task(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Task not found".to_string()))
}

pub async fn delete_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_task(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Task not found".to_string()))
    }
}

// ============================================================
// Task Dependencies
// ============================================================

pub async fn list_task_dependencies(
    State(db): State<Database>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<TaskDependency>>, (StatusCode, String)> {
    // First verify the task exists
    db.get_task(task_id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Task not found".to_string()))?;

    db.get_task_dependencies(task_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn add_task_dependency(
    State(db): State<Database>,
    Path(task_id): Path<Uuid>,
    Json(input): Json<AddDependencyInput>,
) -> Result<(StatusCode, Json<TaskDependency>), (StatusCode, String)> {
    db.add_task_dependency(task_id, input)
        .map(|d| (StatusCode::CREATED, Json(d)))
        .map_err(internal_error)
}

pub async fn remove_task_dependency(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.remove_task_dependency(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Dependency not found".to_string()))
    }
}

// ============================================================
// Computed views
// ============================================================

pub async fn get_task_levels(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<LevelView>, (StatusCode, String)> {
    db.get_task_level_view(project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_gantt_chart(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Option<GanttChart>>, (StatusCode, String)> {
    db.get_gantt_chart(project_id)
        .map(Json)
        .map_err(internal_error)
}
