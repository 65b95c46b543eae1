mod schema;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::gantt::{self, GanttChart};
use crate::levels::{self, LevelView};
use crate::models::*;

/// A client-attributable failure: bad input or a missing resource.
///
/// Everything else coming out of [`Database`] is treated as internal. The
/// API layer downcasts to this type to pick 404 vs 400.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Ticket not found")]
    TicketNotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("A task cannot depend on itself")]
    SelfDependency,
    #[error("Dependency already exists")]
    DuplicateDependency,
    #[error("Both tasks must belong to the same project")]
    CrossProjectDependency,
    #[error("Dependency would create a cycle")]
    DependencyCycle,
}

impl ValidationError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound | Self::TicketNotFound | Self::TaskNotFound | Self::UserNotFound
        )
    }
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "trackline")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("trackline.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    pub fn get_all_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, username, display_name, role, created_at
             FROM users ORDER BY username",
        )?;

        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, username, display_name, role, created_at
             FROM users WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(user_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_user(&self, input: CreateUserInput) -> Result<User> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let role = input.role.unwrap_or(UserRole::Member);

        conn.execute(
            "INSERT INTO users (id, username, display_name, role, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.username,
                &input.display_name,
                role.as_str(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(User {
            id,
            username: input.username,
            display_name: input.display_name,
            role,
            created_at: now,
        })
    }

    pub fn update_user(&self, id: Uuid, input: UpdateUserInput) -> Result<Option<User>> {
        let Some(existing) = self.get_user(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let display_name = input.display_name.unwrap_or(existing.display_name);
        let role = input.role.unwrap_or(existing.role);

        conn.execute(
            "UPDATE users SET display_name = ?, role = ? WHERE id = ?",
            (&display_name, role.as_str(), id.to_string()),
        )?;

        Ok(Some(User {
            id,
            username: existing.username,
            display_name,
            role,
            created_at: existing.created_at,
        }))
    }

    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM users WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at, updated_at
             FROM projects ORDER BY name",
        )?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at, updated_at
             FROM projects WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(project_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO projects (id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Option<Project>> {
        let Some(existing) = self.get_project(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);

        conn.execute(
            "UPDATE projects SET name = ?, description = ?, updated_at = ? WHERE id = ?",
            (&name, &description, now.to_rfc3339(), id.to_string()),
        )?;

        Ok(Some(Project {
            id,
            name,
            description,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Ticket operations
    // ============================================================

    pub fn get_tickets_by_project(
        &self,
        project_id: Uuid,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, description, status, priority, assignee_id, created_at, updated_at
             FROM tickets WHERE project_id = ? ORDER BY created_at",
        )?;

        let mut tickets = stmt
            .query_map([project_id.to_string()], ticket_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(status) = status {
            tickets.retain(|t| t.status == status);
        }

        // Highest priority first, stable within a priority
        tickets.sort_by_key(|t| t.priority.rank());

        Ok(tickets)
    }

    pub fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, description, status, priority, assignee_id, created_at, updated_at
             FROM tickets WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(ticket_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_ticket(&self, project_id: Uuid, input: CreateTicketInput) -> Result<Ticket> {
        self.get_project(project_id)?
            .ok_or(ValidationError::ProjectNotFound)?;
        if let Some(assignee_id) = input.assignee_id {
            self.get_user(assignee_id)?
                .ok_or(ValidationError::UserNotFound)?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let status = input.status.unwrap_or(TicketStatus::Open);
        let priority = input.priority.unwrap_or(TicketPriority::Medium);

        conn.execute(
            "INSERT INTO tickets (id, project_id, title, description, status, priority, assignee_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                project_id.to_string(),
                &input.title,
                &input.description,
                status.as_str(),
                priority.as_str(),
                input.assignee_id.map(|u| u.to_string()),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        if let Some(assignee_id) = input.assignee_id {
            insert_notification(
                &conn,
                assignee_id,
                NotificationKind::Assignment,
                &format!("You were assigned ticket \"{}\"", input.title),
            )?;
        }

        Ok(Ticket {
            id,
            project_id,
            title: input.title,
            description: input.description,
            status,
            priority,
            assignee_id: input.assignee_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_ticket(&self, id: Uuid, input: UpdateTicketInput) -> Result<Option<Ticket>> {
        let Some(existing) = self.get_ticket(id)? else {
            return Ok(None);
        };

        // Reassignment notifies the new assignee
        let newly_assigned = match input.assignee_id {
            Some(new) if existing.assignee_id != Some(new) => {
                self.get_user(new)?.ok_or(ValidationError::UserNotFound)?;
                Some(new)
            }
            _ => None,
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let description = input.description.or(existing.description);
        let status = input.status.unwrap_or(existing.status);
        let priority = input.priority.unwrap_or(existing.priority);
        let assignee_id = input.assignee_id.or(existing.assignee_id);

        conn.execute(
            "UPDATE tickets SET title = ?, description = ?, status = ?, priority = ?, assignee_id = ?, updated_at = ? WHERE id = ?",
            (
                &title,
                &description,
                status.as_str(),
                priority.as_str(),
                assignee_id.map(|u| u.to_string()),
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        if let Some(assignee_id) = newly_assigned {
            insert_notification(
                &conn,
                assignee_id,
                NotificationKind::Assignment,
                &format!("You were assigned ticket \"{}\"", title),
            )?;
        }

        Ok(Some(Ticket {
            id,
            project_id: existing.project_id,
            title,
            description,
            status,
            priority,
            assignee_id,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_ticket(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM tickets WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Comment operations
    // ============================================================

    pub fn get_comments_by_ticket(&self, ticket_id: Uuid) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, ticket_id, author_id, body, created_at
             FROM comments WHERE ticket_id = ? ORDER BY created_at",
        )?;

        let comments = stmt
            .query_map([ticket_id.to_string()], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    pub fn create_comment(&self, ticket_id: Uuid, input: CreateCommentInput) -> Result<Comment> {
        let ticket = self
            .get_ticket(ticket_id)?
            .ok_or(ValidationError::TicketNotFound)?;
        self.get_user(input.author_id)?
            .ok_or(ValidationError::UserNotFound)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO comments (id, ticket_id, author_id, body, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                ticket_id.to_string(),
                input.author_id.to_string(),
                &input.body,
                now.to_rfc3339(),
            ),
        )?;

        // Commenting on someone else's assigned ticket pings the assignee
        if let Some(assignee_id) = ticket.assignee_id {
            if assignee_id != input.author_id {
                insert_notification(
                    &conn,
                    assignee_id,
                    NotificationKind::Comment,
                    &format!("New comment on ticket \"{}\"", ticket.title),
                )?;
            }
        }

        Ok(Comment {
            id,
            ticket_id,
            author_id: input.author_id,
            body: input.body,
            created_at: now,
        })
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn get_tasks_by_project(
        &self,
        project_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, status, assignee_id, start_date, due_date, created_at, updated_at
             FROM tasks WHERE project_id = ? ORDER BY created_at",
        )?;

        let mut tasks = stmt
            .query_map([project_id.to_string()], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(status) = status {
            tasks.retain(|t| t.status == status);
        }

        Ok(tasks)
    }

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, status, assignee_id, start_date, due_date, created_at, updated_at
             FROM tasks WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(task_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_task(&self, project_id: Uuid, input: CreateTaskInput) -> Result<Task> {
        self.get_project(project_id)?
            .ok_or(ValidationError::ProjectNotFound)?;
        if let Some(assignee_id) = input.assignee_id {
            self.get_user(assignee_id)?
                .ok_or(ValidationError::UserNotFound)?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let status = input.status.unwrap_or(TaskStatus::Todo);

        conn.execute(
            "INSERT INTO tasks (id, project_id, title, status, assignee_id, start_date, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                project_id.to_string(),
                &input.title,
                status.as_str(),
                input.assignee_id.map(|u| u.to_string()),
                input.start_date.map(|d| d.to_string()),
                input.due_date.map(|d| d.to_string()),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Task {
            id,
            project_id,
            title: input.title,
            status,
            assignee_id: input.assignee_id,
            start_date: input.start_date,
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_task(&self, id: Uuid, input: UpdateTaskInput) -> Result<Option<Task>> {
        let Some(existing) = self.get_task(id)? else {
            return Ok(None);
        };

        if let Some(assignee_id) = input.assignee_id {
            if existing.assignee_id != Some(assignee_id) {
                self.get_user(assignee_id)?
                    .ok_or(ValidationError::UserNotFound)?;
            }
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let status = input.status.unwrap_or(existing.status);
        let assignee_id = input.assignee_id.or(existing.assignee_id);
        let start_date = input.start_date.or(existing.start_date);
        let due_date = input.due_date.or(existing.due_date);

        conn.execute(
            "UPDATE tasks SET title = ?, status = ?, assignee_id = ?, start_date = ?, due_date = ?, updated_at = ? WHERE id = ?",
            (
                &title,
                status.as_str(),
                assignee_id.map(|u| u.to_string()),
                start_date.map(|d| d.to_string()),
                due_date.map(|d| d.to_string()),
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Task {
            id,
            project_id: existing.project_id,
            title,
            status,
            assignee_id,
            start_date,
            due_date,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_task(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Task dependency operations
    // ============================================================

    pub fn get_task_dependencies(&self, task_id: Uuid) -> Result<Vec<TaskDependency>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, task_id, depends_on_id, created_at
             FROM task_dependencies WHERE task_id = ? ORDER BY created_at",
        )?;

        let deps = stmt
            .query_map([task_id.to_string()], dependency_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(deps)
    }

    pub fn get_dependencies_by_project(&self, project_id: Uuid) -> Result<Vec<TaskDependency>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT td.id, td.task_id, td.depends_on_id, td.created_at
             FROM task_dependencies td
             JOIN tasks t ON t.id = td.task_id
             WHERE t.project_id = ? ORDER BY td.created_at",
        )?;

        let deps = stmt
            .query_map([project_id.to_string()], dependency_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(deps)
    }

    /// Add a dependency edge: `task_id` will not start before
    /// `input.depends_on_id` completes.
    ///
    /// Rejects self-edges, duplicates, cross-project edges and any edge
    /// that would close a cycle. The level view therefore only ever sees
    /// acyclic data from this code path.
    pub fn add_task_dependency(
        &self,
        task_id: Uuid,
        input: AddDependencyInput,
    ) -> Result<TaskDependency> {
        let task = self
            .get_task(task_id)?
            .ok_or(ValidationError::TaskNotFound)?;
        let depends_on = self
            .get_task(input.depends_on_id)?
            .ok_or(ValidationError::TaskNotFound)?;

        if task.id == depends_on.id {
            anyhow::bail!(ValidationError::SelfDependency);
        }
        if task.project_id != depends_on.project_id {
            anyhow::bail!(ValidationError::CrossProjectDependency);
        }

        let existing = self.get_dependencies_by_project(task.project_id)?;
        if existing
            .iter()
            .any(|e| e.task_id == task.id && e.depends_on_id == depends_on.id)
        {
            anyhow::bail!(ValidationError::DuplicateDependency);
        }
        // The new edge closes a cycle iff depends_on already (transitively)
        // depends on task.
        if depends_transitively(&existing, depends_on.id, task.id) {
            anyhow::bail!(ValidationError::DependencyCycle);
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO task_dependencies (id, task_id, depends_on_id, created_at)
             VALUES (?, ?, ?, ?)",
            (
                id.to_string(),
                task.id.to_string(),
                depends_on.id.to_string(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(TaskDependency {
            id,
            task_id: task.id,
            depends_on_id: depends_on.id,
            created_at: now,
        })
    }

    pub fn remove_task_dependency(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM task_dependencies WHERE id = ?",
            [id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Computed views
    // ============================================================

    /// Tasks bucketed into dependency levels for the hierarchy view.
    ///
    /// Computed fresh on every call over a snapshot of the project's tasks
    /// and edges; nothing is persisted.
    pub fn get_task_level_view(&self, project_id: Uuid) -> Result<LevelView> {
        self.get_project(project_id)?
            .ok_or(ValidationError::ProjectNotFound)?;

        let tasks = self.get_tasks_by_project(project_id, None)?;
        let deps = self.get_dependencies_by_project(project_id)?;

        let assignment = levels::compute_levels(&tasks, &deps);
        let groups = levels::level_groups(tasks, &assignment);

        Ok(LevelView {
            groups,
            cycle_task_ids: assignment.cycle_task_ids,
        })
    }

    /// Gantt chart over the project's dated tasks, or `None` when no task
    /// carries a date.
    pub fn get_gantt_chart(&self, project_id: Uuid) -> Result<Option<GanttChart>> {
        self.get_project(project_id)?
            .ok_or(ValidationError::ProjectNotFound)?;

        let tasks = self.get_tasks_by_project(project_id, None)?;
        Ok(gantt::build_chart(tasks))
    }

    // ============================================================
    // Notification operations
    // ============================================================

    pub fn get_notifications_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let sql = if unread_only {
            "SELECT id, user_id, kind, message, read, created_at
             FROM notifications WHERE user_id = ? AND read = 0 ORDER BY created_at DESC"
        } else {
            "SELECT id, user_id, kind, message, read, created_at
             FROM notifications WHERE user_id = ? ORDER BY created_at DESC"
        };
        let mut stmt = conn.prepare(sql)?;

        let notifications = stmt
            .query_map([user_id.to_string()], notification_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notifications)
    }

    pub fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE notifications SET read = 1 WHERE id = ?",
            [id.to_string()],
        )?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn insert_notification(
    conn: &Connection,
    user_id: Uuid,
    kind: NotificationKind,
    message: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, message, read, created_at)
         VALUES (?, ?, ?, ?, 0, ?)",
        (
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            kind.as_str(),
            message,
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(())
}

/// Whether `from` already reaches `target` by following dependency edges.
fn depends_transitively(edges: &[TaskDependency], from: Uuid, target: Uuid) -> bool {
    let mut deps_of: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for edge in edges {
        deps_of.entry(edge.task_id).or_default().push(edge.depends_on_id);
    }

    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if !seen.insert(id) {
            continue;
        }
        if let Some(next) = deps_of.get(&id) {
            stack.extend(next);
        }
    }
    false
}

// ============================================================
// Row mappers
// ============================================================

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        username: row.get(1)?,
        display_name: row.get(2)?,
        role: UserRole::from_str(&row.get::<_, String>(3)?).unwrap_or(UserRole::Member),
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn project_from_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn ticket_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        status: TicketStatus::from_str(&row.get::<_, String>(4)?).unwrap_or(TicketStatus::Open),
        priority: TicketPriority::from_str(&row.get::<_, String>(5)?)
            .unwrap_or(TicketPriority::Medium),
        assignee_id: row.get::<_, Option<String>>(6)?.map(parse_uuid),
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn comment_from_row(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: parse_uuid(row.get::<_, String>(0)?),
        ticket_id: parse_uuid(row.get::<_, String>(1)?),
        author_id: parse_uuid(row.get::<_, String>(2)?),
        body: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn task_from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        status: TaskStatus::from_str(&row.get::<_, String>(3)?).unwrap_or(TaskStatus::Todo),
        assignee_id: row.get::<_, Option<String>>(4)?.map(parse_uuid),
        start_date: row.get::<_, Option<String>>(5)?.and_then(parse_date),
        due_date: row.get::<_, Option<String>>(6)?.and_then(parse_date),
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn dependency_from_row(row: &rusqlite::Row) -> rusqlite::Result<TaskDependency> {
    Ok(TaskDependency {
        id: parse_uuid(row.get::<_, String>(0)?),
        task_id: parse_uuid(row.get::<_, String>(1)?),
        depends_on_id: parse_uuid(row.get::<_, String>(2)?),
        created_at: parse_datetime(row.get::<_, String>(3)?),
    })
}

fn notification_from_row(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        kind: NotificationKind::from_str(&row.get::<_, String>(2)?)
            .unwrap_or(NotificationKind::Assignment),
        message: row.get(3)?,
        read: row.get::<_, i32>(4)? != 0,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: String) -> Option<chrono::NaiveDate> {
    s.parse().ok()
}
