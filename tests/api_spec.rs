use axum::http::StatusCode;
use axum_test::TestServer;
use trackline::api::{create_router, create_router_with_security, SecurityConfig};
use trackline::db::Database;
use trackline::gantt::GanttChart;
use trackline::levels::LevelView;
use trackline::models::*;
use uuid::Uuid;

fn setup() -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let app = create_router(db);
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_project(server: &TestServer) -> Project {
    server
        .post("/api/v1/projects")
        .json(&CreateProjectInput {
            name: "Test Project".to_string(),
            description: None,
        })
        .await
        .json::<Project>()
}

async fn create_test_user(server: &TestServer, username: &str) -> User {
    server
        .post("/api/v1/users")
        .json(&CreateUserInput {
            username: username.to_string(),
            display_name: username.to_string(),
            role: None,
        })
        .await
        .json::<User>()
}

async fn create_test_task(server: &TestServer, project_id: Uuid, title: &str) -> Task {
    server
        .post(&format!("/api/v1/projects/{}/tasks", project_id))
        .json(&CreateTaskInput {
            title: title.to_string(),
            status: None,
            assignee_id: None,
            start_date: None,
            due_date: None,
        })
        .await
        .json::<Task>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn returns_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
    }
}

mod projects {
    use super::*;

    #[tokio::test]
    async fn create_returns_created_with_body() {
        let server = setup();

        let response = server
            .post("/api/v1/projects")
            .json(&CreateProjectInput {
                name: "Apollo".to_string(),
                description: Some("Moonshot".to_string()),
            })
            .await;

        response.assert_status(StatusCode::CREATED);
        let project: Project = response.json();
        assert_eq!(project.name, "Apollo");
        assert_eq!(project.description, Some("Moonshot".to_string()));
    }

    #[tokio::test]
    async fn get_unknown_project_returns_not_found() {
        let server = setup();
        let response = server
            .get(&format!("/api/v1/projects/{}", Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_merges_partial_fields() {
        let server = setup();
        let project = create_test_project(&server).await;

        let response = server
            .put(&format!("/api/v1/projects/{}", project.id))
            .json(&UpdateProjectInput {
                name: Some("Renamed".to_string()),
                description: None,
            })
            .await;

        response.assert_status_ok();
        let updated: Project = response.json();
        assert_eq!(updated.name, "Renamed");
    }

    #[tokio::test]
    async fn delete_returns_no_content_then_not_found() {
        let server = setup();
        let project = create_test_project(&server).await;

        let response = server
            .delete(&format!("/api/v1/projects/{}", project.id))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);

        let response = server
            .delete(&format!("/api/v1/projects/{}", project.id))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod tickets {
    use super::*;

    #[tokio::test]
    async fn create_defaults_status_and_priority() {
        let server = setup();
        let project = create_test_project(&server).await;

        let response = server
            .post(&format!("/api/v1/projects/{}/tickets", project.id))
            .json(&CreateTicketInput {
                title: "Bug".to_string(),
                description: None,
                status: None,
                priority: None,
                assignee_id: None,
            })
            .await;

        response.assert_status(StatusCode::CREATED);
        let ticket: Ticket = response.json();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Medium);
    }

    #[tokio::test]
    async fn create_in_unknown_project_returns_not_found() {
        let server = setup();

        let response = server
            .post(&format!("/api/v1/projects/{}/tickets", Uuid::new_v4()))
            .json(&CreateTicketInput {
                title: "Orphan".to_string(),
                description: None,
                status: None,
                priority: None,
                assignee_id: None,
            })
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let server = setup();
        let project = create_test_project(&server).await;

        for (title, status) in [("open one", TicketStatus::Open), ("done", TicketStatus::Closed)] {
            server
                .post(&format!("/api/v1/projects/{}/tickets", project.id))
                .json(&CreateTicketInput {
                    title: title.to_string(),
                    description: None,
                    status: Some(status),
                    priority: None,
                    assignee_id: None,
                })
                .await;
        }

        let response = server
            .get(&format!("/api/v1/projects/{}/tickets", project.id))
            .add_query_param("status", "closed")
            .await;

        response.assert_status_ok();
        let tickets: Vec<Ticket> = response.json();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].title, "done");
    }

    #[tokio::test]
    async fn comments_roundtrip() {
        let server = setup();
        let project = create_test_project(&server).await;
        let user = create_test_user(&server, "alice").await;

        let ticket = server
            .post(&format!("/api/v1/projects/{}/tickets", project.id))
            .json(&CreateTicketInput {
                title: "Discussed".to_string(),
                description: None,
                status: None,
                priority: None,
                assignee_id: None,
            })
            .await
            .json::<Ticket>();

        let response = server
            .post(&format!("/api/v1/tickets/{}/comments", ticket.id))
            .json(&CreateCommentInput {
                author_id: user.id,
                body: "first!".to_string(),
            })
            .await;
        response.assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/api/v1/tickets/{}/comments", ticket.id))
            .await;
        response.assert_status_ok();
        let comments: Vec<Comment> = response.json();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "first!");
    }

    #[tokio::test]
    async fn comment_on_unknown_ticket_returns_not_found() {
        let server = setup();
        let user = create_test_user(&server, "alice").await;

        let response = server
            .post(&format!("/api/v1/tickets/{}/comments", Uuid::new_v4()))
            .json(&CreateCommentInput {
                author_id: user.id,
                body: "anyone home?".to_string(),
            })
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod tasks {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_status() {
        let server = setup();
        let project = create_test_project(&server).await;
        let task = create_test_task(&server, project.id, "doing").await;
        create_test_task(&server, project.id, "waiting").await;

        server
            .put(&format!("/api/v1/tasks/{}", task.id))
            .json(&UpdateTaskInput {
                title: None,
                status: Some(TaskStatus::InProgress),
                assignee_id: None,
                start_date: None,
                due_date: None,
            })
            .await
            .assert_status_ok();

        let response = server
            .get(&format!("/api/v1/projects/{}/tasks", project.id))
            .add_query_param("status", "in_progress")
            .await;

        response.assert_status_ok();
        let tasks: Vec<Task> = response.json();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "doing");
    }

    #[tokio::test]
    async fn delete_returns_no_content() {
        let server = setup();
        let project = create_test_project(&server).await;
        let task = create_test_task(&server, project.id, "gone").await;

        let response = server.delete(&format!("/api/v1/tasks/{}", task.id)).await;
        response.assert_status(StatusCode::NO_CONTENT);

        let response = server.get(&format!("/api/v1/tasks/{}", task.id)).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod dependencies {
    use super::*;

    #[tokio::test]
    async fn add_and_list_dependencies() {
        let server = setup();
        let project = create_test_project(&server).await;
        let a = create_test_task(&server, project.id, "a").await;
        let b = create_test_task(&server, project.id, "b").await;

        let response = server
            .post(&format!("/api/v1/tasks/{}/dependencies", b.id))
            .json(&AddDependencyInput { depends_on_id: a.id })
            .await;
        response.assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/api/v1/tasks/{}/dependencies", b.id))
            .await;
        response.assert_status_ok();
        let deps: Vec<TaskDependency> = response.json();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].depends_on_id, a.id);
    }

    #[tokio::test]
    async fn cycle_is_rejected_with_bad_request() {
        let server = setup();
        let project = create_test_project(&server).await;
        let a = create_test_task(&server, project.id, "a").await;
        let b = create_test_task(&server, project.id, "b").await;

        server
            .post(&format!("/api/v1/tasks/{}/dependencies", b.id))
            .json(&AddDependencyInput { depends_on_id: a.id })
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post(&format!("/api/v1/tasks/{}/dependencies", a.id))
            .json(&AddDependencyInput { depends_on_id: b.id })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn self_dependency_is_rejected() {
        let server = setup();
        let project = create_test_project(&server).await;
        let a = create_test_task(&server, project.id, "a").await;

        let response = server
            .post(&format!("/api/v1/tasks/{}/dependencies", a.id))
            .json(&AddDependencyInput { depends_on_id: a.id })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_endpoint_returns_not_found() {
        let server = setup();
        let project = create_test_project(&server).await;
        let a = create_test_task(&server, project.id, "a").await;

        let response = server
            .post(&format!("/api/v1/tasks/{}/dependencies", a.id))
            .json(&AddDependencyInput {
                depends_on_id: Uuid::new_v4(),
            })
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn remove_dependency_by_edge_id() {
        let server = setup();
        let project = create_test_project(&server).await;
        let a = create_test_task(&server, project.id, "a").await;
        let b = create_test_task(&server, project.id, "b").await;

        let edge = server
            .post(&format!("/api/v1/tasks/{}/dependencies", b.id))
            .json(&AddDependencyInput { depends_on_id: a.id })
            .await
            .json::<TaskDependency>();

        let response = server
            .delete(&format!("/api/v1/dependencies/{}", edge.id))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
    }
}

mod levels {
    use super::*;

    #[tokio::test]
    async fn chain_is_bucketed_by_depth() {
        let server = setup();
        let project = create_test_project(&server).await;
        let a = create_test_task(&server, project.id, "a").await;
        let b = create_test_task(&server, project.id, "b").await;
        let c = create_test_task(&server, project.id, "c").await;

        // c depends on b, b depends on a
        server
            .post(&format!("/api/v1/tasks/{}/dependencies", b.id))
            .json(&AddDependencyInput { depends_on_id: a.id })
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(&format!("/api/v1/tasks/{}/dependencies", c.id))
            .json(&AddDependencyInput { depends_on_id: b.id })
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/api/v1/projects/{}/tasks/levels", project.id))
            .await;

        response.assert_status_ok();
        let view: LevelView = response.json();
        assert!(view.cycle_task_ids.is_empty());
        assert_eq!(view.groups.len(), 3);
        assert_eq!(view.groups[0].level, 0);
        assert_eq!(view.groups[0].tasks[0].id, a.id);
        assert_eq!(view.groups[1].level, 1);
        assert_eq!(view.groups[1].tasks[0].id, b.id);
        assert_eq!(view.groups[2].level, 2);
        assert_eq!(view.groups[2].tasks[0].id, c.id);
    }

    #[tokio::test]
    async fn all_independent_tasks_share_level_zero() {
        let server = setup();
        let project = create_test_project(&server).await;
        create_test_task(&server, project.id, "x").await;
        create_test_task(&server, project.id, "y").await;

        let response = server
            .get(&format!("/api/v1/projects/{}/tasks/levels", project.id))
            .await;

        response.assert_status_ok();
        let view: LevelView = response.json();
        assert_eq!(view.groups.len(), 1);
        assert_eq!(view.groups[0].level, 0);
        assert_eq!(view.groups[0].tasks.len(), 2);
    }

    #[tokio::test]
    async fn unknown_project_returns_not_found() {
        let server = setup();
        let response = server
            .get(&format!("/api/v1/projects/{}/tasks/levels", Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod gantt {
    use super::*;

    #[tokio::test]
    async fn no_dates_serializes_as_null() {
        let server = setup();
        let project = create_test_project(&server).await;
        create_test_task(&server, project.id, "undated").await;

        let response = server
            .get(&format!("/api/v1/projects/{}/gantt", project.id))
            .await;

        response.assert_status_ok();
        let chart: Option<GanttChart> = response.json();
        assert!(chart.is_none());
    }

    #[tokio::test]
    async fn window_and_rows_are_computed() {
        let server = setup();
        let project = create_test_project(&server).await;

        server
            .post(&format!("/api/v1/projects/{}/tasks", project.id))
            .json(&CreateTaskInput {
                title: "dated".to_string(),
                status: None,
                assignee_id: None,
                start_date: Some("2026-03-01".parse().unwrap()),
                due_date: Some("2026-03-04".parse().unwrap()),
            })
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/api/v1/projects/{}/gantt", project.id))
            .await;

        response.assert_status_ok();
        let chart: Option<GanttChart> = response.json();
        let chart = chart.expect("Expected a chart");
        assert_eq!(chart.rows.len(), 1);
        assert_eq!(chart.rows[0].offset_days, 0);
        assert_eq!(chart.rows[0].duration_days, 4);
    }
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn assignment_creates_unread_notification() {
        let server = setup();
        let project = create_test_project(&server).await;
        let user = create_test_user(&server, "alice").await;

        server
            .post(&format!("/api/v1/projects/{}/tickets", project.id))
            .json(&CreateTicketInput {
                title: "Yours now".to_string(),
                description: None,
                status: None,
                priority: None,
                assignee_id: Some(user.id),
            })
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/api/v1/users/{}/notifications", user.id))
            .add_query_param("unread", "true")
            .await;

        response.assert_status_ok();
        let notifications: Vec<Notification> = response.json();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Assignment);

        server
            .put(&format!(
                "/api/v1/notifications/{}/read",
                notifications[0].id
            ))
            .await
            .assert_status_ok();

        let response = server
            .get(&format!("/api/v1/users/{}/notifications", user.id))
            .add_query_param("unread", "true")
            .await;
        let notifications: Vec<Notification> = response.json();
        assert!(notifications.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_returns_not_found() {
        let server = setup();
        let response = server
            .get(&format!("/api/v1/users/{}/notifications", Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod auth {
    use super::*;

    fn setup_with_key(key: &str) -> TestServer {
        let db = Database::open_memory().expect("Failed to create database");
        db.migrate().expect("Failed to migrate");
        let app = create_router_with_security(db, SecurityConfig::with_api_key(key));
        TestServer::new(app).expect("Failed to create test server")
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let server = setup_with_key("secret");
        let response = server.get("/api/v1/projects").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let server = setup_with_key("secret");
        let response = server
            .get("/api/v1/projects")
            .authorization_bearer("not-the-key")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_is_accepted() {
        let server = setup_with_key("secret");
        let response = server
            .get("/api/v1/projects")
            .authorization_bearer("secret")
            .await;
        response.assert_status_ok();
    }
}
