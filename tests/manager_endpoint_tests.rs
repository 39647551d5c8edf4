//! Manager endpoint integration tests

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use chrono::Utc;
use sea_orm::{EntityTrait, PaginatorTrait};
use tower::util::ServiceExt;

mod common;
use common::*;

use feedbackatm::models::prelude::*;
use feedbackatm::services::calendar::DayWindow;

async fn download(app: &TestApp, uri: &str, username: &str) -> Response {
    app.router
        .clone()
        .oneshot(
            authed(Request::builder().uri(uri), username)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

// ============================================================================
// Tasks
// ============================================================================

#[tokio::test]
async fn test_list_tasks_sweeps_overdue() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    let stale = Utc::now() - chrono::Duration::days(2);
    insert_task(&db, tenant.atm.id, tenant.cleaner.id, TaskStatus::Pending, Some(stale), None).await;
    let later = Utc::now() + chrono::Duration::hours(1);
    insert_task(&db, tenant.bus_stop.id, tenant.cleaner.id, TaskStatus::Pending, Some(later), None).await;
    let app = test_app(db).await;

    let (status, body) = app.get("/api/manager/tasks", "acme_manager").await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    let overdue = tasks
        .iter()
        .find(|t| t["servicePointId"] == tenant.atm.id)
        .unwrap();
    assert_eq!(overdue["status"], "OVERDUE");
    assert_eq!(overdue["cleaner"]["username"], "acme_cleaner");
    let upcoming = tasks
        .iter()
        .find(|t| t["servicePointId"] == tenant.bus_stop.id)
        .unwrap();
    assert_eq!(upcoming["status"], "PENDING");
}

#[tokio::test]
async fn test_company_less_manager_is_rejected() {
    let db = create_test_db().await;
    create_user(&db, "drifter", UserRole::Manager, None).await;
    let app = test_app(db).await;

    let (status, body) = app.get("/api/manager/tasks", "drifter").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Manager not assigned to a company");
}

#[tokio::test]
async fn test_adhoc_task_lifecycle() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    let app = test_app(db).await;

    let (status, body) = app
        .json(
            "POST",
            "/api/manager/tasks",
            "acme_manager",
            serde_json::json!({
                "servicePointId": tenant.atm.id,
                "cleanerId": tenant.cleaner.id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["task"]["status"], "PENDING");
    assert_eq!(body["task"]["servicePoint"]["name"], "Acme ATM");
    let id = body["task"]["id"].as_i64().unwrap();

    let (status, body) = app
        .json(
            "PUT",
            &format!("/api/manager/tasks/{}", id),
            "acme_manager",
            serde_json::json!({ "servicePointId": tenant.bus_stop.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["task"]["servicePointId"], tenant.bus_stop.id);

    let (status, body) = app
        .json("DELETE", &format!("/api/manager/tasks/{}", id), "acme_manager", serde_json::json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");
    assert_eq!(CleaningTask::find().count(&app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_completed_task_cannot_be_deleted() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    let done = insert_task(&db, tenant.atm.id, tenant.cleaner.id, TaskStatus::Completed, Some(Utc::now()), None).await;
    let app = test_app(db).await;

    let (status, body) = app
        .json("DELETE", &format!("/api/manager/tasks/{}", done.id), "acme_manager", serde_json::json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().starts_with("Task not found"));
}

#[tokio::test]
async fn test_tasks_of_other_company_are_hidden() {
    let db = create_test_db().await;
    let acme = create_tenant(&db, "Acme").await;
    create_tenant(&db, "Globex").await;
    let task = insert_task(&db, acme.atm.id, acme.cleaner.id, TaskStatus::Completed, Some(Utc::now()), None).await;
    let app = test_app(db).await;

    let (status, body) = app
        .json(
            "PUT",
            &format!("/api/manager/tasks/{}/comment", task.id),
            "globex_manager",
            serde_json::json!({ "managerNotes": "not mine" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Task not found or not in your company");

    let (_, body) = app.get("/api/manager/tasks", "globex_manager").await;
    assert!(body["tasks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_task_export_formats() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    insert_task(&db, tenant.atm.id, tenant.cleaner.id, TaskStatus::Completed, Some(Utc::now()), None).await;
    let app = test_app(db).await;
    let label = DayWindow::today().label();

    let response = download(&app, "/api/manager/tasks/export?format=csv", "acme_manager").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=tasks_{}.csv", label).as_str()
    );

    let response = download(&app, "/api/manager/tasks/export", "acme_manager").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=tasks_{}.xlsx", label).as_str()
    );
}

// ============================================================================
// Directory and stats
// ============================================================================

#[tokio::test]
async fn test_company_directory() {
    let db = create_test_db().await;
    create_tenant(&db, "Acme").await;
    create_tenant(&db, "Globex").await;
    create_user(&db, "root", UserRole::Admin, None).await;
    let app = test_app(db).await;

    let (status, body) = app.get("/api/manager/cleaners", "acme_manager").await;
    assert_eq!(status, StatusCode::OK);
    let cleaners = body["cleaners"].as_array().unwrap();
    assert_eq!(cleaners.len(), 1);
    assert_eq!(cleaners[0]["username"], "acme_cleaner");

    // A company-less admin sees every cleaner
    let (_, body) = app.get("/api/manager/cleaners", "root").await;
    assert_eq!(body["cleaners"].as_array().unwrap().len(), 2);

    let (status, body) = app.get("/api/manager/service-points", "acme_manager").await;
    assert_eq!(status, StatusCode::OK);
    let points = body["servicePoints"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.get("company").is_none()));
}

#[tokio::test]
async fn test_stats_and_dashboard() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    let today = DayWindow::today();
    insert_task(&db, tenant.atm.id, tenant.cleaner.id, TaskStatus::Completed, Some(today.start), None).await;
    insert_task(&db, tenant.bus_stop.id, tenant.cleaner.id, TaskStatus::Pending, Some(today.start), None).await;
    let app = test_app(db).await;

    let (status, body) = app.get("/api/manager/stats", "acme_manager").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalTasks"], 2);
    assert_eq!(body["stats"]["completionRate"], "50.0");

    let (status, body) = app.get("/api/manager/dashboard-stats", "acme_manager").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["todayTotalTasks"], 2);
    assert_eq!(body["stats"]["todayCompletedTasks"], 1);
    assert_eq!(body["servicePoints"].as_array().unwrap().len(), 2);
}

// ============================================================================
// Routes
// ============================================================================

#[tokio::test]
async fn test_route_endpoints() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    let app = test_app(db).await;

    let (status, body) = app
        .json(
            "POST",
            "/api/manager/routes",
            "acme_manager",
            serde_json::json!({
                "name": "Morning loop",
                "cleanerId": tenant.cleaner.id,
                "servicePointIds": [tenant.bus_stop.id, tenant.atm.id],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let route = &body["route"];
    assert_eq!(route["orderNum"], 1);
    assert_eq!(route["companyId"], tenant.company.id);
    assert_eq!(route["cleaner"]["username"], "acme_cleaner");
    let stops: Vec<i64> = route["routePoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["servicePointId"].as_i64().unwrap())
        .collect();
    assert_eq!(stops, vec![tenant.bus_stop.id, tenant.atm.id]);
    let id = route["id"].as_i64().unwrap();

    let (status, body) = app
        .json(
            "PUT",
            &format!("/api/manager/routes/{}", id),
            "acme_manager",
            serde_json::json!({ "name": "Evening loop" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"]["name"], "Evening loop");
    assert_eq!(body["route"]["routePoints"].as_array().unwrap().len(), 2);

    let (_, body) = app.get("/api/manager/routes", "acme_manager").await;
    assert_eq!(body["routes"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .json("DELETE", &format!("/api/manager/routes/{}", id), "acme_manager", serde_json::json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Route deleted");

    let (status, body) = app
        .json("DELETE", &format!("/api/manager/routes/{}", id), "acme_manager", serde_json::json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Route not found");
}
