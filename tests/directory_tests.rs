//! Directory integration tests: users, companies and service points

mod common;
use common::*;

use chrono::Utc;
use sea_orm::{EntityTrait, PaginatorTrait};

use feedbackatm::error::AppError;
use feedbackatm::models::prelude::*;
use feedbackatm::schemas::*;
use feedbackatm::services::directory;

fn new_user(username: &str, role: UserRole, company_id: Option<i64>) -> CreateUserRequest {
    CreateUserRequest {
        username: username.to_string(),
        email: Some(format!("{}@example.com", username.trim())),
        password: "secret-password".to_string(),
        role,
        company_id,
    }
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_create_user() {
    let db = create_test_db().await;
    let company = create_company(&db, "Acme").await;

    let user = directory::create_user(&db, &new_user(" bob ", UserRole::Cleaner, Some(company.id)))
        .await
        .unwrap();
    assert_eq!(user.username, "bob");
    assert_eq!(user.company_id, Some(company.id));

    let err = directory::create_user(&db, &new_user("bob", UserRole::Manager, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Username or email already exists"));
}

#[tokio::test]
async fn test_create_user_checks_input() {
    let db = create_test_db().await;

    let err = directory::create_user(&db, &new_user("ghost", UserRole::Cleaner, Some(99)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(msg) if msg == "Company not found"));

    let mut bad_email = new_user("mail", UserRole::Cleaner, None);
    bad_email.email = Some("not-an-address".to_string());
    let err = directory::create_user(&db, &bad_email).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid email"));

    let mut blank_email = new_user("blank", UserRole::Observer, None);
    blank_email.email = Some("   ".to_string());
    let user = directory::create_user(&db, &blank_email).await.unwrap();
    assert_eq!(user.email, None);

    let mut no_password = new_user("nopass", UserRole::Cleaner, None);
    no_password.password = String::new();
    assert!(matches!(
        directory::create_user(&db, &no_password).await.unwrap_err(),
        AppError::Validation(_)
    ));
}

#[tokio::test]
async fn test_update_user_fields() {
    let db = create_test_db().await;
    let company = create_company(&db, "Acme").await;
    let user = create_user(&db, "carol", UserRole::Supervisor, Some(company.id)).await;

    let (previous, updated) = directory::update_user(
        &db,
        user.id,
        &UpdateUserRequest {
            username: Some("caroline".to_string()),
            email: Some(None),
            company_id: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(previous, "carol");
    assert_eq!(updated.username, "caroline");
    assert_eq!(updated.email, None);
    assert_eq!(updated.company_id, None);
    assert_eq!(updated.role, UserRole::Supervisor);
}

#[tokio::test]
async fn test_update_user_conflict_and_missing() {
    let db = create_test_db().await;
    create_user(&db, "taken", UserRole::Cleaner, None).await;
    let user = create_user(&db, "free", UserRole::Cleaner, None).await;

    let err = directory::update_user(
        &db,
        user.id,
        &UpdateUserRequest {
            username: Some("taken".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = directory::update_user(&db, 404, &UpdateUserRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_user_removes_tasks() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    insert_task(&db, tenant.atm.id, tenant.cleaner.id, TaskStatus::Pending, Some(Utc::now()), None).await;

    let removed = directory::delete_user(&db, tenant.cleaner.id).await.unwrap();
    assert_eq!(removed.username, "acme_cleaner");
    assert_eq!(CleaningTask::find().count(&db).await.unwrap(), 0);
    assert_eq!(CleanerAssignment::find().count(&db).await.unwrap(), 0);

    assert!(directory::delete_user(&db, tenant.cleaner.id).await.is_err());
}

#[tokio::test]
async fn test_list_users_with_assignments() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;

    let users = directory::list_users(&db).await.unwrap();
    assert_eq!(users.len(), 2);

    let cleaner = users.iter().find(|u| u.id == tenant.cleaner.id).unwrap();
    assert_eq!(cleaner.company.as_ref().map(|c| c.name.as_str()), Some("Acme"));
    assert_eq!(cleaner.assigned_points.as_ref().map(Vec::len), Some(2));
}

// ============================================================================
// Companies
// ============================================================================

#[tokio::test]
async fn test_company_crud() {
    let db = create_test_db().await;

    let company = directory::create_company(
        &db,
        &CreateCompanyRequest {
            name: "Initech".to_string(),
            description: None,
            address: Some("Baku".to_string()),
        },
    )
    .await
    .unwrap();

    let err = directory::create_company(
        &db,
        &CreateCompanyRequest {
            name: "Initech".to_string(),
            description: None,
            address: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Company name already exists"));

    let updated = directory::update_company(
        &db,
        company.id,
        &UpdateCompanyRequest {
            description: Some("Software".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.name, "Initech");
    assert_eq!(updated.description.as_deref(), Some("Software"));
    assert_eq!(updated.address.as_deref(), Some("Baku"));

    directory::delete_company(&db, company.id).await.unwrap();
    let err = directory::delete_company(&db, company.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(msg) if msg == "Company not found"));
}

#[tokio::test]
async fn test_list_companies_with_members() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    create_company(&db, "Empty").await;

    let companies = directory::list_companies(&db).await.unwrap();
    assert_eq!(companies.len(), 2);

    let acme = &companies[0];
    assert_eq!(acme.company.name, "Acme");
    assert_eq!(acme.counts.service_points, 2);
    assert_eq!(acme.counts.users, 2);
    let cleaner = acme.users.iter().find(|u| u.id == tenant.cleaner.id).unwrap();
    assert_eq!(cleaner.assigned_points.len(), 2);

    let empty = &companies[1];
    assert_eq!(empty.counts.users, 0);
    assert!(empty.service_points.is_empty());
}

#[tokio::test]
async fn test_delete_company_cascades() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    insert_task(&db, tenant.atm.id, tenant.cleaner.id, TaskStatus::Pending, Some(Utc::now()), None).await;

    directory::delete_company(&db, tenant.company.id).await.unwrap();

    assert_eq!(ServicePoint::find().count(&db).await.unwrap(), 0);
    assert_eq!(CleaningTask::find().count(&db).await.unwrap(), 0);
    assert_eq!(CleanerAssignment::find().count(&db).await.unwrap(), 0);
}

// ============================================================================
// Service points
// ============================================================================

#[tokio::test]
async fn test_create_service_point_parses_coordinates() {
    let db = create_test_db().await;
    let company = create_company(&db, "Acme").await;

    let point = directory::create_service_point(
        &db,
        &CreateServicePointRequest {
            name: "Fountain Square ATM".to_string(),
            point_type: ServicePointType::Atm,
            address: "Nizami 10".to_string(),
            latitude: CoordinateInput::Text(" 40.3719 ".to_string()),
            longitude: CoordinateInput::Number(49.8370),
            company_id: company.id,
        },
    )
    .await
    .unwrap();

    assert_eq!(point.latitude, 40.3719);
    assert_eq!(point.longitude, 49.8370);
    assert_eq!(point.company.as_ref().map(|c| c.id), Some(company.id));

    let err = directory::create_service_point(
        &db,
        &CreateServicePointRequest {
            name: "Broken".to_string(),
            point_type: ServicePointType::BusStop,
            address: "Nowhere".to_string(),
            latitude: CoordinateInput::Text("north".to_string()),
            longitude: CoordinateInput::Number(49.0),
            company_id: company.id,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid latitude"));
}

#[tokio::test]
async fn test_update_service_point() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    let other = create_company(&db, "Globex").await;

    let moved = directory::update_service_point(
        &db,
        tenant.atm.id,
        &UpdateServicePointRequest {
            point_type: Some(ServicePointType::BusStop),
            company_id: Some(other.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(moved.point_type, ServicePointType::BusStop);
    assert_eq!(moved.company_id, other.id);
    assert_eq!(moved.name, "Acme ATM");

    let err = directory::update_service_point(
        &db,
        tenant.atm.id,
        &UpdateServicePointRequest {
            company_id: Some(9000),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_list_service_points_counts_tasks() {
    let db = create_test_db().await;
    let acme = create_tenant(&db, "Acme").await;
    let globex = create_tenant(&db, "Globex").await;
    let now = Some(Utc::now());
    insert_task(&db, acme.atm.id, acme.cleaner.id, TaskStatus::Pending, now, None).await;
    insert_task(&db, acme.atm.id, acme.cleaner.id, TaskStatus::Completed, now, None).await;

    let all = directory::list_service_points(&db, None, true).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|p| p.point.company.is_some()));

    let scoped = directory::list_service_points(&db, Some(acme.company.id), false)
        .await
        .unwrap();
    assert_eq!(scoped.len(), 2);
    assert!(scoped.iter().all(|p| p.point.company.is_none()));
    let atm = scoped.iter().find(|p| p.point.id == acme.atm.id).unwrap();
    assert_eq!(atm.counts.cleaning_tasks, 2);
    let stop = scoped.iter().find(|p| p.point.id == acme.bus_stop.id).unwrap();
    assert_eq!(stop.counts.cleaning_tasks, 0);
    assert!(!scoped.iter().any(|p| p.point.id == globex.atm.id));
}

#[tokio::test]
async fn test_delete_service_point_cascades() {
    let db = create_test_db().await;
    let tenant = create_tenant(&db, "Acme").await;
    insert_task(&db, tenant.atm.id, tenant.cleaner.id, TaskStatus::Pending, Some(Utc::now()), None).await;

    directory::delete_service_point(&db, tenant.atm.id).await.unwrap();

    assert_eq!(CleaningTask::find().count(&db).await.unwrap(), 0);
    assert_eq!(CleanerAssignment::find().count(&db).await.unwrap(), 1);
    let err = directory::delete_service_point(&db, tenant.atm.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(msg) if msg == "Service point not found"));
}
