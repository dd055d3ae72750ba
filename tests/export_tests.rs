//! Export integration tests
//!
//! CSV and PDF exports honor the active filters and the caller's role
//! scoping, and their row counts match the list endpoint.

use axum::http::StatusCode;
use http_body_util::BodyExt;

mod common;
use common::{
    build_app_state, create_test_db, create_test_user, login_cookie, seed_reference_row,
    send_raw_request, send_request,
};

use praias::models::user::Role;
use praias::state::AppState;

async fn create_occurrence(state: AppState, cookie: &str, zone_id: i64, type_id: i64, date: &str) {
    let (status, body) = send_request(
        state,
        "POST",
        "/api/occurrences",
        Some(cookie),
        Some(serde_json::json!({
            "zone_id": zone_id,
            "type_id": type_id,
            "date": date,
            "time": "12:00",
            "description": "exported row",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
}

#[tokio::test]
async fn test_csv_export_row_count_matches_list() {
    let db = create_test_db().await;
    create_test_user(&db, "Root", "root@example.com", "pw", Role::Admin).await;
    let (zone_id, type_id) = seed_reference_row(&db).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "root@example.com", "pw").await;

    for date in ["2026-07-01", "2026-07-02", "2026-07-03"] {
        create_occurrence(state.clone(), &cookie, zone_id, type_id, date).await;
    }

    let (_, list) = send_request(state.clone(), "GET", "/api/occurrences", Some(&cookie), None).await;
    let total = list.as_array().unwrap().len();
    assert_eq!(total, 3);

    let response =
        send_raw_request(state, "GET", "/api/occurrences/export/csv", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/csv; charset=utf-8"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    // Header plus one line per occurrence.
    assert_eq!(text.trim_end().lines().count(), total + 1);
    assert!(text.starts_with("id,date,time,zone,type,location,description,status,reporter"));
}

#[tokio::test]
async fn test_csv_export_honors_filters() {
    let db = create_test_db().await;
    create_test_user(&db, "Root", "root@example.com", "pw", Role::Admin).await;
    let (zone_id, type_id) = seed_reference_row(&db).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "root@example.com", "pw").await;

    for date in ["2026-07-01", "2026-07-02", "2026-07-03"] {
        create_occurrence(state.clone(), &cookie, zone_id, type_id, date).await;
    }

    let response = send_raw_request(
        state,
        "GET",
        "/api/occurrences/export/csv?start_date=2026-07-02",
        Some(&cookie),
    )
    .await;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert_eq!(text.trim_end().lines().count(), 2 + 1);
}

#[tokio::test]
async fn test_swimmer_csv_export_scoped_to_own_rows() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
    create_test_user(&db, "Root", "root@example.com", "pw", Role::Admin).await;
    let (zone_id, type_id) = seed_reference_row(&db).await;

    let state = build_app_state(db);
    let ana_cookie = login_cookie(state.clone(), "ana@example.com", "pw").await;
    let admin_cookie = login_cookie(state.clone(), "root@example.com", "pw").await;

    create_occurrence(state.clone(), &ana_cookie, zone_id, type_id, "2026-07-01").await;
    create_occurrence(state.clone(), &admin_cookie, zone_id, type_id, "2026-07-02").await;

    let response = send_raw_request(
        state.clone(),
        "GET",
        "/api/occurrences/export/csv",
        Some(&ana_cookie),
    )
    .await;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.trim_end().lines().count(), 1 + 1, "swimmer sees one row");

    let response = send_raw_request(
        state,
        "GET",
        "/api/occurrences/export/csv",
        Some(&admin_cookie),
    )
    .await;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.trim_end().lines().count(), 2 + 1, "admin sees all rows");
}

#[tokio::test]
async fn test_pdf_export_returns_pdf_document() {
    let db = create_test_db().await;
    create_test_user(&db, "Root", "root@example.com", "pw", Role::Admin).await;
    let (zone_id, type_id) = seed_reference_row(&db).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "root@example.com", "pw").await;
    create_occurrence(state.clone(), &cookie, zone_id, type_id, "2026-07-01").await;

    let response =
        send_raw_request(state, "GET", "/api/occurrences/export/pdf", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"%PDF"), "body must be a PDF document");
}

#[tokio::test]
async fn test_export_requires_authentication() {
    let db = create_test_db().await;
    let state = build_app_state(db);

    let response = send_raw_request(state, "GET", "/api/occurrences/export/csv", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_export_is_audited() {
    use praias::models::activity_log;
    use praias::models::prelude::*;
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

    let db = create_test_db().await;
    create_test_user(&db, "Root", "root@example.com", "pw", Role::Admin).await;

    let state = build_app_state(db.clone());
    let cookie = login_cookie(state.clone(), "root@example.com", "pw").await;

    send_raw_request(state, "GET", "/api/occurrences/export/csv", Some(&cookie)).await;

    let entries = ActivityLog::find()
        .filter(activity_log::Column::Action.eq("export_csv"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(entries, 1);
}
