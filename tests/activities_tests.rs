//! Audit trail integration tests
//!
//! Every mutating action leaves exactly one activity entry, readable by the
//! acting user and (for other users' trails) by admins only.

use axum::http::StatusCode;

mod common;
use common::{
    build_app_state, create_test_db, create_test_user, login_cookie, seed_reference_row,
    send_request,
};

use praias::models::user::Role;

#[tokio::test]
async fn test_login_is_audited_and_visible_to_self() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "ana@example.com", "pw").await;

    let (status, body) =
        send_request(state, "GET", "/api/activities", Some(&cookie), None).await;

    assert_eq!(status, StatusCode::OK);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "login");
}

#[tokio::test]
async fn test_mutations_append_entries_newest_first() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
    let (zone_id, type_id) = seed_reference_row(&db).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "ana@example.com", "pw").await;

    let (status, created) = send_request(
        state.clone(),
        "POST",
        "/api/occurrences",
        Some(&cookie),
        Some(serde_json::json!({
            "zone_id": zone_id,
            "type_id": type_id,
            "date": "2026-07-14",
            "time": "09:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let occ_id = created["id"].as_i64().unwrap();
    let (status, _) = send_request(
        state.clone(),
        "PATCH",
        &format!("/api/occurrences/{}", occ_id),
        Some(&cookie),
        Some(serde_json::json!({"description": "updated"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send_request(state, "GET", "/api/activities", Some(&cookie), None).await;
    let actions: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();

    assert_eq!(actions, vec!["edit_occurrence", "create_occurrence", "login"]);
}

#[tokio::test]
async fn test_action_filter() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "ana@example.com", "pw").await;

    let (_, body) = send_request(
        state,
        "GET",
        "/api/activities?action=login",
        Some(&cookie),
        None,
    )
    .await;

    assert_eq!(body["total"], 1);
    assert_eq!(body["entries"][0]["action"], "login");
}

#[tokio::test]
async fn test_admin_can_read_other_users_trail() {
    let db = create_test_db().await;
    let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
    create_test_user(&db, "Root", "root@example.com", "pw", Role::Admin).await;

    let state = build_app_state(db);
    login_cookie(state.clone(), "ana@example.com", "pw").await;
    let admin_cookie = login_cookie(state.clone(), "root@example.com", "pw").await;

    let (status, body) = send_request(
        state,
        "GET",
        &format!("/api/activities?user_id={}", swimmer.id),
        Some(&admin_cookie),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"][0]["action"], "login");
    assert_eq!(body["entries"][0]["user_id"], swimmer.id);
}

#[tokio::test]
async fn test_non_admin_cannot_read_other_users_trail() {
    let db = create_test_db().await;
    let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
    create_test_user(&db, "Rui", "rui@example.com", "pw", Role::Supervisor).await;
    create_test_user(&db, "Bruno", "bruno@example.com", "pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let rui_cookie = login_cookie(state.clone(), "rui@example.com", "pw").await;
    let bruno_cookie = login_cookie(state.clone(), "bruno@example.com", "pw").await;

    for cookie in [&rui_cookie, &bruno_cookie] {
        let (status, _) = send_request(
            state.clone(),
            "GET",
            &format!("/api/activities?user_id={}", swimmer.id),
            Some(cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_pagination_limits_page_size() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
    let (zone_id, type_id) = seed_reference_row(&db).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "ana@example.com", "pw").await;

    for day in 1..=4 {
        let (status, _) = send_request(
            state.clone(),
            "POST",
            "/api/occurrences",
            Some(&cookie),
            Some(serde_json::json!({
                "zone_id": zone_id,
                "type_id": type_id,
                "date": format!("2026-07-{:02}", day),
                "time": "09:00",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send_request(
        state,
        "GET",
        "/api/activities?per_page=2&page=1",
        Some(&cookie),
        None,
    )
    .await;

    // 4 creations + 1 login in total, page holds 2.
    assert_eq!(body["total"], 5);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["total_pages"], 3);
}
