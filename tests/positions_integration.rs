mod common;

use common::{spawn_app, LoggedInUser, TestApp};
use serde_json::{json, Value};

async fn create_position(app: &TestApp, user: &LoggedInUser, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(&app.url("/positions"))
        .bearer_auth(&user.access_token)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.")
}

#[tokio::test]
async fn create_position_records_owner() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;

    let response = create_position(&app, &user, json!({ "code": "P1", "name": "Lead" })).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "P1");
    assert_eq!(body["name"], "Lead");
    assert_eq!(body["user_id"].as_i64(), Some(user.id));
}

#[tokio::test]
async fn create_position_accepts_prefixed_field_names() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;

    let response = create_position(
        &app,
        &user,
        json!({ "position_code": "P2", "position_name": "Engineer" }),
    )
    .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "P2");
}

#[tokio::test]
async fn create_position_returns_400_for_invalid_data() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;

    let test_cases = vec![
        (json!({ "name": "Lead" }), "missing code"),
        (json!({ "code": "P1" }), "missing name"),
        (json!({ "code": "", "name": "Lead" }), "empty code"),
        (json!({ "code": "P1", "name": "x".repeat(200) }), "name too long"),
    ];

    for (body, reason) in test_cases {
        let response = create_position(&app, &user, body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject: {}", reason);
    }
}

#[tokio::test]
async fn create_position_requires_access_token() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;

    let response = reqwest::Client::new()
        .post(&app.url("/positions"))
        .json(&json!({ "code": "P1", "name": "Lead" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let response = reqwest::Client::new()
        .post(&app.url("/positions"))
        .bearer_auth(&user.refresh_token)
        .json(&json!({ "code": "P1", "name": "Lead" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn get_position_returns_404_for_unknown_id() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;

    let response = reqwest::Client::new()
        .get(&app.url("/positions/999"))
        .bearer_auth(&user.access_token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn update_position_changes_only_given_fields() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;
    let created: Value = create_position(&app, &user, json!({ "code": "P1", "name": "Lead" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    let response = reqwest::Client::new()
        .put(&app.url(&format!("/positions/{}", id)))
        .bearer_auth(&user.access_token)
        .json(&json!({ "name": "Principal" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Position updated successfully");
    assert_eq!(body["position"]["code"], "P1");
    assert_eq!(body["position"]["name"], "Principal");
}

#[tokio::test]
async fn update_position_rejects_empty_body_and_unknown_id() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;
    let client = reqwest::Client::new();

    let response = client
        .put(&app.url("/positions/1"))
        .bearer_auth(&user.access_token)
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, response.status().as_u16());

    let response = client
        .put(&app.url("/positions/999"))
        .bearer_auth(&user.access_token)
        .json(&json!({ "code": "P9" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn delete_position_twice_returns_404() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;
    let client = reqwest::Client::new();
    let created: Value = create_position(&app, &user, json!({ "code": "P1", "name": "Lead" }))
        .await
        .json()
        .await
        .unwrap();
    let url = app.url(&format!("/positions/{}", created["id"]));

    let response = client
        .delete(&url)
        .bearer_auth(&user.access_token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Position deleted successfully.");

    let response = client
        .delete(&url)
        .bearer_auth(&user.access_token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn deleting_owner_keeps_position_without_owner() {
    let app = spawn_app().await;
    let owner = app.signed_in_user("alice").await;
    let other = app.signed_in_user("bob").await;
    let client = reqwest::Client::new();
    let created: Value = create_position(&app, &owner, json!({ "code": "P1", "name": "Lead" }))
        .await
        .json()
        .await
        .unwrap();

    let response = client
        .delete(&app.url(&format!("/users/{}", owner.id)))
        .bearer_auth(&other.access_token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let response = client
        .get(&app.url(&format!("/positions/{}", created["id"])))
        .bearer_auth(&other.access_token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["user_id"].is_null());
}

#[tokio::test]
async fn create_position_with_token_of_deleted_user_returns_401() {
    let app = spawn_app().await;
    let user = app.signed_in_user("alice").await;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&app.db_pool)
        .await
        .expect("Failed to delete user");

    let response = create_position(&app, &user, json!({ "code": "P1", "name": "Lead" })).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM positions")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to count positions");
    assert_eq!(count, 0);
}
