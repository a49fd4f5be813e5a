// tests/api_tests.rs

mod common;

use common::spawn_app;
use school_exams::{
    models::user::Role, repository::ExamRepository, utils::hash::hash_password,
};

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(&format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn login_works() {
    // Arrange
    let app = spawn_app().await;
    let hash = hash_password("password123").unwrap();
    app.repo
        .create_user("teacher1", &hash, Role::Teacher)
        .await
        .unwrap();

    // Act
    let response = app
        .client
        .post(app.url("/auth/login"))
        .json(&serde_json::json!({
            "username": "teacher1",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["role"], "teacher");
    let token = body["token"].as_str().expect("token missing");

    // The issued token opens protected routes
    let response = app.get("/exams", token).await;
    assert_eq!(response.status().as_u16(), 404, "teacher without profile");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = spawn_app().await;
    let hash = hash_password("password123").unwrap();
    app.repo
        .create_user("student1", &hash, Role::Student)
        .await
        .unwrap();

    for (username, password) in [("student1", "wrong"), ("nobody", "password123")] {
        let response = app
            .client
            .post(app.url("/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 401);
    }
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/exams"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = app.get("/exams", "not-a-jwt").await;
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_are_admin_only() {
    let app = spawn_app().await;
    let teacher = app.teacher("teacher1").await;
    let admin = app.admin().await;

    let response = app.get("/admin/users", &teacher.token).await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app.get("/admin/users", &admin.token).await;
    assert_eq!(response.status().as_u16(), 200);
    let users: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));
}

#[tokio::test]
async fn admin_provisions_accounts_and_profiles() {
    // Arrange
    let app = spawn_app().await;
    let admin = app.admin().await;

    // Act: account, then profile
    let response = app
        .post(
            "/admin/users",
            &admin.token,
            serde_json::json!({ "username": "teacher1", "password": "secret1", "role": "teacher" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let user: serde_json::Value = response.json().await.unwrap();
    let user_id = user["id"].as_i64().unwrap();

    let response = app
        .post(
            "/admin/teachers",
            &admin.token,
            serde_json::json!({ "user_id": user_id, "employee_id": "E-1" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);

    // Assert: duplicates conflict, wrong role is rejected
    let response = app
        .post(
            "/admin/users",
            &admin.token,
            serde_json::json!({ "username": "teacher1", "password": "secret1", "role": "student" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);

    let response = app
        .post(
            "/admin/students",
            &admin.token,
            serde_json::json!({ "user_id": user_id, "roll_number": "R-1", "grade": "10" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post(
            "/admin/teachers",
            &admin.token,
            serde_json::json!({ "user_id": 999, "employee_id": "E-2" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn unknown_role_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let response = app
        .post(
            "/admin/users",
            &admin.token,
            serde_json::json!({ "username": "someone", "password": "secret1", "role": "janitor" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
}
