// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use school_exams::{
    config::Config,
    models::{
        profile::{CreateStudentRequest, CreateTeacherRequest},
        user::Role,
    },
    repository::{ExamRepository, MemoryRepository},
    routes,
    state::AppState,
    utils::{clock::ManualClock, jwt::sign_jwt},
};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepository>,
    pub clock: Arc<ManualClock>,
    pub client: reqwest::Client,
}

/// A fixed instant so that deadline arithmetic in tests is exact.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
}

/// Spawns the app on a random port, backed by in-memory storage and a manual clock.
pub async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let clock = Arc::new(ManualClock::new(t0()));

    let config = Config {
        database_url: None,
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    };

    let state = AppState {
        repo: repo.clone(),
        clock: clock.clone(),
        config,
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        repo,
        clock,
        client: reqwest::Client::new(),
    }
}

/// A seeded account: its bearer token and, for teachers and students, its profile id.
pub struct Account {
    pub user_id: i64,
    pub profile_id: i64,
    pub token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    pub fn token_for(&self, user_id: i64, role: Role) -> String {
        sign_jwt(user_id, role, JWT_SECRET, 600).unwrap()
    }

    pub async fn admin(&self) -> Account {
        let user = self
            .repo
            .create_user("admin", "unused-hash", Role::Admin)
            .await
            .unwrap();
        Account {
            user_id: user.id,
            profile_id: 0,
            token: self.token_for(user.id, Role::Admin),
        }
    }

    pub async fn teacher(&self, name: &str) -> Account {
        let user = self
            .repo
            .create_user(name, "unused-hash", Role::Teacher)
            .await
            .unwrap();
        let profile = self
            .repo
            .create_teacher(&CreateTeacherRequest {
                user_id: user.id,
                employee_id: format!("E-{}", name),
                subject_specialization: "Math".to_string(),
            })
            .await
            .unwrap();
        Account {
            user_id: user.id,
            profile_id: profile.id,
            token: self.token_for(user.id, Role::Teacher),
        }
    }

    pub async fn student(&self, name: &str) -> Account {
        let user = self
            .repo
            .create_user(name, "unused-hash", Role::Student)
            .await
            .unwrap();
        let profile = self
            .repo
            .create_student(&CreateStudentRequest {
                user_id: user.id,
                roll_number: format!("R-{}", name),
                grade: "10".to_string(),
            })
            .await
            .unwrap();
        Account {
            user_id: user.id,
            profile_id: profile.id,
            token: self.token_for(user.id, Role::Student),
        }
    }

    pub async fn post(&self, path: &str, token: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, token: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates an exam through the API and returns its id.
    pub async fn create_exam(&self, teacher: &Account, title: &str, duration: i32) -> i64 {
        let response = self
            .post(
                "/exams",
                &teacher.token,
                serde_json::json!({ "title": title, "duration_minutes": duration }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let exam: serde_json::Value = response.json().await.unwrap();
        exam["id"].as_i64().unwrap()
    }

    /// Adds a question through the API and returns its id.
    pub async fn add_question(&self, teacher: &Account, exam_id: i64, text: &str, correct: &str) -> i64 {
        let response = self
            .post(
                &format!("/exams/{}/questions", exam_id),
                &teacher.token,
                question_body(text, correct),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let question: serde_json::Value = response.json().await.unwrap();
        question["id"].as_i64().unwrap()
    }

    pub async fn assign(&self, teacher: &Account, exam_id: i64, students: &[i64]) {
        let response = self
            .post(
                &format!("/exams/{}/students", exam_id),
                &teacher.token,
                serde_json::json!({ "student_ids": students }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
    }
}

pub fn question_body(text: &str, correct: &str) -> serde_json::Value {
    serde_json::json!({
        "question_text": text,
        "option_a": "3",
        "option_b": "4",
        "option_c": "5",
        "option_d": "6",
        "correct_option": correct
    })
}
