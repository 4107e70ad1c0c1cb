//! Shared harness for the HTTP integration tests: an app on the in-memory
//! store, seeded users, and a small request helper.
#![allow(dead_code)]

use api_lib::{
    adapters::InMemoryAdapter,
    config::Config,
    web::{auth::hash_password, build_router, state::AppState, token, Principal},
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use job_ledger_core::domain::{NewUser, Role, User};
use job_ledger_core::ports::DatabaseService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "memory://".to_string(),
        db_max_connections: 1,
        log_level: tracing::Level::WARN,
        jwt_secret: "integration-test-secret-that-is-long-enough".to_string(),
        token_ttl_hours: 1,
        cors_origin: "http://localhost:3000".to_string(),
        admin: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryAdapter>,
    pub config: Arc<Config>,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(InMemoryAdapter::new());
        let config = Arc::new(test_config());
        let state = Arc::new(AppState::new(db.clone(), config.clone()));
        let router = build_router(state).unwrap();
        Self { router, db, config }
    }

    /// Creates a user directly in the store and returns it with a valid token.
    pub async fn seed_user(&self, username: &str, role: Role) -> (User, String) {
        let user = self
            .db
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                first_name: String::new(),
                last_name: String::new(),
                role,
                hashed_password: hash_password(PASSWORD).unwrap(),
            })
            .await
            .unwrap();
        let token = self.token_for(&Principal::Staff {
            user_id: user.id,
            role,
        });
        (user, token)
    }

    pub fn token_for(&self, principal: &Principal) -> String {
        token::issue(principal, &self.config.jwt_secret, self.config.token_ttl_hours)
            .unwrap()
            .0
    }

    /// Sends one request and returns the status with the decoded envelope.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Creates a job through the API and returns its id.
    pub async fn create_job(&self, admin_token: &str, title: &str, income: i64) -> Uuid {
        let client_email = format!("{}@client.example.com", title.to_lowercase().replace(' ', "-"));
        let (status, body) = self
            .post(
                "/jobs",
                admin_token,
                json!({
                    "title": title,
                    "client_email": client_email,
                    "client_password": PASSWORD,
                    "over_all_income": income,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body["data"])
    }

    /// Adds tasks to a job through the API and returns the created tasks.
    pub async fn add_tasks(&self, admin_token: &str, job_id: Uuid, tasks: Value) -> Vec<Value> {
        let (status, body) = self
            .post(
                &format!("/jobs/{}/tasks", job_id),
                admin_token,
                json!({ "tasks": tasks }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"].as_array().cloned().unwrap()
    }
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"].as_str().unwrap().parse().unwrap()
}

/// Percentage of the task with the given title in a task list.
pub fn percentage_of(tasks: &[Value], title: &str) -> f64 {
    tasks
        .iter()
        .find(|t| t["title"] == title)
        .and_then(|t| t["task_percentage"].as_f64())
        .unwrap()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {} to be close to {}",
        actual,
        expected
    );
}
