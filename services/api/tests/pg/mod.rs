//! Postgres harness for the adapter tests. Every helper returns `None` when
//! `TEST_DATABASE_URL` is unset so the suite still runs without a database.
#![allow(dead_code)]

use api_lib::adapters::DbAdapter;
use chrono::Utc;
use job_ledger_core::domain::{
    ClientContact, Job, NewJob, NewTask, NewUser, Role, Task, TaskFilter, TaskType, User,
};
use job_ledger_core::ports::DatabaseService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

/// Connects, migrates and empties every table.
pub async fn setup_db() -> Option<Arc<DbAdapter>> {
    let _ = dotenvy::dotenv();
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping Postgres adapter test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("failed to connect to TEST_DATABASE_URL");
    let db = DbAdapter::new(pool.clone());
    db.run_migrations().await.expect("migrations failed");

    sqlx::query("TRUNCATE TABLE deduction_logs, task_assignees, tasks, jobs, users CASCADE")
        .execute(&pool)
        .await
        .expect("truncate failed");

    Some(Arc::new(db))
}

pub async fn seed_user(db: &DbAdapter, username: &str, role: Role) -> User {
    db.create_user(NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        first_name: String::new(),
        last_name: String::new(),
        role,
        hashed_password: "not-a-real-hash".to_string(),
    })
    .await
    .unwrap()
}

pub async fn seed_job(db: &DbAdapter, title: &str, income: i64) -> Job {
    db.create_job(NewJob {
        title: title.to_string(),
        client_email: format!("{}@client.example.com", title.to_lowercase()),
        client_password_hash: "not-a-real-hash".to_string(),
        over_all_income: income,
        contact: ClientContact::default(),
    })
    .await
    .unwrap()
}

pub fn simple_task(title: &str, hours: i32, money: i64, progress: u8) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: String::new(),
        hours,
        money_for_task: money,
        progress,
        task_type: TaskType::Simple,
        deadline: None,
        assignee_ids: vec![],
    }
}

pub async fn job_tasks(db: &DbAdapter, job_id: Uuid) -> Vec<Task> {
    db.list_tasks(&TaskFilter::for_job(job_id, Utc::now().date_naive()))
        .await
        .unwrap()
}

pub fn percentage(tasks: &[Task], title: &str) -> f64 {
    tasks
        .iter()
        .find(|t| t.title == title)
        .map(|t| t.task_percentage)
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
