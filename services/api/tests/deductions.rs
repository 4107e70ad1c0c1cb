mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::{id_of, TestApp};
use job_ledger_core::domain::Role;
use serde_json::json;

#[tokio::test]
async fn deductions_drain_the_balance_and_are_logged() {
    let app = TestApp::new();
    let (admin_user, admin) = app.seed_user("admin", Role::Admin).await;
    let (dev, dev_token) = app.seed_user("dev", Role::Developer).await;
    let (_, other_token) = app.seed_user("other", Role::Developer).await;
    let job = app.create_job(&admin, "Billing", 5000).await;
    let tasks = app
        .add_tasks(
            &admin,
            job,
            json!([
                { "title": "Invoices", "hours": 3, "money_for_task": 300, "progress": 100, "assignee_ids": [dev.id] },
                { "title": "Reports", "hours": 2, "money_for_task": 200, "progress": 100, "assignee_ids": [dev.id] },
            ]),
        )
        .await;
    let ids: Vec<_> = tasks.iter().map(id_of).collect();
    app.post("/confirmations/bulk", &admin, json!({ "task_ids": ids }))
        .await;

    let deduct_uri = format!("/developers/{}/deductions", dev.id);
    let balance_uri = format!("/developers/{}/balance", dev.id);
    let (_, balance) = app.get(&balance_uri, &dev_token).await;
    assert_eq!(balance["data"]["balance"], 500);

    let (status, _) = app.post(&deduct_uri, &admin, json!({ "amount": 501 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&deduct_uri, &admin, json!({ "amount": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&deduct_uri, &dev_token, json!({ "amount": 10 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&deduct_uri, &admin, json!({ "amount": 350 })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["amount"], 350);
    assert_eq!(body["data"]["deducted_by"], admin_user.id.to_string());

    let (_, balance) = app.get(&balance_uri, &dev_token).await;
    assert_eq!(balance["data"]["balance"], 150);

    let (status, _) = app.get(&balance_uri, &other_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, own_logs) = app.get(&deduct_uri, &dev_token).await;
    assert_eq!(own_logs["data"].as_array().unwrap().len(), 1);

    let now = Utc::now();
    let (status, logs) = app
        .get(
            &format!("/deductions?month={:04}-{:02}", now.year(), now.month()),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/deductions?month=2025-13", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/deductions", &dev_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deducting_from_an_unknown_developer_is_not_found() {
    let app = TestApp::new();
    let (_, admin) = app.seed_user("admin", Role::Admin).await;

    let (status, _) = app
        .post(
            &format!("/developers/{}/deductions", uuid::Uuid::new_v4()),
            &admin,
            json!({ "amount": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
