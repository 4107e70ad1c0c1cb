mod common;

use axum::http::{Method, StatusCode};
use common::{assert_close, id_of, percentage_of, TestApp};
use job_ledger_core::domain::Role;
use serde_json::json;

#[tokio::test]
async fn percentages_follow_hours_across_create_update_and_delete() {
    let app = TestApp::new();
    let (_, admin) = app.seed_user("admin", Role::Admin).await;
    let job = app.create_job(&admin, "Mobile App", 10_000).await;

    let created = app
        .add_tasks(
            &admin,
            job,
            json!([
                { "title": "Design", "hours": 3 },
                { "title": "Build", "hours": 7 },
            ]),
        )
        .await;
    assert_close(percentage_of(&created, "Design"), 30.0);
    assert_close(percentage_of(&created, "Build"), 70.0);

    app.add_tasks(&admin, job, json!([{ "title": "Test", "hours": 5 }]))
        .await;
    let (_, listed) = app.get(&format!("/jobs/{}/tasks", job), &admin).await;
    let tasks = listed["data"].as_array().cloned().unwrap();
    assert_close(percentage_of(&tasks, "Design"), 20.0);
    assert_close(percentage_of(&tasks, "Build"), 46.67);
    assert_close(percentage_of(&tasks, "Test"), 33.33);
    let sum: f64 = tasks
        .iter()
        .map(|t| t["task_percentage"].as_f64().unwrap())
        .sum();
    assert_close(sum, 100.0);

    let build = tasks.iter().find(|t| t["title"] == "Build").unwrap();
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/jobs/{}/tasks/{}", job, id_of(build)),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, listed) = app.get(&format!("/jobs/{}/tasks", job), &admin).await;
    let tasks = listed["data"].as_array().cloned().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_close(percentage_of(&tasks, "Design"), 37.5);
    assert_close(percentage_of(&tasks, "Test"), 62.5);

    let design = tasks.iter().find(|t| t["title"] == "Design").unwrap();
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/jobs/{}/tasks/{}", job, id_of(design)),
            Some(&admin),
            Some(json!({ "hours": 15 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, listed) = app.get(&format!("/jobs/{}/tasks", job), &admin).await;
    let tasks = listed["data"].as_array().cloned().unwrap();
    assert_close(percentage_of(&tasks, "Design"), 75.0);
    assert_close(percentage_of(&tasks, "Test"), 25.0);
}

#[tokio::test]
async fn invalid_tasks_are_rejected() {
    let app = TestApp::new();
    let (_, admin) = app.seed_user("admin", Role::Admin).await;
    let job = app.create_job(&admin, "Website", 0).await;
    let uri = format!("/jobs/{}/tasks", job);

    let (status, _) = app.post(&uri, &admin, json!({ "tasks": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(&uri, &admin, json!({ "tasks": [{ "title": "Zero", "hours": 0 }] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &uri,
            &admin,
            json!({ "tasks": [{ "title": "Odd", "hours": 1, "task_type": "weekly" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/jobs/00000000-0000-0000-0000-000000000000/tasks",
            &admin,
            json!({ "tasks": [{ "title": "Lost", "hours": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recurring_tasks_expand_into_monthly_instances() {
    let app = TestApp::new();
    let (_, admin) = app.seed_user("admin", Role::Admin).await;
    let job = app.create_job(&admin, "Maintenance", 1200).await;

    let created = app
        .add_tasks(
            &admin,
            job,
            json!([{ "title": "Monthly check", "hours": 2, "task_type": "recurring" }]),
        )
        .await;
    assert_eq!(created.len(), 12);
    let dated = created.iter().filter(|t| t["deadline"].is_string()).count();
    assert!(dated >= 11, "only {} instances have a deadline", dated);
    let sum: f64 = created
        .iter()
        .map(|t| t["task_percentage"].as_f64().unwrap())
        .sum();
    assert_close(sum, 100.0);
}

#[tokio::test]
async fn developers_update_only_their_own_tasks() {
    let app = TestApp::new();
    let (_, admin) = app.seed_user("admin", Role::Admin).await;
    let (dev, dev_token) = app.seed_user("dev", Role::Developer).await;
    let (_, other_token) = app.seed_user("other", Role::Developer).await;
    let job = app.create_job(&admin, "Portal", 5000).await;
    let tasks = app
        .add_tasks(
            &admin,
            job,
            json!([{ "title": "API", "hours": 4, "assignee_ids": [dev.id] }]),
        )
        .await;
    let task = id_of(&tasks[0]);

    let (status, _) = app
        .post(&format!("/tasks/{}/progress", task), &other_token, json!({ "progress": 50 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(&format!("/tasks/{}/progress", task), &dev_token, json!({ "progress": 50 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["progress"], 50);

    let (status, _) = app
        .post(&format!("/tasks/{}/progress", task), &dev_token, json!({ "progress": 101 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/jobs/{}/tasks/{}", job, task),
            Some(&dev_token),
            Some(json!({ "hours": 40 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &format!("/jobs/{}/tasks", job),
            &dev_token,
            json!({ "tasks": [{ "title": "Sneaky", "hours": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, mine) = app.get("/tasks/mine", &dev_token).await;
    assert_eq!(mine["data"]["tasks"].as_array().unwrap().len(), 1);
    let (_, jobs) = app.get("/jobs", &other_token).await;
    assert!(jobs["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn toggling_switches_between_simple_and_monthly() {
    let app = TestApp::new();
    let (_, admin) = app.seed_user("admin", Role::Admin).await;
    let job = app.create_job(&admin, "Retainer", 100).await;
    let tasks = app
        .add_tasks(&admin, job, json!([{ "title": "Support", "hours": 1 }]))
        .await;
    let uri = format!("/tasks/{}/toggle-type", id_of(&tasks[0]));

    let (_, body) = app.post(&uri, &admin, json!({})).await;
    assert_eq!(body["data"]["task_type"], "monthly");
    let (_, body) = app.post(&uri, &admin, json!({})).await;
    assert_eq!(body["data"]["task_type"], "simple");
}

#[tokio::test]
async fn deleting_a_job_removes_its_tasks() {
    let app = TestApp::new();
    let (_, admin) = app.seed_user("admin", Role::Admin).await;
    let job = app.create_job(&admin, "Short lived", 100).await;
    app.add_tasks(
        &admin,
        job,
        json!([{ "title": "One", "hours": 1 }, { "title": "Two", "hours": 2 }]),
    )
    .await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/jobs/{}", job), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/jobs/{}/tasks", job), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, all) = app.get("/tasks", &admin).await;
    assert!(all["data"].as_array().unwrap().is_empty());
}
