//! Exercises `DbAdapter` against a real Postgres. Set `TEST_DATABASE_URL` to
//! run them; without it each test returns early.
mod pg;

use chrono::Utc;
use job_ledger_core::domain::{DeductionFilter, Role, TaskUpdate};
use job_ledger_core::ports::{DatabaseService, PortError};
use pg::{assert_close, job_tasks, percentage, seed_job, seed_user, setup_db, simple_task};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn percentages_are_renormalized_in_sql() {
    let Some(db) = setup_db().await else { return };
    let job = seed_job(&db, "Website", 1000).await;

    db.create_tasks(job.id, vec![simple_task("A", 3, 0, 0), simple_task("B", 7, 0, 0)])
        .await
        .unwrap();
    let tasks = job_tasks(&db, job.id).await;
    assert_close(percentage(&tasks, "A"), 30.0);
    assert_close(percentage(&tasks, "B"), 70.0);

    db.create_tasks(job.id, vec![simple_task("C", 5, 0, 0)])
        .await
        .unwrap();
    let tasks = job_tasks(&db, job.id).await;
    assert_close(percentage(&tasks, "A"), 20.0);
    assert_close(percentage(&tasks, "B"), 46.67);
    assert_close(percentage(&tasks, "C"), 33.33);

    let b = tasks.iter().find(|t| t.title == "B").unwrap().id;
    db.delete_task(b).await.unwrap();
    let tasks = job_tasks(&db, job.id).await;
    assert_close(percentage(&tasks, "A"), 37.5);
    assert_close(percentage(&tasks, "C"), 62.5);

    let a = tasks.iter().find(|t| t.title == "A").unwrap().id;
    db.update_task(
        a,
        TaskUpdate {
            hours: Some(5),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let tasks = job_tasks(&db, job.id).await;
    assert_close(percentage(&tasks, "A"), 50.0);
    assert_close(percentage(&tasks, "C"), 50.0);
    let sum: f64 = tasks.iter().map(|t| t.task_percentage).sum();
    assert_close(sum, 100.0);
}

#[tokio::test]
#[serial]
async fn deleting_a_job_cascades_to_its_tasks() {
    let Some(db) = setup_db().await else { return };
    let dev = seed_user(&db, "dev", Role::Developer).await;
    let job = seed_job(&db, "Cascade", 500).await;
    let mut task = simple_task("Only", 2, 100, 0);
    task.assignee_ids = vec![dev.id];
    let created = db.create_tasks(job.id, vec![task]).await.unwrap();

    db.delete_job(job.id).await.unwrap();

    assert!(matches!(db.get_job(job.id).await, Err(PortError::NotFound(_))));
    assert!(matches!(
        db.get_task(created[0].id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(job_tasks(&db, job.id).await.is_empty());
    // The developer survives the cascade.
    assert_eq!(db.get_user(dev.id).await.unwrap().id, dev.id);
}

#[tokio::test]
#[serial]
async fn confirmation_pays_and_unconfirm_reverses_it() {
    let Some(db) = setup_db().await else { return };
    let admin = seed_user(&db, "admin", Role::Admin).await;
    let job = seed_job(&db, "Payments", 1000).await;
    let created = db
        .create_tasks(
            job.id,
            vec![simple_task("Done", 1, 300, 100), simple_task("Half", 1, 200, 50)],
        )
        .await
        .unwrap();
    let done = created.iter().find(|t| t.title == "Done").unwrap().id;
    let half = created.iter().find(|t| t.title == "Half").unwrap().id;

    assert!(matches!(
        db.confirm_task(half, admin.id, Utc::now()).await,
        Err(PortError::Invalid(_))
    ));

    let paid = db.confirm_task(done, admin.id, Utc::now()).await.unwrap();
    assert!(paid.confirmed && paid.paid);
    assert_eq!(paid.confirmed_by, Some(admin.id));
    assert!(db.get_task(done).await.unwrap().paid);

    let reverted = db.unconfirm_task(done).await.unwrap();
    assert!(!reverted.confirmed && !reverted.paid);
    let stored = db.get_task(done).await.unwrap();
    assert!(!stored.paid);
    assert_eq!(stored.confirmed_at, None);
}

#[tokio::test]
#[serial]
async fn deduction_drains_paid_tasks_and_is_logged() {
    let Some(db) = setup_db().await else { return };
    let admin = seed_user(&db, "admin", Role::Admin).await;
    let dev = seed_user(&db, "dev", Role::Developer).await;
    let job = seed_job(&db, "Earnings", 1000).await;
    let mut first = simple_task("First", 1, 100, 100);
    first.assignee_ids = vec![dev.id];
    let mut second = simple_task("Second", 1, 80, 100);
    second.assignee_ids = vec![dev.id];
    db.create_tasks(job.id, vec![first]).await.unwrap();
    db.create_tasks(job.id, vec![second]).await.unwrap();
    let ids: Vec<_> = job_tasks(&db, job.id).await.iter().map(|t| t.id).collect();
    db.confirm_tasks(&ids, admin.id, Utc::now()).await.unwrap();

    let log = db
        .deduct_balance(dev.id, admin.id, 130, Utc::now())
        .await
        .unwrap();
    assert_eq!(log.amount, 130);

    let tasks = job_tasks(&db, job.id).await;
    let money = |title: &str| {
        tasks
            .iter()
            .find(|t| t.title == title)
            .map(|t| t.money_for_task)
            .unwrap()
    };
    assert_eq!(money("First"), 0);
    assert_eq!(money("Second"), 50);

    assert!(matches!(
        db.deduct_balance(dev.id, admin.id, 51, Utc::now()).await,
        Err(PortError::Invalid(_))
    ));
    let logs = db.list_deductions(&DeductionFilter::default()).await.unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn bulk_confirms_in_opposite_order_do_not_deadlock() {
    let Some(db) = setup_db().await else { return };
    let admin = seed_user(&db, "admin", Role::Admin).await;
    let mut ids = Vec::new();
    for title in ["Alpha", "Beta", "Gamma"] {
        let job = seed_job(&db, title, 100).await;
        let created = db
            .create_tasks(job.id, vec![simple_task(title, 1, 10, 100)])
            .await
            .unwrap();
        ids.push(created[0].id);
    }
    let mut reversed = ids.clone();
    reversed.reverse();
    let admin_id = admin.id;

    for _ in 0..20 {
        let (forward, backward) = tokio::join!(
            tokio::spawn({
                let db = db.clone();
                let ids = ids.clone();
                async move { db.confirm_tasks(&ids, admin_id, Utc::now()).await }
            }),
            tokio::spawn({
                let db = db.clone();
                let ids = reversed.clone();
                async move { db.confirm_tasks(&ids, admin_id, Utc::now()).await }
            }),
        );
        let forward = forward.unwrap().unwrap();
        let backward = backward.unwrap().unwrap();
        assert_eq!(forward.len() + backward.len(), ids.len());

        for &id in &ids {
            db.unconfirm_task(id).await.unwrap();
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn deduction_and_hours_update_on_the_same_job_do_not_deadlock() {
    let Some(db) = setup_db().await else { return };
    let admin = seed_user(&db, "admin", Role::Admin).await;
    let dev = seed_user(&db, "dev", Role::Developer).await;
    let job = seed_job(&db, "Contended", 100_000).await;
    let mut paid = simple_task("Paid", 2, 10_000, 100);
    paid.assignee_ids = vec![dev.id];
    let created = db
        .create_tasks(job.id, vec![paid, simple_task("Open", 3, 0, 10)])
        .await
        .unwrap();
    let paid_id = created.iter().find(|t| t.title == "Paid").unwrap().id;
    let open_id = created.iter().find(|t| t.title == "Open").unwrap().id;
    db.confirm_task(paid_id, admin.id, Utc::now()).await.unwrap();
    let (admin_id, dev_id) = (admin.id, dev.id);

    for round in 0..20 {
        let (deduct, update) = tokio::join!(
            tokio::spawn({
                let db = db.clone();
                async move { db.deduct_balance(dev_id, admin_id, 1, Utc::now()).await }
            }),
            tokio::spawn({
                let db = db.clone();
                async move {
                    let update = TaskUpdate {
                        hours: Some(3 + round % 4),
                        ..Default::default()
                    };
                    db.update_task(open_id, update).await
                }
            }),
        );
        deduct.unwrap().unwrap();
        update.unwrap().unwrap();
    }

    let remaining = db.get_task(paid_id).await.unwrap();
    assert_eq!(remaining.money_for_task, 10_000 - 20);
    let sum: f64 = job_tasks(&db, job.id)
        .await
        .iter()
        .map(|t| t.task_percentage)
        .sum();
    assert_close(sum, 100.0);
}
