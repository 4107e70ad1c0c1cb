//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. The whole store
//! sits behind one `RwLock`; holding the write lock for the duration of a call
//! is what makes each call all-or-nothing. Used with `DATABASE_URL=memory://`
//! and by the integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use job_ledger_core::allocation::renormalize;
use job_ledger_core::domain::{
    sort_by_deadline, ClientCredentials, ClientDecision, DeductionFilter, DeductionLog, Job,
    JobUpdate, NewJob, NewTask, NewUser, Task, TaskFilter, TaskUpdate, User, UserCredentials,
};
use job_ledger_core::payment::plan_deduction;
use job_ledger_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

//=========================================================================================
// Store
//=========================================================================================

struct StoredJob {
    job: Job,
    client_password_hash: String,
}

#[derive(Default)]
struct Store {
    users: Vec<UserCredentials>,
    jobs: Vec<StoredJob>,
    /// Insertion order doubles as creation order.
    tasks: Vec<Task>,
    deductions: Vec<DeductionLog>,
}

impl Store {
    fn job(&self, job_id: Uuid) -> PortResult<&StoredJob> {
        self.jobs
            .iter()
            .find(|j| j.job.id == job_id)
            .ok_or_else(|| PortError::NotFound(format!("Job {} not found", job_id)))
    }

    fn task_index(&self, task_id: Uuid) -> PortResult<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))
    }

    fn ensure_users_exist(&self, ids: &[Uuid]) -> PortResult<()> {
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !self.users.iter().any(|u| u.user.id == **id))
            .map(|id| id.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PortError::Invalid(format!(
                "User IDs not found: {}",
                missing.join(", ")
            )))
        }
    }

    fn client_email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.jobs.iter().any(|j| {
            Some(j.job.id) != except && j.job.client_email.eq_ignore_ascii_case(email)
        })
    }

    /// Recomputes the hour shares of every task of the job.
    fn renormalize_job(&mut self, job_id: Uuid) {
        let mut own: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.job_id == job_id)
            .cloned()
            .collect();
        if !renormalize(&mut own) {
            return;
        }
        let shares: HashMap<Uuid, f64> = own.iter().map(|t| (t.id, t.task_percentage)).collect();
        for task in self.tasks.iter_mut() {
            if let Some(share) = shares.get(&task.id) {
                task.task_percentage = *share;
            }
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A `DatabaseService` kept entirely in memory.
#[derive(Default)]
pub struct InMemoryAdapter {
    store: RwLock<Store>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for InMemoryAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|c| {
            c.user.username == new_user.username
                || c.user.email.eq_ignore_ascii_case(&new_user.email)
        }) {
            return Err(PortError::Conflict(
                "A user with this username or email already exists".to_string(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            created_at: Utc::now(),
        };
        store.users.push(UserCredentials {
            user: user.clone(),
            hashed_password: new_user.hashed_password,
        });
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let store = self.store.read().await;
        store
            .users
            .iter()
            .find(|c| c.user.id == user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().map(|c| c.user.clone()).collect())
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let store = self.store.read().await;
        store
            .users
            .iter()
            .find(|c| c.user.username == username)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let store = self.store.read().await;
        store
            .users
            .iter()
            .find(|c| c.user.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn create_job(&self, new_job: NewJob) -> PortResult<Job> {
        let mut store = self.store.write().await;
        if store.client_email_taken(&new_job.client_email, None) {
            return Err(PortError::Conflict(
                "A job with this client email already exists".to_string(),
            ));
        }
        let job = Job {
            id: Uuid::new_v4(),
            title: new_job.title,
            client_email: new_job.client_email,
            over_all_income: new_job.over_all_income,
            contact: new_job.contact,
            created_at: Utc::now(),
        };
        store.jobs.push(StoredJob {
            job: job.clone(),
            client_password_hash: new_job.client_password_hash,
        });
        Ok(job)
    }

    async fn get_job(&self, job_id: Uuid) -> PortResult<Job> {
        let store = self.store.read().await;
        store.job(job_id).map(|j| j.job.clone())
    }

    async fn list_jobs(&self) -> PortResult<Vec<Job>> {
        let store = self.store.read().await;
        let mut jobs: Vec<Job> = store.jobs.iter().map(|j| j.job.clone()).collect();
        jobs.reverse();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> PortResult<Job> {
        let mut store = self.store.write().await;
        store.job(job_id)?;
        if let Some(email) = &update.client_email {
            if store.client_email_taken(email, Some(job_id)) {
                return Err(PortError::Conflict(
                    "A job with this client email already exists".to_string(),
                ));
            }
        }
        let stored = store
            .jobs
            .iter_mut()
            .find(|j| j.job.id == job_id)
            .ok_or_else(|| PortError::NotFound(format!("Job {} not found", job_id)))?;
        update.apply_to(&mut stored.job);
        if let Some(hash) = update.client_password_hash {
            stored.client_password_hash = hash;
        }
        Ok(stored.job.clone())
    }

    async fn delete_job(&self, job_id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        store.job(job_id)?;
        store.jobs.retain(|j| j.job.id != job_id);
        store.tasks.retain(|t| t.job_id != job_id);
        Ok(())
    }

    async fn get_client_credentials(&self, client_email: &str) -> PortResult<ClientCredentials> {
        let store = self.store.read().await;
        store
            .jobs
            .iter()
            .find(|j| j.job.client_email.eq_ignore_ascii_case(client_email))
            .map(|j| ClientCredentials {
                job_id: j.job.id,
                client_email: j.job.client_email.clone(),
                hashed_password: j.client_password_hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound("No job found for this email".to_string()))
    }

    async fn create_tasks(&self, job_id: Uuid, tasks: Vec<NewTask>) -> PortResult<Vec<Task>> {
        let mut store = self.store.write().await;
        store.job(job_id)?;
        for new_task in &tasks {
            new_task.validate()?;
            store.ensure_users_exist(&new_task.assignee_ids)?;
        }
        let now = Utc::now();
        let ids: Vec<Uuid> = tasks
            .into_iter()
            .map(|new_task| {
                let task = Task::from_new(job_id, new_task, now);
                let id = task.id;
                store.tasks.push(task);
                id
            })
            .collect();
        store.renormalize_job(job_id);
        Ok(store
            .tasks
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn get_task(&self, task_id: Uuid) -> PortResult<Task> {
        let store = self.store.read().await;
        let index = store.task_index(task_id)?;
        Ok(store.tasks[index].clone())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> PortResult<Vec<Task>> {
        let store = self.store.read().await;
        let mut tasks: Vec<Task> = store
            .tasks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        sort_by_deadline(&mut tasks);
        Ok(tasks)
    }

    async fn update_task(&self, task_id: Uuid, update: TaskUpdate) -> PortResult<Task> {
        update.validate()?;
        let mut store = self.store.write().await;
        let index = store.task_index(task_id)?;
        if let Some(ids) = &update.assignee_ids {
            store.ensure_users_exist(ids)?;
        }
        let mut task = store.tasks[index].clone();
        let change = task.apply(&update)?;
        let job_id = task.job_id;
        store.tasks[index] = task;
        if change.hours_changed {
            store.renormalize_job(job_id);
        }
        Ok(store.tasks[index].clone())
    }

    async fn delete_task(&self, task_id: Uuid) -> PortResult<Task> {
        let mut store = self.store.write().await;
        let index = store.task_index(task_id)?;
        let removed = store.tasks.remove(index);
        store.renormalize_job(removed.job_id);
        Ok(removed)
    }

    async fn confirm_task(
        &self,
        task_id: Uuid,
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<Task> {
        let mut store = self.store.write().await;
        let index = store.task_index(task_id)?;
        let mut task = store.tasks[index].clone();
        task.confirm(admin_id, at)?;
        store.tasks[index] = task.clone();
        Ok(task)
    }

    async fn confirm_tasks(
        &self,
        task_ids: &[Uuid],
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<Vec<Task>> {
        let mut store = self.store.write().await;
        let mut confirmed = Vec::new();
        for task in store
            .tasks
            .iter_mut()
            .filter(|t| task_ids.contains(&t.id) && t.is_complete() && !t.confirmed)
        {
            task.confirm(admin_id, at)?;
            confirmed.push(task.clone());
        }
        Ok(confirmed)
    }

    async fn unconfirm_task(&self, task_id: Uuid) -> PortResult<Task> {
        let mut store = self.store.write().await;
        let index = store.task_index(task_id)?;
        store.tasks[index].unconfirm();
        Ok(store.tasks[index].clone())
    }

    async fn client_review_task(
        &self,
        job_id: Uuid,
        task_id: Uuid,
        decision: ClientDecision,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> PortResult<Task> {
        let mut store = self.store.write().await;
        let index = store.task_index(task_id)?;
        if store.tasks[index].job_id != job_id {
            return Err(PortError::NotFound(format!("Task {} not found", task_id)));
        }
        let mut task = store.tasks[index].clone();
        task.client_review(decision, comment, at)?;
        store.tasks[index] = task.clone();
        Ok(task)
    }

    async fn client_confirm_tasks(
        &self,
        job_id: Uuid,
        task_ids: &[Uuid],
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> PortResult<Vec<Task>> {
        let mut store = self.store.write().await;
        let mut confirmed = Vec::new();
        for task in store.tasks.iter_mut().filter(|t| {
            t.job_id == job_id && task_ids.contains(&t.id) && t.confirmed && !t.client_confirmed
        }) {
            task.client_review(ClientDecision::Confirm, comment.clone(), at)?;
            confirmed.push(task.clone());
        }
        Ok(confirmed)
    }

    async fn deduct_balance(
        &self,
        developer_id: Uuid,
        admin_id: Uuid,
        amount: i64,
        at: DateTime<Utc>,
    ) -> PortResult<DeductionLog> {
        let mut store = self.store.write().await;
        store.ensure_users_exist(&[developer_id])?;
        let plan = plan_deduction(&store.tasks, developer_id, amount)?;
        for adjustment in plan {
            if let Some(task) = store.tasks.iter_mut().find(|t| t.id == adjustment.task_id) {
                task.money_for_task = adjustment.money_for_task;
            }
        }
        let log = DeductionLog {
            id: Uuid::new_v4(),
            developer_id,
            deducted_by: admin_id,
            amount,
            created_at: at,
        };
        store.deductions.push(log.clone());
        Ok(log)
    }

    async fn list_deductions(&self, filter: &DeductionFilter) -> PortResult<Vec<DeductionLog>> {
        let store = self.store.read().await;
        let mut logs: Vec<DeductionLog> = store
            .deductions
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        logs.reverse();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(logs)
    }
}
