//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every call that touches a job's task set runs in one transaction and takes a
//! `FOR UPDATE` lock on the job row first, so percentage renormalization never
//! interleaves with another writer on the same job. Writes spanning several
//! jobs lock them in id order before any task row.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use job_ledger_core::allocation::hour_shares;
use job_ledger_core::domain::{
    ClientContact, ClientCredentials, ClientDecision, DeductionFilter, DeductionLog, Job,
    JobUpdate, NewJob, NewTask, NewUser, ProgressStatus, Task, TaskFilter, TaskUpdate, User,
    UserCredentials,
};
use job_ledger_core::payment::plan_deduction;
use job_ledger_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, role, hashed_password, created_at";

const JOB_COLUMNS: &str = "id, title, client_email, client_password_hash, over_all_income, \
     full_name, phone_number, position, company_name, company_phone, company_address, website, \
     created_at";

const TASK_COLUMNS: &str = "id, job_id, title, description, hours, task_percentage, progress, \
     money_for_task, paid, task_type, start_date, deadline, feedback, confirmed, confirmed_at, \
     confirmed_by, client_confirmed, client_confirmed_at, client_comment, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    hashed_password: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            user: User {
                id: self.id,
                username: self.username,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                role: self.role.parse()?,
                created_at: self.created_at,
            },
            hashed_password: self.hashed_password,
        })
    }
}

#[derive(FromRow)]
struct JobRecord {
    id: Uuid,
    title: String,
    client_email: String,
    client_password_hash: String,
    over_all_income: i64,
    full_name: String,
    phone_number: String,
    position: String,
    company_name: String,
    company_phone: String,
    company_address: String,
    website: String,
    created_at: DateTime<Utc>,
}
impl JobRecord {
    fn to_domain(self) -> Job {
        Job {
            id: self.id,
            title: self.title,
            client_email: self.client_email,
            over_all_income: self.over_all_income,
            contact: ClientContact {
                full_name: self.full_name,
                phone_number: self.phone_number,
                position: self.position,
                company_name: self.company_name,
                company_phone: self.company_phone,
                company_address: self.company_address,
                website: self.website,
            },
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TaskRecord {
    id: Uuid,
    job_id: Uuid,
    title: String,
    description: String,
    hours: i32,
    task_percentage: f64,
    progress: i16,
    money_for_task: i64,
    paid: bool,
    task_type: String,
    start_date: NaiveDate,
    deadline: Option<NaiveDate>,
    feedback: Option<String>,
    confirmed: bool,
    confirmed_at: Option<DateTime<Utc>>,
    confirmed_by: Option<Uuid>,
    client_confirmed: bool,
    client_confirmed_at: Option<DateTime<Utc>>,
    client_comment: Option<String>,
    created_at: DateTime<Utc>,
}
impl TaskRecord {
    fn to_domain(self, assignee_ids: Vec<Uuid>) -> PortResult<Task> {
        let progress = u8::try_from(self.progress).map_err(|_| {
            PortError::Unexpected(format!("Stored progress {} out of range", self.progress))
        })?;
        Ok(Task {
            id: self.id,
            job_id: self.job_id,
            title: self.title,
            description: self.description,
            hours: self.hours,
            task_percentage: self.task_percentage,
            progress,
            money_for_task: self.money_for_task,
            paid: self.paid,
            task_type: self.task_type.parse()?,
            start_date: self.start_date,
            deadline: self.deadline,
            feedback: self.feedback,
            confirmed: self.confirmed,
            confirmed_at: self.confirmed_at,
            confirmed_by: self.confirmed_by,
            client_confirmed: self.client_confirmed,
            client_confirmed_at: self.client_confirmed_at,
            client_comment: self.client_comment,
            assignee_ids,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct DeductionRecord {
    id: Uuid,
    developer_id: Uuid,
    deducted_by: Uuid,
    amount: i64,
    created_at: DateTime<Utc>,
}
impl DeductionRecord {
    fn to_domain(self) -> DeductionLog {
        DeductionLog {
            id: self.id,
            developer_id: self.developer_id,
            deducted_by: self.deducted_by,
            amount: self.amount,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps a unique-constraint violation to `Conflict`, anything else to `Unexpected`.
fn write_error(e: sqlx::Error, conflict: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            PortError::Conflict(conflict.to_string())
        }
        _ => unexpected(e),
    }
}

fn task_not_found(task_id: Uuid) -> PortError {
    PortError::NotFound(format!("Task {} not found", task_id))
}

fn job_not_found(job_id: Uuid) -> PortError {
    PortError::NotFound(format!("Job {} not found", job_id))
}

//=========================================================================================
// Connection-level Helpers
//=========================================================================================

async fn lock_job(conn: &mut PgConnection, job_id: Uuid) -> PortResult<()> {
    sqlx::query("SELECT id FROM jobs WHERE id = $1 FOR UPDATE")
        .bind(job_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| job_not_found(job_id))?;
    Ok(())
}

/// Locks several jobs at once, always in id order so that concurrent
/// multi-job writers queue up instead of deadlocking. Returns the ids that
/// still exist.
async fn lock_jobs(conn: &mut PgConnection, job_ids: &[Uuid]) -> PortResult<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM jobs WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(job_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(unexpected)
}

/// Locks the job that owns the task, then the task row itself.
async fn lock_task(conn: &mut PgConnection, task_id: Uuid) -> PortResult<Task> {
    let job_id: Uuid = sqlx::query_scalar("SELECT job_id FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| task_not_found(task_id))?;
    lock_job(conn, job_id).await?;

    let sql = format!("SELECT {} FROM tasks WHERE id = $1 FOR UPDATE", TASK_COLUMNS);
    let record = sqlx::query_as::<_, TaskRecord>(&sql)
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| task_not_found(task_id))?;
    let mut tasks = hydrate(conn, vec![record]).await?;
    tasks.pop().ok_or_else(|| task_not_found(task_id))
}

async fn fetch_task(conn: &mut PgConnection, task_id: Uuid) -> PortResult<Task> {
    let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
    let record = sqlx::query_as::<_, TaskRecord>(&sql)
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| task_not_found(task_id))?;
    let mut tasks = hydrate(conn, vec![record]).await?;
    tasks.pop().ok_or_else(|| task_not_found(task_id))
}

/// Attaches assignee ids to task rows.
async fn hydrate(conn: &mut PgConnection, records: Vec<TaskRecord>) -> PortResult<Vec<Task>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT task_id, user_id FROM task_assignees WHERE task_id = ANY($1) ORDER BY user_id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(unexpected)?;

    let mut assignees: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (task_id, user_id) in rows {
        assignees.entry(task_id).or_default().push(user_id);
    }
    records
        .into_iter()
        .map(|r| {
            let ids = assignees.remove(&r.id).unwrap_or_default();
            r.to_domain(ids)
        })
        .collect()
}

async fn ensure_users_exist(conn: &mut PgConnection, ids: &[Uuid]) -> PortResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(unexpected)?;
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
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

/// Recomputes the hour shares of every task of the job in a single statement.
async fn renormalize_job(conn: &mut PgConnection, job_id: Uuid) -> PortResult<()> {
    let rows: Vec<(Uuid, i32)> =
        sqlx::query_as("SELECT id, hours FROM tasks WHERE job_id = $1 ORDER BY created_at, id")
            .bind(job_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(unexpected)?;
    let hours: Vec<i32> = rows.iter().map(|(_, h)| *h).collect();
    let Some(shares) = hour_shares(&hours) else {
        return Ok(());
    };
    let ids: Vec<Uuid> = rows.iter().map(|(id, _)| *id).collect();

    sqlx::query(
        "UPDATE tasks AS t SET task_percentage = v.share \
         FROM UNNEST($1::uuid[], $2::float8[]) AS v(id, share) \
         WHERE t.id = v.id",
    )
    .bind(&ids)
    .bind(&shares)
    .execute(&mut *conn)
    .await
    .map_err(unexpected)?;
    Ok(())
}

async fn insert_task(conn: &mut PgConnection, task: &Task) -> PortResult<()> {
    sqlx::query(
        "INSERT INTO tasks (id, job_id, title, description, hours, task_percentage, progress, \
         money_for_task, paid, task_type, start_date, deadline, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(task.id)
    .bind(task.job_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.hours)
    .bind(task.task_percentage)
    .bind(i16::from(task.progress))
    .bind(task.money_for_task)
    .bind(task.paid)
    .bind(task.task_type.as_str())
    .bind(task.start_date)
    .bind(task.deadline)
    .bind(task.created_at)
    .execute(&mut *conn)
    .await
    .map_err(unexpected)?;
    replace_assignees(conn, task.id, &task.assignee_ids).await
}

/// Writes every mutable column of the task back.
async fn save_task(conn: &mut PgConnection, task: &Task) -> PortResult<()> {
    sqlx::query(
        "UPDATE tasks SET title = $2, description = $3, hours = $4, progress = $5, \
         money_for_task = $6, paid = $7, task_type = $8, deadline = $9, feedback = $10, \
         confirmed = $11, confirmed_at = $12, confirmed_by = $13, client_confirmed = $14, \
         client_confirmed_at = $15, client_comment = $16 \
         WHERE id = $1",
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.hours)
    .bind(i16::from(task.progress))
    .bind(task.money_for_task)
    .bind(task.paid)
    .bind(task.task_type.as_str())
    .bind(task.deadline)
    .bind(&task.feedback)
    .bind(task.confirmed)
    .bind(task.confirmed_at)
    .bind(task.confirmed_by)
    .bind(task.client_confirmed)
    .bind(task.client_confirmed_at)
    .bind(&task.client_comment)
    .execute(&mut *conn)
    .await
    .map_err(unexpected)?;
    Ok(())
}

async fn replace_assignees(conn: &mut PgConnection, task_id: Uuid, ids: &[Uuid]) -> PortResult<()> {
    sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
        .bind(task_id)
        .execute(&mut *conn)
        .await
        .map_err(unexpected)?;
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO task_assignees (task_id, user_id) \
         SELECT $1, user_id FROM UNNEST($2::uuid[]) AS u(user_id) \
         ON CONFLICT DO NOTHING",
    )
    .bind(task_id)
    .bind(ids)
    .execute(&mut *conn)
    .await
    .map_err(unexpected)?;
    Ok(())
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, first_name, last_name, role, hashed_password) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .bind(new_user.role.as_str())
            .bind(&new_user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "A user with this username or email already exists"))?;
        Ok(record.to_domain()?.user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
                _ => unexpected(e),
            })?;
        Ok(record.to_domain()?.user)
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at ASC", USER_COLUMNS);
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records
            .into_iter()
            .map(|r| r.to_domain().map(|c| c.user))
            .collect()
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))?
            .to_domain()
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let sql = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", USER_COLUMNS);
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))?
            .to_domain()
    }

    async fn create_job(&self, new_job: NewJob) -> PortResult<Job> {
        let sql = format!(
            "INSERT INTO jobs (id, title, client_email, client_password_hash, over_all_income, \
             full_name, phone_number, position, company_name, company_phone, company_address, website) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
            JOB_COLUMNS
        );
        let contact = &new_job.contact;
        let record = sqlx::query_as::<_, JobRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_job.title)
            .bind(&new_job.client_email)
            .bind(&new_job.client_password_hash)
            .bind(new_job.over_all_income)
            .bind(&contact.full_name)
            .bind(&contact.phone_number)
            .bind(&contact.position)
            .bind(&contact.company_name)
            .bind(&contact.company_phone)
            .bind(&contact.company_address)
            .bind(&contact.website)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "A job with this client email already exists"))?;
        Ok(record.to_domain())
    }

    async fn get_job(&self, job_id: Uuid) -> PortResult<Job> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        let record = sqlx::query_as::<_, JobRecord>(&sql)
            .bind(job_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => job_not_found(job_id),
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn list_jobs(&self) -> PortResult<Vec<Job>> {
        let sql = format!("SELECT {} FROM jobs ORDER BY created_at DESC, id", JOB_COLUMNS);
        let records = sqlx::query_as::<_, JobRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> PortResult<Job> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let sql = format!("SELECT {} FROM jobs WHERE id = $1 FOR UPDATE", JOB_COLUMNS);
        let record = sqlx::query_as::<_, JobRecord>(&sql)
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| job_not_found(job_id))?;
        let password_hash = update
            .client_password_hash
            .clone()
            .unwrap_or_else(|| record.client_password_hash.clone());
        let mut job = record.to_domain();
        update.apply_to(&mut job);

        let contact = &job.contact;
        sqlx::query(
            "UPDATE jobs SET title = $2, client_email = $3, client_password_hash = $4, \
             over_all_income = $5, full_name = $6, phone_number = $7, position = $8, \
             company_name = $9, company_phone = $10, company_address = $11, website = $12 \
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.client_email)
        .bind(&password_hash)
        .bind(job.over_all_income)
        .bind(&contact.full_name)
        .bind(&contact.phone_number)
        .bind(&contact.position)
        .bind(&contact.company_name)
        .bind(&contact.company_phone)
        .bind(&contact.company_address)
        .bind(&contact.website)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "A job with this client email already exists"))?;

        tx.commit().await.map_err(unexpected)?;
        Ok(job)
    }

    async fn delete_job(&self, job_id: Uuid) -> PortResult<()> {
        // Tasks and their assignments go with the job via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(job_not_found(job_id));
        }
        Ok(())
    }

    async fn get_client_credentials(&self, client_email: &str) -> PortResult<ClientCredentials> {
        let row: Option<(Uuid, String, String)> = sqlx::query_as(
            "SELECT id, client_email, client_password_hash FROM jobs \
             WHERE lower(client_email) = lower($1)",
        )
        .bind(client_email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        let (job_id, client_email, hashed_password) =
            row.ok_or_else(|| PortError::NotFound("No job found for this email".to_string()))?;
        Ok(ClientCredentials {
            job_id,
            client_email,
            hashed_password,
        })
    }

    async fn create_tasks(&self, job_id: Uuid, tasks: Vec<NewTask>) -> PortResult<Vec<Task>> {
        for new_task in &tasks {
            new_task.validate()?;
        }
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        lock_job(&mut tx, job_id).await?;
        for new_task in &tasks {
            ensure_users_exist(&mut tx, &new_task.assignee_ids).await?;
        }

        let now = Utc::now();
        let mut ids = Vec::with_capacity(tasks.len());
        for new_task in tasks {
            let task = Task::from_new(job_id, new_task, now);
            insert_task(&mut tx, &task).await?;
            ids.push(task.id);
        }
        renormalize_job(&mut tx, job_id).await?;

        let mut created = Vec::with_capacity(ids.len());
        for id in ids {
            created.push(fetch_task(&mut tx, id).await?);
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(created)
    }

    async fn get_task(&self, task_id: Uuid) -> PortResult<Task> {
        let mut conn = self.pool.acquire().await.map_err(unexpected)?;
        fetch_task(&mut conn, task_id).await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> PortResult<Vec<Task>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM tasks t WHERE TRUE", TASK_COLUMNS));
        if let Some(job_id) = filter.job_id {
            qb.push(" AND t.job_id = ").push_bind(job_id);
        }
        if let Some(user_id) = filter.assignee_id {
            qb.push(" AND EXISTS (SELECT 1 FROM task_assignees a WHERE a.task_id = t.id AND a.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        match filter.status {
            None => {}
            Some(ProgressStatus::Completed) => {
                qb.push(" AND t.progress = 100");
            }
            Some(ProgressStatus::InProgress) => {
                qb.push(" AND t.progress > 0 AND t.progress < 100");
            }
            Some(ProgressStatus::Pending) => {
                qb.push(" AND t.progress = 0");
            }
            Some(ProgressStatus::Overdue) => {
                qb.push(" AND t.progress < 100 AND t.deadline < ")
                    .push_bind(filter.today);
            }
        }
        if let Some(from) = filter.deadline_from {
            qb.push(" AND t.deadline >= ").push_bind(from);
        }
        if let Some(to) = filter.deadline_to {
            qb.push(" AND t.deadline <= ").push_bind(to);
        }
        qb.push(" ORDER BY t.deadline ASC NULLS LAST, t.created_at ASC, t.id ASC");

        let mut conn = self.pool.acquire().await.map_err(unexpected)?;
        let records = qb
            .build_query_as::<TaskRecord>()
            .fetch_all(&mut *conn)
            .await
            .map_err(unexpected)?;
        hydrate(&mut conn, records).await
    }

    async fn update_task(&self, task_id: Uuid, update: TaskUpdate) -> PortResult<Task> {
        update.validate()?;
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut task = lock_task(&mut tx, task_id).await?;
        if let Some(ids) = &update.assignee_ids {
            ensure_users_exist(&mut tx, ids).await?;
        }

        let change = task.apply(&update)?;
        save_task(&mut tx, &task).await?;
        if update.assignee_ids.is_some() {
            replace_assignees(&mut tx, task.id, &task.assignee_ids).await?;
        }
        if change.hours_changed {
            renormalize_job(&mut tx, task.job_id).await?;
        }

        let task = fetch_task(&mut tx, task_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(task)
    }

    async fn delete_task(&self, task_id: Uuid) -> PortResult<Task> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let task = lock_task(&mut tx, task_id).await?;
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        renormalize_job(&mut tx, task.job_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(task)
    }

    async fn confirm_task(
        &self,
        task_id: Uuid,
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<Task> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut task = lock_task(&mut tx, task_id).await?;
        task.confirm(admin_id, at)?;
        save_task(&mut tx, &task).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(task)
    }

    async fn confirm_tasks(
        &self,
        task_ids: &[Uuid],
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<Vec<Task>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let job_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT job_id FROM tasks WHERE id = ANY($1)")
                .bind(task_ids)
                .fetch_all(&mut *tx)
                .await
                .map_err(unexpected)?;
        lock_jobs(&mut tx, &job_ids).await?;

        let mut confirmed = Vec::new();
        for &task_id in task_ids {
            // Job already held above; this only takes the task row.
            let mut task = match lock_task(&mut tx, task_id).await {
                Ok(task) => task,
                Err(PortError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if !task.is_complete() || task.confirmed {
                continue;
            }
            task.confirm(admin_id, at)?;
            save_task(&mut tx, &task).await?;
            confirmed.push(task);
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(confirmed)
    }

    async fn unconfirm_task(&self, task_id: Uuid) -> PortResult<Task> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut task = lock_task(&mut tx, task_id).await?;
        if task.unconfirm() {
            save_task(&mut tx, &task).await?;
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(task)
    }

    async fn client_review_task(
        &self,
        job_id: Uuid,
        task_id: Uuid,
        decision: ClientDecision,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> PortResult<Task> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut task = lock_task(&mut tx, task_id).await?;
        if task.job_id != job_id {
            return Err(task_not_found(task_id));
        }
        task.client_review(decision, comment, at)?;
        save_task(&mut tx, &task).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(task)
    }

    async fn client_confirm_tasks(
        &self,
        job_id: Uuid,
        task_ids: &[Uuid],
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> PortResult<Vec<Task>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        lock_job(&mut tx, job_id).await?;
        let mut confirmed = Vec::new();
        for &task_id in task_ids {
            let mut task = match fetch_task(&mut tx, task_id).await {
                Ok(task) => task,
                Err(PortError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if task.job_id != job_id || !task.confirmed || task.client_confirmed {
                continue;
            }
            task.client_review(ClientDecision::Confirm, comment.clone(), at)?;
            save_task(&mut tx, &task).await?;
            confirmed.push(task);
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(confirmed)
    }

    async fn deduct_balance(
        &self,
        developer_id: Uuid,
        admin_id: Uuid,
        amount: i64,
        at: DateTime<Utc>,
    ) -> PortResult<DeductionLog> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        // Serializes concurrent deductions for the same developer.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(developer_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::Invalid(format!("User IDs not found: {}", developer_id))
            })?;

        // Jobs before tasks, as every other write does.
        let job_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT t.job_id FROM tasks t \
             JOIN task_assignees a ON a.task_id = t.id \
             WHERE a.user_id = $1 AND t.paid",
        )
        .bind(developer_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(unexpected)?;
        let job_ids = lock_jobs(&mut tx, &job_ids).await?;

        let sql = format!(
            "SELECT {} FROM tasks t WHERE t.paid AND t.job_id = ANY($2) AND EXISTS \
             (SELECT 1 FROM task_assignees a WHERE a.task_id = t.id AND a.user_id = $1) \
             ORDER BY t.created_at ASC, t.id ASC FOR UPDATE",
            TASK_COLUMNS
        );
        let records = sqlx::query_as::<_, TaskRecord>(&sql)
            .bind(developer_id)
            .bind(&job_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(unexpected)?;
        let tasks = hydrate(&mut tx, records).await?;

        let plan = plan_deduction(&tasks, developer_id, amount)?;
        for adjustment in plan {
            sqlx::query("UPDATE tasks SET money_for_task = $2 WHERE id = $1")
                .bind(adjustment.task_id)
                .bind(adjustment.money_for_task)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        let record = sqlx::query_as::<_, DeductionRecord>(
            "INSERT INTO deduction_logs (id, developer_id, deducted_by, amount, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, developer_id, deducted_by, amount, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(developer_id)
        .bind(admin_id)
        .bind(amount)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_deductions(&self, filter: &DeductionFilter) -> PortResult<Vec<DeductionLog>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, developer_id, deducted_by, amount, created_at FROM deduction_logs WHERE TRUE",
        );
        if let Some(developer_id) = filter.developer_id {
            qb.push(" AND developer_id = ").push_bind(developer_id);
        }
        if let Some((year, month)) = filter.month {
            qb.push(" AND EXTRACT(YEAR FROM created_at AT TIME ZONE 'UTC')::int = ")
                .push_bind(year)
                .push(" AND EXTRACT(MONTH FROM created_at AT TIME ZONE 'UTC')::int = ")
                .push_bind(month as i32);
        }
        qb.push(" ORDER BY created_at DESC, id");

        let records = qb
            .build_query_as::<DeductionRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
