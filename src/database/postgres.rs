use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;

use crate::api::Pagination;
use super::manager::DatabaseError;
use super::models::{
    Activity, ActivityFilter, Customer, CustomerFilter, HistoryEntry, Lead, LeadFilter, LeadStatus, Note,
    RefreshToken, RelatedRef, Task, TaskFilter, User, UserFilter,
};
use super::store::{Store, TaskCounts};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, active, created_at, updated_at";
const LEAD_COLUMNS: &str = "id, name, email, phone, company, source, status, assigned_agent, archived, history, \
                            converted_customer_id, created_by, created_at, updated_at";
const CUSTOMER_COLUMNS: &str =
    "id, name, email, phone, company, tags, notes, owner, lead_id, created_at, updated_at";
const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, owner, related_type, related_id, \
                            created_at, updated_at";
const ACTIVITY_COLUMNS: &str = "id, kind, actor, actor_name, entity_type, entity_id, message, meta, created_at";

/// Postgres-backed `Store`. Enum columns hold the same strings the API uses;
/// lead history and customer notes are embedded as JSONB arrays.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count(&self, mut qb: QueryBuilder<'_, Postgres>) -> Result<i64, DatabaseError> {
        let (total,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(total)
    }
}

fn parse<T: FromStr<Err = String>>(value: &str) -> Result<T, DatabaseError> {
    value.parse().map_err(DatabaseError::QueryError)
}

/// Wraps a search term for ILIKE, escaping the pattern metacharacters
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Pagination) {
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    qb.push_bind(page.limit as i64);
    qb.push(" OFFSET ");
    qb.push_bind(page.skip() as i64);
}

// Row mappings

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: parse(&row.role)?,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RefreshTokenRow {
    token_hash: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            token_hash: row.token_hash,
            user_id: row.user_id,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct LeadRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    source: String,
    status: String,
    assigned_agent: Uuid,
    archived: bool,
    history: Json<Vec<HistoryEntry>>,
    converted_customer_id: Option<Uuid>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = DatabaseError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        Ok(Lead {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            source: row.source,
            status: parse(&row.status)?,
            assigned_agent: row.assigned_agent,
            archived: row.archived,
            history: row.history.0,
            converted_customer_id: row.converted_customer_id,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    tags: Vec<String>,
    notes: Json<Vec<Note>>,
    owner: Uuid,
    lead_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            tags: row.tags,
            notes: row.notes.0,
            owner: row.owner,
            lead_id: row.lead_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    owner: Uuid,
    related_type: Option<String>,
    related_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = DatabaseError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let related = match (row.related_type.as_deref(), row.related_id) {
            (Some(kind), Some(id)) => Some(RelatedRef::new(parse(kind)?, id)),
            _ => None,
        };
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            status: parse(&row.status)?,
            priority: parse(&row.priority)?,
            due_date: row.due_date,
            owner: row.owner,
            related,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ActivityRow {
    id: Uuid,
    kind: String,
    actor: Uuid,
    actor_name: String,
    entity_type: String,
    entity_id: Uuid,
    message: String,
    meta: Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = DatabaseError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(Activity {
            id: row.id,
            kind: parse(&row.kind)?,
            actor: row.actor,
            actor_name: row.actor_name,
            entity_type: parse(&row.entity_type)?,
            entity_id: row.entity_id,
            message: row.message,
            meta: row.meta,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DatabaseError>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// Filters, pushed after a `WHERE TRUE`

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(active) = filter.active {
        qb.push(" AND active = ").push_bind(active);
    }
}

fn push_lead_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &LeadFilter) {
    if !filter.include_archived {
        qb.push(" AND NOT archived");
    }
    if let Some(owner) = filter.owner {
        qb.push(" AND assigned_agent = ").push_bind(owner);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(source) = &filter.source {
        qb.push(" AND lower(source) = lower(").push_bind(source.clone()).push(")");
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR company ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_customer_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
    if let Some(owner) = filter.owner {
        qb.push(" AND owner = ").push_bind(owner);
    }
    if let Some(tag) = &filter.tag {
        qb.push(" AND EXISTS (SELECT 1 FROM unnest(tags) t WHERE lower(t) = lower(")
            .push_bind(tag.clone())
            .push("))");
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR company ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_task_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    if let Some(owner) = filter.owner {
        qb.push(" AND owner = ").push_bind(owner);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(related) = filter.related {
        qb.push(" AND related_type = ")
            .push_bind(related.kind().as_str())
            .push(" AND related_id = ")
            .push_bind(related.id());
    }
    if let Some(now) = filter.overdue_at {
        qb.push(" AND status <> 'Done' AND due_date < ").push_bind(now);
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, &format!("Email '{}' is already registered", user.email)))?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, role = $5, active = $6, updated_at = $7 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, &format!("Email '{}' is already registered", user.email)))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {} not found", user.id)));
        }
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, filter: &UserFilter, page: Pagination) -> Result<(Vec<User>, i64), DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_filter(&mut count, filter);
        let total = self.count(count).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));
        push_user_filter(&mut qb, filter);
        push_page(&mut qb, page);
        let rows: Vec<UserRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok((convert_all(rows)?, total))
    }

    async fn count_users(&self) -> Result<i64, DatabaseError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token_hash, user_id, expires_at, revoked_at, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&token.token_hash)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT token_hash, user_id, expires_at, revoked_at, created_at FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshToken::from))
    }

    async fn revoke_refresh_token(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO leads (id, name, email, phone, company, source, status, assigned_agent, archived, history, \
             converted_customer_id, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.company)
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(lead.assigned_agent)
        .bind(lead.archived)
        .bind(Json(&lead.history))
        .bind(lead.converted_customer_id)
        .bind(lead.created_by)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_lead(&self, lead: &Lead) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE leads SET name = $2, email = $3, phone = $4, company = $5, source = $6, status = $7, \
             assigned_agent = $8, archived = $9, history = $10, updated_at = $11 \
             WHERE id = $1 AND converted_customer_id IS NOT DISTINCT FROM $12",
        )
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.company)
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(lead.assigned_agent)
        .bind(lead.archived)
        .bind(Json(&lead.history))
        .bind(lead.updated_at)
        .bind(lead.converted_customer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM leads WHERE id = $1)")
            .bind(lead.id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Err(DatabaseError::Conflict("Lead was converted by another request".to_string()))
        } else {
            Err(DatabaseError::NotFound(format!("Lead {} not found", lead.id)))
        }
    }

    async fn find_lead(&self, id: Uuid) -> Result<Option<Lead>, DatabaseError> {
        let row: Option<LeadRow> = sqlx::query_as(&format!("SELECT {} FROM leads WHERE id = $1", LEAD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Lead::try_from).transpose()
    }

    async fn list_leads(&self, filter: &LeadFilter, page: Pagination) -> Result<(Vec<Lead>, i64), DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM leads WHERE TRUE");
        push_lead_filter(&mut count, filter);
        let total = self.count(count).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {} FROM leads WHERE TRUE", LEAD_COLUMNS));
        push_lead_filter(&mut qb, filter);
        push_page(&mut qb, page);
        let rows: Vec<LeadRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok((convert_all(rows)?, total))
    }

    async fn convert_lead(&self, lead: &Lead, customer: &Customer, activity: &Activity) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(Option<Uuid>, bool)> =
            sqlx::query_as("SELECT converted_customer_id, archived FROM leads WHERE id = $1 FOR UPDATE")
                .bind(lead.id)
                .fetch_optional(&mut *tx)
                .await?;
        match current {
            None => return Err(DatabaseError::NotFound(format!("Lead {} not found", lead.id))),
            Some((Some(_), _)) => return Err(DatabaseError::Conflict("Lead has already been converted".to_string())),
            Some((None, true)) => {
                return Err(DatabaseError::Conflict("Archived leads cannot be converted".to_string()))
            }
            Some((None, false)) => {}
        }

        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, company, tags, notes, owner, lead_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.company)
        .bind(&customer.tags)
        .bind(Json(&customer.notes))
        .bind(customer.owner)
        .bind(customer.lead_id)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *tx)
        .await?;

        let entry: Vec<&HistoryEntry> = lead.history.last().into_iter().collect();
        sqlx::query(
            "UPDATE leads SET status = $2, history = history || $3, converted_customer_id = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(lead.id)
        .bind(lead.status.as_str())
        .bind(Json(entry))
        .bind(lead.converted_customer_id)
        .bind(lead.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_activity_query(activity).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, company, tags, notes, owner, lead_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.company)
        .bind(&customer.tags)
        .bind(Json(&customer.notes))
        .bind(customer.owner)
        .bind(customer.lead_id)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE customers SET name = $2, email = $3, phone = $4, company = $5, tags = $6, \
             owner = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.company)
        .bind(&customer.tags)
        .bind(customer.owner)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Customer {} not found", customer.id)));
        }
        Ok(())
    }

    async fn append_customer_note(&self, id: Uuid, note: &Note) -> Result<Customer, DatabaseError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "UPDATE customers SET notes = notes || $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .bind(Json([note]))
        .bind(note.created_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("Customer {} not found", id)))
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, DatabaseError> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Customer::from))
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Pagination,
    ) -> Result<(Vec<Customer>, i64), DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM customers WHERE TRUE");
        push_customer_filter(&mut count, filter);
        let total = self.count(count).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {} FROM customers WHERE TRUE", CUSTOMER_COLUMNS));
        push_customer_filter(&mut qb, filter);
        push_page(&mut qb, page);
        let rows: Vec<CustomerRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok((rows.into_iter().map(Customer::from).collect(), total))
    }

    async fn delete_customer(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO tasks (id, title, description, status, priority, due_date, owner, related_type, related_id, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.owner)
        .bind(task.related.map(|r| r.kind().as_str()))
        .bind(task.related.map(|r| r.id()))
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE tasks SET title = $2, description = $3, status = $4, priority = $5, due_date = $6, owner = $7, \
             related_type = $8, related_id = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.owner)
        .bind(task.related.map(|r| r.kind().as_str()))
        .bind(task.related.map(|r| r.id()))
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Task {} not found", task.id)));
        }
        Ok(())
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Task::try_from).transpose()
    }

    async fn list_tasks(&self, filter: &TaskFilter, page: Pagination) -> Result<(Vec<Task>, i64), DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM tasks WHERE TRUE");
        push_task_filter(&mut count, filter);
        let total = self.count(count).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {} FROM tasks WHERE TRUE", TASK_COLUMNS));
        push_task_filter(&mut qb, filter);
        push_page(&mut qb, page);
        let rows: Vec<TaskRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok((convert_all(rows)?, total))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_activity(&self, activity: &Activity) -> Result<(), DatabaseError> {
        insert_activity_query(activity).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, DatabaseError> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM activities WHERE TRUE", ACTIVITY_COLUMNS));
        if let Some(actor) = filter.actor {
            qb.push(" AND actor = ").push_bind(actor);
        }
        if let Some((entity_type, entity_id)) = filter.entity {
            qb.push(" AND entity_type = ")
                .push_bind(entity_type.as_str())
                .push(" AND entity_id = ")
                .push_bind(entity_id);
        }
        qb.push(" ORDER BY created_at DESC, seq DESC LIMIT ")
            .push_bind(filter.limit as i64);

        let rows: Vec<ActivityRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        convert_all(rows)
    }

    async fn lead_status_counts(&self, owner: Option<Uuid>) -> Result<Vec<(LeadStatus, i64)>, DatabaseError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM leads \
             WHERE NOT archived AND ($1::uuid IS NULL OR assigned_agent = $1) \
             GROUP BY status",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, count)| Ok((parse(&status)?, count)))
            .collect()
    }

    async fn count_customers(&self, owner: Option<Uuid>) -> Result<i64, DatabaseError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers WHERE ($1::uuid IS NULL OR owner = $1)")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn task_counts(&self, owner: Option<Uuid>, now: DateTime<Utc>) -> Result<TaskCounts, DatabaseError> {
        let (open, overdue): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE status <> 'Done'), \
                    COUNT(*) FILTER (WHERE status <> 'Done' AND due_date < $2) \
             FROM tasks WHERE ($1::uuid IS NULL OR owner = $1)",
        )
        .bind(owner)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(TaskCounts { open, overdue })
    }

    async fn daily_lead_counts(
        &self,
        owner: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, i64)>, DatabaseError> {
        let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) FROM leads \
             WHERE created_at >= $2 AND ($1::uuid IS NULL OR assigned_agent = $1) \
             GROUP BY day ORDER BY day",
        )
        .bind(owner)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn insert_activity_query(activity: &Activity) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        "INSERT INTO activities (id, kind, actor, actor_name, entity_type, entity_id, message, meta, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(activity.id)
    .bind(activity.kind.as_str())
    .bind(activity.actor)
    .bind(&activity.actor_name)
    .bind(activity.entity_type.as_str())
    .bind(activity.entity_id)
    .bind(&activity.message)
    .bind(&activity.meta)
    .bind(activity.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("acme"), "%acme%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn unknown_enum_text_is_a_query_error() {
        assert!(matches!(parse::<LeadStatus>("Pending"), Err(DatabaseError::QueryError(_))));
        assert_eq!(parse::<LeadStatus>("In Progress").unwrap(), LeadStatus::InProgress);
    }

    #[test]
    fn filters_bind_only_what_is_set() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads WHERE TRUE");
        push_lead_filter(
            &mut qb,
            &LeadFilter { status: Some(LeadStatus::New), include_archived: true, ..Default::default() },
        );
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM leads WHERE TRUE AND status = $1");

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks WHERE TRUE");
        push_task_filter(&mut qb, &TaskFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM tasks WHERE TRUE");
    }
}
