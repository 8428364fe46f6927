use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::api::Pagination;
use super::manager::DatabaseError;
use super::models::{
    Activity, ActivityFilter, Customer, CustomerFilter, Lead, LeadFilter, LeadStatus, Note, RefreshToken,
    Task, TaskFilter, User, UserFilter,
};

/// Open/overdue task totals for the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub open: i64,
    pub overdue: i64,
}

/// Persistence seam shared by the Postgres and in-memory backends.
///
/// Lists return `(page_items, total_matching)` ordered newest first.
/// `update_*` replaces the whole record and fails with `NotFound` when the
/// id is unknown.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    // Users
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;
    async fn update_user(&self, user: &User) -> Result<(), DatabaseError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn list_users(&self, filter: &UserFilter, page: Pagination) -> Result<(Vec<User>, i64), DatabaseError>;
    async fn count_users(&self) -> Result<i64, DatabaseError>;

    // Refresh tokens
    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), DatabaseError>;
    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError>;
    /// Returns `true` when a live token was revoked by this call
    async fn revoke_refresh_token(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, DatabaseError>;
    async fn revoke_user_refresh_tokens(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, DatabaseError>;

    // Leads
    async fn insert_lead(&self, lead: &Lead) -> Result<(), DatabaseError>;
    /// Fails with `Conflict` when the stored lead's conversion state no longer
    /// matches `lead`, so a stale read cannot undo a conversion.
    async fn update_lead(&self, lead: &Lead) -> Result<(), DatabaseError>;
    async fn find_lead(&self, id: Uuid) -> Result<Option<Lead>, DatabaseError>;
    async fn list_leads(&self, filter: &LeadFilter, page: Pagination) -> Result<(Vec<Lead>, i64), DatabaseError>;
    /// Writes the conversion of the lead, the new customer and the activity as
    /// one unit. Only status, `converted_customer_id` and the last history entry
    /// of `lead` are applied. Fails with `Conflict` when the stored lead is
    /// already converted or archived.
    async fn convert_lead(&self, lead: &Lead, customer: &Customer, activity: &Activity) -> Result<(), DatabaseError>;

    // Customers
    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError>;
    /// Writes every field except `notes`, which only grow through `append_customer_note`
    async fn update_customer(&self, customer: &Customer) -> Result<(), DatabaseError>;
    /// Appends in place and returns the stored customer
    async fn append_customer_note(&self, id: Uuid, note: &Note) -> Result<Customer, DatabaseError>;
    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, DatabaseError>;
    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Pagination,
    ) -> Result<(Vec<Customer>, i64), DatabaseError>;
    async fn delete_customer(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Tasks
    async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError>;
    async fn update_task(&self, task: &Task) -> Result<(), DatabaseError>;
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError>;
    async fn list_tasks(&self, filter: &TaskFilter, page: Pagination) -> Result<(Vec<Task>, i64), DatabaseError>;
    async fn delete_task(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Activity
    async fn insert_activity(&self, activity: &Activity) -> Result<(), DatabaseError>;
    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, DatabaseError>;

    // Aggregates; `owner = None` means unscoped
    async fn lead_status_counts(&self, owner: Option<Uuid>) -> Result<Vec<(LeadStatus, i64)>, DatabaseError>;
    async fn count_customers(&self, owner: Option<Uuid>) -> Result<i64, DatabaseError>;
    async fn task_counts(&self, owner: Option<Uuid>, now: DateTime<Utc>) -> Result<TaskCounts, DatabaseError>;
    /// Leads created per UTC day since `since`, archived included
    async fn daily_lead_counts(
        &self,
        owner: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, i64)>, DatabaseError>;
}
