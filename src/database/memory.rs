//! In-memory `Store` used by tests and `DATABASE_URL=memory://` runs.
//!
//! Each collection sits behind its own `tokio::sync::RwLock`. Multi-collection
//! writes take their locks in a fixed order: users, leads, customers, tasks,
//! activities.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::api::Pagination;
use super::manager::DatabaseError;
use super::models::{
    Activity, ActivityFilter, Customer, CustomerFilter, Lead, LeadFilter, LeadStatus, Note, RefreshToken,
    Task, TaskFilter, User, UserFilter,
};
use super::store::{Store, TaskCounts};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    refresh_tokens: RwLock<HashMap<String, RefreshToken>>,
    leads: RwLock<HashMap<Uuid, Lead>>,
    customers: RwLock<HashMap<Uuid, Customer>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
    activities: RwLock<Vec<Activity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Filters, orders newest first and windows a collection
fn page_of<T: Clone>(
    items: impl Iterator<Item = T>,
    keep: impl Fn(&T) -> bool,
    created_at: impl Fn(&T) -> DateTime<Utc>,
    page: Pagination,
) -> (Vec<T>, i64) {
    let mut matching: Vec<T> = items.filter(|item| keep(item)).collect();
    matching.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    let total = matching.len() as i64;
    (page.slice(&matching), total)
}

fn replace<T: Clone>(map: &mut HashMap<Uuid, T>, id: Uuid, value: &T, what: &str) -> Result<(), DatabaseError> {
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = value.clone();
            Ok(())
        }
        None => Err(DatabaseError::NotFound(format!("{} {} not found", what, id))),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict(format!("Email '{}' is already registered", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(DatabaseError::Conflict(format!("Email '{}' is already registered", user.email)));
        }
        replace(&mut users, user.id, user, "User")
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self, filter: &UserFilter, page: Pagination) -> Result<(Vec<User>, i64), DatabaseError> {
        let users = self.users.read().await;
        Ok(page_of(users.values().cloned(), |u| filter.matches(u), |u| u.created_at, page))
    }

    async fn count_users(&self) -> Result<i64, DatabaseError> {
        Ok(self.users.read().await.len() as i64)
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), DatabaseError> {
        self.refresh_tokens
            .write()
            .await
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        Ok(self.refresh_tokens.read().await.get(token_hash).cloned())
    }

    async fn revoke_refresh_token(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut tokens = self.refresh_tokens.write().await;
        match tokens.get_mut(token_hash) {
            Some(token) if token.revoked_at.is_none() => {
                token.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let mut tokens = self.refresh_tokens.write().await;
        let mut revoked = 0;
        for token in tokens.values_mut() {
            if token.user_id == user_id && token.revoked_at.is_none() {
                token.revoked_at = Some(at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<(), DatabaseError> {
        self.leads.write().await.insert(lead.id, lead.clone());
        Ok(())
    }

    async fn update_lead(&self, lead: &Lead) -> Result<(), DatabaseError> {
        let mut leads = self.leads.write().await;
        match leads.get_mut(&lead.id) {
            None => Err(DatabaseError::NotFound(format!("Lead {} not found", lead.id))),
            Some(stored) if stored.converted_customer_id != lead.converted_customer_id => {
                Err(DatabaseError::Conflict("Lead was converted by another request".to_string()))
            }
            Some(stored) => {
                *stored = lead.clone();
                Ok(())
            }
        }
    }

    async fn find_lead(&self, id: Uuid) -> Result<Option<Lead>, DatabaseError> {
        Ok(self.leads.read().await.get(&id).cloned())
    }

    async fn list_leads(&self, filter: &LeadFilter, page: Pagination) -> Result<(Vec<Lead>, i64), DatabaseError> {
        let leads = self.leads.read().await;
        Ok(page_of(leads.values().cloned(), |l| filter.matches(l), |l| l.created_at, page))
    }

    async fn convert_lead(&self, lead: &Lead, customer: &Customer, activity: &Activity) -> Result<(), DatabaseError> {
        let mut leads = self.leads.write().await;
        let mut customers = self.customers.write().await;
        let mut activities = self.activities.write().await;

        let stored = match leads.get_mut(&lead.id) {
            None => return Err(DatabaseError::NotFound(format!("Lead {} not found", lead.id))),
            Some(stored) if stored.is_converted() => {
                return Err(DatabaseError::Conflict("Lead has already been converted".to_string()))
            }
            Some(stored) if stored.archived => {
                return Err(DatabaseError::Conflict("Archived leads cannot be converted".to_string()))
            }
            Some(stored) => stored,
        };

        // Only the conversion itself is applied; other fields keep their stored values
        stored.status = lead.status;
        stored.converted_customer_id = lead.converted_customer_id;
        stored.updated_at = lead.updated_at;
        stored.history.extend(lead.history.last().cloned());
        customers.insert(customer.id, customer.clone());
        activities.push(activity.clone());
        Ok(())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        self.customers.write().await.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        let mut customers = self.customers.write().await;
        match customers.get_mut(&customer.id) {
            None => Err(DatabaseError::NotFound(format!("Customer {} not found", customer.id))),
            Some(stored) => {
                let notes = std::mem::take(&mut stored.notes);
                *stored = Customer { notes, ..customer.clone() };
                Ok(())
            }
        }
    }

    async fn append_customer_note(&self, id: Uuid, note: &Note) -> Result<Customer, DatabaseError> {
        let mut customers = self.customers.write().await;
        let stored = customers
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Customer {} not found", id)))?;
        stored.notes.push(note.clone());
        stored.updated_at = note.created_at;
        Ok(stored.clone())
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, DatabaseError> {
        Ok(self.customers.read().await.get(&id).cloned())
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Pagination,
    ) -> Result<(Vec<Customer>, i64), DatabaseError> {
        let customers = self.customers.read().await;
        Ok(page_of(customers.values().cloned(), |c| filter.matches(c), |c| c.created_at, page))
    }

    async fn delete_customer(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.customers.write().await.remove(&id).is_some())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let mut tasks = self.tasks.write().await;
        replace(&mut tasks, task.id, task, "Task")
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter, page: Pagination) -> Result<(Vec<Task>, i64), DatabaseError> {
        let tasks = self.tasks.read().await;
        Ok(page_of(tasks.values().cloned(), |t| filter.matches(t), |t| t.created_at, page))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.tasks.write().await.remove(&id).is_some())
    }

    async fn insert_activity(&self, activity: &Activity) -> Result<(), DatabaseError> {
        self.activities.write().await.push(activity.clone());
        Ok(())
    }

    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, DatabaseError> {
        let activities = self.activities.read().await;
        let mut matching: Vec<Activity> = activities.iter().filter(|a| filter.matches(a)).cloned().collect();
        // Insertion order breaks ties between identical timestamps
        matching.reverse();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(filter.limit as usize);
        Ok(matching)
    }

    async fn lead_status_counts(&self, owner: Option<Uuid>) -> Result<Vec<(LeadStatus, i64)>, DatabaseError> {
        let leads = self.leads.read().await;
        let mut counts: HashMap<LeadStatus, i64> = HashMap::new();
        for lead in leads.values() {
            if lead.archived || owner.map_or(false, |o| lead.assigned_agent != o) {
                continue;
            }
            *counts.entry(lead.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_customers(&self, owner: Option<Uuid>) -> Result<i64, DatabaseError> {
        let customers = self.customers.read().await;
        Ok(customers
            .values()
            .filter(|c| owner.map_or(true, |o| c.owner == o))
            .count() as i64)
    }

    async fn task_counts(&self, owner: Option<Uuid>, now: DateTime<Utc>) -> Result<TaskCounts, DatabaseError> {
        let tasks = self.tasks.read().await;
        let mut counts = TaskCounts::default();
        for task in tasks.values().filter(|t| owner.map_or(true, |o| t.owner == o)) {
            if task.status != super::models::TaskStatus::Done {
                counts.open += 1;
            }
            if task.is_overdue(now) {
                counts.overdue += 1;
            }
        }
        Ok(counts)
    }

    async fn daily_lead_counts(
        &self,
        owner: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, i64)>, DatabaseError> {
        let leads = self.leads.read().await;
        let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for lead in leads.values() {
            if lead.created_at < since || owner.map_or(false, |o| lead.assigned_agent != o) {
                continue;
            }
            *days.entry(lead.created_at.date_naive()).or_default() += 1;
        }
        Ok(days.into_iter().collect())
    }
}
