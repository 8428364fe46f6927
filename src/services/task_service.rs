use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Page, Pagination};
use crate::database::models::{
    Activity, ActivityType, EntityType, NewTask, RelatedRef, Task, TaskFilter, TaskStatus, TaskUpdate, TaskView,
};
use crate::database::Store;
use crate::middleware::AuthUser;
use super::{ensure_owner, record_activity, resolve_owner, ServiceError, ServiceResult};

pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn activity(actor: &AuthUser, kind: ActivityType, task: &Task, message: String) -> Activity {
        Activity::new(kind, actor.id, &actor.name, EntityType::Task, task.id, message)
    }

    /// Looks the reference up in the collection its tag names. Missing or
    /// inaccessible targets are reported against `relatedId`.
    async fn resolve_related(&self, actor: &AuthUser, related: RelatedRef) -> ServiceResult<()> {
        let owner = match related {
            RelatedRef::Lead(id) => self.store.find_lead(id).await?.map(|lead| lead.assigned_agent),
            RelatedRef::Customer(id) => self.store.find_customer(id).await?.map(|customer| customer.owner),
        };

        match owner {
            None => Err(ServiceError::field("relatedId", format!("{} not found", related.kind()))),
            Some(owner) if !actor.is_admin() && owner != actor.id => Err(ServiceError::field(
                "relatedId",
                format!("{} is not accessible", related.kind()),
            )),
            Some(_) => Ok(()),
        }
    }

    pub async fn create(&self, actor: &AuthUser, input: NewTask) -> ServiceResult<TaskView> {
        let owner = resolve_owner(self.store.as_ref(), actor, input.owner, "owner").await?;
        if let Some(related) = input.related() {
            self.resolve_related(actor, related).await?;
        }

        let task = Task::new(input, owner);
        self.store.insert_task(&task).await?;
        record_activity(
            self.store.as_ref(),
            Self::activity(actor, ActivityType::TaskCreated, &task, format!("Created task {}", task.title)),
        )
        .await;
        Ok(task.view(Utc::now()))
    }

    pub async fn list(&self, actor: &AuthUser, mut filter: TaskFilter, page: Pagination) -> ServiceResult<Page<TaskView>> {
        if !actor.is_admin() {
            filter.owner = Some(actor.id);
        }
        let (items, total) = self.store.list_tasks(&filter, page).await?;
        let now = Utc::now();
        Ok(Page::new(page, total, items).map(|task| task.view(now)))
    }

    async fn find(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Task> {
        let task = self
            .store
            .find_task(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;
        ensure_owner(actor, task.owner, "task")?;
        Ok(task)
    }

    pub async fn get(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<TaskView> {
        Ok(self.find(actor, id).await?.view(Utc::now()))
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, update: TaskUpdate) -> ServiceResult<TaskView> {
        let mut task = self.find(actor, id).await?;
        let was_done = task.status == TaskStatus::Done;

        let mut changed = Vec::new();
        if let Some(owner) = update.owner {
            if owner != task.owner {
                if !actor.is_admin() {
                    return Err(ServiceError::Forbidden("Only admins can change the owner".to_string()));
                }
                task.owner = resolve_owner(self.store.as_ref(), actor, Some(owner), "owner").await?;
                changed.push("owner");
            }
        }
        if let Some(related) = update.related() {
            if task.related != Some(related) {
                self.resolve_related(actor, related).await?;
                task.related = Some(related);
                changed.push("related");
            }
        }
        changed.extend(task.apply_fields(&update));
        if changed.is_empty() {
            return Ok(task.view(Utc::now()));
        }

        task.updated_at = Utc::now();
        self.store.update_task(&task).await?;

        let activity = if !was_done && task.status == TaskStatus::Done {
            Self::activity(actor, ActivityType::TaskCompleted, &task, format!("Completed task {}", task.title))
        } else {
            Self::activity(actor, ActivityType::TaskUpdated, &task, format!("Updated {}", changed.join(", ")))
                .with_meta(json!({ "fields": changed }))
        };
        record_activity(self.store.as_ref(), activity).await;

        Ok(task.view(Utc::now()))
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        let task = self.find(actor, id).await?;
        if !self.store.delete_task(id).await? {
            return Err(ServiceError::NotFound("Task not found".to_string()));
        }
        record_activity(
            self.store.as_ref(),
            Self::activity(actor, ActivityType::TaskDeleted, &task, format!("Deleted task {}", task.title)),
        )
        .await;
        Ok(())
    }
}
