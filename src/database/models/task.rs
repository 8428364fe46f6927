use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::validation::{clean_optional, FieldError, Validate, Validator};

string_enum! {
    TaskStatus {
        Todo => "Todo",
        InProgress => "In Progress",
        Done => "Done",
    }
}

string_enum! {
    TaskPriority {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
}

string_enum! {
    RelatedType {
        Lead => "Lead",
        Customer => "Customer",
    }
}

/// Typed reference to the record a task is about.
/// Serialized as `{"relatedType": "Lead", "relatedId": "<uuid>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "relatedType", content = "relatedId")]
pub enum RelatedRef {
    Lead(Uuid),
    Customer(Uuid),
}

impl RelatedRef {
    pub fn new(kind: RelatedType, id: Uuid) -> Self {
        match kind {
            RelatedType::Lead => RelatedRef::Lead(id),
            RelatedType::Customer => RelatedRef::Customer(id),
        }
    }

    pub fn kind(&self) -> RelatedType {
        match self {
            RelatedRef::Lead(_) => RelatedType::Lead,
            RelatedRef::Customer(_) => RelatedType::Customer,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            RelatedRef::Lead(id) | RelatedRef::Customer(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub owner: Uuid,
    #[serde(flatten)]
    pub related: Option<RelatedRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(input: NewTask, owner: Uuid) -> Self {
        let now = Utc::now();
        let related = input.related();
        Self {
            id: Uuid::new_v4(),
            title: input.title.unwrap_or_default().trim().to_string(),
            description: clean_optional(input.description),
            status: input.status.unwrap_or(TaskStatus::Todo),
            priority: input.priority.unwrap_or(TaskPriority::Medium),
            due_date: input.due_date,
            owner,
            related,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derived, never stored: past due and not finished
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done && self.due_date.map_or(false, |due| due < now)
    }

    pub fn view(self, now: DateTime<Utc>) -> TaskView {
        let overdue = self.is_overdue(now);
        TaskView { task: self, overdue }
    }

    /// Applies field edits (owner and related excluded), returning the changed field names
    pub fn apply_fields(&mut self, update: &TaskUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(title) = update.title.as_deref().map(str::trim) {
            if title != self.title {
                self.title = title.to_string();
                changed.push("title");
            }
        }
        if update.description.is_some() {
            let description = clean_optional(update.description.clone());
            if description != self.description {
                self.description = description;
                changed.push("description");
            }
        }
        if let Some(status) = update.status {
            if status != self.status {
                self.status = status;
                changed.push("status");
            }
        }
        if let Some(priority) = update.priority {
            if priority != self.priority {
                self.priority = priority;
                changed.push("priority");
            }
        }
        if update.due_date.is_some() && update.due_date != self.due_date {
            self.due_date = update.due_date;
            changed.push("dueDate");
        }

        if !changed.is_empty() {
            self.updated_at = Utc::now();
        }
        changed
    }
}

/// Task as returned by the API, with the derived `overdue` flag
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub overdue: bool,
}

/// POST /api/tasks
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub related_type: Option<RelatedType>,
    pub related_id: Option<Uuid>,
    pub owner: Option<Uuid>,
}

impl NewTask {
    pub fn related(&self) -> Option<RelatedRef> {
        match (self.related_type, self.related_id) {
            (Some(kind), Some(id)) => Some(RelatedRef::new(kind, id)),
            _ => None,
        }
    }
}

impl Validate for NewTask {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        v.required("title", self.title.as_deref())
            .max_len("title", self.title.as_deref(), 200)
            .max_len("description", self.description.as_deref(), 5000);
        validate_related_pair(&mut v, self.related_type, self.related_id);
        v.finish()
    }
}

/// PATCH /api/tasks/:id
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub related_type: Option<RelatedType>,
    pub related_id: Option<Uuid>,
    pub owner: Option<Uuid>,
}

impl TaskUpdate {
    pub fn related(&self) -> Option<RelatedRef> {
        match (self.related_type, self.related_id) {
            (Some(kind), Some(id)) => Some(RelatedRef::new(kind, id)),
            _ => None,
        }
    }
}

impl Validate for TaskUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        v.not_blank("title", self.title.as_deref())
            .max_len("title", self.title.as_deref(), 200)
            .max_len("description", self.description.as_deref(), 5000);
        validate_related_pair(&mut v, self.related_type, self.related_id);
        v.finish()
    }
}

fn validate_related_pair(v: &mut Validator, kind: Option<RelatedType>, id: Option<Uuid>) {
    match (kind, id) {
        (Some(_), None) => v.push("relatedId", "relatedId is required when relatedType is set"),
        (None, Some(_)) => v.push("relatedType", "relatedType is required when relatedId is set"),
        _ => {}
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub owner: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub related: Option<RelatedRef>,
    /// Only tasks overdue at this instant
    pub overdue_at: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.owner.map_or(true, |o| task.owner == o)
            && self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && self.related.map_or(true, |r| task.related == Some(r))
            && self.overdue_at.map_or(true, |now| task.is_overdue(now))
    }
}
