use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

string_enum! {
    EntityType {
        Lead => "Lead",
        Customer => "Customer",
        Task => "Task",
        User => "User",
    }
}

string_enum! {
    ActivityType {
        LeadCreated => "lead_created",
        LeadUpdated => "lead_updated",
        LeadStatusChanged => "lead_status_changed",
        LeadReassigned => "lead_reassigned",
        LeadArchived => "lead_archived",
        LeadRestored => "lead_restored",
        LeadConverted => "lead_converted",
        CustomerCreated => "customer_created",
        CustomerUpdated => "customer_updated",
        CustomerDeleted => "customer_deleted",
        CustomerNoteAdded => "customer_note_added",
        TaskCreated => "task_created",
        TaskUpdated => "task_updated",
        TaskCompleted => "task_completed",
        TaskDeleted => "task_deleted",
        UserCreated => "user_created",
        UserUpdated => "user_updated",
        UserDeactivated => "user_deactivated",
    }
}

/// Immutable event written as a side effect of a mutation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub actor: Uuid,
    pub actor_name: String,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub message: String,
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        kind: ActivityType,
        actor: Uuid,
        actor_name: impl Into<String>,
        entity_type: EntityType,
        entity_id: Uuid,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            actor,
            actor_name: actor_name.into(),
            entity_type,
            entity_id,
            message: message.into(),
            meta: Value::Object(Default::default()),
            created_at: Utc::now(),
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ActivityFilter {
    pub actor: Option<Uuid>,
    pub entity: Option<(EntityType, Uuid)>,
    pub limit: u32,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        self.actor.map_or(true, |a| activity.actor == a)
            && self
                .entity
                .map_or(true, |(t, id)| activity.entity_type == t && activity.entity_id == id)
    }
}
