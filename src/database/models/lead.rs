use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::validation::{clean_optional, FieldError, Validate, Validator};

pub const DEFAULT_SOURCE: &str = "Other";

string_enum! {
    LeadStatus {
        New => "New",
        InProgress => "In Progress",
        ClosedWon => "Closed Won",
        ClosedLost => "Closed Lost",
    }
}

string_enum! {
    HistoryAction {
        Created => "created",
        Updated => "updated",
        StatusChanged => "status_changed",
        Reassigned => "reassigned",
        Archived => "archived",
        Restored => "restored",
        Converted => "converted",
    }
}

/// One audit line in a lead's append-only history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub by: Uuid,
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    pub assigned_agent: Uuid,
    pub archived: bool,
    pub history: Vec<HistoryEntry>,
    pub converted_customer_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Builds a lead from validated input, opening its history with `created`
    pub fn new(input: NewLead, assigned_agent: Uuid, created_by: Uuid) -> Self {
        let now = Utc::now();
        let mut lead = Self {
            id: Uuid::new_v4(),
            name: input.name.unwrap_or_default().trim().to_string(),
            email: clean_optional(input.email).map(|e| e.to_lowercase()),
            phone: clean_optional(input.phone),
            company: clean_optional(input.company),
            source: clean_optional(input.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            status: input.status.unwrap_or(LeadStatus::New),
            assigned_agent,
            archived: false,
            history: Vec::new(),
            converted_customer_id: None,
            created_by,
            created_at: now,
            updated_at: now,
        };
        lead.record(HistoryAction::Created, created_by, "Lead created");
        lead
    }

    /// Appends a history entry and bumps `updated_at`
    pub fn record(&mut self, action: HistoryAction, by: Uuid, message: impl Into<String>) {
        let at = Utc::now();
        self.history.push(HistoryEntry {
            action,
            by,
            at,
            message: message.into(),
        });
        self.updated_at = at;
    }

    pub fn is_converted(&self) -> bool {
        self.converted_customer_id.is_some()
    }

    /// Applies the plain field edits of an update, returning the names of the
    /// fields that actually changed. Status and assignment are handled by the
    /// caller because they carry their own history entries.
    pub fn apply_fields(&mut self, update: &LeadUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(name) = update.name.as_deref().map(str::trim) {
            if name != self.name {
                self.name = name.to_string();
                changed.push("name");
            }
        }
        if update.email.is_some() {
            let email = clean_optional(update.email.clone()).map(|e| e.to_lowercase());
            if email != self.email {
                self.email = email;
                changed.push("email");
            }
        }
        if update.phone.is_some() {
            let phone = clean_optional(update.phone.clone());
            if phone != self.phone {
                self.phone = phone;
                changed.push("phone");
            }
        }
        if update.company.is_some() {
            let company = clean_optional(update.company.clone());
            if company != self.company {
                self.company = company;
                changed.push("company");
            }
        }
        if let Some(source) = clean_optional(update.source.clone()) {
            if source != self.source {
                self.source = source;
                changed.push("source");
            }
        }

        changed
    }

    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.email.as_deref().map_or(false, |e| e.contains(&needle))
            || self
                .company
                .as_deref()
                .map_or(false, |c| c.to_lowercase().contains(&needle))
    }
}

/// POST /api/leads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub source: Option<String>,
    pub status: Option<LeadStatus>,
    pub assigned_agent: Option<Uuid>,
}

impl Validate for NewLead {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        v.required("name", self.name.as_deref())
            .max_len("name", self.name.as_deref(), 200)
            .max_len("phone", self.phone.as_deref(), 50)
            .max_len("company", self.company.as_deref(), 200)
            .max_len("source", self.source.as_deref(), 100);
        if let Some(email) = clean_optional(self.email.clone()) {
            v.email("email", Some(&email));
        }
        if self.status == Some(LeadStatus::ClosedWon) {
            v.push("status", "Leads become Closed Won through conversion");
        }
        v.finish()
    }
}

/// PATCH /api/leads/:id
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub source: Option<String>,
    pub status: Option<LeadStatus>,
    pub assigned_agent: Option<Uuid>,
}

impl Validate for LeadUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        v.not_blank("name", self.name.as_deref())
            .max_len("name", self.name.as_deref(), 200)
            .max_len("phone", self.phone.as_deref(), 50)
            .max_len("company", self.company.as_deref(), 200)
            .max_len("source", self.source.as_deref(), 100);
        if let Some(email) = clean_optional(self.email.clone()) {
            v.email("email", Some(&email));
        }
        if self.status == Some(LeadStatus::ClosedWon) {
            v.push("status", "Leads become Closed Won through conversion");
        }
        v.finish()
    }
}

/// POST /api/leads/:id/reassign
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignLead {
    pub assigned_agent: Option<Uuid>,
}

impl Validate for ReassignLead {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        if self.assigned_agent.is_none() {
            v.push("assignedAgent", "This field is required");
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    /// Ownership constraint; `None` for admins
    pub owner: Option<Uuid>,
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    pub search: Option<String>,
    pub include_archived: bool,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        if !self.include_archived && lead.archived {
            return false;
        }
        if self.owner.map_or(false, |o| lead.assigned_agent != o) {
            return false;
        }
        if self.status.map_or(false, |s| lead.status != s) {
            return false;
        }
        if let Some(source) = &self.source {
            if !lead.source.eq_ignore_ascii_case(source) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !lead.matches_search(search) {
                return false;
            }
        }
        true
    }
}
