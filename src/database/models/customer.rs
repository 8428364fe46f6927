use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::validation::{clean_optional, FieldError, Validate, Validator};
use super::lead::Lead;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub body: String,
    pub author: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(body: &str, author: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: body.trim().to_string(),
            author,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub tags: Vec<String>,
    /// Append-only, oldest first
    pub notes: Vec<Note>,
    pub owner: Uuid,
    pub lead_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing shape: only the most recent notes, newest first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub tags: Vec<String>,
    pub notes: Vec<Note>,
    pub notes_count: usize,
    pub owner: Uuid,
    pub lead_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(input: NewCustomer, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.unwrap_or_default().trim().to_string(),
            email: clean_optional(input.email).map(|e| e.to_lowercase()),
            phone: clean_optional(input.phone),
            company: clean_optional(input.company),
            tags: normalize_tags(input.tags.unwrap_or_default()),
            notes: Vec::new(),
            owner,
            lead_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copies a lead's contact fields into a new customer owned by the lead's agent
    pub fn from_lead(lead: &Lead) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            company: lead.company.clone(),
            tags: Vec::new(),
            notes: Vec::new(),
            owner: lead.assigned_agent,
            lead_id: Some(lead.id),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn recent_notes(&self, n: usize) -> Vec<Note> {
        self.notes.iter().rev().take(n).cloned().collect()
    }

    pub fn summary(&self, notes_preview: usize) -> CustomerSummary {
        CustomerSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
            tags: self.tags.clone(),
            notes: self.recent_notes(notes_preview),
            notes_count: self.notes.len(),
            owner: self.owner,
            lead_id: self.lead_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Applies field edits (owner excluded), returning the changed field names
    pub fn apply_fields(&mut self, update: &CustomerUpdate) -> Vec<&'static str> {
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
        if let Some(tags) = &update.tags {
            let tags = normalize_tags(tags.clone());
            if tags != self.tags {
                self.tags = tags;
                changed.push("tags");
            }
        }

        if !changed.is_empty() {
            self.updated_at = Utc::now();
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

/// Tags behave as a set: trimmed, blanks dropped, first occurrence wins
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

/// POST /api/customers
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub tags: Option<Vec<String>>,
    pub owner: Option<Uuid>,
}

impl Validate for NewCustomer {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        v.required("name", self.name.as_deref())
            .max_len("name", self.name.as_deref(), 200)
            .max_len("phone", self.phone.as_deref(), 50)
            .max_len("company", self.company.as_deref(), 200);
        if let Some(email) = clean_optional(self.email.clone()) {
            v.email("email", Some(&email));
        }
        validate_tags(&mut v, self.tags.as_deref());
        v.finish()
    }
}

/// PATCH /api/customers/:id
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub tags: Option<Vec<String>>,
    pub owner: Option<Uuid>,
}

impl Validate for CustomerUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        v.not_blank("name", self.name.as_deref())
            .max_len("name", self.name.as_deref(), 200)
            .max_len("phone", self.phone.as_deref(), 50)
            .max_len("company", self.company.as_deref(), 200);
        if let Some(email) = clean_optional(self.email.clone()) {
            v.email("email", Some(&email));
        }
        validate_tags(&mut v, self.tags.as_deref());
        v.finish()
    }
}

fn validate_tags(v: &mut Validator, tags: Option<&[String]>) {
    if let Some(tags) = tags {
        if tags.len() > 50 {
            v.push("tags", "At most 50 tags are allowed");
        }
        if tags.iter().any(|t| t.chars().count() > 50) {
            v.push("tags", "Tags must be at most 50 characters");
        }
    }
}

/// POST /api/customers/:id/notes
#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    pub body: Option<String>,
}

impl Validate for NewNote {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("body", self.body.as_deref())
            .max_len("body", self.body.as_deref(), 5000)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub owner: Option<Uuid>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        if self.owner.map_or(false, |o| customer.owner != o) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !customer.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !customer.matches_search(search) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::lead::NewLead;

    #[test]
    fn tags_are_a_set() {
        let tags = normalize_tags(vec![
            " vip ".to_string(),
            "VIP".to_string(),
            "".to_string(),
            "enterprise".to_string(),
        ]);
        assert_eq!(tags, vec!["vip", "enterprise"]);
    }

    #[test]
    fn summary_keeps_most_recent_notes_newest_first() {
        let owner = Uuid::new_v4();
        let mut customer = Customer::new(
            NewCustomer { name: Some("Acme".into()), ..Default::default() },
            owner,
        );
        for i in 1..=7 {
            customer.notes.push(Note::new(&format!("note {}", i), owner));
        }

        let summary = customer.summary(5);
        assert_eq!(summary.notes_count, 7);
        let bodies: Vec<&str> = summary.notes.iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, vec!["note 7", "note 6", "note 5", "note 4", "note 3"]);
        assert_eq!(customer.notes.len(), 7);
    }

    #[test]
    fn from_lead_copies_contact_fields() {
        let agent = Uuid::new_v4();
        let lead = Lead::new(
            NewLead {
                name: Some("Jane".into()),
                email: Some("jane@example.com".into()),
                company: Some("Acme".into()),
                ..Default::default()
            },
            agent,
            Uuid::new_v4(),
        );
        let customer = Customer::from_lead(&lead);
        assert_eq!(customer.name, "Jane");
        assert_eq!(customer.company.as_deref(), Some("Acme"));
        assert_eq!(customer.owner, agent);
        assert_eq!(customer.lead_id, Some(lead.id));
    }

    #[test]
    fn blank_note_is_rejected() {
        assert!(NewNote { body: Some("  ".into()) }.validate().is_err());
        assert!(NewNote { body: Some("Called, left voicemail".into()) }.validate().is_ok());
    }
}
