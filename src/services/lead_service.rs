use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::{Page, Pagination};
use crate::database::models::{
    Activity, ActivityType, Customer, EntityType, HistoryAction, Lead, LeadFilter, LeadStatus, LeadUpdate, NewLead,
};
use crate::database::Store;
use crate::middleware::AuthUser;
use super::{ensure_owner, record_activity, require_active_user, resolve_owner, ServiceError, ServiceResult};

/// Result of converting a lead
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub lead: Lead,
    pub customer: Customer,
}

pub struct LeadService {
    store: Arc<dyn Store>,
}

impl LeadService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn activity(actor: &AuthUser, kind: ActivityType, lead: &Lead, message: String) -> Activity {
        Activity::new(kind, actor.id, &actor.name, EntityType::Lead, lead.id, message)
    }

    pub async fn create(&self, actor: &AuthUser, input: NewLead) -> ServiceResult<Lead> {
        let assigned = resolve_owner(self.store.as_ref(), actor, input.assigned_agent, "assignedAgent").await?;
        let lead = Lead::new(input, assigned, actor.id);
        self.store.insert_lead(&lead).await?;

        record_activity(
            self.store.as_ref(),
            Self::activity(actor, ActivityType::LeadCreated, &lead, format!("Created lead {}", lead.name)),
        )
        .await;
        Ok(lead)
    }

    /// Agents only ever see their own leads, whatever `assigned_agent` filter was asked for
    pub async fn list(&self, actor: &AuthUser, mut filter: LeadFilter, page: Pagination) -> ServiceResult<Page<Lead>> {
        if !actor.is_admin() {
            filter.owner = Some(actor.id);
        }
        let (items, total) = self.store.list_leads(&filter, page).await?;
        Ok(Page::new(page, total, items))
    }

    pub async fn get(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Lead> {
        let lead = self
            .store
            .find_lead(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Lead not found".to_string()))?;
        ensure_owner(actor, lead.assigned_agent, "lead")?;
        Ok(lead)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, update: LeadUpdate) -> ServiceResult<Lead> {
        let mut lead = self.get(actor, id).await?;
        let mut activities = Vec::new();

        if let Some(agent) = update.assigned_agent {
            if !actor.is_admin() {
                return Err(ServiceError::Forbidden("Only admins can reassign leads".to_string()));
            }
            if agent != lead.assigned_agent {
                activities.push(self.reassign_to(actor, &mut lead, agent).await?);
            }
        }

        if let Some(status) = update.status {
            if status != lead.status {
                if lead.is_converted() {
                    return Err(ServiceError::Conflict(
                        "The status of a converted lead cannot be changed".to_string(),
                    ));
                }
                let message = format!("Status changed from {} to {}", lead.status, status);
                lead.status = status;
                lead.record(HistoryAction::StatusChanged, actor.id, message.clone());
                activities.push(
                    Self::activity(actor, ActivityType::LeadStatusChanged, &lead, message)
                        .with_meta(json!({ "status": status })),
                );
            }
        }

        let changed = lead.apply_fields(&update);
        if !changed.is_empty() {
            let message = format!("Updated {}", changed.join(", "));
            lead.record(HistoryAction::Updated, actor.id, message.clone());
            activities.push(
                Self::activity(actor, ActivityType::LeadUpdated, &lead, message).with_meta(json!({ "fields": changed })),
            );
        }

        if activities.is_empty() {
            return Ok(lead);
        }

        self.store.update_lead(&lead).await?;
        for activity in activities {
            record_activity(self.store.as_ref(), activity).await;
        }
        Ok(lead)
    }

    /// Soft delete
    pub async fn archive(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Lead> {
        self.set_archived(actor, id, true).await
    }

    pub async fn restore(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Lead> {
        self.set_archived(actor, id, false).await
    }

    async fn set_archived(&self, actor: &AuthUser, id: Uuid, archived: bool) -> ServiceResult<Lead> {
        let mut lead = self.get(actor, id).await?;
        if lead.archived == archived {
            return Ok(lead);
        }

        let (action, kind, message) = if archived {
            (HistoryAction::Archived, ActivityType::LeadArchived, "Lead archived")
        } else {
            (HistoryAction::Restored, ActivityType::LeadRestored, "Lead restored")
        };
        lead.archived = archived;
        lead.record(action, actor.id, message);
        self.store.update_lead(&lead).await?;

        record_activity(
            self.store.as_ref(),
            Self::activity(actor, kind, &lead, format!("{}: {}", message, lead.name)),
        )
        .await;
        Ok(lead)
    }

    /// Creates a customer from the lead and closes it as won. The lead,
    /// customer and activity are written together; a lead converts at most once.
    pub async fn convert(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Conversion> {
        let mut lead = self.get(actor, id).await?;
        if lead.is_converted() {
            return Err(ServiceError::Conflict("Lead has already been converted".to_string()));
        }
        if lead.archived {
            return Err(ServiceError::Conflict("Archived leads cannot be converted".to_string()));
        }

        let customer = Customer::from_lead(&lead);
        lead.status = LeadStatus::ClosedWon;
        lead.converted_customer_id = Some(customer.id);
        lead.record(
            HistoryAction::Converted,
            actor.id,
            format!("Converted to customer {}", customer.id),
        );

        let activity = Self::activity(
            actor,
            ActivityType::LeadConverted,
            &lead,
            format!("Converted lead {} to a customer", lead.name),
        )
        .with_meta(json!({ "customerId": customer.id }));

        self.store.convert_lead(&lead, &customer, &activity).await?;
        info!("Lead {} converted to customer {}", lead.id, customer.id);
        Ok(Conversion { lead, customer })
    }

    /// Admin-only: hand the lead to another active user
    pub async fn reassign(&self, actor: &AuthUser, id: Uuid, agent: Uuid) -> ServiceResult<Lead> {
        let mut lead = self.get(actor, id).await?;
        if agent == lead.assigned_agent {
            return Ok(lead);
        }

        let activity = self.reassign_to(actor, &mut lead, agent).await?;
        self.store.update_lead(&lead).await?;
        record_activity(self.store.as_ref(), activity).await;
        Ok(lead)
    }

    async fn reassign_to(&self, actor: &AuthUser, lead: &mut Lead, agent: Uuid) -> ServiceResult<Activity> {
        let target = require_active_user(self.store.as_ref(), agent, "assignedAgent").await?;
        let from = lead.assigned_agent;
        let message = format!("Reassigned to {}", target.name);

        lead.assigned_agent = target.id;
        lead.record(HistoryAction::Reassigned, actor.id, message.clone());
        Ok(Self::activity(actor, ActivityType::LeadReassigned, lead, message)
            .with_meta(json!({ "from": from, "to": target.id })))
    }
}
