use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Page, Pagination};
use crate::database::models::{
    Activity, ActivityType, Customer, CustomerFilter, CustomerSummary, CustomerUpdate, EntityType, NewCustomer, Note,
};
use crate::database::Store;
use crate::middleware::AuthUser;
use super::{ensure_owner, record_activity, resolve_owner, ServiceError, ServiceResult};

pub struct CustomerService {
    store: Arc<dyn Store>,
    notes_preview: usize,
}

impl CustomerService {
    pub fn new(store: Arc<dyn Store>, notes_preview: usize) -> Self {
        Self { store, notes_preview }
    }

    fn activity(actor: &AuthUser, kind: ActivityType, customer: &Customer, message: String) -> Activity {
        Activity::new(kind, actor.id, &actor.name, EntityType::Customer, customer.id, message)
    }

    pub async fn create(&self, actor: &AuthUser, input: NewCustomer) -> ServiceResult<Customer> {
        let owner = resolve_owner(self.store.as_ref(), actor, input.owner, "owner").await?;
        let customer = Customer::new(input, owner);
        self.store.insert_customer(&customer).await?;

        record_activity(
            self.store.as_ref(),
            Self::activity(
                actor,
                ActivityType::CustomerCreated,
                &customer,
                format!("Created customer {}", customer.name),
            ),
        )
        .await;
        Ok(customer)
    }

    /// Listing view: each customer carries only its most recent notes
    pub async fn list(
        &self,
        actor: &AuthUser,
        mut filter: CustomerFilter,
        page: Pagination,
    ) -> ServiceResult<Page<CustomerSummary>> {
        if !actor.is_admin() {
            filter.owner = Some(actor.id);
        }
        let (items, total) = self.store.list_customers(&filter, page).await?;
        Ok(Page::new(page, total, items).map(|c| c.summary(self.notes_preview)))
    }

    pub async fn get(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Customer> {
        let customer = self
            .store
            .find_customer(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;
        ensure_owner(actor, customer.owner, "customer")?;
        Ok(customer)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, update: CustomerUpdate) -> ServiceResult<Customer> {
        let mut customer = self.get(actor, id).await?;

        let mut changed = Vec::new();
        if let Some(owner) = update.owner {
            if owner != customer.owner {
                if !actor.is_admin() {
                    return Err(ServiceError::Forbidden("Only admins can change the owner".to_string()));
                }
                customer.owner = resolve_owner(self.store.as_ref(), actor, Some(owner), "owner").await?;
                changed.push("owner");
            }
        }
        changed.extend(customer.apply_fields(&update));
        if changed.is_empty() {
            return Ok(customer);
        }

        customer.updated_at = chrono::Utc::now();
        self.store.update_customer(&customer).await?;
        record_activity(
            self.store.as_ref(),
            Self::activity(
                actor,
                ActivityType::CustomerUpdated,
                &customer,
                format!("Updated {}", changed.join(", ")),
            )
            .with_meta(json!({ "fields": changed })),
        )
        .await;
        Ok(customer)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        let customer = self.get(actor, id).await?;
        if !self.store.delete_customer(id).await? {
            return Err(ServiceError::NotFound("Customer not found".to_string()));
        }

        record_activity(
            self.store.as_ref(),
            Self::activity(
                actor,
                ActivityType::CustomerDeleted,
                &customer,
                format!("Deleted customer {}", customer.name),
            ),
        )
        .await;
        Ok(())
    }

    /// Appends a note and returns the full customer
    pub async fn add_note(&self, actor: &AuthUser, id: Uuid, body: &str) -> ServiceResult<Customer> {
        self.get(actor, id).await?;
        let note = Note::new(body, actor.id);
        let note_id = note.id;
        let customer = self.store.append_customer_note(id, &note).await?;

        record_activity(
            self.store.as_ref(),
            Self::activity(
                actor,
                ActivityType::CustomerNoteAdded,
                &customer,
                format!("Added a note to {}", customer.name),
            )
            .with_meta(json!({ "noteId": note_id })),
        )
        .await;
        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::services::fixtures;

    fn new_customer(name: &str) -> NewCustomer {
        NewCustomer { name: Some(name.into()), tags: Some(vec!["vip".into()]), ..Default::default() }
    }

    #[tokio::test]
    async fn list_truncates_notes_and_scopes_to_owner() {
        let store = fixtures::store();
        let ann = fixtures::user(&store, "Ann", Role::Agent).await;
        let bob = fixtures::user(&store, "Bob", Role::Agent).await;
        let customers = CustomerService::new(store.clone(), 5);

        let acme = customers.create(&ann, new_customer("Acme")).await.unwrap();
        customers.create(&bob, new_customer("Globex")).await.unwrap();
        for i in 0..7 {
            customers.add_note(&ann, acme.id, &format!("note {}", i)).await.unwrap();
        }

        let page = customers
            .list(&ann, CustomerFilter::default(), Pagination::new(None, None, 20, 100))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].notes.len(), 5);
        assert_eq!(page.items[0].notes_count, 7);
        assert_eq!(page.items[0].notes[0].body, "note 6");

        assert_eq!(customers.get(&ann, acme.id).await.unwrap().notes.len(), 7);
    }

    #[tokio::test]
    async fn concurrent_notes_are_all_kept() {
        let store = fixtures::store();
        let ann = fixtures::user(&store, "Ann", Role::Agent).await;
        let customers = Arc::new(CustomerService::new(store.clone(), 5));
        let acme = customers.create(&ann, new_customer("Acme")).await.unwrap();

        let writers: Vec<_> = (0..20)
            .map(|i| {
                let customers = customers.clone();
                let ann = ann.clone();
                tokio::spawn(async move { customers.add_note(&ann, acme.id, &format!("note {}", i)).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let stored = customers.get(&ann, acme.id).await.unwrap();
        assert_eq!(stored.notes.len(), 20);
    }

    #[tokio::test]
    async fn field_updates_leave_notes_alone() {
        let store = fixtures::store();
        let ann = fixtures::user(&store, "Ann", Role::Agent).await;
        let customers = CustomerService::new(store.clone(), 5);
        let acme = customers.create(&ann, new_customer("Acme")).await.unwrap();

        // A record read before the note was added must not drop it when written back
        let stale = store.find_customer(acme.id).await.unwrap().unwrap();
        customers.add_note(&ann, acme.id, "first call").await.unwrap();
        store.update_customer(&Customer { name: "Acme Corp".into(), ..stale }).await.unwrap();

        let stored = customers.get(&ann, acme.id).await.unwrap();
        assert_eq!(stored.name, "Acme Corp");
        assert_eq!(stored.notes.len(), 1);
    }

    #[tokio::test]
    async fn owner_changes_are_admin_only() {
        let store = fixtures::store();
        let ann = fixtures::user(&store, "Ann", Role::Agent).await;
        let bob = fixtures::user(&store, "Bob", Role::Agent).await;
        let admin = fixtures::user(&store, "Root", Role::Admin).await;
        let customers = CustomerService::new(store.clone(), 5);
        let acme = customers.create(&ann, new_customer("Acme")).await.unwrap();

        let handoff = CustomerUpdate { owner: Some(bob.id), ..Default::default() };
        assert!(matches!(
            customers.update(&ann, acme.id, handoff.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(customers.update(&admin, acme.id, handoff).await.unwrap().owner, bob.id);
    }

    #[tokio::test]
    async fn delete_is_hard_and_owner_checked() {
        let store = fixtures::store();
        let ann = fixtures::user(&store, "Ann", Role::Agent).await;
        let bob = fixtures::user(&store, "Bob", Role::Agent).await;
        let customers = CustomerService::new(store.clone(), 5);
        let acme = customers.create(&ann, new_customer("Acme")).await.unwrap();

        assert!(matches!(customers.delete(&bob, acme.id).await, Err(ServiceError::Forbidden(_))));
        customers.delete(&ann, acme.id).await.unwrap();
        assert!(matches!(customers.get(&ann, acme.id).await, Err(ServiceError::NotFound(_))));
    }
}
