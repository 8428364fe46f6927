use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{Activity, ActivityFilter, EntityType};
use crate::database::Store;
use crate::middleware::AuthUser;
use super::ServiceResult;

/// Read side of the activity log
pub struct ActivityService {
    store: Arc<dyn Store>,
    default_limit: u32,
    max_limit: u32,
}

impl ActivityService {
    pub fn new(store: Arc<dyn Store>, default_limit: u32, max_limit: u32) -> Self {
        Self { store, default_limit, max_limit }
    }

    /// Most recent entries first. Agents only see what they did themselves.
    pub async fn feed(
        &self,
        actor: &AuthUser,
        entity: Option<(EntityType, Uuid)>,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Activity>> {
        let limit = limit
            .unwrap_or(self.default_limit as i64)
            .clamp(1, self.max_limit.max(1) as i64) as u32;
        let filter = ActivityFilter {
            actor: actor.scope(),
            entity,
            limit,
        };
        Ok(self.store.list_activities(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ActivityType, Role};
    use crate::services::fixtures;

    #[tokio::test]
    async fn feed_is_scoped_and_limited() {
        let store = fixtures::store();
        let ann = fixtures::user(&store, "Ann", Role::Agent).await;
        let bob = fixtures::user(&store, "Bob", Role::Agent).await;
        let admin = fixtures::user(&store, "Root", Role::Admin).await;

        let lead = Uuid::new_v4();
        for i in 0..3 {
            let activity = Activity::new(ActivityType::LeadUpdated, ann.id, "Ann", EntityType::Lead, lead, format!("a{}", i));
            store.insert_activity(&activity).await.unwrap();
        }
        let other = Activity::new(ActivityType::TaskCreated, bob.id, "Bob", EntityType::Task, Uuid::new_v4(), "b");
        store.insert_activity(&other).await.unwrap();

        let feed = ActivityService::new(store.clone(), 20, 100);
        let mine = feed.feed(&ann, None, None).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[0].message, "a2");

        assert_eq!(feed.feed(&admin, None, None).await.unwrap().len(), 4);
        assert_eq!(feed.feed(&admin, None, Some(2)).await.unwrap().len(), 2);
        assert_eq!(feed.feed(&admin, None, Some(0)).await.unwrap().len(), 1);
        assert_eq!(feed.feed(&admin, Some((EntityType::Lead, lead)), None).await.unwrap().len(), 3);
    }
}
