use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::models::LeadStatus;
use crate::database::Store;
use crate::middleware::AuthUser;
use super::ServiceResult;

/// Days covered by the lead time series, today included
pub const TREND_DAYS: i64 = 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: LeadStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub leads_by_status: Vec<StatusCount>,
    pub total_leads: i64,
    pub customers: i64,
    pub open_tasks: i64,
    pub overdue_tasks: i64,
    pub leads_last_14_days: Vec<DailyCount>,
}

pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn summary(&self, actor: &AuthUser) -> ServiceResult<Dashboard> {
        self.summary_at(actor, Utc::now()).await
    }

    pub async fn summary_at(&self, actor: &AuthUser, now: DateTime<Utc>) -> ServiceResult<Dashboard> {
        let owner = actor.scope();
        let today = now.date_naive();
        let first_day = today - Duration::days(TREND_DAYS - 1);
        let since = first_day.and_time(NaiveTime::MIN).and_utc();

        let (statuses, customers, tasks, daily) = futures::try_join!(
            self.store.lead_status_counts(owner),
            self.store.count_customers(owner),
            self.store.task_counts(owner, now),
            self.store.daily_lead_counts(owner, since),
        )?;

        let leads_by_status = zero_fill_statuses(&statuses);
        let total_leads = leads_by_status.iter().map(|s| s.count).sum();

        Ok(Dashboard {
            leads_by_status,
            total_leads,
            customers,
            open_tasks: tasks.open,
            overdue_tasks: tasks.overdue,
            leads_last_14_days: zero_fill_days(first_day, &daily),
        })
    }
}

/// Every status appears, in declaration order
fn zero_fill_statuses(counts: &[(LeadStatus, i64)]) -> Vec<StatusCount> {
    let counts: HashMap<LeadStatus, i64> = counts.iter().copied().collect();
    LeadStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: counts.get(status).copied().unwrap_or(0),
        })
        .collect()
}

fn zero_fill_days(first_day: NaiveDate, counts: &[(NaiveDate, i64)]) -> Vec<DailyCount> {
    let counts: HashMap<NaiveDate, i64> = counts.iter().copied().collect();
    (0..TREND_DAYS)
        .map(|offset| {
            let date = first_day + Duration::days(offset);
            DailyCount {
                date,
                count: counts.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}
