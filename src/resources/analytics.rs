//! Dashboard metrics computed client-side from the list endpoints.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::error::ClientResult;
use crate::resources::departments::{Department, Departments};
use crate::resources::subscriptions::{Subscription, SubscriptionStatus, Subscriptions};
use crate::resources::users::{UserRecord, Users};

/// Counts of users by highest role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleBreakdown {
    pub root_admins: usize,
    pub reseller_admins: usize,
    pub department_admins: usize,
    pub users: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_subscriptions: usize,
    pub active_subscriptions: usize,
    pub pending_subscriptions: usize,
    pub inactive_subscriptions: usize,
    pub total_departments: usize,
    pub total_users: usize,
    /// Keyed `YYYY-MM` so ordering is chronological
    pub subscriptions_by_month: BTreeMap<String, usize>,
    pub users_by_department: BTreeMap<String, usize>,
    pub roles: RoleBreakdown,
}

impl DashboardMetrics {
    pub async fn collect(subscriptions: &Subscriptions, departments: &Departments, users: &Users) -> ClientResult<Self> {
        let (subscriptions, departments, users) =
            futures::try_join!(subscriptions.list(), departments.list(), users.list())?;
        Ok(Self::compute(&subscriptions, &departments, &users))
    }

    pub fn compute(subscriptions: &[Subscription], departments: &[Department], users: &[UserRecord]) -> Self {
        let mut metrics = Self {
            total_subscriptions: subscriptions.len(),
            total_departments: departments.len(),
            total_users: users.len(),
            ..Self::default()
        };

        for subscription in subscriptions {
            if subscription.status.is_active() {
                metrics.active_subscriptions += 1;
            } else if subscription.status.is_inactive() {
                metrics.inactive_subscriptions += 1;
            } else if subscription.status == SubscriptionStatus::Pending {
                metrics.pending_subscriptions += 1;
            }

            if let Some(created) = subscription.created_at {
                let month = format!("{:04}-{:02}", created.year(), created.month());
                *metrics.subscriptions_by_month.entry(month).or_default() += 1;
            }
        }

        for department in departments {
            *metrics.users_by_department.entry(department.name.clone()).or_default() += department.users.len();
        }

        for user in users {
            if user.is_root_admin {
                metrics.roles.root_admins += 1;
            } else if user.is_reseller_admin {
                metrics.roles.reseller_admins += 1;
            } else if user.is_department_admin {
                metrics.roles.department_admins += 1;
            } else {
                metrics.roles.users += 1;
            }
        }

        metrics
    }

    /// Whole-number percentage of subscriptions that are active
    pub fn active_rate(&self) -> u32 {
        if self.total_subscriptions == 0 {
            return 0;
        }
        ((self.active_subscriptions as f64 / self.total_subscriptions as f64) * 100.0).round() as u32
    }
}
