use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::resources::departments::DepartmentMember;
use crate::resources::ApiClient;
use crate::transport::ApiRequest;
use crate::types::{AccessId, DepartmentId, PackageId, SubscriptionId, UserId};

const SUBSCRIBE: &str = "/api/services/subscribe/";
const BASE: &str = "/api/services/subscriptions/";
const ACCESS_BASE: &str = "/api/services/subscription-users/";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Cancelled,
    Expired,
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Other(other) => other,
        }
    }

    pub fn is_active(&self) -> bool {
        *self == SubscriptionStatus::Active
    }

    /// Cancelled or expired
    pub fn is_inactive(&self) -> bool {
        matches!(self, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired)
    }
}

impl From<String> for SubscriptionStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "active" => SubscriptionStatus::Active,
            "pending" => SubscriptionStatus::Pending,
            "cancelled" | "canceled" => SubscriptionStatus::Cancelled,
            "expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::Other(value),
        }
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub billing_cycle: Option<String>,
}

/// A user's grant on a subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccess {
    pub id: AccessId,
    #[serde(default)]
    pub user_details: Option<DepartmentMember>,
    #[serde(default)]
    pub granted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub service_package: Option<PackageId>,
    #[serde(default)]
    pub department_details: Option<DepartmentSummary>,
    #[serde(default)]
    pub service_package_details: Option<PackageSummary>,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub users: Vec<ServiceAccess>,
}

impl Subscription {
    /// "Ops - Basic" style title
    pub fn title(&self) -> String {
        let department = self.department_details.as_ref().map(|d| d.name.as_str()).unwrap_or("?");
        let package = self.service_package_details.as_ref().map(|p| p.name.as_str()).unwrap_or("?");
        format!("{} - {}", department, package)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub department: DepartmentId,
    pub service_package: PackageId,
}

#[derive(Serialize)]
struct StatusChange<'a> {
    status: &'a str,
}

#[derive(Serialize)]
struct AccessGrant {
    user_id: UserId,
}

pub struct Subscriptions {
    client: ApiClient,
}

impl Subscriptions {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, subscription: &NewSubscription) -> ClientResult<Subscription> {
        self.client.post(SUBSCRIBE, subscription).await
    }

    pub async fn list(&self) -> ClientResult<Vec<Subscription>> {
        self.client.list(ApiRequest::get(BASE)).await
    }

    pub async fn get(&self, id: SubscriptionId) -> ClientResult<Subscription> {
        self.client.get(&format!("{}{}/", BASE, id)).await
    }

    pub async fn update_status(&self, id: SubscriptionId, status: &SubscriptionStatus) -> ClientResult<Subscription> {
        self.client
            .patch(&format!("{}{}/", BASE, id), &StatusChange { status: status.as_str() })
            .await
    }

    pub async fn grant_access(&self, id: SubscriptionId, user: UserId) -> ClientResult<()> {
        self.client
            .submit(&format!("{}{}/", ACCESS_BASE, id), &AccessGrant { user_id: user })
            .await
    }

    pub async fn revoke_access(&self, access: AccessId) -> ClientResult<()> {
        self.client.delete(&format!("{}{}/", ACCESS_BASE, access)).await
    }
}
