use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientResult;
use crate::resources::ApiClient;
use crate::transport::ApiRequest;
use crate::types::PackageId;

const BASE: &str = "/api/services/packages/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePackage {
    pub id: PackageId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub billing_cycle: Option<String>,
    /// Free-form feature flags keyed by feature name
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ServicePackage {
    /// "$19.99/monthly" style label
    pub fn price_label(&self) -> String {
        match (&self.price, &self.billing_cycle) {
            (Some(price), Some(cycle)) => format!("${}/{}", price, cycle),
            (Some(price), None) => format!("${}", price),
            (None, _) => "n/a".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

pub struct Packages {
    client: ApiClient,
}

impl Packages {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn item(id: PackageId) -> String {
        format!("{}{}/", BASE, id)
    }

    pub async fn list(&self, active_only: bool) -> ClientResult<Vec<ServicePackage>> {
        self.client
            .list(ApiRequest::get(BASE).with_query("active_only", active_only))
            .await
    }

    pub async fn get(&self, id: PackageId) -> ClientResult<ServicePackage> {
        self.client.get(&Self::item(id)).await
    }

    pub async fn create(&self, draft: &PackageDraft) -> ClientResult<ServicePackage> {
        self.client.post(BASE, draft).await
    }

    pub async fn update(&self, id: PackageId, draft: &PackageDraft) -> ClientResult<ServicePackage> {
        self.client.patch(&Self::item(id), draft).await
    }

    pub async fn delete(&self, id: PackageId) -> ClientResult<()> {
        self.client.delete(&Self::item(id)).await
    }
}
