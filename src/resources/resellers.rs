//! Reseller administration and customer invite links.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientResult;
use crate::resources::departments::{Department, DepartmentMember};
use crate::resources::subscriptions::{NewSubscription, Subscription};
use crate::resources::{ApiClient, MemberEmail};
use crate::transport::ApiRequest;
use crate::types::{CustomerId, DepartmentId, ResellerId};

const BASE: &str = "/api/resellers/resellers/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reseller {
    pub reseller_id: ResellerId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Percentage, e.g. `10.00`
    #[serde(default)]
    pub commission_rate: Option<Decimal>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub admins: Vec<DepartmentMember>,
    #[serde(default)]
    pub customers: Vec<Department>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResellerDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// A reseller's customer: a link record around a department
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub department_details: Option<Department>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct Resellers {
    client: ApiClient,
}

impl Resellers {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn item(id: ResellerId) -> String {
        format!("{}{}/", BASE, id)
    }

    pub async fn list(&self) -> ClientResult<Vec<Reseller>> {
        self.client.list(ApiRequest::get(BASE)).await
    }

    pub async fn get(&self, id: ResellerId) -> ClientResult<Reseller> {
        self.client.get(&Self::item(id)).await
    }

    pub async fn create(&self, draft: &ResellerDraft) -> ClientResult<Reseller> {
        self.client.post(BASE, draft).await
    }

    pub async fn update(&self, id: ResellerId, draft: &ResellerDraft) -> ClientResult<Reseller> {
        self.client.patch(&Self::item(id), draft).await
    }

    pub async fn delete(&self, id: ResellerId) -> ClientResult<()> {
        self.client.delete(&Self::item(id)).await
    }

    pub async fn add_admin(&self, id: ResellerId, email: &str) -> ClientResult<()> {
        self.client
            .submit(&format!("{}admins/", Self::item(id)), &MemberEmail::new(email))
            .await
    }

    pub async fn remove_admin(&self, id: ResellerId, email: &str) -> ClientResult<()> {
        self.client
            .delete_with(&format!("{}admins/", Self::item(id)), &MemberEmail::new(email))
            .await
    }

    pub async fn customers(&self, id: ResellerId) -> ClientResult<Vec<Customer>> {
        self.client
            .list(ApiRequest::get(format!("{}customers/", Self::item(id))))
            .await
    }

    pub async fn create_customer(&self, id: ResellerId, customer: &NewCustomer) -> ClientResult<Customer> {
        self.client
            .post(&format!("{}customers/", Self::item(id)), customer)
            .await
    }

    pub async fn delete_customer(&self, id: ResellerId, customer: CustomerId) -> ClientResult<()> {
        self.client
            .delete(&format!("{}customers/{}/", Self::item(id), customer))
            .await
    }

    /// Subscribe one of the reseller's customer departments to a package
    pub async fn create_subscription(&self, id: ResellerId, subscription: &NewSubscription) -> ClientResult<Subscription> {
        self.client
            .post(&format!("{}subscriptions/", Self::item(id)), subscription)
            .await
    }
}

/// Shareable registration link that pre-scopes a new account to a reseller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLink {
    pub reseller_id: ResellerId,
    pub company_name: Option<String>,
}

impl InviteLink {
    pub fn new(reseller_id: ResellerId) -> Self {
        Self {
            reseller_id,
            company_name: None,
        }
    }

    pub fn with_company(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.company_name = if name.trim().is_empty() { None } else { Some(name) };
        self
    }

    /// `<origin>/?reseller_id=<id>[&company_name=<name>]`
    pub fn to_url(&self, origin: &str) -> ClientResult<Url> {
        let mut url = Url::parse(origin)?.join("/")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("reseller_id", &self.reseller_id.to_string());
            if let Some(company) = &self.company_name {
                query.append_pair("company_name", company);
            }
        }
        Ok(url)
    }

    /// Recover an invite from a landing URL; `None` unless it carries a positive reseller id
    pub fn parse(link: &str) -> Option<Self> {
        let url = Url::parse(link).ok()?;
        let mut reseller_id = None;
        let mut company_name = None;
        for (key, value) in url.query_pairs() {
            match &*key {
                "reseller_id" => reseller_id = value.parse::<i64>().ok().filter(|id| *id > 0).map(ResellerId),
                "company_name" if !value.trim().is_empty() => company_name = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            reseller_id: reseller_id?,
            company_name,
        })
    }
}
