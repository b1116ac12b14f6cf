use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::resources::ApiClient;
use crate::transport::ApiRequest;
use crate::types::{DepartmentId, ResellerId, SubscriptionId, UserId};

const BASE: &str = "/api/users/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub is_root_admin: bool,
    #[serde(default)]
    pub is_reseller_admin: bool,
    #[serde(default)]
    pub is_department_admin: bool,
    #[serde(default)]
    pub reseller_id: Option<ResellerId>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

impl UserRecord {
    pub fn identifier(&self) -> Option<UserId> {
        self.user_id.or(self.id)
    }

    pub fn is_plain_user(&self) -> bool {
        !self.is_root_admin && !self.is_reseller_admin && !self.is_department_admin
    }
}

/// Role flags accepted by the user update endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_root_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reseller_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_department_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub users: Vec<UserRecord>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

impl SearchPage {
    pub fn has_more(&self) -> bool {
        (self.page as usize) * (self.limit as usize) < self.total
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchReply {
    Paged {
        #[serde(alias = "users")]
        results: Vec<UserRecord>,
        #[serde(default, alias = "count")]
        total: Option<usize>,
    },
    Plain(Vec<UserRecord>),
}

pub struct Users {
    client: ApiClient,
}

impl Users {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> ClientResult<Vec<UserRecord>> {
        self.client.list(ApiRequest::get(BASE)).await
    }

    pub async fn search(&self, query: &str, page: u32, limit: u32) -> ClientResult<SearchPage> {
        let request = ApiRequest::get(format!("{}search/", BASE))
            .with_query("query", query)
            .with_query("page", page)
            .with_query("limit", limit);

        let (users, total) = match self.client.fetch(request).await? {
            SearchReply::Paged { results, total } => {
                let total = total.unwrap_or(results.len());
                (results, total)
            }
            SearchReply::Plain(results) => {
                let total = results.len();
                (results, total)
            }
        };
        Ok(SearchPage { users, total, page, limit })
    }

    pub async fn get(&self, id: UserId) -> ClientResult<UserRecord> {
        self.client.get(&format!("{}{}/", BASE, id)).await
    }

    pub async fn update_role(&self, id: UserId, update: &RoleUpdate) -> ClientResult<UserRecord> {
        self.client.patch(&format!("{}{}/", BASE, id), update).await
    }

    pub async fn delete(&self, id: UserId) -> ClientResult<()> {
        self.client.delete(&format!("{}{}/", BASE, id)).await
    }

    pub async fn by_department(&self, department: DepartmentId) -> ClientResult<Vec<UserRecord>> {
        self.client
            .list(ApiRequest::get(format!("/api/departments/{}/users/", department)))
            .await
    }

    pub async fn by_subscription(&self, subscription: SubscriptionId) -> ClientResult<Vec<UserRecord>> {
        self.client
            .list(ApiRequest::get(format!("/api/subscriptions/{}/users/", subscription)))
            .await
    }
}
