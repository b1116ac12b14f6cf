use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::resources::{ApiClient, MemberEmail};
use crate::transport::ApiRequest;
use crate::types::{DepartmentId, ResellerId, UserId};

const BASE: &str = "/api/departments/departments/";

/// A user listed on a department (as admin or member)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentMember {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub department_id: DepartmentId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reseller_id: Option<ResellerId>,
    #[serde(default)]
    pub admins: Vec<DepartmentMember>,
    #[serde(default)]
    pub users: Vec<DepartmentMember>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Department {
    /// Match by id when both sides carry one, otherwise by email
    pub fn has_admin(&self, user: Option<UserId>, email: &str) -> bool {
        self.admins.iter().any(|admin| match (admin.user_id, user) {
            (Some(admin_id), Some(user_id)) => admin_id == user_id,
            _ => !email.is_empty() && admin.email.eq_ignore_ascii_case(email),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepartmentDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reseller_id: Option<ResellerId>,
}

pub struct Departments {
    client: ApiClient,
}

impl Departments {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn item(id: DepartmentId) -> String {
        format!("{}{}/", BASE, id)
    }

    pub async fn list(&self) -> ClientResult<Vec<Department>> {
        self.client.list(ApiRequest::get(BASE)).await
    }

    pub async fn get(&self, id: DepartmentId) -> ClientResult<Department> {
        self.client.get(&Self::item(id)).await
    }

    pub async fn create(&self, draft: &DepartmentDraft) -> ClientResult<Department> {
        self.client.post(BASE, draft).await
    }

    pub async fn update(&self, id: DepartmentId, draft: &DepartmentDraft) -> ClientResult<Department> {
        self.client.patch(&Self::item(id), draft).await
    }

    pub async fn delete(&self, id: DepartmentId) -> ClientResult<()> {
        self.client.delete(&Self::item(id)).await
    }

    pub async fn add_admin(&self, id: DepartmentId, email: &str) -> ClientResult<()> {
        self.client
            .submit(&format!("{}admins/", Self::item(id)), &MemberEmail::new(email))
            .await
    }

    pub async fn remove_admin(&self, id: DepartmentId, email: &str) -> ClientResult<()> {
        self.client
            .delete_with(&format!("{}admins/", Self::item(id)), &MemberEmail::new(email))
            .await
    }

    pub async fn add_user(&self, id: DepartmentId, email: &str) -> ClientResult<()> {
        self.client
            .submit(&format!("{}users/", Self::item(id)), &MemberEmail::new(email))
            .await
    }

    pub async fn remove_user(&self, id: DepartmentId, email: &str) -> ClientResult<()> {
        self.client
            .delete_with(&format!("{}users/", Self::item(id)), &MemberEmail::new(email))
            .await
    }
}
