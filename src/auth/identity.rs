use serde::{Deserialize, Serialize};

use crate::resources::departments::Department;
use crate::session::TokenPair;
use crate::types::{DepartmentId, ResellerId, UserId};

/// The authenticated principal, as returned by the backend profile endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_root_admin: bool,
    #[serde(default)]
    pub is_reseller_admin: bool,
    #[serde(default)]
    pub is_department_admin: bool,
    #[serde(default)]
    pub reseller_id: Option<ResellerId>,
    #[serde(default)]
    pub reseller_name: Option<String>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    /// Departments whose admin list contains this user (from department resources)
    #[serde(default)]
    pub administered_departments: Vec<DepartmentId>,
}

impl UserIdentity {
    pub fn identifier(&self) -> Option<UserId> {
        self.user_id.or(self.id)
    }

    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }

    pub fn role_label(&self) -> &'static str {
        if self.is_root_admin {
            "Root Administrator"
        } else if self.is_reseller_admin {
            "Reseller Administrator"
        } else if self.is_department_admin || !self.administered_departments.is_empty() {
            "Department Administrator"
        } else {
            "User"
        }
    }

    /// Record which of the given departments list this user among their admins
    pub fn apply_department_memberships(&mut self, departments: &[Department]) {
        let id = self.identifier();
        let email = self.email.as_str();
        let mut administered: Vec<DepartmentId> = departments
            .iter()
            .filter(|department| department.has_admin(id, email))
            .map(|department| department.department_id)
            .collect();
        administered.sort();
        administered.dedup();
        self.administered_departments = administered;
    }
}

/// New-account details for registration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationProfile {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub department_name: Option<String>,
}

/// Result of a successful login or registration
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: UserIdentity,
    pub tokens: TokenPair,
}

/// Login/registration response body
#[derive(Debug, Deserialize)]
pub(crate) struct AuthPayload {
    #[serde(default)]
    pub user: Option<UserIdentity>,
    #[serde(default)]
    pub tokens: Option<TokenPair>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginPayload<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterPayload<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reseller_id: Option<ResellerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<&'a str>,
}
