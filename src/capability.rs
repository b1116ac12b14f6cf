//! Capability model: which actions and navigation items an identity may see.
//!
//! Derived purely from a [`UserIdentity`] snapshot, with no storage or network
//! access. This is UX gating only; the backend enforces authorization.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::auth::UserIdentity;
use crate::types::{DepartmentId, ResellerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewProfile,
    UpdateProfile,
    ViewAnalytics,
    ManageUsers,
    ManageAccessControl,
    ManageResellers,
    ManageResellerAdmins,
    ManageCustomers,
    ManageResellerSubscriptions,
    GenerateInviteLink,
    ViewServicePackages,
    ManageServicePackages,
    ViewDepartments,
    ManageDepartments,
    ManageDepartmentAdmins,
    ManageDepartmentUsers,
    ViewSubscriptions,
    ManageSubscriptions,
    ChangeSubscriptionStatus,
}

impl Action {
    pub const ALL: [Action; 19] = [
        Action::ViewProfile,
        Action::UpdateProfile,
        Action::ViewAnalytics,
        Action::ManageUsers,
        Action::ManageAccessControl,
        Action::ManageResellers,
        Action::ManageResellerAdmins,
        Action::ManageCustomers,
        Action::ManageResellerSubscriptions,
        Action::GenerateInviteLink,
        Action::ViewServicePackages,
        Action::ManageServicePackages,
        Action::ViewDepartments,
        Action::ManageDepartments,
        Action::ManageDepartmentAdmins,
        Action::ManageDepartmentUsers,
        Action::ViewSubscriptions,
        Action::ManageSubscriptions,
        Action::ChangeSubscriptionStatus,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Scope {
    Global,
    Reseller(ResellerId),
    Department(DepartmentId),
    Own,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Capability {
    pub action: Action,
    pub scope: Scope,
}

impl Capability {
    pub fn new(action: Action, scope: Scope) -> Self {
        Self { action, scope }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavItem {
    Dashboard,
    Users,
    Departments,
    Packages,
    Subscriptions,
    AccessControl,
    Analytics,
    Profile,
}

impl NavItem {
    pub fn label(&self) -> &'static str {
        match self {
            NavItem::Dashboard => "Dashboard",
            NavItem::Users => "User Management",
            NavItem::Departments => "Departments",
            NavItem::Packages => "Service Packages",
            NavItem::Subscriptions => "Subscriptions",
            NavItem::AccessControl => "Access Control",
            NavItem::Analytics => "Analytics",
            NavItem::Profile => "Profile",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    grants: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every action over every organization
    pub fn full() -> Self {
        let mut set = Self::default();
        for action in Action::ALL {
            set.grant(action, Scope::Global);
        }
        set
    }

    /// Profile view/update only
    pub fn self_service() -> Self {
        let mut set = Self::default();
        set.grant(Action::ViewProfile, Scope::Own);
        set.grant(Action::UpdateProfile, Scope::Own);
        set
    }

    fn grant(&mut self, action: Action, scope: Scope) {
        self.grants.insert(Capability::new(action, scope));
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.grants.iter()
    }

    /// A `Global` grant covers every scope
    pub fn allows(&self, action: Action, scope: Scope) -> bool {
        self.grants.contains(&Capability::new(action, Scope::Global))
            || self.grants.contains(&Capability::new(action, scope))
    }

    /// Department-level check that also honours grants over the owning reseller
    pub fn allows_department(&self, action: Action, department: DepartmentId, reseller: Option<ResellerId>) -> bool {
        self.allows(action, Scope::Department(department))
            || reseller.is_some_and(|id| self.grants.contains(&Capability::new(action, Scope::Reseller(id))))
    }

    /// Whether the action is granted at any scope
    pub fn allows_any(&self, action: Action) -> bool {
        self.grants.iter().any(|grant| grant.action == action)
    }

    pub fn navigation(&self) -> Vec<NavItem> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut items = vec![NavItem::Dashboard];
        if self.allows(Action::ManageUsers, Scope::Global) {
            items.push(NavItem::Users);
        }
        if self.allows_any(Action::ViewDepartments) || self.allows_any(Action::ManageCustomers) {
            items.push(NavItem::Departments);
        }
        if self.allows_any(Action::ViewServicePackages) {
            items.push(NavItem::Packages);
        }
        if self.allows_any(Action::ViewSubscriptions) {
            items.push(NavItem::Subscriptions);
        }
        if self.allows(Action::ManageAccessControl, Scope::Global) {
            items.push(NavItem::AccessControl);
        }
        if self.allows_any(Action::ViewAnalytics) {
            items.push(NavItem::Analytics);
        }
        items.push(NavItem::Profile);
        items
    }
}

/// Departments the identity administers, from membership data or its own department
fn administered_departments(identity: &UserIdentity) -> Vec<DepartmentId> {
    if !identity.administered_departments.is_empty() {
        return identity.administered_departments.clone();
    }
    if identity.is_department_admin {
        return identity.department_id.into_iter().collect();
    }
    Vec::new()
}

pub fn capabilities_for(identity: Option<&UserIdentity>) -> CapabilitySet {
    let Some(identity) = identity else {
        return CapabilitySet::empty();
    };

    if identity.is_root_admin {
        return CapabilitySet::full();
    }

    let mut set = CapabilitySet::self_service();

    if identity.is_reseller_admin {
        if let Some(reseller) = identity.reseller_id {
            let scope = Scope::Reseller(reseller);
            for action in [
                Action::ManageResellerAdmins,
                Action::ManageCustomers,
                Action::ManageResellerSubscriptions,
                Action::GenerateInviteLink,
                Action::ViewDepartments,
                Action::ViewSubscriptions,
                Action::ViewAnalytics,
            ] {
                set.grant(action, scope);
            }
            // Package definitions are readable for subscribing customers, never editable
            set.grant(Action::ViewServicePackages, Scope::Global);
        }
    }

    for department in administered_departments(identity) {
        let scope = Scope::Department(department);
        for action in [
            Action::ViewDepartments,
            Action::ManageDepartmentAdmins,
            Action::ManageDepartmentUsers,
            Action::ViewSubscriptions,
            Action::ChangeSubscriptionStatus,
        ] {
            set.grant(action, scope);
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            email: "a@b.com".to_string(),
            ..UserIdentity::default()
        }
    }

    #[test]
    fn test_anonymous_has_nothing() {
        let set = capabilities_for(None);
        assert!(set.is_empty());
        assert!(set.navigation().is_empty());
    }

    #[test]
    fn test_root_admin_is_full_regardless_of_other_flags() {
        let combos = [(false, false), (true, false), (false, true), (true, true)];
        for (reseller, department) in combos {
            let mut root = identity();
            root.is_root_admin = true;
            root.is_reseller_admin = reseller;
            root.is_department_admin = department;
            root.reseller_id = reseller.then_some(ResellerId(3));
            assert_eq!(capabilities_for(Some(&root)), CapabilitySet::full());
        }
    }

    #[test]
    fn test_plain_user_is_self_service_only() {
        let set = capabilities_for(Some(&identity()));
        assert_eq!(set, CapabilitySet::self_service());
        assert_eq!(set.navigation(), vec![NavItem::Dashboard, NavItem::Profile]);
    }

    #[test]
    fn test_reseller_admin_scoped_to_own_reseller() {
        let mut user = identity();
        user.is_reseller_admin = true;
        user.reseller_id = Some(ResellerId(5));
        let set = capabilities_for(Some(&user));

        assert!(set.allows(Action::ManageCustomers, Scope::Reseller(ResellerId(5))));
        assert!(set.allows(Action::GenerateInviteLink, Scope::Reseller(ResellerId(5))));
        assert!(!set.allows(Action::ManageCustomers, Scope::Reseller(ResellerId(6))));
        assert!(!set.allows_any(Action::ManageResellers));
        assert!(!set.allows_any(Action::ManageServicePackages));
        assert!(set.allows(Action::ViewServicePackages, Scope::Global));
        assert!(set.allows_department(Action::ViewDepartments, DepartmentId(40), Some(ResellerId(5))));
        assert!(!set.allows_department(Action::ViewDepartments, DepartmentId(40), Some(ResellerId(6))));
        assert!(!set.navigation().contains(&NavItem::Users));
    }

    #[test]
    fn test_reseller_flag_without_reseller_is_self_service() {
        let mut user = identity();
        user.is_reseller_admin = true;
        assert_eq!(capabilities_for(Some(&user)), CapabilitySet::self_service());
    }

    #[test]
    fn test_department_admin_from_memberships() {
        let mut user = identity();
        user.administered_departments = vec![DepartmentId(11)];
        let set = capabilities_for(Some(&user));

        assert!(set.allows(Action::ManageDepartmentUsers, Scope::Department(DepartmentId(11))));
        assert!(set.allows(Action::ChangeSubscriptionStatus, Scope::Department(DepartmentId(11))));
        assert!(!set.allows(Action::ManageDepartmentUsers, Scope::Department(DepartmentId(12))));
        assert!(!set.allows_any(Action::ManageDepartments));
        assert!(set.navigation().contains(&NavItem::Subscriptions));
    }

    #[test]
    fn test_department_flag_falls_back_to_own_department() {
        let mut user = identity();
        user.is_department_admin = true;
        user.department_id = Some(DepartmentId(4));
        let set = capabilities_for(Some(&user));
        assert!(set.allows(Action::ManageDepartmentAdmins, Scope::Department(DepartmentId(4))));

        user.department_id = None;
        assert_eq!(capabilities_for(Some(&user)), CapabilitySet::self_service());
    }

    #[test]
    fn test_root_navigation_includes_admin_items() {
        let set = CapabilitySet::full();
        let nav = set.navigation();
        assert!(nav.contains(&NavItem::Users));
        assert!(nav.contains(&NavItem::AccessControl));
        assert!(nav.contains(&NavItem::Packages));
    }
}
