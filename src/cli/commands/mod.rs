pub mod analytics;
pub mod auth;
pub mod departments;
pub mod packages;
pub mod resellers;
pub mod subscriptions;
pub mod users;
