mod common;

use anyhow::Result;
use axum::http::Method;
use serde_json::json;

use common::RefreshMode;
use tenant_console::auth::RegistrationProfile;
use tenant_console::capability::{Action, Scope};
use tenant_console::error::{AuthError, ClientError};
use tenant_console::types::{DepartmentId, ResellerId, UserId};

fn profile(email: &str, password: &str) -> RegistrationProfile {
    RegistrationProfile {
        full_name: "New Customer".to_string(),
        email: email.to_string(),
        password: password.to_string(),
        department_name: Some("Research".to_string()),
    }
}

#[tokio::test]
async fn login_stores_token_pair() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, _) = backend.console()?;

    let session = console.auth().login(common::EMAIL, common::PASSWORD).await?;

    assert_eq!(session.identity.identifier(), Some(UserId(7)));
    assert_eq!(console.store().access_token().as_deref(), Some(common::FIRST_ACCESS));
    assert_eq!(console.store().refresh_token().as_deref(), Some(common::REFRESH_TOKEN));
    assert!(console.auth().is_authenticated());
    assert_eq!(console.auth().identity().map(|i| i.email), Some(common::EMAIL.to_string()));

    let login = backend.requests_to(Method::POST, "/users/auth/login/");
    assert_eq!(login[0].body, json!({"email": common::EMAIL, "password": common::PASSWORD}));
    Ok(())
}

#[tokio::test]
async fn wrong_password_reports_backend_message() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, _) = backend.console()?;

    let err = console.auth().login(common::EMAIL, "nope").await.unwrap_err();

    match err {
        ClientError::Auth(AuthError::InvalidCredentials(message)) => {
            assert_eq!(message, "No active account found with the given credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!console.auth().is_authenticated());
    assert!(console.auth().identity().is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_field_error() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, _) = backend.console()?;

    let err = console
        .auth()
        .register(&profile(common::EMAIL, "longenough"), None)
        .await
        .unwrap_err();

    match err {
        ClientError::Auth(AuthError::Validation { field, message }) => {
            assert_eq!(field.as_deref(), Some("email"));
            assert_eq!(message, "user with this email already exists.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn short_password_is_an_aggregate_error() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, _) = backend.console()?;

    let err = console.auth().register(&profile("new@b.com", "abc"), None).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Auth(AuthError::Validation { field: None, ref message }) if message == "Password is too short."
    ));
    Ok(())
}

#[tokio::test]
async fn reseller_registration_sends_reseller_id() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, _) = backend.console()?;

    let session = console
        .auth()
        .register(&profile("new@b.com", "longenough"), Some(ResellerId(12)))
        .await?;

    assert_eq!(session.identity.identifier(), Some(UserId(50)));
    assert!(console.auth().is_authenticated());

    let register = backend.requests_to(Method::POST, "/users/auth/register/");
    assert_eq!(register[0].body["reseller_id"], json!(12));
    assert_eq!(register[0].body["department_name"], json!("Research"));
    assert_eq!(register[0].authorization, None);
    Ok(())
}

#[tokio::test]
async fn direct_registration_omits_reseller_and_blank_department() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, _) = backend.console()?;

    let mut direct = profile("new@b.com", "longenough");
    direct.department_name = Some("   ".to_string());
    console.auth().register(&direct, Some(ResellerId(0))).await?;

    let body = &backend.requests_to(Method::POST, "/users/auth/register/")[0].body;
    assert!(body.get("reseller_id").is_none());
    assert!(body.get("department_name").is_none());
    Ok(())
}

#[tokio::test]
async fn bootstrap_loads_profile_for_existing_session() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, _) = backend.console()?;
    common::login(&console).await?;

    let identity = console.auth().bootstrap().await?.expect("profile");

    assert_eq!(identity.display_name(), "Ada Admin");
    let profile = backend.requests_to(Method::GET, "/users/profile/");
    assert_eq!(profile.len(), 1);
    assert_eq!(profile[0].authorization, common::bearer(common::FIRST_ACCESS));
    Ok(())
}

#[tokio::test]
async fn dead_session_profile_fetch_tears_down() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, navigator) = backend.console()?;
    common::login(&console).await?;
    backend.expire_access();
    backend.set_refresh_mode(RefreshMode::Reject);

    let err = console.auth().fetch_profile().await.unwrap_err();

    assert!(err.is_session_lost());
    assert!(console.auth().identity().is_none());
    assert!(!console.auth().is_authenticated());
    assert_eq!(console.store().refresh_token(), None);
    assert_eq!(backend.refresh_calls(), 1);

    console.teardown().await;
    assert_eq!(navigator.visits(), vec!["/?login=true&error=session_expired".to_string()]);
    Ok(())
}

#[tokio::test]
async fn profile_rejected_after_refresh_tears_down() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, _) = backend.console()?;
    common::login(&console).await?;
    backend.reject_profile();

    let err = console.auth().fetch_profile().await.unwrap_err();

    assert!(err.is_session_lost());
    assert_eq!(err.status(), Some(401));
    assert_eq!(backend.refresh_calls(), 1);
    let profile = backend.requests_to(Method::GET, "/users/profile/");
    assert_eq!(profile.len(), 2);
    assert_eq!(profile[1].authorization, common::bearer(common::REFRESHED_ACCESS));
    assert!(console.auth().identity().is_none());
    assert!(!console.auth().is_authenticated());
    assert_eq!(console.store().access_token(), None);
    Ok(())
}

#[tokio::test]
async fn logout_redirects_to_public_entry() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let (console, navigator) = backend.console()?;
    common::login(&console).await?;
    let mut changes = console.auth().subscribe();

    console.auth().logout(true)?;

    assert!(!console.auth().is_authenticated());
    assert!(changes.borrow_and_update().is_none());
    assert!(console.auth().capabilities().is_empty());

    console.teardown().await;
    assert_eq!(navigator.visits(), vec!["/".to_string()]);
    Ok(())
}

#[tokio::test]
async fn root_profile_gets_everything() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    backend.set_profile(json!({
        "user_id": 7,
        "email": common::EMAIL,
        "is_root_admin": true,
        "is_reseller_admin": true,
        "reseller_id": 3
    }));
    let (console, _) = backend.console()?;
    common::login(&console).await?;

    let capabilities = console.auth().capabilities();

    assert!(capabilities.allows(Action::ManageResellers, Scope::Global));
    assert!(capabilities.allows(Action::ManageServicePackages, Scope::Global));
    assert!(capabilities.allows(Action::ManageDepartmentAdmins, Scope::Department(DepartmentId(42))));
    Ok(())
}

#[tokio::test]
async fn reseller_admin_is_scoped_to_own_reseller() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    backend.set_profile(json!({
        "user_id": 9,
        "email": common::EMAIL,
        "is_reseller_admin": true,
        "reseller_id": 3
    }));
    let (console, _) = backend.console()?;
    common::login(&console).await?;

    let capabilities = console.auth().capabilities();

    assert!(capabilities.allows(Action::GenerateInviteLink, Scope::Reseller(ResellerId(3))));
    assert!(!capabilities.allows(Action::GenerateInviteLink, Scope::Reseller(ResellerId(4))));
    assert!(!capabilities.allows(Action::ManageResellers, Scope::Global));
    assert!(!capabilities.allows(Action::ManageServicePackages, Scope::Global));
    Ok(())
}
