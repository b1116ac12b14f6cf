//! Application lifecycle: wire the session, transport and controllers once
//! per process, and tear them down explicitly.

use std::sync::Arc;

use tracing::info;

use crate::auth::AuthController;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::navigation::{Navigator, RedirectScheduler};
use crate::refresh::RefreshCoordinator;
use crate::resources::analytics::DashboardMetrics;
use crate::resources::departments::Departments;
use crate::resources::packages::Packages;
use crate::resources::resellers::Resellers;
use crate::resources::subscriptions::Subscriptions;
use crate::resources::users::Users;
use crate::resources::ApiClient;
use crate::session::{CredentialStore, SessionGate, StorageBackend};
use crate::transport::{HttpTransport, Transport};

pub struct Console {
    config: ClientConfig,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    auth: AuthController,
    client: ApiClient,
}

impl Console {
    /// Build a console against the configured backend over HTTP
    pub fn init(config: ClientConfig, storage: Arc<dyn StorageBackend>, navigator: Arc<dyn Navigator>) -> ClientResult<Self> {
        let transport = Arc::new(HttpTransport::new(&config.api)?);
        Ok(Self::with_transport(config, storage, navigator, transport))
    }

    /// Build a console over any transport
    pub fn with_transport(
        config: ClientConfig,
        storage: Arc<dyn StorageBackend>,
        navigator: Arc<dyn Navigator>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let store = Arc::new(CredentialStore::new(storage, config.session.clone()));
        let redirects = Arc::new(RedirectScheduler::new(navigator, config.navigation.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport,
            store.clone(),
            redirects,
            config.api.refresh_path.clone(),
        ));
        let auth = AuthController::new(coordinator.clone(), SessionGate::new(store.clone()));
        let client = ApiClient::new(coordinator.clone());

        info!("Console initialised against {}", config.api.base_url);
        Self {
            config,
            store,
            coordinator,
            auth,
            client,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthController {
        &self.auth
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn client(&self) -> ApiClient {
        self.client.clone()
    }

    pub fn departments(&self) -> Departments {
        Departments::new(self.client())
    }

    pub fn packages(&self) -> Packages {
        Packages::new(self.client())
    }

    pub fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new(self.client())
    }

    pub fn users(&self) -> Users {
        Users::new(self.client())
    }

    pub fn resellers(&self) -> Resellers {
        Resellers::new(self.client())
    }

    pub async fn dashboard_metrics(&self) -> ClientResult<DashboardMetrics> {
        DashboardMetrics::collect(&self.subscriptions(), &self.departments(), &self.users()).await
    }

    /// Run pending navigations, then drop the console
    pub async fn teardown(self) {
        self.coordinator.redirects().flush().await;
        info!("Console shut down");
    }
}
