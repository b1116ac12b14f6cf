use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::config::config;
use crate::navigation::Navigator;
use crate::session::{FileStorage, NoopStorage, StorageBackend};
use crate::Console;

/// CLI state directory: `CONSOLE_CLI_CONFIG_DIR`, else `$HOME/.config/tenant-console`
pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("CONSOLE_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("tenant-console")
    };

    Ok(config_dir)
}

/// Session file under the config dir, or a no-op store when there is nowhere to persist
pub fn storage_backend() -> Arc<dyn StorageBackend> {
    match get_config_dir().and_then(|dir| Ok(FileStorage::in_dir(&dir)?)) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            warn!("Session will not persist: {}", e);
            Arc::new(NoopStorage)
        }
    }
}

/// Turns redirect requests into terminal hints
#[derive(Debug)]
pub struct TerminalNavigator {
    route: Mutex<String>,
}

impl TerminalNavigator {
    pub fn new() -> Self {
        Self {
            route: Mutex::new("/cli".to_string()),
        }
    }
}

impl Default for TerminalNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for TerminalNavigator {
    fn current_route(&self) -> String {
        self.route.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn navigate(&self, target: &str) {
        if let Ok(mut route) = self.route.lock() {
            *route = target.to_string();
        }
        if target.contains("login=true") {
            if target.contains("session_expired") {
                eprintln!("Session expired. Run `console auth login <email>` to sign in again.");
            } else {
                eprintln!("Not signed in. Run `console auth login <email>`.");
            }
        }
    }
}

pub fn open_console() -> anyhow::Result<Console> {
    let console = Console::init(config().clone(), storage_backend(), Arc::new(TerminalNavigator::new()))?;
    Ok(console)
}
