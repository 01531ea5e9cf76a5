//! Application context
//!
//! Wires the configured transport, local storage and clock into the view
//! models. Built once at startup; tests build their own with doubles.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::console::AdminConsole;
use crate::identity::DeviceIdentity;
use crate::local_storage::{FileStorage, LocalStorage, StorageError, StorageResult};
use crate::remote::{ApiClient, AuthClient};
use crate::session::SessionStore;
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};
use crate::visit::{Clock, SystemClock, VisitTracker};

/// Errors while building the context
#[derive(Error, Debug)]
pub enum InitError {
    #[error("HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error("Local storage: {0}")]
    Storage(#[from] StorageError),
}

pub struct ConsoleContext {
    config: Config,
    api: ApiClient,
    storage: Arc<dyn LocalStorage>,
    clock: Arc<dyn Clock>,
}

impl ConsoleContext {
    /// Production wiring: reqwest, file storage in `data_dir`, system clock
    pub fn from_config(config: Config) -> Result<Self, InitError> {
        let transport = ReqwestTransport::new(
            &config.api.url,
            Duration::from_secs(config.api.request_timeout_secs),
        )?;
        let storage = FileStorage::open(&config.storage.data_dir)?;

        tracing::debug!(
            api_url = %config.api.url,
            storage = ?storage.path(),
            "Console context ready"
        );

        Ok(Self::with_parts(
            config,
            Arc::new(transport),
            Arc::new(storage),
            Arc::new(SystemClock),
        ))
    }

    pub fn with_parts(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn LocalStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            api: ApiClient::new(transport),
            storage,
            clock,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(Arc::clone(&self.storage), AuthClient::new(self.api.clone()))
    }

    pub fn admin_console(&self) -> AdminConsole {
        AdminConsole::new(self.session_store(), self.api.clone())
    }

    pub fn visit_tracker(&self) -> VisitTracker {
        VisitTracker::new(
            self.api.clone(),
            Arc::clone(&self.storage),
            Arc::clone(&self.clock),
            self.config.visit.user_id.clone(),
        )
    }

    pub fn device_identity(&self) -> StorageResult<DeviceIdentity> {
        DeviceIdentity::resolve(self.storage.as_ref())
    }
}
