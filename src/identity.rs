//! Device Identity
//!
//! A random per-install identifier that approximates per-browser identity
//! for anonymous practice visits.

use uuid::Uuid;

use crate::local_storage::{LocalStorage, StorageResult, DEVICE_ID_KEY};

/// Per-install identifier, stable for the lifetime of local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
}

impl DeviceIdentity {
    /// Return the stored device id, generating and persisting one if absent
    ///
    /// An empty stored value counts as absent.
    pub fn resolve(storage: &dyn LocalStorage) -> StorageResult<Self> {
        if let Some(existing) = storage.get_item(DEVICE_ID_KEY)? {
            if !existing.is_empty() {
                return Ok(Self { device_id: existing });
            }
        }

        let device_id = generate_device_id();
        storage.set_item(DEVICE_ID_KEY, &device_id)?;
        tracing::debug!(device_id = %device_id, "Generated new device id");

        Ok(Self { device_id })
    }

    pub fn as_str(&self) -> &str {
        &self.device_id
    }
}

/// Fresh version-4 identifier, `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`
pub fn generate_device_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
