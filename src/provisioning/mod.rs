//! Runtime provisioning of connection parameters.
//!
//! # Components
//!
//! - [`ProvisioningStore`] - versioned, snapshot-on-read store (host-testable)
//! - [`update`] - `KEY=VALUE` blob parsing and export (host-testable)
//! - [`persist_host`] - file persistence for host builds
//! - `storage` - NVS persistence (ESP32 only)
//! - `espnow` - ESP-NOW update listener (ESP32 only)

mod bounded;
mod credentials;
mod key;
mod store;

pub mod persist_host;
pub mod update;

#[cfg(feature = "esp32")]
pub mod espnow;
#[cfg(feature = "esp32")]
pub mod storage;

pub use bounded::BoundedString;
pub use credentials::{
    MqttParams, WifiCredentials, MAX_CLIENT_ID_LEN, MAX_HOST_LEN, MAX_PASSWORD_LEN,
    MAX_SSID_LEN, MAX_TOPIC_LEN,
};
pub use key::{parse_port, Group, ProvisioningKey, UnknownKey};
pub use store::ProvisioningStore;
pub use update::{apply_update, apply_update_bytes, export_update, RadioUpdates, UpdateReport};
