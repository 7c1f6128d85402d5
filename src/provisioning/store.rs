//! Versioned key/value store for connection parameters.
//!
//! The store is written by the provisioning path (radio callback, boot-time
//! persistence) and read by the WiFi and MQTT managers. Readers always get a
//! copy taken under the lock, so they never see a half-applied group.
//!
//! Change detection is by version counter only: each group carries a counter
//! that is bumped once per accepted write to any of its fields. Managers
//! remember the last version they acted on and compare on every step.
//!
//! # Example
//!
//! ```
//! use commrobot_esp32::provisioning::ProvisioningStore;
//!
//! let store = ProvisioningStore::new();
//! store.init_defaults();
//! let seen = store.wifi_version();
//!
//! assert!(store.apply_key_value("wifi_ssid", "Workshop"));
//! assert_eq!(store.wifi_version(), seen + 1);
//! assert_eq!(store.wifi().ssid, "Workshop");
//! ```

use super::credentials::{MqttParams, WifiCredentials};
use super::key::{parse_port, Group, ProvisioningKey};
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct StoreState {
    wifi: WifiCredentials,
    mqtt: MqttParams,
    wifi_version: u32,
    mqtt_version: u32,
}

impl StoreState {
    fn mark_updated(&mut self, group: Group) {
        match group {
            Group::Wifi => {
                self.wifi_version = self.wifi_version.wrapping_add(1);
                self.wifi.revalidate();
            }
            Group::Mqtt => {
                self.mqtt_version = self.mqtt_version.wrapping_add(1);
                self.mqtt.revalidate();
            }
        }
    }

    fn write(&mut self, key: ProvisioningKey, value: &str) {
        match key {
            ProvisioningKey::WifiSsid => self.wifi.ssid.set(value),
            ProvisioningKey::WifiPassword => self.wifi.password.set(value),
            ProvisioningKey::MqttHost => self.mqtt.host.set(value),
            ProvisioningKey::MqttPort => self.mqtt.port = parse_port(value),
            ProvisioningKey::MqttClientId => self.mqtt.client_id.set(value),
            ProvisioningKey::MqttUsername => self.mqtt.username.set(value),
            ProvisioningKey::MqttPassword => self.mqtt.password.set(value),
            ProvisioningKey::MqttPubTopic => self.mqtt.publish_topic.set(value),
            ProvisioningKey::MqttCmdTopic => self.mqtt.command_topic.set(value),
            ProvisioningKey::MqttHeartbeatTopic => self.mqtt.heartbeat_topic.set(value),
        }
    }

    fn read(&self, key: ProvisioningKey) -> String {
        match key {
            ProvisioningKey::WifiSsid => self.wifi.ssid.to_string(),
            ProvisioningKey::WifiPassword => self.wifi.password.to_string(),
            ProvisioningKey::MqttHost => self.mqtt.host.to_string(),
            ProvisioningKey::MqttPort => self.mqtt.port.to_string(),
            ProvisioningKey::MqttClientId => self.mqtt.client_id.to_string(),
            ProvisioningKey::MqttUsername => self.mqtt.username.to_string(),
            ProvisioningKey::MqttPassword => self.mqtt.password.to_string(),
            ProvisioningKey::MqttPubTopic => self.mqtt.publish_topic.to_string(),
            ProvisioningKey::MqttCmdTopic => self.mqtt.command_topic.to_string(),
            ProvisioningKey::MqttHeartbeatTopic => self.mqtt.heartbeat_topic.to_string(),
        }
    }
}

/// Process-wide provisioning store.
///
/// Shared between components as `Arc<ProvisioningStore>`. All methods take
/// `&self`; a single internal lock makes every read a consistent snapshot.
pub struct ProvisioningStore {
    state: Mutex<StoreState>,
}

impl Default for ProvisioningStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisioningStore {
    /// Create an empty store (no credentials, both versions at 0).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create a store already seeded with the compiled-in defaults.
    pub fn with_defaults() -> Self {
        let store = Self::new();
        store.init_defaults();
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Writers only ever replace whole field values, so a poisoned lock
        // still guards consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset both groups to the compiled-in defaults and bump both versions.
    pub fn init_defaults(&self) {
        let mut state = self.lock();
        state.wifi = WifiCredentials::defaults();
        state.mark_updated(Group::Wifi);
        state.mqtt = MqttParams::defaults();
        state.mark_updated(Group::Mqtt);
    }

    /// Snapshot of the WiFi credentials.
    pub fn wifi(&self) -> WifiCredentials {
        self.lock().wifi.clone()
    }

    /// Snapshot of the MQTT parameters.
    pub fn mqtt(&self) -> MqttParams {
        self.lock().mqtt.clone()
    }

    /// WiFi credentials together with the version they belong to.
    pub fn wifi_versioned(&self) -> (u32, WifiCredentials) {
        let state = self.lock();
        (state.wifi_version, state.wifi.clone())
    }

    /// MQTT parameters together with the version they belong to.
    pub fn mqtt_versioned(&self) -> (u32, MqttParams) {
        let state = self.lock();
        (state.mqtt_version, state.mqtt.clone())
    }

    pub fn has_wifi_credentials(&self) -> bool {
        self.lock().wifi.valid
    }

    pub fn has_mqtt_params(&self) -> bool {
        self.lock().mqtt.valid
    }

    pub fn wifi_version(&self) -> u32 {
        self.lock().wifi_version
    }

    pub fn mqtt_version(&self) -> u32 {
        self.lock().mqtt_version
    }

    /// Apply one `key = value` pair.
    ///
    /// Returns `false` (and changes nothing) when the key is not recognized.
    /// Oversized values are truncated; a non-numeric port becomes 0.
    pub fn apply_key_value(&self, key: &str, value: &str) -> bool {
        let key: ProvisioningKey = match key.parse() {
            Ok(key) => key,
            Err(e) => {
                debug!("{}", e);
                return false;
            }
        };

        let mut state = self.lock();
        state.write(key, value);
        state.mark_updated(key.group());

        if key.is_secret() {
            debug!("provisioned {} (hidden)", key);
        } else {
            debug!("provisioned {} = {}", key, value);
        }
        true
    }

    /// Current value of a key as text.
    pub fn get(&self, key: ProvisioningKey) -> String {
        self.lock().read(key)
    }
}
