//! Credential groups held by the provisioning store.

use super::bounded::BoundedString;
use crate::config::defaults;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum WPA2 passphrase length.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Maximum broker host length.
pub const MAX_HOST_LEN: usize = 64;

/// Maximum client id / username length.
pub const MAX_CLIENT_ID_LEN: usize = 32;

/// Maximum topic length.
pub const MAX_TOPIC_LEN: usize = 64;

/// WiFi station credentials.
///
/// `valid` is derived: it is recomputed by the store on every update and is
/// true iff `ssid` is non-empty.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WifiCredentials {
    pub ssid: BoundedString<MAX_SSID_LEN>,
    pub password: BoundedString<MAX_PASSWORD_LEN>,
    pub valid: bool,
}

impl WifiCredentials {
    /// Credentials from the compiled-in defaults.
    pub fn defaults() -> Self {
        Self::new(defaults::WIFI_DEFAULT_SSID, defaults::WIFI_DEFAULT_PASSWORD)
    }

    /// Build credentials, truncating oversized values.
    pub fn new(ssid: &str, password: &str) -> Self {
        let mut creds = Self {
            ssid: BoundedString::truncated(ssid),
            password: BoundedString::truncated(password),
            valid: false,
        };
        creds.revalidate();
        creds
    }

    /// Whether this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }

    pub(crate) fn revalidate(&mut self) {
        self.valid = !self.ssid.is_empty();
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &mask(&self.password))
            .field("valid", &self.valid)
            .finish()
    }
}

/// MQTT broker connection parameters.
///
/// `valid` is true iff `host` is non-empty.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MqttParams {
    pub host: BoundedString<MAX_HOST_LEN>,
    pub port: u16,
    pub client_id: BoundedString<MAX_CLIENT_ID_LEN>,
    pub username: BoundedString<MAX_CLIENT_ID_LEN>,
    pub password: BoundedString<MAX_PASSWORD_LEN>,
    pub publish_topic: BoundedString<MAX_TOPIC_LEN>,
    pub command_topic: BoundedString<MAX_TOPIC_LEN>,
    pub heartbeat_topic: BoundedString<MAX_TOPIC_LEN>,
    pub valid: bool,
}

impl MqttParams {
    /// Parameters from the compiled-in defaults.
    pub fn defaults() -> Self {
        let mut params = Self {
            host: BoundedString::truncated(defaults::MQTT_HOST),
            port: defaults::MQTT_PORT,
            client_id: BoundedString::truncated(defaults::MQTT_CLIENT_ID),
            username: BoundedString::truncated(defaults::MQTT_USERNAME),
            password: BoundedString::truncated(defaults::MQTT_PASSWORD),
            publish_topic: BoundedString::truncated(defaults::MQTT_PUB_TOPIC),
            command_topic: BoundedString::truncated(defaults::MQTT_CMD_TOPIC),
            heartbeat_topic: BoundedString::truncated(defaults::MQTT_HEARTBEAT_TOPIC),
            valid: false,
        };
        params.revalidate();
        params
    }

    /// Whether heartbeats also go to a dedicated topic.
    pub fn has_separate_heartbeat_topic(&self) -> bool {
        !self.heartbeat_topic.is_empty() && self.heartbeat_topic != self.publish_topic
    }

    pub(crate) fn revalidate(&mut self) {
        self.valid = !self.host.is_empty();
    }
}

impl fmt::Debug for MqttParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("publish_topic", &self.publish_topic)
            .field("command_topic", &self.command_topic)
            .field("heartbeat_topic", &self.heartbeat_topic)
            .field("valid", &self.valid)
            .finish()
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(none)"
    } else {
        "****"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wifi_valid_iff_ssid() {
        assert!(WifiCredentials::new("net", "").valid);
        assert!(!WifiCredentials::new("", "password").valid);
    }

    #[test]
    fn test_wifi_truncates() {
        let creds = WifiCredentials::new(&"s".repeat(40), &"p".repeat(80));
        assert_eq!(creds.ssid.len(), MAX_SSID_LEN);
        assert_eq!(creds.password.len(), MAX_PASSWORD_LEN);
    }

    #[test]
    fn test_debug_masks_passwords() {
        let creds = WifiCredentials::new("net", "hunter22");
        let out = format!("{:?}", creds);
        assert!(out.contains("net"));
        assert!(!out.contains("hunter22"));

        let mut params = MqttParams::defaults();
        params.password.set("brokersecret");
        let out = format!("{:?}", params);
        assert!(!out.contains("brokersecret"));
    }

    #[test]
    fn test_separate_heartbeat_topic() {
        let mut params = MqttParams::defaults();
        params.publish_topic.set("a");
        params.heartbeat_topic.set("b");
        assert!(params.has_separate_heartbeat_topic());
        params.heartbeat_topic.set("a");
        assert!(!params.has_separate_heartbeat_topic());
        params.heartbeat_topic.set("");
        assert!(!params.has_separate_heartbeat_topic());
    }
}
