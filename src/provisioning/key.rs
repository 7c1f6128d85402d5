//! Recognized provisioning keys.

use std::fmt;
use std::str::FromStr;

/// Credential group a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Wifi,
    Mqtt,
}

/// A provisioning key, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningKey {
    WifiSsid,
    WifiPassword,
    MqttHost,
    MqttPort,
    MqttClientId,
    MqttUsername,
    MqttPassword,
    MqttPubTopic,
    MqttCmdTopic,
    MqttHeartbeatTopic,
}

impl ProvisioningKey {
    /// All keys, in export order.
    pub const ALL: [ProvisioningKey; 10] = [
        Self::WifiSsid,
        Self::WifiPassword,
        Self::MqttHost,
        Self::MqttPort,
        Self::MqttClientId,
        Self::MqttUsername,
        Self::MqttPassword,
        Self::MqttPubTopic,
        Self::MqttCmdTopic,
        Self::MqttHeartbeatTopic,
    ];

    /// Canonical upper-case spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WifiSsid => "WIFI_SSID",
            Self::WifiPassword => "WIFI_PASSWORD",
            Self::MqttHost => "MQTT_HOST",
            Self::MqttPort => "MQTT_PORT",
            Self::MqttClientId => "MQTT_CLIENT_ID",
            Self::MqttUsername => "MQTT_USERNAME",
            Self::MqttPassword => "MQTT_PASSWORD",
            Self::MqttPubTopic => "MQTT_PUB_TOPIC",
            Self::MqttCmdTopic => "MQTT_CMD_TOPIC",
            Self::MqttHeartbeatTopic => "MQTT_HEARTBEAT_TOPIC",
        }
    }

    /// The group whose version a write to this key bumps.
    pub fn group(&self) -> Group {
        match self {
            Self::WifiSsid | Self::WifiPassword => Group::Wifi,
            _ => Group::Mqtt,
        }
    }

    /// Whether the value is a secret and must not be logged.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::WifiPassword | Self::MqttPassword)
    }
}

/// Returned for keys outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey(pub String);

impl fmt::Display for UnknownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provisioning key: {}", self.0)
    }
}

impl std::error::Error for UnknownKey {}

impl FromStr for ProvisioningKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ProvisioningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a port the way C `atoi` followed by a `uint16_t` cast would.
///
/// Leading whitespace and one sign are accepted, digits are consumed until
/// the first non-digit, and the result wraps modulo 2^16. Text without
/// leading digits yields 0.
pub fn parse_port(text: &str) -> u16 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u16, |acc, b| acc.wrapping_mul(10).wrapping_add(u16::from(b - b'0')));

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}
