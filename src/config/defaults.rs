//! Compiled-in defaults.
//!
//! Every value can be overridden at build time through an environment
//! variable of the same name, e.g.:
//!
//! ```text
//! WIFI_DEFAULT_SSID="Lab" MQTT_HOST="192.168.1.10" cargo build --features esp32
//! ```
//!
//! and again at runtime through provisioning updates.

/// Default WiFi SSID.
pub const WIFI_DEFAULT_SSID: &str = env_str(option_env!("WIFI_DEFAULT_SSID"), "kitakitan");

/// Default WiFi password.
pub const WIFI_DEFAULT_PASSWORD: &str =
    env_str(option_env!("WIFI_DEFAULT_PASSWORD"), "bocchichan");

/// Default MQTT broker host.
pub const MQTT_HOST: &str = env_str(option_env!("MQTT_HOST"), "10.171.48.129");

/// Default MQTT broker port.
pub const MQTT_PORT: u16 = env_u64(option_env!("MQTT_PORT"), 1883) as u16;

/// Default base client identifier (a random suffix is appended per session).
pub const MQTT_CLIENT_ID: &str = env_str(option_env!("MQTT_CLIENT_ID"), "RobotA");

/// Default broker username. Empty means anonymous.
pub const MQTT_USERNAME: &str = env_str(option_env!("MQTT_USERNAME"), "");

/// Default broker password.
pub const MQTT_PASSWORD: &str = env_str(option_env!("MQTT_PASSWORD"), "");

/// Default topic for serial output and heartbeats.
pub const MQTT_PUB_TOPIC: &str = env_str(
    option_env!("MQTT_PUB_TOPIC"),
    "esp32/commrobot/serial_out",
);

/// Default topic carrying inbound robot commands.
pub const MQTT_CMD_TOPIC: &str = env_str(
    option_env!("MQTT_CMD_TOPIC"),
    "esp32/commrobot/serial_in",
);

/// Default dedicated heartbeat topic.
pub const MQTT_HEARTBEAT_TOPIC: &str = env_str(
    option_env!("MQTT_HEARTBEAT_TOPIC"),
    "esp32/commrobot/heartbeat",
);

/// Minimum delay between broker connect attempts, in milliseconds.
pub const MQTT_RETRY_DELAY_MS: u64 = env_u64(option_env!("MQTT_RETRY_DELAY_MS"), 3000);

/// Capacity of the serial-to-MQTT forwarding buffer, in bytes.
pub const MQTT_SERIAL_BUFFER: usize = {
    let size = env_u64(option_env!("MQTT_SERIAL_BUFFER"), 128) as usize;
    if size == 0 {
        1
    } else {
        size
    }
};

/// Minimum delay between WiFi connect attempts, in milliseconds.
pub const WIFI_RETRY_DELAY_MS: u64 = 5000;

/// Interval between heartbeat publishes, in milliseconds.
pub const MQTT_HEARTBEAT_INTERVAL_MS: u64 = 5000;

/// Payload published on every heartbeat.
pub const HEARTBEAT_PAYLOAD: &[u8] = b"comm-robot heartbeat";

/// Client-id base used when none is provisioned.
pub const FALLBACK_CLIENT_ID: &str = "mqtt-client";

/// Cadence of the cooperative driver loop, in milliseconds.
pub const LOOP_CADENCE_MS: u64 = 10;

const fn env_str(value: Option<&'static str>, default: &'static str) -> &'static str {
    match value {
        Some(v) => v,
        None => default,
    }
}

/// Parse a decimal build-time override, falling back to `default` when the
/// variable is unset, empty or not a plain number.
const fn env_u64(value: Option<&str>, default: u64) -> u64 {
    let bytes = match value {
        Some(v) => v.as_bytes(),
        None => return default,
    };
    if bytes.is_empty() {
        return default;
    }

    let mut result: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !b.is_ascii_digit() {
            return default;
        }
        result = match result.checked_mul(10) {
            Some(r) => match r.checked_add((b - b'0') as u64) {
                Some(r) => r,
                None => return default,
            },
            None => return default,
        };
        i += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_u64_parses_digits() {
        assert_eq!(env_u64(Some("3000"), 1), 3000);
        assert_eq!(env_u64(Some("0"), 1), 0);
    }

    #[test]
    fn test_env_u64_falls_back() {
        assert_eq!(env_u64(None, 42), 42);
        assert_eq!(env_u64(Some(""), 42), 42);
        assert_eq!(env_u64(Some("12ab"), 42), 42);
        assert_eq!(env_u64(Some("-5"), 42), 42);
        assert_eq!(env_u64(Some("99999999999999999999999"), 42), 42);
    }

    #[test]
    fn test_env_str() {
        assert_eq!(env_str(Some("x"), "y"), "x");
        assert_eq!(env_str(None, "y"), "y");
    }

    #[test]
    fn test_serial_buffer_nonzero() {
        assert!(MQTT_SERIAL_BUFFER > 0);
    }
}
