//! Device configuration.
//!
//! # Components
//!
//! - [`defaults`] - compiled-in connection parameters and timing constants
//! - [`MqttTiming`] - runtime-tunable MQTT session timing
//!
//! Connection parameters that can change at runtime live in
//! [`crate::provisioning`]; this module only holds what they start from.

pub mod defaults;

use std::time::Duration;

/// Timing knobs for the MQTT session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttTiming {
    /// Minimum delay between broker connect attempts.
    pub retry_delay: Duration,
    /// Interval between heartbeat publishes.
    pub heartbeat_interval: Duration,
    /// Capacity of the serial forwarding buffer.
    pub serial_buffer: usize,
}

impl Default for MqttTiming {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(defaults::MQTT_RETRY_DELAY_MS),
            heartbeat_interval: Duration::from_millis(defaults::MQTT_HEARTBEAT_INTERVAL_MS),
            serial_buffer: defaults::MQTT_SERIAL_BUFFER,
        }
    }
}

/// Delay between WiFi connect attempts.
pub fn wifi_retry_delay() -> Duration {
    Duration::from_millis(defaults::WIFI_RETRY_DELAY_MS)
}

/// Cadence of the cooperative driver loop.
pub fn loop_cadence() -> Duration {
    Duration::from_millis(defaults::LOOP_CADENCE_MS)
}
