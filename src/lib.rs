//! Comm-robot ESP32 firmware library.
//!
//! Connectivity and provisioning core for a WiFi/MQTT robot controller.
//! Everything except the ESP-IDF adapters is platform-independent and can be
//! tested on the host machine without ESP32 hardware.

pub mod config;
pub mod mqtt;
pub mod provisioning;
pub mod runtime;
pub mod wifi;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use mqtt::{ByteSource, CommandSink, MqttClient, MqttError, MqttSessionManager, MqttState};
pub use provisioning::{MqttParams, ProvisioningKey, ProvisioningStore, WifiCredentials};
pub use runtime::Controller;
pub use wifi::{LinkStatus, StationLink, WifiConnectionManager, WifiError, WifiState};
