//! MQTT session layer.
//!
//! # Components
//!
//! - [`MqttClient`] - synchronous broker client seam
//! - [`MqttSessionManager`] - poll-driven session manager gated on the WiFi link
//! - [`SerialBridge`] - serial-to-MQTT staging buffer
//! - `EspMqttTransport` - ESP-IDF client adapter (ESP32 only)

mod bridge;
mod client;
mod session;

#[cfg(feature = "esp32")]
mod esp;

pub use bridge::{ByteSource, SerialBridge};
pub use client::{InboundMessage, MqttClient, MqttCredentials, MqttError};
pub use session::{session_client_id, CommandSink, MqttSessionManager, MqttState};

#[cfg(feature = "esp32")]
pub use esp::{EspMqttTransport, CONNECT_TIMEOUT};
