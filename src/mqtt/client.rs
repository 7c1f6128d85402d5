//! Broker client abstraction.

use std::fmt;

/// Username/password for the broker handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttCredentials<'a> {
    pub username: &'a str,
    /// `None` sends a username without a password.
    pub password: Option<&'a str>,
}

/// A message received on a subscribed topic, payload fully reassembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// A synchronous MQTT client.
///
/// `connect` blocks until the broker accepts or rejects the session (or the
/// network timeout expires). `poll` services the transport and must be
/// called regularly while connected to keep the session alive.
pub trait MqttClient {
    /// Size of the packet buffer used for publishes and receives.
    fn set_buffer_size(&mut self, size: usize);

    /// Broker endpoint for subsequent connects.
    fn set_server(&mut self, host: &str, port: u16);

    /// Open a session.
    fn connect(
        &mut self,
        client_id: &str,
        credentials: Option<MqttCredentials<'_>>,
    ) -> Result<(), MqttError>;

    /// Close the session and release the transport. Also called after the
    /// session has already dropped.
    fn disconnect(&mut self);

    /// Live session status.
    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<(), MqttError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError>;

    /// Service the transport, returning messages received since the last call.
    fn poll(&mut self) -> Vec<InboundMessage>;
}

/// Errors that can occur during MQTT operations.
#[derive(Debug)]
pub enum MqttError {
    /// No broker endpoint configured.
    NoServer,
    /// Operation requires an open session.
    NotConnected,
    /// Broker or transport refused the session; carries the status code.
    ConnectRefused(i32),
    /// No answer from the broker within the network timeout.
    Timeout,
    SubscribeFailed(String),
    PublishFailed(String),
    /// ESP-IDF error.
    #[cfg(feature = "esp32")]
    EspError(esp_idf_sys::EspError),
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for MqttError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::EspError(e)
    }
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoServer => write!(f, "no broker configured"),
            Self::NotConnected => write!(f, "not connected"),
            Self::ConnectRefused(rc) => write!(f, "connect failed, rc={}", rc),
            Self::Timeout => write!(f, "broker did not answer"),
            Self::SubscribeFailed(topic) => write!(f, "subscribe to {} failed", topic),
            Self::PublishFailed(topic) => write!(f, "publish to {} failed", topic),
            #[cfg(feature = "esp32")]
            Self::EspError(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for MqttError {}
