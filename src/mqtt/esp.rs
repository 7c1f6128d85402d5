//! ESP-IDF broker client.
//!
//! Adapts the event-driven `EspMqttClient` to the synchronous
//! [`MqttClient`] contract: `connect` waits for the CONNECTED (or ERROR)
//! event, and received messages are reassembled from their chunks and queued
//! until the next `poll`. The driver's own reconnect is disabled: once the
//! session drops, the client stays down until `disconnect` releases it and
//! the session manager builds a new one.

use super::client::{InboundMessage, MqttClient, MqttCredentials, MqttError};
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long `connect` waits for the broker.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct SessionEvents {
    connected: bool,
    error: Option<i32>,
    inbound: VecDeque<InboundMessage>,
    partial: Option<InboundMessage>,
}

type Shared = Arc<(Mutex<SessionEvents>, Condvar)>;

fn lock(shared: &Shared) -> MutexGuard<'_, SessionEvents> {
    shared.0.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`MqttClient`] over the ESP-IDF MQTT component.
pub struct EspMqttTransport {
    server: Option<(String, u16)>,
    buffer_size: usize,
    connect_timeout: Duration,
    client: Option<EspMqttClient<'static>>,
    shared: Shared,
}

impl Default for EspMqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl EspMqttTransport {
    pub fn new() -> Self {
        Self {
            server: None,
            buffer_size: 0,
            connect_timeout: CONNECT_TIMEOUT,
            client: None,
            shared: Arc::new((Mutex::new(SessionEvents::default()), Condvar::new())),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

fn on_event(shared: &Shared, payload: EventPayload<'_, esp_idf_sys::EspError>) {
    let mut events = lock(shared);
    match payload {
        EventPayload::Connected(_) => {
            events.connected = true;
            shared.1.notify_all();
        }
        EventPayload::Disconnected => {
            events.connected = false;
            shared.1.notify_all();
        }
        EventPayload::Error(e) => {
            events.error = Some(e.code());
            shared.1.notify_all();
        }
        EventPayload::Received {
            topic,
            data,
            details,
            ..
        } => match details {
            Details::Complete => events.inbound.push_back(InboundMessage {
                topic: topic.unwrap_or_default().to_string(),
                payload: data.to_vec(),
            }),
            Details::InitialChunk(chunk) => {
                let mut payload = Vec::with_capacity(chunk.total_data_size);
                payload.extend_from_slice(data);
                events.partial = Some(InboundMessage {
                    topic: topic.unwrap_or_default().to_string(),
                    payload,
                });
            }
            Details::SubsequentChunk(chunk) => {
                let done = match events.partial.as_mut() {
                    Some(partial) => {
                        partial.payload.extend_from_slice(data);
                        partial.payload.len() >= chunk.total_data_size
                    }
                    None => false,
                };
                if done {
                    if let Some(message) = events.partial.take() {
                        events.inbound.push_back(message);
                    }
                }
            }
        },
        other => debug!("MQTT event: {:?}", other),
    }
}

impl MqttClient for EspMqttTransport {
    fn set_buffer_size(&mut self, size: usize) {
        self.buffer_size = size;
    }

    fn set_server(&mut self, host: &str, port: u16) {
        self.server = Some((host.to_string(), port));
    }

    fn connect(
        &mut self,
        client_id: &str,
        credentials: Option<MqttCredentials<'_>>,
    ) -> Result<(), MqttError> {
        self.client = None;
        let (host, port) = self.server.as_ref().ok_or(MqttError::NoServer)?;
        let url = format!("mqtt://{}:{}", host, port);

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            username: credentials.map(|c| c.username),
            password: credentials.and_then(|c| c.password),
            buffer_size: self.buffer_size,
            network_timeout: self.connect_timeout,
            disable_auto_reconnect: true,
            ..Default::default()
        };

        *lock(&self.shared) = SessionEvents::default();
        let shared = self.shared.clone();
        let client = EspMqttClient::new_cb(&url, &conf, move |event| {
            on_event(&shared, event.payload());
        })?;

        let events = lock(&self.shared);
        let (events, _) = self
            .shared
            .1
            .wait_timeout_while(events, self.connect_timeout, |e| {
                !e.connected && e.error.is_none()
            })
            .unwrap_or_else(PoisonError::into_inner);

        if events.connected {
            drop(events);
            self.client = Some(client);
            return Ok(());
        }
        match events.error {
            Some(code) => Err(MqttError::ConnectRefused(code)),
            None => Err(MqttError::Timeout),
        }
    }

    fn disconnect(&mut self) {
        // A dropped session still holds the driver task; release it too.
        self.client = None;
        lock(&self.shared).connected = false;
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && lock(&self.shared).connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        let client = self.client.as_mut().ok_or(MqttError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| MqttError::SubscribeFailed(topic.to_string()))
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        let client = self.client.as_mut().ok_or(MqttError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT publish error: {:?}", e);
                MqttError::PublishFailed(topic.to_string())
            })
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        lock(&self.shared).inbound.drain(..).collect()
    }
}
