//! Poll-driven MQTT session manager.
//!
//! Layered on top of the WiFi link: the session is only worked on while the
//! link is up and the provisioning store holds a broker host. Each step:
//!
//! 1. picks up new broker parameters (version check) and forces a fresh
//!    handshake when they changed;
//! 2. drops the session and idles while the link is down;
//! 3. idles while no broker host is configured;
//! 4. reconnects at most once per retry delay, subscribing to the command
//!    topic on success;
//! 5. while connected, services the transport, forwards serial bytes and
//!    publishes the heartbeat on its cadence.

use super::bridge::{ByteSource, SerialBridge};
use super::client::{MqttClient, MqttCredentials};
use crate::config::{defaults, MqttTiming};
use crate::provisioning::{MqttParams, ProvisioningStore};
use crate::wifi::LinkStatus;
use log::{debug, info, warn};
use rand_core::{OsRng, RngCore};
use std::sync::Arc;
use std::time::Instant;

/// Consumer of command-topic payloads.
pub trait CommandSink {
    fn dispatch(&mut self, command: &str);
}

impl<F: FnMut(&str)> CommandSink for F {
    fn dispatch(&mut self, command: &str) {
        self(command)
    }
}

/// Session state as tracked by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttState {
    /// `init` has not run yet.
    Uninitialized,
    /// Network link is down.
    Idle,
    /// Link is up but no broker host is configured.
    Unconfigured,
    /// Link is up, no session, no attempt made yet.
    Disconnected,
    /// Last attempt failed; waiting for the retry delay.
    Connecting,
    /// Session is open.
    Connected,
}

/// Build the per-attempt client id: `<base>-<XXXX>`.
pub fn session_client_id(base: &str, rng: &mut dyn RngCore) -> String {
    let base = if base.is_empty() {
        defaults::FALLBACK_CLIENT_ID
    } else {
        base
    };
    format!("{}-{:04X}", base, rng.next_u32() & 0xFFFF)
}

/// MQTT session manager.
pub struct MqttSessionManager<C: MqttClient> {
    client: C,
    store: Arc<ProvisioningStore>,
    params: MqttParams,
    seen_version: u32,
    timing: MqttTiming,
    bridge: SerialBridge,
    rng: Box<dyn RngCore + Send>,
    last_reconnect: Option<Instant>,
    last_heartbeat: Option<Instant>,
    state: MqttState,
}

impl<C: MqttClient> MqttSessionManager<C> {
    /// Create a manager over `client`, reading parameters from `store`.
    pub fn new(client: C, store: Arc<ProvisioningStore>) -> Self {
        let timing = MqttTiming::default();
        Self {
            client,
            store,
            params: MqttParams::default(),
            seen_version: 0,
            timing,
            bridge: SerialBridge::new(timing.serial_buffer),
            rng: Box::new(OsRng),
            last_reconnect: None,
            last_heartbeat: None,
            state: MqttState::Uninitialized,
        }
    }

    /// Override retry, heartbeat and buffer settings.
    pub fn with_timing(mut self, timing: MqttTiming) -> Self {
        self.timing = timing;
        self.bridge = SerialBridge::new(timing.serial_buffer);
        self
    }

    /// Override the source of client-id suffixes.
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Size the client buffer, load parameters and point the client at the broker.
    pub fn init(&mut self, now: Instant) {
        self.client.set_buffer_size(self.timing.serial_buffer);
        self.refresh_params();
        self.apply_server();
        self.last_heartbeat = Some(now);
        self.state = MqttState::Idle;
    }

    /// Advance the session by one tick.
    pub fn step(
        &mut self,
        now: Instant,
        link: &impl LinkStatus,
        serial: &mut impl ByteSource,
        commands: &mut impl CommandSink,
    ) {
        self.handle_config_updates();

        if !link.is_link_up() {
            if self.state != MqttState::Idle {
                if self.client.is_connected() {
                    info!("WiFi down, closing MQTT session");
                }
                self.client.disconnect();
            }
            self.state = MqttState::Idle;
            return;
        }

        if !self.params.valid {
            self.state = MqttState::Unconfigured;
            return;
        }

        if !self.ensure_connected(now) {
            return;
        }

        for message in self.client.poll() {
            self.handle_message(&message.topic, &message.payload, commands);
        }
        self.pump_serial(serial);

        let heartbeat_due = self.last_heartbeat.map_or(true, |t| {
            now.saturating_duration_since(t) >= self.timing.heartbeat_interval
        });
        if heartbeat_due {
            self.publish_heartbeat(now);
        }
    }

    /// Live session status, queried from the client.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Current state.
    pub fn state(&self) -> MqttState {
        self.state
    }

    /// Parameters the manager is currently acting on.
    pub fn active_params(&self) -> &MqttParams {
        &self.params
    }

    /// Borrow the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Bytes waiting in the serial forwarding buffer.
    pub fn pending_serial(&self) -> usize {
        self.bridge.len()
    }

    fn refresh_params(&mut self) {
        let (version, params) = self.store.mqtt_versioned();
        self.seen_version = version;
        self.params = params;
    }

    fn apply_server(&mut self) {
        if !self.params.valid {
            return;
        }
        self.client.set_server(&self.params.host, self.params.port);
    }

    fn handle_config_updates(&mut self) {
        if self.store.mqtt_version() == self.seen_version {
            return;
        }

        self.refresh_params();
        self.apply_server();
        info!("MQTT parameters updated");
        self.client.disconnect();
        self.state = MqttState::Disconnected;
    }

    fn ensure_connected(&mut self, now: Instant) -> bool {
        if self.client.is_connected() {
            self.state = MqttState::Connected;
            return true;
        }

        if self.state == MqttState::Connected {
            warn!("MQTT session lost");
            self.client.disconnect();
            self.state = MqttState::Disconnected;
        }

        let retry_due = self
            .last_reconnect
            .map_or(true, |t| now.saturating_duration_since(t) >= self.timing.retry_delay);
        if !retry_due {
            return false;
        }
        self.last_reconnect = Some(now);

        let client_id = session_client_id(&self.params.client_id, self.rng.as_mut());
        let credentials = if self.params.username.is_empty() {
            None
        } else {
            Some(MqttCredentials {
                username: self.params.username.as_str(),
                password: if self.params.password.is_empty() {
                    None
                } else {
                    Some(self.params.password.as_str())
                },
            })
        };

        debug!(
            "MQTT connecting to {}:{} as {}",
            self.params.host, self.params.port, client_id
        );
        if let Err(e) = self.client.connect(&client_id, credentials) {
            warn!("MQTT {}", e);
            self.state = MqttState::Connecting;
            return false;
        }

        info!("MQTT connected");
        self.state = MqttState::Connected;
        if !self.params.command_topic.is_empty() {
            match self.client.subscribe(&self.params.command_topic) {
                Ok(()) => info!("Subscribed to {}", self.params.command_topic),
                Err(e) => warn!("MQTT {}", e),
            }
        }
        true
    }

    fn handle_message(&self, topic: &str, payload: &[u8], commands: &mut impl CommandSink) {
        if !self.params.command_topic.is_empty() && self.params.command_topic == topic {
            let command = String::from_utf8_lossy(payload);
            commands.dispatch(&command);
            return;
        }
        debug!("MQTT message on {} ({} bytes) ignored", topic, payload.len());
    }

    fn pump_serial(&mut self, serial: &mut impl ByteSource) {
        while let Some(byte) = serial.read_byte() {
            if let Some(chunk) = self.bridge.push(byte) {
                self.flush_serial(&chunk);
            }
        }
    }

    fn flush_serial(&mut self, chunk: &[u8]) {
        if chunk.is_empty() || self.params.publish_topic.is_empty() {
            return;
        }
        if let Err(e) = self.client.publish(&self.params.publish_topic, chunk) {
            warn!("MQTT serial {}", e);
        }
    }

    fn publish_heartbeat(&mut self, now: Instant) {
        let payload = defaults::HEARTBEAT_PAYLOAD;
        if !self.params.publish_topic.is_empty() {
            if let Err(e) = self.client.publish(&self.params.publish_topic, payload) {
                warn!("MQTT {}", e);
            }
        }
        if self.params.has_separate_heartbeat_topic() {
            if let Err(e) = self.client.publish(&self.params.heartbeat_topic, payload) {
                warn!("MQTT heartbeat {}", e);
            }
        }
        self.last_heartbeat = Some(now);
    }
}
