//! In-memory fakes for the hardware seams, used by unit tests.
//!
//! Each fake is a cheap handle over shared state: clone it, hand one copy to
//! the component under test and keep the other to drive and inspect it.

use crate::mqtt::{InboundMessage, MqttClient, MqttCredentials, MqttError};
use crate::wifi::{LinkStatus, StationLink, WifiError};
use rand_core::{impls, Error as RandError, RngCore};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};

// ==================== Station link ====================

#[derive(Default)]
struct LinkState {
    configured: bool,
    configurations: usize,
    connected: bool,
    connect_on_begin: bool,
    begins: Vec<(String, String)>,
    disconnects: usize,
}

/// Station link whose status is set by the test.
#[derive(Clone, Default)]
pub struct FakeStationLink {
    state: Arc<Mutex<LinkState>>,
}

impl FakeStationLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap()
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Make every `begin` succeed instantly.
    pub fn connect_on_begin(&self, enabled: bool) {
        self.lock().connect_on_begin = enabled;
    }

    pub fn station_configured(&self) -> bool {
        self.lock().configured
    }

    /// Times the station was actually set up.
    pub fn configure_count(&self) -> usize {
        self.lock().configurations
    }

    pub fn begin_calls(&self) -> Vec<(String, String)> {
        self.lock().begins.clone()
    }

    pub fn begin_count(&self) -> usize {
        self.lock().begins.len()
    }

    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }
}

impl StationLink for FakeStationLink {
    fn configure_station(&mut self) -> Result<(), WifiError> {
        let mut state = self.lock();
        if !state.configured {
            state.configured = true;
            state.configurations += 1;
        }
        Ok(())
    }

    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), WifiError> {
        let mut state = self.lock();
        state.begins.push((ssid.to_string(), password.to_string()));
        if state.connect_on_begin {
            state.connected = true;
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), WifiError> {
        let mut state = self.lock();
        state.connected = false;
        state.disconnects += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        if self.is_connected() {
            Some(Ipv4Addr::new(192, 168, 1, 50))
        } else {
            None
        }
    }
}

/// Link status fixed by the test.
pub struct FixedLink(pub bool);

impl LinkStatus for FixedLink {
    fn is_link_up(&self) -> bool {
        self.0
    }
}

// ==================== MQTT client ====================

/// Recorded `connect` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectCall {
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Default)]
struct ClientState {
    server: Option<(String, u16)>,
    buffer_size: Option<usize>,
    connected: bool,
    refuse_connect: bool,
    refuse_subscribe: bool,
    refuse_publish: bool,
    connects: Vec<ConnectCall>,
    disconnects: usize,
    subscriptions: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
    inbound: VecDeque<InboundMessage>,
    polls: usize,
}

/// Broker client that records calls and replays queued inbound messages.
#[derive(Clone, Default)]
pub struct FakeMqttClient {
    state: Arc<Mutex<ClientState>>,
}

impl FakeMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap()
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.lock().refuse_connect = refuse;
    }

    pub fn refuse_subscribe(&self, refuse: bool) {
        self.lock().refuse_subscribe = refuse;
    }

    pub fn refuse_publish(&self, refuse: bool) {
        self.lock().refuse_publish = refuse;
    }

    /// Simulate the broker dropping the session.
    pub fn drop_session(&self) {
        self.lock().connected = false;
    }

    pub fn push_inbound(&self, topic: &str, payload: &[u8]) {
        self.lock().inbound.push_back(InboundMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
    }

    pub fn server(&self) -> Option<(String, u16)> {
        self.lock().server.clone()
    }

    pub fn buffer_size(&self) -> Option<usize> {
        self.lock().buffer_size
    }

    pub fn connects(&self) -> Vec<ConnectCall> {
        self.lock().connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects.len()
    }

    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.lock().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().published.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.lock().polls
    }
}

impl MqttClient for FakeMqttClient {
    fn set_buffer_size(&mut self, size: usize) {
        self.lock().buffer_size = Some(size);
    }

    fn set_server(&mut self, host: &str, port: u16) {
        self.lock().server = Some((host.to_string(), port));
    }

    fn connect(
        &mut self,
        client_id: &str,
        credentials: Option<MqttCredentials<'_>>,
    ) -> Result<(), MqttError> {
        let mut state = self.lock();
        state.connects.push(ConnectCall {
            client_id: client_id.to_string(),
            username: credentials.map(|c| c.username.to_string()),
            password: credentials.and_then(|c| c.password.map(str::to_string)),
        });
        if state.refuse_connect || state.server.is_none() {
            return Err(MqttError::ConnectRefused(5));
        }
        state.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut state = self.lock();
        state.connected = false;
        state.disconnects += 1;
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        let mut state = self.lock();
        if state.refuse_subscribe {
            return Err(MqttError::SubscribeFailed(topic.to_string()));
        }
        state.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(MqttError::NotConnected);
        }
        if state.refuse_publish {
            return Err(MqttError::PublishFailed(topic.to_string()));
        }
        state.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        let mut state = self.lock();
        state.polls += 1;
        state.inbound.drain(..).collect()
    }
}

// ==================== RNG ====================

/// Deterministic RNG returning `start`, `start + 1`, ...
pub struct SeqRng(pub u32);

impl RngCore for SeqRng {
    fn next_u32(&mut self) -> u32 {
        let value = self.0;
        self.0 = self.0.wrapping_add(1);
        value
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        self.fill_bytes(dest);
        Ok(())
    }
}
