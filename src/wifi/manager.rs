//! Poll-driven WiFi connection manager.
//!
//! The manager is stepped from the driver loop. Each step:
//!
//! 1. picks up new credentials from the provisioning store (version check),
//!    tearing down the current association when they changed;
//! 2. idles when there are no usable credentials;
//! 3. tracks link up/down transitions from the live interface status;
//! 4. starts a new association when none is in flight, or when the last one
//!    has been pending for longer than the retry delay.

use super::link::{LinkStatus, StationLink};
use crate::config;
use crate::provisioning::{ProvisioningStore, WifiCredentials};
use log::{error, info, warn};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Connection state as tracked by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    /// `init` has not run yet.
    Uninitialized,
    /// No valid credentials; waiting for provisioning.
    NoCredentials,
    /// An association attempt is in flight.
    Connecting,
    /// Link is up.
    Connected,
    /// Link was lost or a reconnect was requested.
    Disconnected,
}

/// WiFi connection manager.
pub struct WifiConnectionManager<L: StationLink> {
    link: L,
    store: Arc<ProvisioningStore>,
    credentials: WifiCredentials,
    seen_version: u32,
    last_attempt: Option<Instant>,
    in_flight: bool,
    connected: bool,
    retry_delay: Duration,
    state: WifiState,
}

impl<L: StationLink> WifiConnectionManager<L> {
    /// Create a manager over `link`, reading credentials from `store`.
    pub fn new(link: L, store: Arc<ProvisioningStore>) -> Self {
        Self {
            link,
            store,
            credentials: WifiCredentials::default(),
            seen_version: 0,
            last_attempt: None,
            in_flight: false,
            connected: false,
            retry_delay: config::wifi_retry_delay(),
            state: WifiState::Uninitialized,
        }
    }

    /// Override the delay between connection attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Configure station mode and start connecting if credentials exist.
    pub fn init(&mut self, now: Instant) {
        if let Err(e) = self.link.configure_station() {
            error!("Failed to configure WiFi station mode: {}", e);
        }
        self.refresh_credentials();

        if !self.credentials.valid {
            self.enter_no_credentials();
            return;
        }
        self.begin_attempt(now);
    }

    /// Advance the state machine by one tick.
    pub fn step(&mut self, now: Instant) {
        self.handle_credential_updates(now);

        if !self.credentials.valid {
            return;
        }

        if self.link.is_connected() {
            if !self.connected {
                self.connected = true;
                self.in_flight = false;
                self.state = WifiState::Connected;
                match self.link.local_ip() {
                    Some(ip) => info!("WiFi connected, IP: {}", ip),
                    None => info!("WiFi connected"),
                }
            }
            return;
        }

        if self.connected {
            self.connected = false;
            self.state = WifiState::Disconnected;
            warn!("WiFi disconnected");
        }

        let retry_due = self
            .last_attempt
            .map_or(true, |t| now.saturating_duration_since(t) >= self.retry_delay);
        if !self.in_flight || retry_due {
            self.begin_attempt(now);
        }
    }

    /// Live link status, queried from the interface.
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Drop the current association; the next step starts a fresh attempt.
    pub fn request_reconnect(&mut self) {
        self.in_flight = false;
        self.connected = false;
        if self.state != WifiState::NoCredentials {
            self.state = WifiState::Disconnected;
        }
        if let Err(e) = self.link.disconnect() {
            warn!("WiFi disconnect failed: {}", e);
        }
    }

    /// Current state.
    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Address acquired via DHCP, if connected.
    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        self.link.local_ip()
    }

    /// Credentials the manager is currently acting on.
    pub fn active_credentials(&self) -> &WifiCredentials {
        &self.credentials
    }

    /// Borrow the underlying interface.
    pub fn link(&self) -> &L {
        &self.link
    }

    fn refresh_credentials(&mut self) {
        let (version, credentials) = self.store.wifi_versioned();
        self.seen_version = version;
        self.credentials = credentials;
    }

    fn handle_credential_updates(&mut self, now: Instant) {
        if self.store.wifi_version() == self.seen_version {
            return;
        }

        self.refresh_credentials();
        self.connected = false;
        self.in_flight = false;
        if let Err(e) = self.link.disconnect() {
            warn!("WiFi disconnect failed: {}", e);
        }

        if self.credentials.valid {
            info!("WiFi credentials updated");
            self.begin_attempt(now);
        } else {
            self.enter_no_credentials();
        }
    }

    fn enter_no_credentials(&mut self) {
        self.state = WifiState::NoCredentials;
        info!("WiFi credentials unavailable; waiting for provisioning");
    }

    fn begin_attempt(&mut self, now: Instant) {
        info!("Connecting to WiFi SSID '{}'", self.credentials.ssid);
        if let Err(e) = self
            .link
            .begin(&self.credentials.ssid, &self.credentials.password)
        {
            warn!("WiFi connect request failed: {}", e);
        }
        self.last_attempt = Some(now);
        self.in_flight = true;
        self.state = WifiState::Connecting;
    }
}

impl<L: StationLink> LinkStatus for WifiConnectionManager<L> {
    fn is_link_up(&self) -> bool {
        self.is_connected()
    }
}
