//! Event-bit WiFi variant for the multi-task runtime.
//!
//! Unlike [`super::WifiConnectionManager`], this variant connects with a
//! fixed set of credentials and a bounded number of attempts. It publishes
//! its status through [`SystemBits`]: `WIFI_CONNECTED_BIT` while the link is
//! up, `WIFI_FAIL_BIT` after a round of attempts is exhausted. A failed round
//! is followed by a back-off pause before the next one starts.

use super::link::StationLink;
use crate::config;
use crate::provisioning::WifiCredentials;
use crate::runtime::events::{SystemBits, WIFI_CONNECTED_BIT, WIFI_FAIL_BIT};
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Maximum connect attempts per round.
pub const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Pause after a failed round.
pub const EXHAUSTED_BACKOFF: Duration = Duration::from_secs(30);

/// Settings for [`BoundedRetryWifi`].
#[derive(Debug, Clone)]
pub struct WifiTaskConfig {
    pub credentials: WifiCredentials,
    pub max_attempts: u32,
    /// Time an attempt is given before the next one starts.
    pub retry_delay: Duration,
    /// Pause after `max_attempts` failed attempts.
    pub exhausted_backoff: Duration,
    /// Task polling period.
    pub poll_interval: Duration,
}

impl Default for WifiTaskConfig {
    fn default() -> Self {
        Self {
            credentials: WifiCredentials::defaults(),
            max_attempts: MAX_CONNECT_ATTEMPTS,
            retry_delay: config::wifi_retry_delay(),
            exhausted_backoff: EXHAUSTED_BACKOFF,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Bounded-retry WiFi state machine that reports through status bits.
pub struct BoundedRetryWifi<L: StationLink> {
    link: L,
    config: WifiTaskConfig,
    bits: Arc<SystemBits>,
    attempts: u32,
    last_attempt: Option<Instant>,
    backoff_until: Option<Instant>,
    connected: bool,
}

impl<L: StationLink> BoundedRetryWifi<L> {
    pub fn new(link: L, config: WifiTaskConfig, bits: Arc<SystemBits>) -> Self {
        Self {
            link,
            config,
            bits,
            attempts: 0,
            last_attempt: None,
            backoff_until: None,
            connected: false,
        }
    }

    /// Configure station mode.
    pub fn init(&mut self) {
        if let Err(e) = self.link.configure_station() {
            warn!("Failed to configure WiFi station mode: {}", e);
        }
        if !self.config.credentials.valid {
            warn!("No compiled-in WiFi SSID; station will stay idle");
        }
    }

    /// Advance by one tick.
    pub fn step(&mut self, now: Instant) {
        if !self.config.credentials.valid {
            return;
        }

        if self.link.is_connected() {
            if !self.connected {
                self.connected = true;
                self.attempts = 0;
                self.backoff_until = None;
                self.bits.clear(WIFI_FAIL_BIT);
                self.bits.set(WIFI_CONNECTED_BIT);
                match self.link.local_ip() {
                    Some(ip) => info!("WiFi connected, IP: {}", ip),
                    None => info!("WiFi connected"),
                }
            }
            return;
        }

        if self.connected {
            self.connected = false;
            self.last_attempt = None;
            self.bits.clear(WIFI_CONNECTED_BIT);
            warn!("WiFi disconnected");
        }

        if let Some(until) = self.backoff_until {
            if now < until {
                return;
            }
            self.backoff_until = None;
            self.attempts = 0;
            self.bits.clear(WIFI_FAIL_BIT);
            info!("WiFi back-off over, retrying");
        }

        let retry_due = self
            .last_attempt
            .map_or(true, |t| now.saturating_duration_since(t) >= self.config.retry_delay);
        if !retry_due {
            return;
        }

        if self.attempts >= self.config.max_attempts {
            warn!(
                "WiFi failed after {} attempts, backing off {:?}",
                self.attempts, self.config.exhausted_backoff
            );
            self.bits.set(WIFI_FAIL_BIT);
            self.backoff_until = Some(now + self.config.exhausted_backoff);
            return;
        }

        self.attempts += 1;
        info!(
            "Connecting to WiFi SSID '{}' (attempt {}/{})",
            self.config.credentials.ssid, self.attempts, self.config.max_attempts
        );
        if let Err(e) = self.link.begin(
            &self.config.credentials.ssid,
            &self.config.credentials.password,
        ) {
            warn!("WiFi connect request failed: {}", e);
        }
        self.last_attempt = Some(now);
    }

    /// Attempts made in the current round.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }
}
