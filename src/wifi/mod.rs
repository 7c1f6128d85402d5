//! WiFi station management.
//!
//! # Components
//!
//! - [`StationLink`] - interface seam over the station driver
//! - [`WifiConnectionManager`] - poll-driven manager fed by the provisioning store
//! - [`BoundedRetryWifi`] - fixed-credential variant reporting through status bits
//! - `EspStationLink` - ESP-IDF driver wrapper (ESP32 only)

mod bounded_retry;
mod link;
mod manager;

#[cfg(feature = "esp32")]
mod connection;

pub use bounded_retry::{BoundedRetryWifi, WifiTaskConfig, EXHAUSTED_BACKOFF, MAX_CONNECT_ATTEMPTS};
pub use link::{LinkStatus, StationLink, WifiError};
pub use manager::{WifiConnectionManager, WifiState};

#[cfg(feature = "esp32")]
pub use connection::EspStationLink;
