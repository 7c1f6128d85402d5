//! Station-mode interface abstraction.

use std::net::Ipv4Addr;

/// A WiFi interface in station mode.
///
/// `begin` only starts an association; completion is observed by polling
/// [`StationLink::is_connected`]. Implementations must not block on it.
pub trait StationLink {
    /// Put the interface in station mode without persisting prior credentials.
    ///
    /// Calls after the first success are no-ops, so the radio can be brought
    /// up early (ESP-NOW needs it) before a manager's `init` runs.
    fn configure_station(&mut self) -> Result<(), WifiError>;

    /// Start associating with `ssid`. An empty password means an open network.
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), WifiError>;

    /// Drop any established or in-progress association.
    fn disconnect(&mut self) -> Result<(), WifiError>;

    /// Live link status: associated and holding an address.
    fn is_connected(&self) -> bool;

    /// Address acquired via DHCP, if connected.
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

/// Anything that can say whether the network link is currently usable.
///
/// The MQTT session manager is gated on this.
pub trait LinkStatus {
    fn is_link_up(&self) -> bool;
}

/// Errors that can occur during WiFi operations.
#[derive(Debug)]
pub enum WifiError {
    /// SSID is invalid (too long or contains invalid characters).
    InvalidSsid,
    /// Password is invalid.
    InvalidPassword,
    /// The driver rejected the request.
    ConnectionFailed(String),
    /// ESP-IDF error.
    #[cfg(feature = "esp32")]
    EspError(esp_idf_sys::EspError),
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for WifiError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::EspError(e)
    }
}

impl std::fmt::Display for WifiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidPassword => write!(f, "invalid password"),
            Self::ConnectionFailed(reason) => write!(f, "connection failed: {}", reason),
            #[cfg(feature = "esp32")]
            Self::EspError(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for WifiError {}
