//! ESP-IDF station link.
//!
//! Wraps the non-blocking `EspWifi` driver: `begin` configures the client and
//! issues a connect request, and link status is read from the STA netif.

use super::link::{StationLink, WifiError};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};
use esp_idf_sys::{esp, esp_wifi_set_storage, wifi_storage_t_WIFI_STORAGE_RAM, EspError};
use log::info;
use std::net::Ipv4Addr;

/// Station link over the ESP-IDF WiFi driver.
pub struct EspStationLink<'a> {
    /// ESP-IDF WiFi driver.
    wifi: EspWifi<'a>,
    started: bool,
}

impl<'a> EspStationLink<'a> {
    /// Create the driver.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, nvs)?;
        Ok(Self {
            wifi,
            started: false,
        })
    }
}

impl<'a> StationLink for EspStationLink<'a> {
    fn configure_station(&mut self) -> Result<(), WifiError> {
        if self.started {
            return Ok(());
        }
        // Credentials come from the provisioning store; keep the driver's
        // own copy in RAM so stale ones are never restored from flash.
        esp!(unsafe { esp_wifi_set_storage(wifi_storage_t_WIFI_STORAGE_RAM) })?;
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        self.wifi.start()?;
        let _ = self.wifi.disconnect();
        self.started = true;
        Ok(())
    }

    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), WifiError> {
        info!("Associating with '{}'", ssid);

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| WifiError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|_| WifiError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let _ = self.wifi.disconnect();
        self.wifi.set_configuration(&config)?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        self.wifi
            .connect()
            .map_err(|e| WifiError::ConnectionFailed(format!("{:?}", e)))?;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), WifiError> {
        self.wifi.disconnect()?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        if !self.is_connected() {
            return None;
        }
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }
}
