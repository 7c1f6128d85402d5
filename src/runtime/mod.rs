//! Drivers that step the connection managers.
//!
//! Two scheduling models are supported:
//!
//! - [`Controller`]: one thread steps WiFi then MQTT back-to-back on a fixed
//!   cadence. Nothing is shared, so nothing is locked beyond the store.
//! - [`run_wifi_task`] / [`run_mqtt_task`]: independent tokio tasks that
//!   coordinate through [`events::SystemBits`].

pub mod events;
mod tasks;

pub use tasks::{run_mqtt_task, run_wifi_task};

use crate::config;
use crate::mqtt::{ByteSource, CommandSink, MqttClient, MqttSessionManager};
use crate::provisioning::ProvisioningStore;
use crate::wifi::{StationLink, WifiConnectionManager};
use log::info;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Device context: the provisioning store and both managers.
pub struct Controller<L: StationLink, C: MqttClient> {
    store: Arc<ProvisioningStore>,
    wifi: WifiConnectionManager<L>,
    mqtt: MqttSessionManager<C>,
    cadence: Duration,
}

impl<L: StationLink, C: MqttClient> Controller<L, C> {
    /// Build both managers over `store` with default timing.
    pub fn new(store: Arc<ProvisioningStore>, link: L, client: C) -> Self {
        let wifi = WifiConnectionManager::new(link, store.clone());
        let mqtt = MqttSessionManager::new(client, store.clone());
        Self::from_parts(store, wifi, mqtt)
    }

    /// Assemble from pre-configured managers.
    pub fn from_parts(
        store: Arc<ProvisioningStore>,
        wifi: WifiConnectionManager<L>,
        mqtt: MqttSessionManager<C>,
    ) -> Self {
        Self {
            store,
            wifi,
            mqtt,
            cadence: config::loop_cadence(),
        }
    }

    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn init(&mut self, now: Instant) {
        self.wifi.init(now);
        self.mqtt.init(now);
    }

    /// One pass of the loop: WiFi first, then MQTT gated on it.
    pub fn tick(
        &mut self,
        now: Instant,
        serial: &mut impl ByteSource,
        commands: &mut impl CommandSink,
    ) {
        self.wifi.step(now);
        self.mqtt.step(now, &self.wifi, serial, commands);
    }

    /// Tick every cadence period until `cancel` fires. Call `init` first.
    pub fn run(
        &mut self,
        serial: &mut impl ByteSource,
        commands: &mut impl CommandSink,
        cancel: &CancellationToken,
    ) {
        info!("Control loop running every {:?}", self.cadence);
        while !cancel.is_cancelled() {
            self.tick(Instant::now(), serial, commands);
            std::thread::sleep(self.cadence);
        }
        info!("Control loop stopped");
    }

    pub fn store(&self) -> &Arc<ProvisioningStore> {
        &self.store
    }

    pub fn wifi(&self) -> &WifiConnectionManager<L> {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut WifiConnectionManager<L> {
        &mut self.wifi
    }

    pub fn mqtt(&self) -> &MqttSessionManager<C> {
        &self.mqtt
    }
}
