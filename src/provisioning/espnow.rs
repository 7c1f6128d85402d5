//! ESP-NOW provisioning listener.
//!
//! Peers send `KEY=VALUE` blobs over ESP-NOW; each received frame is applied
//! to the shared store. Frames that changed something wake a saver thread
//! that persists the store to NVS, keeping flash writes off the WiFi task.
//! ESP-NOW needs the radio in station mode, which must be configured before
//! this listener starts.

use super::storage::save_overrides;
use super::store::ProvisioningStore;
use super::update::RadioUpdates;
use esp_idf_svc::espnow::{EspNow, ReceiveInfo};
use esp_idf_svc::nvs::{EspNvs, NvsDefault};
use esp_idf_sys::EspError;
use log::{info, warn};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

const SAVER_STACK_SIZE: usize = 8192;

/// Keeps the ESP-NOW driver and its receive callback alive.
pub struct EspNowListener {
    _espnow: EspNow<'static>,
    updates: Arc<RadioUpdates>,
}

impl EspNowListener {
    /// Initialize ESP-NOW and start applying received updates to `store`.
    ///
    /// Without `nvs`, updates still apply but are lost on reboot.
    pub fn start(
        store: Arc<ProvisioningStore>,
        nvs: Option<EspNvs<NvsDefault>>,
    ) -> Result<Self, EspError> {
        let updates = Arc::new(RadioUpdates::new());
        // One queued wake is enough: the saver always exports the latest values.
        let (wake_tx, wake_rx) = mpsc::sync_channel::<()>(1);

        if let Some(nvs) = nvs {
            spawn_saver(nvs, store.clone(), updates.clone(), wake_rx);
        }

        let espnow = EspNow::take()?;
        let intake = updates.clone();
        espnow.register_recv_cb(move |_info: &ReceiveInfo, data: &[u8]| {
            if intake.receive(&store, data).any_applied() {
                let _ = wake_tx.try_send(());
            }
        })?;

        info!("ESP-NOW provisioning listener ready");
        Ok(Self {
            _espnow: espnow,
            updates,
        })
    }

    /// Radio updates applied since start.
    pub fn updates_received(&self) -> u32 {
        self.updates.received()
    }
}

fn spawn_saver(
    mut nvs: EspNvs<NvsDefault>,
    store: Arc<ProvisioningStore>,
    updates: Arc<RadioUpdates>,
    wake: Receiver<()>,
) {
    let spawned = thread::Builder::new()
        .name("prov-save".to_string())
        .stack_size(SAVER_STACK_SIZE)
        .spawn(move || {
            // Ends when the receive callback, and with it the sender, is dropped.
            while wake.recv().is_ok() {
                if !updates.take_save_request() {
                    continue;
                }
                match save_overrides(&mut nvs, &store) {
                    Ok(()) => info!("Provisioning update saved to NVS"),
                    Err(e) => warn!("Failed to persist provisioning update: {:?}", e),
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Provisioning saver not started, updates will not persist: {}", e);
    }
}
