//! NVS persistence for provisioned values.
//!
//! Runtime overrides are stored in ESP32's Non-Volatile Storage as an update
//! blob so they survive reboots. At boot the blob is applied on top of the
//! compiled-in defaults.

use super::store::ProvisioningStore;
use super::update::{apply_update, export_update, UpdateReport};
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_sys::EspError;
use log::{info, warn};

/// NVS namespace for provisioning data.
const NVS_NAMESPACE: &str = "provisioning";

/// NVS key for the stored blob.
const NVS_KEY: &str = "overrides";

/// Maximum stored blob size. Ten keys with bounded values stay well below.
const MAX_BLOB_SIZE: usize = 1024;

/// Apply stored overrides to `store`.
///
/// Missing or unreadable data applies nothing.
pub fn load_overrides(nvs: &EspNvs<NvsDefault>, store: &ProvisioningStore) -> UpdateReport {
    let mut buf = [0u8; MAX_BLOB_SIZE];
    let bytes = match nvs.get_raw(NVS_KEY, &mut buf) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            log::debug!("No provisioning overrides in NVS");
            return UpdateReport::default();
        }
        Err(e) => {
            warn!("Failed to read provisioning from NVS: {:?}", e);
            return UpdateReport::default();
        }
    };

    let report = apply_update(store, &String::from_utf8_lossy(bytes));
    info!("Loaded {} provisioning values from NVS", report.applied);
    report
}

/// Save the store's current values to NVS.
pub fn save_overrides(
    nvs: &mut EspNvs<NvsDefault>,
    store: &ProvisioningStore,
) -> Result<(), EspError> {
    let blob = export_update(store);
    nvs.set_raw(NVS_KEY, blob.as_bytes())?;
    Ok(())
}

/// Clear stored overrides. The next boot uses the compiled-in defaults.
pub fn clear_overrides(nvs: &mut EspNvs<NvsDefault>) -> Result<(), EspError> {
    nvs.remove(NVS_KEY)?;
    warn!("Provisioning overrides cleared from NVS");
    Ok(())
}

/// Open the provisioning namespace on the default partition.
pub fn init_nvs(partition: EspNvsPartition<NvsDefault>) -> Result<EspNvs<NvsDefault>, EspError> {
    EspNvs::new(partition, NVS_NAMESPACE, true)
}
