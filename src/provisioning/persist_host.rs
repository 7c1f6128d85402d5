//! Provisioning persistence for host (development) builds.
//!
//! Stores the provisioned values as an update blob in a file so they survive
//! restarts. Uses `~/.commrobot-esp32/provisioning.env` by default.
//!
//! # Usage
//!
//! ```ignore
//! use commrobot_esp32::provisioning::{persist_host, ProvisioningStore};
//!
//! let store = ProvisioningStore::with_defaults();
//! persist_host::load_overrides(&store)?;
//! ```

use super::store::ProvisioningStore;
use super::update::{apply_update, export_update, UpdateReport};
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Get the default provisioning file path.
///
/// Returns `~/.commrobot-esp32/provisioning.env`
pub fn default_provisioning_path() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home)
        .join(".commrobot-esp32")
        .join("provisioning.env"))
}

/// Apply the overrides stored at `path` to `store`.
///
/// A missing file is not an error and applies nothing.
pub fn load_overrides_from(store: &ProvisioningStore, path: &Path) -> io::Result<UpdateReport> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No provisioning file at {:?}", path);
            return Ok(UpdateReport::default());
        }
        Err(e) => return Err(e),
    };

    let report = apply_update(store, &text);
    info!("Loaded {} provisioning values from {:?}", report.applied, path);
    Ok(report)
}

/// Apply the overrides stored at the default path.
pub fn load_overrides(store: &ProvisioningStore) -> io::Result<UpdateReport> {
    load_overrides_from(store, &default_provisioning_path()?)
}

/// Save the store's current values to `path`, verifying by read-back.
pub fn save_to(store: &ProvisioningStore, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let blob = export_update(store);
    fs::write(path, &blob)?;

    let read_back = fs::read_to_string(path)?;
    if read_back != blob {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Provisioning verification failed: wrote {} bytes, read {} bytes",
                blob.len(),
                read_back.len()
            ),
        ));
    }

    info!("Provisioning saved to {:?}", path);
    Ok(())
}

/// Save the store's current values to the default path.
pub fn save(store: &ProvisioningStore) -> io::Result<()> {
    save_to(store, &default_provisioning_path()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_path() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let pid = std::process::id();
        env::temp_dir().join(format!("commrobot-test-{}-{}.env", pid, id))
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = unique_path();

        let store = ProvisioningStore::with_defaults();
        store.apply_key_value("WIFI_SSID", "Saved");
        store.apply_key_value("MQTT_PORT", "8883");
        save_to(&store, &path).expect("Failed to save");

        let restored = ProvisioningStore::with_defaults();
        let report = load_overrides_from(&restored, &path).expect("Failed to load");
        assert!(report.any_applied());
        assert_eq!(restored.wifi().ssid, "Saved");
        assert_eq!(restored.mqtt().port, 8883);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_applies_nothing() {
        let path = unique_path();
        let store = ProvisioningStore::with_defaults();
        let version = store.wifi_version();

        let report = load_overrides_from(&store, &path).expect("Missing file is not an error");
        assert_eq!(report, UpdateReport::default());
        assert_eq!(store.wifi_version(), version);
    }
}
