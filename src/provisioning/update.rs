//! `KEY=VALUE` update blobs.
//!
//! Provisioning updates arrive out of band as small text blobs, one
//! assignment per line:
//!
//! ```text
//! WIFI_SSID = Workshop
//! WIFI_PASSWORD = correct-horse
//! mqtt_host=192.168.1.20
//! ```
//!
//! Lines are independent: a malformed or unknown line is skipped and does not
//! undo the lines already applied.

use super::key::ProvisioningKey;
use super::store::ProvisioningStore;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Largest raw payload accepted from the radio, in bytes.
pub const MAX_UPDATE_LEN: usize = 255;

/// Outcome of applying one update blob.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Lines whose key was recognized and written.
    pub applied: usize,
    /// Non-empty lines that were malformed or carried an unknown key.
    pub skipped: usize,
}

impl UpdateReport {
    pub fn any_applied(&self) -> bool {
        self.applied > 0
    }
}

/// Split one line into a trimmed `(key, value)` pair.
///
/// Returns `None` for lines without `=` or with an empty key.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Apply every line of `text` to `store`.
pub fn apply_update(store: &ProvisioningStore, text: &str) -> UpdateReport {
    let mut report = UpdateReport::default();

    let lines = text.split(|c| c == '\n' || c == '\r');
    for line in lines.filter(|l| !l.trim().is_empty()) {
        match parse_line(line) {
            Some((key, value)) if store.apply_key_value(key, value) => report.applied += 1,
            _ => {
                debug!("skipping provisioning line");
                report.skipped += 1;
            }
        }
    }

    report
}

/// Apply a raw radio payload, capped at [`MAX_UPDATE_LEN`] bytes.
pub fn apply_update_bytes(store: &ProvisioningStore, data: &[u8]) -> UpdateReport {
    let data = &data[..data.len().min(MAX_UPDATE_LEN)];
    apply_update(store, &String::from_utf8_lossy(data))
}

/// Intake for update blobs received over the radio.
///
/// Counts the blobs that changed something and raises a save request for
/// each. Receive callbacks run on the WiFi task, so the save itself is left
/// to whoever drains [`take_save_request`](Self::take_save_request).
#[derive(Debug, Default)]
pub struct RadioUpdates {
    received: AtomicU32,
    save_pending: AtomicBool,
}

impl RadioUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one radio payload to `store`.
    pub fn receive(&self, store: &ProvisioningStore, data: &[u8]) -> UpdateReport {
        let report = apply_update_bytes(store, data);
        if report.any_applied() {
            let n = self.received.fetch_add(1, Ordering::Relaxed) + 1;
            self.save_pending.store(true, Ordering::Release);
            info!(
                "provisioning update #{} applied ({} lines, {} skipped)",
                n, report.applied, report.skipped
            );
        }
        report
    }

    /// Radio blobs that applied at least one line.
    pub fn received(&self) -> u32 {
        self.received.load(Ordering::Relaxed)
    }

    /// Consume the pending save request, if any.
    pub fn take_save_request(&self) -> bool {
        self.save_pending.swap(false, Ordering::AcqRel)
    }
}

/// Serialize the store's current values as an update blob.
///
/// Applying the result to a fresh store reproduces the same values.
pub fn export_update(store: &ProvisioningStore) -> String {
    let mut out = String::new();
    for key in ProvisioningKey::ALL {
        out.push_str(key.as_str());
        out.push('=');
        out.push_str(&store.get(key));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_trims() {
        assert_eq!(parse_line("  WIFI_SSID =  Lab  "), Some(("WIFI_SSID", "Lab")));
        assert_eq!(parse_line("KEY="), Some(("KEY", "")));
    }

    #[test]
    fn test_parse_line_splits_at_first_equals() {
        assert_eq!(
            parse_line("WIFI_PASSWORD=a=b"),
            Some(("WIFI_PASSWORD", "a=b"))
        );
    }

    #[test]
    fn test_parse_line_rejects_malformed() {
        assert_eq!(parse_line("no separator"), None);
        assert_eq!(parse_line("   = value"), None);
    }

    #[test]
    fn test_apply_multi_line_blob() {
        let store = ProvisioningStore::new();
        let report = apply_update(
            &store,
            "WIFI_SSID=Lab\r\nWIFI_PASSWORD = pass1234\nMQTT_HOST=broker.local\n",
        );
        assert_eq!(report, UpdateReport { applied: 3, skipped: 0 });
        assert_eq!(store.wifi().ssid, "Lab");
        assert_eq!(store.wifi().password, "pass1234");
        assert_eq!(store.mqtt().host, "broker.local");
        assert_eq!(store.wifi_version(), 2);
        assert_eq!(store.mqtt_version(), 1);
    }

    #[test]
    fn test_bad_lines_do_not_roll_back() {
        let store = ProvisioningStore::new();
        let report = apply_update(&store, "WIFI_SSID=one\ngarbage\n=x\nUNKNOWN=1\nMQTT_PORT=99");
        assert_eq!(report, UpdateReport { applied: 2, skipped: 3 });
        assert_eq!(store.wifi().ssid, "one");
        assert_eq!(store.mqtt().port, 99);
    }

    #[test]
    fn test_empty_blob() {
        let store = ProvisioningStore::new();
        let report = apply_update(&store, "\n\r\n  \n");
        assert_eq!(report, UpdateReport::default());
        assert!(!report.any_applied());
    }

    #[test]
    fn test_bytes_are_capped() {
        let store = ProvisioningStore::new();
        let mut blob = format!("WIFI_SSID=first\n{}", "x".repeat(MAX_UPDATE_LEN));
        blob.push_str("\nMQTT_HOST=late");
        let report = apply_update_bytes(&store, blob.as_bytes());
        assert_eq!(report.applied, 1);
        assert!(!store.has_mqtt_params());
    }

    #[test]
    fn test_bytes_invalid_utf8_is_lossy() {
        let store = ProvisioningStore::new();
        let report = apply_update_bytes(&store, b"WIFI_SSID=ok\nMQTT_HOST=\xff\xfe");
        assert_eq!(report.applied, 2);
        assert!(store.has_mqtt_params());
    }

    // ==================== Radio Intake Tests ====================

    #[test]
    fn test_radio_counts_only_effective_blobs() {
        let store = ProvisioningStore::new();
        let radio = RadioUpdates::new();

        radio.receive(&store, b"WIFI_SSID=Lab");
        radio.receive(&store, b"garbage");
        radio.receive(&store, b"MQTT_HOST=broker.local\nMQTT_PORT=1884");
        assert_eq!(radio.received(), 2);
    }

    #[test]
    fn test_local_loads_not_counted() {
        let store = ProvisioningStore::new();
        let radio = RadioUpdates::new();

        apply_update(&store, "WIFI_SSID=FromFile");
        assert_eq!(radio.received(), 0);
        assert!(!radio.take_save_request());
    }

    #[test]
    fn test_save_requests_coalesce() {
        let store = ProvisioningStore::new();
        let radio = RadioUpdates::new();
        assert!(!radio.take_save_request());

        radio.receive(&store, b"WIFI_SSID=one");
        radio.receive(&store, b"WIFI_SSID=two");
        assert!(radio.take_save_request());
        assert!(!radio.take_save_request());

        radio.receive(&store, b"not an assignment");
        assert!(!radio.take_save_request());
    }

    #[test]
    fn test_export_reapplies_to_same_values() {
        let store = ProvisioningStore::with_defaults();
        store.apply_key_value("MQTT_PORT", "8883");
        store.apply_key_value("MQTT_USERNAME", "robot");

        let copy = ProvisioningStore::new();
        let report = apply_update(&copy, &export_update(&store));
        assert_eq!(report.applied, ProvisioningKey::ALL.len());
        assert_eq!(copy.wifi(), store.wifi());
        assert_eq!(copy.mqtt(), store.mqtt());
    }
}
