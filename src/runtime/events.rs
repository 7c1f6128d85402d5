//! Shared status bits for the multi-task runtime.
//!
//! One task sets or clears bits, others poll them or wait for them. Waits
//! take an optional timeout; `None` waits indefinitely, which is only used
//! for the initial link-up.

use crate::wifi::LinkStatus;
use std::time::Duration;
use tokio::sync::watch;

/// Station is associated and has an address.
pub const WIFI_CONNECTED_BIT: u32 = 1 << 0;
/// Station exhausted its connect attempts and is backing off.
pub const WIFI_FAIL_BIT: u32 = 1 << 1;
/// Broker session is up and subscribed.
pub const MQTT_READY_BIT: u32 = 1 << 2;

/// A group of status bits shared between tasks.
pub struct SystemBits {
    tx: watch::Sender<u32>,
}

impl Default for SystemBits {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBits {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Set `bits`. Waiters are woken only if something changed.
    pub fn set(&self, bits: u32) {
        self.tx.send_if_modified(|current| {
            let updated = *current | bits;
            let changed = updated != *current;
            *current = updated;
            changed
        });
    }

    /// Clear `bits`.
    pub fn clear(&self, bits: u32) {
        self.tx.send_if_modified(|current| {
            let updated = *current & !bits;
            let changed = updated != *current;
            *current = updated;
            changed
        });
    }

    /// Current value of all bits.
    pub fn get(&self) -> u32 {
        *self.tx.borrow()
    }

    /// Whether all of `bits` are set.
    pub fn contains(&self, bits: u32) -> bool {
        self.get() & bits == bits
    }

    /// Wait until any bit in `mask` is set.
    ///
    /// Returns the bit group at wake-up; on timeout the returned value has
    /// no bit of `mask` set.
    pub async fn wait_any(&self, mask: u32, timeout: Option<Duration>) -> u32 {
        let mut rx = self.tx.subscribe();
        let wait = async {
            // The sender lives in `self`, so the channel cannot close here.
            let _ = rx.wait_for(|bits| bits & mask != 0).await;
        };

        match timeout {
            Some(limit) => {
                let _ = tokio::time::timeout(limit, wait).await;
            }
            None => wait.await,
        }
        self.get()
    }
}

impl LinkStatus for SystemBits {
    fn is_link_up(&self) -> bool {
        self.contains(WIFI_CONNECTED_BIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_clear_get() {
        let bits = SystemBits::new();
        assert_eq!(bits.get(), 0);

        bits.set(WIFI_CONNECTED_BIT | MQTT_READY_BIT);
        assert!(bits.contains(WIFI_CONNECTED_BIT));
        assert!(bits.contains(WIFI_CONNECTED_BIT | MQTT_READY_BIT));
        assert!(!bits.contains(WIFI_FAIL_BIT));

        bits.clear(MQTT_READY_BIT);
        assert_eq!(bits.get(), WIFI_CONNECTED_BIT);
    }

    #[test]
    fn test_link_status_follows_connected_bit() {
        let bits = SystemBits::new();
        assert!(!bits.is_link_up());
        bits.set(WIFI_CONNECTED_BIT);
        assert!(bits.is_link_up());
        bits.set(WIFI_FAIL_BIT);
        bits.clear(WIFI_CONNECTED_BIT);
        assert!(!bits.is_link_up());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_set() {
        let bits = SystemBits::new();
        bits.set(WIFI_FAIL_BIT);
        let result = bits
            .wait_any(WIFI_CONNECTED_BIT | WIFI_FAIL_BIT, Some(Duration::from_secs(1)))
            .await;
        assert_eq!(result, WIFI_FAIL_BIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let bits = SystemBits::new();
        let start = tokio::time::Instant::now();
        let result = bits
            .wait_any(WIFI_CONNECTED_BIT, Some(Duration::from_millis(500)))
            .await;
        assert_eq!(result & WIFI_CONNECTED_BIT, 0);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_wakes_on_set_from_other_task() {
        let bits = Arc::new(SystemBits::new());
        let setter = {
            let bits = bits.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3)).await;
                bits.set(WIFI_CONNECTED_BIT);
            })
        };

        let result = bits.wait_any(WIFI_CONNECTED_BIT, None).await;
        assert!(result & WIFI_CONNECTED_BIT != 0);
        setter.await.unwrap();
    }
}
