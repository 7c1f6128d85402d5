//! Task bodies for the multi-task runtime.
//!
//! The WiFi task owns the station and publishes its status as bits; the MQTT
//! task waits for the first link-up, then steps the session manager with the
//! bits as its link gate and mirrors the session state into `MQTT_READY_BIT`.

use super::events::{SystemBits, MQTT_READY_BIT, WIFI_CONNECTED_BIT};
use crate::config;
use crate::mqtt::{ByteSource, CommandSink, MqttClient, MqttSessionManager};
use crate::wifi::{BoundedRetryWifi, StationLink};
use log::info;
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drive `wifi` on its poll interval until cancelled.
pub async fn run_wifi_task<L: StationLink>(
    mut wifi: BoundedRetryWifi<L>,
    cancel: CancellationToken,
) {
    wifi.init();
    let mut ticker = tokio::time::interval(wifi.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("WiFi task shutting down");
                break;
            }
            _ = ticker.tick() => wifi.step(Instant::now().into_std()),
        }
    }
}

/// Drive `mqtt` once the link is up, until cancelled.
pub async fn run_mqtt_task<C, S, K>(
    mut mqtt: MqttSessionManager<C>,
    bits: Arc<SystemBits>,
    mut serial: S,
    mut commands: K,
    cancel: CancellationToken,
) where
    C: MqttClient,
    S: ByteSource,
    K: CommandSink,
{
    mqtt.init(Instant::now().into_std());

    // Nothing useful happens before the first link-up.
    tokio::select! {
        _ = cancel.cancelled() => {
            info!("MQTT task cancelled before link-up");
            return;
        }
        _ = bits.wait_any(WIFI_CONNECTED_BIT, None) => {}
    }
    info!("Link up, starting MQTT session");

    let mut ticker = tokio::time::interval(config::loop_cadence());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("MQTT task shutting down");
                break;
            }
            _ = ticker.tick() => {
                mqtt.step(Instant::now().into_std(), bits.as_ref(), &mut serial, &mut commands);
                if mqtt.is_connected() {
                    bits.set(MQTT_READY_BIT);
                } else {
                    bits.clear(MQTT_READY_BIT);
                }
            }
        }
    }
    bits.clear(MQTT_READY_BIT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioning::{ProvisioningStore, WifiCredentials};
    use crate::runtime::events::WIFI_FAIL_BIT;
    use crate::testing::{FakeMqttClient, FakeStationLink};
    use crate::wifi::WifiTaskConfig;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    fn wifi_task_config() -> WifiTaskConfig {
        WifiTaskConfig {
            credentials: WifiCredentials::new("Fixed", "password123"),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wifi_task_sets_connected_bit() {
        let link = FakeStationLink::new();
        link.connect_on_begin(true);
        let bits = Arc::new(SystemBits::new());
        let cancel = CancellationToken::new();

        let wifi = BoundedRetryWifi::new(link.clone(), wifi_task_config(), bits.clone());
        let handle = tokio::spawn(run_wifi_task(wifi, cancel.clone()));

        let result = bits
            .wait_any(WIFI_CONNECTED_BIT, Some(Duration::from_secs(1)))
            .await;
        assert!(result & WIFI_CONNECTED_BIT != 0);
        assert!(link.station_configured());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wifi_task_reports_failure() {
        let link = FakeStationLink::new();
        let bits = Arc::new(SystemBits::new());
        let cancel = CancellationToken::new();

        let wifi = BoundedRetryWifi::new(link.clone(), wifi_task_config(), bits.clone());
        let handle = tokio::spawn(run_wifi_task(wifi, cancel.clone()));

        let result = bits.wait_any(WIFI_FAIL_BIT, Some(Duration::from_secs(60))).await;
        assert!(result & WIFI_FAIL_BIT != 0);
        assert_eq!(link.begin_count(), 5);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_mqtt_task_waits_for_link() {
        let store = Arc::new(ProvisioningStore::with_defaults());
        let client = FakeMqttClient::new();
        let bits = Arc::new(SystemBits::new());
        let cancel = CancellationToken::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let mqtt = MqttSessionManager::new(client.clone(), store);
        let sink = {
            let received = received.clone();
            move |c: &str| received.lock().unwrap().push(c.to_string())
        };
        let handle = tokio::spawn(run_mqtt_task(
            mqtt,
            bits.clone(),
            VecDeque::new(),
            sink,
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(client.connect_count(), 0);
        assert!(!bits.contains(MQTT_READY_BIT));

        client.push_inbound(crate::config::defaults::MQTT_CMD_TOPIC, b"left:45");
        bits.set(WIFI_CONNECTED_BIT);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.connect_count(), 1);
        assert!(bits.contains(MQTT_READY_BIT));
        assert_eq!(*received.lock().unwrap(), vec!["left:45".to_string()]);

        bits.clear(WIFI_CONNECTED_BIT);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!bits.contains(MQTT_READY_BIT));
        assert_eq!(client.disconnect_count(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_mqtt_task_cancel_before_link() {
        let store = Arc::new(ProvisioningStore::with_defaults());
        let client = FakeMqttClient::new();
        let bits = Arc::new(SystemBits::new());
        let cancel = CancellationToken::new();

        let mqtt = MqttSessionManager::new(client.clone(), store);
        let handle = tokio::spawn(run_mqtt_task(
            mqtt,
            bits,
            VecDeque::new(),
            |_: &str| {},
            cancel.clone(),
        ));

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(client.connect_count(), 0);
    }
}
