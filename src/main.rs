//! Comm-robot firmware binary.
//!
//! - **ESP32**: `cargo espflash flash --bin commrobot --features esp32 --release`
//!   (add `task-runtime` to run WiFi and MQTT as separate tasks)
//! - **Host**: `cargo run --bin commrobot -- [KEY=VALUE ...]` edits the
//!   provisioning file used by host builds and prints the resulting values.

#[cfg(feature = "esp32")]
fn main() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("=== comm-robot starting ===");

    if let Err(e) = firmware::run() {
        log::error!("Fatal: {}", e);
    }

    // Keep the serial console alive for inspection after a fatal error.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(10));
    }
}

#[cfg(feature = "esp32")]
mod firmware {
    use commrobot_esp32::provisioning::espnow::EspNowListener;
    use commrobot_esp32::provisioning::{storage, ProvisioningStore};
    use commrobot_esp32::wifi::{EspStationLink, StationLink};
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
    use esp_idf_hal::units::Hertz;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use log::{info, warn};
    use std::sync::Arc;

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs_partition = EspDefaultNvsPartition::take()?;

        let store = Arc::new(ProvisioningStore::with_defaults());
        match storage::init_nvs(nvs_partition.clone()) {
            Ok(nvs) => {
                storage::load_overrides(&nvs, &store);
            }
            Err(e) => warn!("NVS unavailable, using compiled-in defaults: {:?}", e),
        }

        let mut link =
            EspStationLink::new(peripherals.modem, sysloop, Some(nvs_partition.clone()))?;
        // ESP-NOW needs the radio up in station mode; the managers' later
        // setup call is then a no-op.
        link.configure_station()?;
        let listener_nvs = storage::init_nvs(nvs_partition).ok();
        let _listener = match EspNowListener::start(store.clone(), listener_nvs) {
            Ok(listener) => Some(listener),
            Err(e) => {
                warn!("ESP-NOW provisioning disabled: {:?}", e);
                None
            }
        };

        let uart = UartDriver::new(
            peripherals.uart0,
            peripherals.pins.gpio1,
            peripherals.pins.gpio3,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &UartConfig::default().baudrate(Hertz(115_200)),
        )?;
        let commands = |command: &str| println!("{}", command);

        info!("Provisioned WiFi SSID: '{}'", store.wifi().ssid);
        drive(store, link, uart, commands)
    }

    #[cfg(not(feature = "task-runtime"))]
    fn drive(
        store: Arc<ProvisioningStore>,
        link: EspStationLink<'static>,
        mut uart: UartDriver<'static>,
        mut commands: impl FnMut(&str),
    ) -> Result<(), Box<dyn std::error::Error>> {
        use commrobot_esp32::mqtt::EspMqttTransport;
        use commrobot_esp32::Controller;
        use std::time::Instant;
        use tokio_util::sync::CancellationToken;

        let mut controller = Controller::new(store, link, EspMqttTransport::new());
        controller.init(Instant::now());
        controller.run(&mut uart, &mut commands, &CancellationToken::new());
        Ok(())
    }

    #[cfg(feature = "task-runtime")]
    fn drive(
        store: Arc<ProvisioningStore>,
        link: EspStationLink<'static>,
        uart: UartDriver<'static>,
        commands: impl FnMut(&str) + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error>> {
        use commrobot_esp32::mqtt::{EspMqttTransport, MqttSessionManager};
        use commrobot_esp32::runtime::events::SystemBits;
        use commrobot_esp32::runtime::{run_mqtt_task, run_wifi_task};
        use commrobot_esp32::wifi::{BoundedRetryWifi, WifiTaskConfig};
        use log::error;
        use tokio_util::sync::CancellationToken;

        let bits = Arc::new(SystemBits::new());
        let cancel = CancellationToken::new();
        let wifi = BoundedRetryWifi::new(link, WifiTaskConfig::default(), bits.clone());
        let mqtt = MqttSessionManager::new(EspMqttTransport::new(), store);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        rt.block_on(async move {
            let wifi_task = tokio::spawn(run_wifi_task(wifi, cancel.clone()));
            let mqtt_task = tokio::spawn(run_mqtt_task(mqtt, bits, uart, commands, cancel));
            let (wifi_result, mqtt_result) = tokio::join!(wifi_task, mqtt_task);
            if let Err(e) = wifi_result {
                error!("WiFi task error: {}", e);
            }
            if let Err(e) = mqtt_result {
                error!("MQTT task error: {}", e);
            }
        });
        Ok(())
    }
}

/// Print message and exit with failure.
#[cfg(not(feature = "esp32"))]
fn halt_with_error(msg: &str) -> ! {
    eprintln!("\n{}", msg);
    std::process::exit(1);
}

#[cfg(not(feature = "esp32"))]
fn main() {
    use commrobot_esp32::provisioning::{persist_host, update, ProvisioningKey, ProvisioningStore};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = match persist_host::default_provisioning_path() {
        Ok(path) => path,
        Err(e) => halt_with_error(&format!("Error: cannot locate provisioning file: {}", e)),
    };

    let store = ProvisioningStore::with_defaults();
    if let Err(e) = persist_host::load_overrides_from(&store, &path) {
        halt_with_error(&format!("Error reading {}: {}", path.display(), e));
    }

    let mut changed = false;
    for arg in std::env::args().skip(1) {
        match update::parse_line(&arg) {
            Some((key, value)) if store.apply_key_value(key, value) => changed = true,
            _ => halt_with_error(&format!(
                "Error: expected KEY=VALUE with a known key, got '{}'\n\nKeys: {}",
                arg,
                ProvisioningKey::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    if changed {
        if let Err(e) = persist_host::save_to(&store, &path) {
            halt_with_error(&format!("Error saving {}: {}", path.display(), e));
        }
        println!("Saved to {}", path.display());
    }

    println!("\n=== Provisioning ===\n");
    for key in ProvisioningKey::ALL {
        let value = store.get(key);
        let shown = if key.is_secret() && !value.is_empty() {
            "****".to_string()
        } else {
            value
        };
        println!("{:<22} {}", key.as_str(), shown);
    }
}
