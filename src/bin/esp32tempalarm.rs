// bin/esp32tempalarm.rs

#![warn(clippy::large_futures)]

#[cfg(target_os = "espidf")]
use esp32tempalarm::*;
#[cfg(target_os = "espidf")]
use esp_idf_hal::{
    delay::FreeRtos,
    gpio::{IOPin, OutputPin, PinDriver, Pull},
    prelude::Peripherals,
};
#[cfg(target_os = "espidf")]
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs, wifi::EspWifi};
#[cfg(target_os = "espidf")]
use esp_idf_sys::esp_app_desc;
#[cfg(target_os = "espidf")]
use log::*;

#[cfg(target_os = "espidf")]
esp_app_desc!();

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Temperature Reading - Project");
    info!("Firmware v{FW_VERSION} built {BUILD_TIMESTAMP}");
    info!("Starting up.");

    let config = MyConfig::default();
    info!("My config:\n{config:#?}");

    let sysloop = EspSystemEventLoop::take()?;
    let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    #[cfg(feature = "esp32c3")]
    let (led_pin, onew_pin) = (pins.gpio8.downgrade_output(), pins.gpio4.downgrade());

    #[cfg(feature = "esp32s")]
    let (led_pin, onew_pin) = (pins.gpio2.downgrade_output(), pins.gpio4.downgrade());

    let mut led = PinDriver::output(led_pin)?;
    led.set_low()?;

    let mut onew_drv = PinDriver::input_output_od(onew_pin)?;
    onew_drv.set_pull(Pull::Up)?;
    let sensor = OneWireSensor::new(onew_drv)?;

    let wifi = EspWifi::new(peripherals.modem, sysloop, Some(nvs_default_partition))?;
    let mut link = EspWifiLink::new(wifi, &config);

    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?
        .block_on(Box::pin(async move {
            if let Err(e) = associate(&mut link, ASSOC_POLL, config.assoc_timeout()).await {
                error!("{e}");
                error!("Resetting...");
                FreeRtos::delay_ms(5000);
                esp_idf_hal::reset::restart();
            }
            match link.ip_addr() {
                Ok(ip) => info!("Connected, IP address: {ip}"),
                Err(e) => error!("Cannot read IP address: {e:#}"),
            }

            let mut broker = EspBroker::new(&config.mqtt_url);
            match ensure_session(&mut broker, MQTT_CLIENT_ID) {
                SessionCheck::Failed => error!("Not connected!"),
                _ => info!("Connected to MQTT server!"),
            }

            let state = MyState::new(config, broker, sensor, led);
            if let Err(e) = state.run().await {
                error!("Main loop failed: {e:#}");
            }
        }));

    // not actually returning from main() but we reboot instead
    info!("main() finished, reboot.");
    FreeRtos::delay_ms(3000);
    esp_idf_hal::reset::restart();
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!(
        "esp32tempalarm v{} runs on ESP-IDF targets only, use `cargo test` on the host.",
        esp32tempalarm::FW_VERSION
    );
    std::process::exit(1);
}

// EOF
