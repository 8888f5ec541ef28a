// build.rs

use std::env;

fn main() -> anyhow::Result<()> {
    // Necessary because of this issue: https://github.com/rust-lang/cargo/issues/9641
    // see also https://github.com/rust-lang/cargo/issues/9554
    // Only the device build links against ESP-IDF; host builds run the unit tests.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::build::CfgArgs::output_propagated("ESP_IDF")?;
        embuild::build::LinkArgs::output_propagated("ESP_IDF")?;
    }

    // optional, read back with option_env!()
    let _ = build_data::set_BUILD_TIMESTAMP();
    let _ = build_data::no_debug_rebuilds();

    let wifi_ssid = env::var("WIFI_SSID").unwrap_or_else(|_| "internet".into());
    let wifi_pass = env::var("WIFI_PASS").unwrap_or_else(|_| "password".into());
    let mqtt_url = env::var("MQTT_URL").unwrap_or_else(|_| "mqtt://192.168.0.113:1883".into());
    let assoc_timeout = env::var("ASSOC_TIMEOUT").unwrap_or_else(|_| "60".into());

    println!("cargo:rustc-env=WIFI_SSID={wifi_ssid}");
    println!("cargo:rustc-env=WIFI_PASS={wifi_pass}");
    println!("cargo:rustc-env=MQTT_URL={mqtt_url}");
    println!("cargo:rustc-env=ASSOC_TIMEOUT={assoc_timeout}");
    for var in ["WIFI_SSID", "WIFI_PASS", "MQTT_URL", "ASSOC_TIMEOUT"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    Ok(())
}

// EOF
