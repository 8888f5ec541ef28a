// config.rs

use std::time::Duration;

/// Client identifier used for the initial connect and every reconnect.
pub const MQTT_CLIENT_ID: &str = "Temperature";

/// Topic receiving the formatted reading every cycle.
pub const TOPIC_READING: &str = "outTopic";
/// Topic receiving [`STATUS_ALARM`] or [`STATUS_OK`] every cycle.
pub const TOPIC_STATUS: &str = "outTopic3";

pub const STATUS_ALARM: &str = ":(";
pub const STATUS_OK: &str = ":)";

/// Readings strictly above this turn the alarm on.
pub const ALARM_THRESHOLD: f32 = 30.0;

pub const CYCLE_PERIOD: Duration = Duration::from_secs(1);
pub const ASSOC_POLL: Duration = Duration::from_secs(1);
pub const PUMP_IDLE: Duration = Duration::from_millis(10);

const DEFAULT_MQTT_URL: &str = "mqtt://192.168.0.113:1883";
const DEFAULT_ASSOC_TIMEOUT: u64 = 60;

#[derive(Clone, Debug, PartialEq)]
pub struct MyConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub mqtt_url: String,
    /// seconds
    pub assoc_timeout: u64,
}

impl Default for MyConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("internet").into(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or("password").into(),
            mqtt_url: option_env!("MQTT_URL").unwrap_or(DEFAULT_MQTT_URL).into(),
            assoc_timeout: option_env!("ASSOC_TIMEOUT")
                .unwrap_or("-")
                .parse()
                .unwrap_or(DEFAULT_ASSOC_TIMEOUT),
        }
    }
}

impl MyConfig {
    pub fn assoc_timeout(&self) -> Duration {
        Duration::from_secs(self.assoc_timeout)
    }
}


// EOF
