// alarm.rs

use std::fmt::Write;

use embedded_hal::digital::OutputPin;
use log::*;

use crate::*;

/// Fits any `f32` rendered with two decimals.
pub const READING_BUF: usize = 48;

pub type Formatted = heapless::String<READING_BUF>;

/// Right-aligned, width 6, two decimals: `23.456` becomes `" 23.46"`.
pub fn format_reading(celsius: f32) -> Formatted {
    let mut s = Formatted::new();
    // cannot overflow, see READING_BUF
    let _ = write!(s, "{celsius:6.2}");
    s
}

pub fn is_alarm(celsius: f32) -> bool {
    celsius > ALARM_THRESHOLD
}

pub fn status_token(alarm: bool) -> &'static str {
    if alarm {
        STATUS_ALARM
    } else {
        STATUS_OK
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actuation {
    pub alarm: bool,
    /// publishes the broker accepted, out of two
    pub delivered: u8,
}

/// Publish the reading and the status token, then drive the LED.
/// Nothing here fails the cycle, errors are only logged.
pub fn actuate<B, P>(broker: &mut B, led: &mut P, sample: &Sample) -> Actuation
where
    B: Broker,
    P: OutputPin,
{
    let mut delivered = 0;
    if publish_logged(broker, TOPIC_READING, sample.formatted.as_str()) {
        delivered += 1;
    }

    let alarm = is_alarm(sample.celsius);
    if publish_logged(broker, TOPIC_STATUS, status_token(alarm)) {
        delivered += 1;
    }

    let res = if alarm { led.set_high() } else { led.set_low() };
    if let Err(e) = res {
        error!("LED write failed: {e:?}");
    }

    Actuation { alarm, delivered }
}


// EOF
