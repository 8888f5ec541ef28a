// testing.rs
// Host-side stand-ins for the broker, sensor, LED and Wi-Fi link.

use std::convert::Infallible;

use anyhow::bail;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::*;

#[derive(Debug, Default)]
pub struct FakeBroker {
    pub is_connected: bool,
    pub accept_connect: bool,
    pub connect_attempts: u32,
    pub client_ids: Vec<String>,
    pub attempted: Vec<(String, String)>,
    pub delivered: Vec<(String, String)>,
    pub services: u32,
}

impl FakeBroker {
    pub fn online() -> Self {
        FakeBroker {
            is_connected: true,
            accept_connect: true,
            ..Default::default()
        }
    }
}

impl Broker for FakeBroker {
    fn connected(&self) -> bool {
        self.is_connected
    }

    fn connect(&mut self, client_id: &str) -> anyhow::Result<()> {
        self.connect_attempts += 1;
        self.client_ids.push(client_id.to_string());
        if !self.accept_connect {
            bail!("broker unreachable");
        }
        self.is_connected = true;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
        let msg = (topic.to_string(), String::from_utf8_lossy(payload).into_owned());
        self.attempted.push(msg.clone());
        if !self.is_connected {
            bail!("not connected");
        }
        self.delivered.push(msg);
        Ok(())
    }

    fn service(&mut self) -> anyhow::Result<()> {
        self.services += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeSensor {
    pub celsius: f32,
    pub fail_request: bool,
    pub fail_read: bool,
    pub requests: u32,
}

impl FakeSensor {
    pub fn new(celsius: f32) -> Self {
        FakeSensor {
            celsius,
            ..Default::default()
        }
    }
}

impl TempSensor for FakeSensor {
    fn request_temperatures(&mut self) -> anyhow::Result<()> {
        self.requests += 1;
        if self.fail_request {
            bail!("bus reset failed");
        }
        Ok(())
    }

    fn temp_c_by_index(&mut self, index: usize) -> anyhow::Result<f32> {
        if self.fail_read || index != 0 {
            bail!("no device at index {index}");
        }
        Ok(self.celsius)
    }
}

#[derive(Debug, Default)]
pub struct FakeLed {
    pub high: Option<bool>,
    pub writes: u32,
}

impl ErrorType for FakeLed {
    type Error = Infallible;
}

impl OutputPin for FakeLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = Some(false);
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = Some(true);
        self.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeLink {
    /// answers "not yet" this many times, `None` never comes up
    pub up_after: Option<u32>,
    pub fail_begin: bool,
    pub status_errors: u32,
    pub begins: u32,
    pub polls: u32,
}

impl FakeLink {
    pub fn up_after(n: u32) -> Self {
        FakeLink {
            up_after: Some(n),
            ..Default::default()
        }
    }

    pub fn never() -> Self {
        FakeLink::default()
    }
}

impl WifiLink for FakeLink {
    fn begin(&mut self) -> anyhow::Result<()> {
        self.begins += 1;
        if self.fail_begin {
            bail!("driver start failed");
        }
        Ok(())
    }

    fn is_associated(&mut self) -> anyhow::Result<bool> {
        self.polls += 1;
        if self.status_errors > 0 {
            self.status_errors -= 1;
            bail!("netif not ready");
        }
        Ok(self.up_after.is_some_and(|n| self.polls > n))
    }
}

// EOF
