// mqtt.rs

use std::{sync::mpsc, time::Duration};

use embedded_hal::digital::OutputPin;
use log::*;
use tokio::time::sleep;

use crate::*;

pub trait Broker {
    fn connected(&self) -> bool;
    fn connect(&mut self, client_id: &str) -> anyhow::Result<()>;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> anyhow::Result<()>;
    /// Keepalive, connection events and inbound dispatch.
    fn service(&mut self) -> anyhow::Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCheck {
    Live,
    Reconnected,
    Failed,
}

/// Makes at most one connect attempt. Failure is logged and the caller
/// carries on publishing anyway.
pub fn ensure_session<B: Broker>(broker: &mut B, client_id: &str) -> SessionCheck {
    if broker.connected() {
        return SessionCheck::Live;
    }

    warn!("MQTT not connected.");
    match broker.connect(client_id) {
        Ok(()) => {
            info!("MQTT connected as {client_id}.");
            SessionCheck::Reconnected
        }
        Err(e) => {
            error!("MQTT connection failed: {e:#}");
            SessionCheck::Failed
        }
    }
}

/// Fire-and-forget publish, returns whether the broker took it.
pub fn publish_logged<B: Broker>(broker: &mut B, topic: &str, payload: &str) -> bool {
    info!("MQTT sending {topic}: {payload}");
    match broker.publish(topic, payload.as_bytes()) {
        Ok(()) => true,
        Err(e) => {
            error!("MQTT send error: {e:#}");
            false
        }
    }
}

pub async fn run_session_pump<B, S, P>(state: &MyState<B, S, P>) -> anyhow::Result<()>
where
    B: Broker,
    S: TempSensor,
    P: OutputPin,
{
    loop {
        {
            let mut broker = state.broker.lock().await;
            if let Err(e) = broker.service() {
                error!("MQTT service error: {e:#}");
            }
        }
        state.pumps.fetch_add(1, Ordering::Relaxed);
        sleep(PUMP_IDLE).await;
    }
}

/// How long a connect waits for the broker's CONNACK. A cycle runs the
/// wait plus a 750 ms DS18B20 conversion and must still fit in `CYCLE_PERIOD`.
pub const CONNECT_WAIT: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    Received { topic: String, data: Vec<u8> },
    Error(String),
}

/// Connection state as seen through the client's event stream. The client
/// task pushes events through `sender()`, the main loop applies them.
pub struct SessionTracker {
    connected: bool,
    tx: mpsc::Sender<SessionEvent>,
    rx: mpsc::Receiver<SessionEvent>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        SessionTracker {
            connected: false,
            tx,
            rx,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<SessionEvent> {
        self.tx.clone()
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Forget the old session, including events it left queued.
    pub fn reset(&mut self) {
        self.connected = false;
        while self.rx.try_recv().is_ok() {}
    }

    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected => {
                info!("MQTT session up.");
                self.connected = true;
            }
            SessionEvent::Disconnected => {
                warn!("MQTT session closed.");
                self.connected = false;
            }
            SessionEvent::Received { topic, data } => {
                info!("MQTT received on {topic}: {:?}", String::from_utf8_lossy(&data));
            }
            SessionEvent::Error(e) => error!("MQTT error: {e}"),
        }
    }

    /// Apply everything queued so far, returns how many events that was.
    pub fn drain(&mut self) -> usize {
        let mut n = 0;
        while let Ok(ev) = self.rx.try_recv() {
            self.handle(ev);
            n += 1;
        }
        n
    }

    /// Block until a `Connected` event arrives or `timeout` runs out.
    pub fn wait_connected(&mut self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while !self.connected {
            let left = deadline.saturating_duration_since(std::time::Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(ev) => self.handle(ev),
                Err(_) => return false,
            }
        }
        true
    }
}

#[cfg(target_os = "espidf")]
pub use esp::*;

#[cfg(target_os = "espidf")]
mod esp {
    use std::time::Duration;

    use anyhow::bail;
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use log::*;

    use super::{Broker, SessionEvent, SessionTracker, CONNECT_WAIT};

    const KEEP_ALIVE: Duration = Duration::from_secs(15);

    /// ESP-IDF MQTT client. The client runs its own task and hands events to
    /// the tracker; `service()` applies them from the main loop.
    pub struct EspBroker {
        url: String,
        client: Option<EspMqttClient<'static>>,
        session: SessionTracker,
    }

    impl EspBroker {
        pub fn new(url: &str) -> Self {
            EspBroker {
                url: url.to_string(),
                client: None,
                session: SessionTracker::new(),
            }
        }
    }

    impl Broker for EspBroker {
        fn connected(&self) -> bool {
            self.client.is_some() && self.session.connected()
        }

        fn connect(&mut self, client_id: &str) -> anyhow::Result<()> {
            // drop the old client first, it would keep reconnecting on its own
            self.client = None;
            self.session.reset();

            info!("MQTT connecting to {}...", self.url);
            let tx = self.session.sender();
            let client = EspMqttClient::new_cb(
                &self.url,
                &MqttClientConfiguration {
                    client_id: Some(client_id),
                    keep_alive_interval: Some(KEEP_ALIVE),
                    ..Default::default()
                },
                move |event| {
                    let ev = match event.payload() {
                        EventPayload::Connected(_) => SessionEvent::Connected,
                        EventPayload::Disconnected => SessionEvent::Disconnected,
                        EventPayload::Received {
                            topic,
                            data,
                            details: Details::Complete,
                            ..
                        } => SessionEvent::Received {
                            topic: topic.unwrap_or("-").to_string(),
                            data: data.to_vec(),
                        },
                        EventPayload::Error(e) => SessionEvent::Error(format!("{e:?}")),
                        _ => return,
                    };
                    tx.send(ev).ok();
                },
            )?;
            self.client = Some(client);

            if !self.session.wait_connected(CONNECT_WAIT) {
                bail!("no CONNACK within {CONNECT_WAIT:?}");
            }
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
            let Some(client) = self.client.as_mut() else {
                bail!("no MQTT session");
            };
            if !self.session.connected() {
                bail!("MQTT session is down");
            }
            client.enqueue(topic, QoS::AtMostOnce, false, payload)?;
            Ok(())
        }

        fn service(&mut self) -> anyhow::Result<()> {
            self.session.drain();
            Ok(())
        }
    }
}


// EOF
