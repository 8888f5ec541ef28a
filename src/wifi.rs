// wifi.rs

use std::time::Duration;

use log::*;
use tokio::time::{sleep, Instant};

pub trait WifiLink {
    /// Configure credentials, start the driver and kick off the connect.
    fn begin(&mut self) -> anyhow::Result<()>;
    fn is_associated(&mut self) -> anyhow::Result<bool>;
}

#[derive(Debug, thiserror::Error)]
pub enum AssociationError {
    #[error("WiFi association timed out after {0:?}")]
    Timeout(Duration),
    #[error("WiFi driver error: {0:#}")]
    Driver(#[from] anyhow::Error),
}

/// Join the network, polling every `poll` until up or `timeout` has passed.
/// Returns the number of polls it took.
pub async fn associate<W: WifiLink>(
    link: &mut W,
    poll: Duration,
    timeout: Duration,
) -> Result<u32, AssociationError> {
    info!("WiFi connecting...");
    link.begin()?;

    let deadline = Instant::now() + timeout;
    let mut polls = 0;
    loop {
        polls += 1;
        match link.is_associated() {
            Ok(true) => {
                info!("WiFi connected.");
                return Ok(polls);
            }
            Ok(false) => debug!("WiFi waiting for association..."),
            Err(e) => warn!("WiFi status error: {e:#}"),
        }

        if Instant::now() + poll > deadline {
            error!("WiFi gave up after {polls} polls");
            return Err(AssociationError::Timeout(timeout));
        }
        sleep(poll).await;
    }
}

#[cfg(target_os = "espidf")]
pub use esp::*;

#[cfg(target_os = "espidf")]
mod esp {
    use std::net::Ipv4Addr;

    use anyhow::anyhow;
    use embedded_svc::wifi::{ClientConfiguration, Configuration};
    use esp_idf_svc::wifi::EspWifi;
    use log::*;

    use super::WifiLink;
    use crate::MyConfig;

    pub struct EspWifiLink<'a> {
        wifi: EspWifi<'a>,
        ssid: String,
        pass: String,
    }

    impl<'a> EspWifiLink<'a> {
        pub fn new(wifi: EspWifi<'a>, config: &MyConfig) -> Self {
            EspWifiLink {
                wifi,
                ssid: config.wifi_ssid.clone(),
                pass: config.wifi_pass.clone(),
            }
        }

        pub fn ip_addr(&self) -> anyhow::Result<Ipv4Addr> {
            Ok(self.wifi.sta_netif().get_ip_info()?.ip)
        }
    }

    impl WifiLink for EspWifiLink<'_> {
        fn begin(&mut self) -> anyhow::Result<()> {
            info!("WiFi setting credentials...");
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration {
                    ssid: self
                        .ssid
                        .as_str()
                        .try_into()
                        .map_err(|_| anyhow!("SSID too long"))?,
                    password: self
                        .pass
                        .as_str()
                        .try_into()
                        .map_err(|_| anyhow!("password too long"))?,
                    ..Default::default()
                }))?;

            info!("WiFi driver starting...");
            self.wifi.start()?;
            self.wifi.connect()?;
            Ok(())
        }

        fn is_associated(&mut self) -> anyhow::Result<bool> {
            Ok(self.wifi.is_up()?)
        }
    }
}


// EOF
