// measure.rs

use log::*;

use crate::*;

/// What the DS18B20 driver family reports for a sensor that did not answer.
pub const DEVICE_DISCONNECTED_C: f32 = -127.0;

pub trait TempSensor {
    /// Start a conversion on every sensor on the bus and wait for it.
    fn request_temperatures(&mut self) -> anyhow::Result<()>;
    fn temp_c_by_index(&mut self, index: usize) -> anyhow::Result<f32>;
}

/// One reading and its published rendering, built together so they can't drift apart.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub celsius: f32,
    pub formatted: Formatted,
    pub sensor_ok: bool,
}

impl Sample {
    pub fn new(celsius: f32, sensor_ok: bool) -> Self {
        Sample {
            celsius,
            formatted: format_reading(celsius),
            sensor_ok: sensor_ok && celsius != DEVICE_DISCONNECTED_C,
        }
    }
}

/// Read the first sensor. The value is forwarded even when it looks bogus,
/// only `sensor_ok` tells the difference.
pub fn sample<S: TempSensor>(sensor: &mut S) -> Sample {
    info!("Requesting temperatures...");
    if let Err(e) = sensor.request_temperatures() {
        error!("Temperature conversion failed: {e:#}");
    }

    match sensor.temp_c_by_index(0) {
        Ok(celsius) => {
            if celsius == DEVICE_DISCONNECTED_C {
                warn!("Sensor returned the disconnected marker");
            }
            info!("Temperature is: {celsius}");
            Sample::new(celsius, true)
        }
        Err(e) => {
            error!("Sensor read failed: {e:#}");
            Sample::new(DEVICE_DISCONNECTED_C, false)
        }
    }
}

#[cfg(target_os = "espidf")]
pub use onewire::*;

#[cfg(target_os = "espidf")]
mod onewire {
    use embedded_hal::digital::{InputPin, OutputPin};
    use esp_idf_hal::delay::{Ets, FreeRtos};
    use log::*;
    use one_wire_bus::{Address, OneWire, OneWireError, SearchState};

    use super::TempSensor;

    /// DS18B20 sensors on a single one-wire pin.
    pub struct OneWireSensor<P> {
        bus: OneWire<P>,
        ids: Vec<Address>,
    }

    impl<P, E> OneWireSensor<P>
    where
        P: OutputPin<Error = E> + InputPin<Error = E>,
        E: std::fmt::Debug,
    {
        pub fn new(pin: P) -> anyhow::Result<Self> {
            let bus = match OneWire::new(pin) {
                Ok(b) => b,
                Err(e) => anyhow::bail!("Cannot open one-wire bus: {e:?}"),
            };
            let mut sensor = OneWireSensor {
                bus,
                ids: Vec::new(),
            };
            if let Err(e) = sensor.scan() {
                error!("One-wire scan failed: {e:?}");
            }
            Ok(sensor)
        }

        pub fn scan(&mut self) -> Result<usize, MeasurementError<E>> {
            info!("Scanning 1-wire devices...");
            let mut ids = Vec::new();
            let mut st: SearchState;
            let mut state = None;

            while let Some((device_address, s)) =
                self.bus.device_search(state, false, &mut Ets)?
            {
                ids.push(device_address);
                st = s;
                state = Some(&st);
            }

            info!("Onewire response:\n{ids:#?}");
            self.ids = ids;
            if self.ids.is_empty() {
                Err(MeasurementError::NoDeviceFound)
            } else {
                Ok(self.ids.len())
            }
        }

        fn read(&mut self, index: usize) -> Result<f32, MeasurementError<E>> {
            if self.ids.is_empty() {
                // sensor may have been plugged in after boot
                self.scan()?;
            }
            let address = *self.ids.get(index).ok_or(MeasurementError::NoDeviceFound)?;
            let sensor = ds18b20::Ds18b20::new::<E>(address)?;
            let sensor_data = sensor.read_data(&mut self.bus, &mut Ets)?;
            Ok(sensor_data.temperature)
        }
    }

    impl<P, E> TempSensor for OneWireSensor<P>
    where
        P: OutputPin<Error = E> + InputPin<Error = E>,
        E: std::fmt::Debug,
    {
        fn request_temperatures(&mut self) -> anyhow::Result<()> {
            if let Err(e) = ds18b20::start_simultaneous_temp_measurement(&mut self.bus, &mut Ets) {
                anyhow::bail!("{:?}", MeasurementError::from(e));
            }
            ds18b20::Resolution::Bits12.delay_for_measurement_time(&mut FreeRtos);
            Ok(())
        }

        fn temp_c_by_index(&mut self, index: usize) -> anyhow::Result<f32> {
            match self.read(index) {
                Ok(t) => Ok(t),
                Err(e) => {
                    // force a rescan next time, the bus may have changed
                    self.ids.clear();
                    anyhow::bail!("{e:?}")
                }
            }
        }
    }

    // When performing a measurement it can happen that no device was found on the one-wire-bus
    // in addition to the bus errors. Therefore we extend the error cases for proper error handling.
    #[derive(Debug)]
    pub enum MeasurementError<E> {
        OneWireError(OneWireError<E>),
        NoDeviceFound,
    }

    impl<E> From<OneWireError<E>> for MeasurementError<E> {
        fn from(value: OneWireError<E>) -> Self {
            MeasurementError::OneWireError(value)
        }
    }
}


// EOF
