// state.rs

use embedded_hal::digital::OutputPin;
use log::*;
use tokio::sync::Mutex;

use crate::*;

/// Everything the cycle and the session pump share. Built once at startup and
/// handed to both by reference.
pub struct MyState<B, S, P> {
    pub config: MyConfig,
    pub broker: Mutex<B>,
    pub sensor: Mutex<S>,
    pub led: Mutex<P>,
    pub cycles: AtomicU32,
    pub pumps: AtomicU32,
}

impl<B, S, P> MyState<B, S, P>
where
    B: Broker,
    S: TempSensor,
    P: OutputPin,
{
    pub fn new(config: MyConfig, broker: B, sensor: S, led: P) -> Self {
        MyState {
            config,
            broker: Mutex::new(broker),
            sensor: Mutex::new(sensor),
            led: Mutex::new(led),
            cycles: AtomicU32::new(0),
            pumps: AtomicU32::new(0),
        }
    }

    /// Runs the cycle timer and the session pump side by side. Neither ends
    /// on its own.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("Entering main loop...");
        tokio::select! {
            r = Box::pin(poll_cycle(self)) => { error!("poll_cycle() ended."); r }
            r = Box::pin(run_session_pump(self)) => { error!("run_session_pump() ended."); r }
        }
    }
}

// EOF
