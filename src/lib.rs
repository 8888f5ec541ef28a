// lib.rs
#![warn(clippy::large_futures)]

pub use std::sync::atomic::{AtomicU32, Ordering};

mod config;
pub use config::*;

mod state;
pub use state::*;

mod measure;
pub use measure::*;

mod alarm;
pub use alarm::*;

mod mqtt;
pub use mqtt::*;

mod cycle;
pub use cycle::*;

mod wifi;
pub use wifi::*;

#[cfg(test)]
mod testing;

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_TIMESTAMP: &str = match option_env!("BUILD_TIMESTAMP") {
    Some(ts) => ts,
    None => "-",
};

// EOF
