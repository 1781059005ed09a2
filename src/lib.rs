//! An Eddystone beacon core.
//!
//! The crate encodes the Eddystone frame family (UID, URL, TLM and custom frames), cycles
//! them on air with an [`AdvertisingScheduler`](scheduler::AdvertisingScheduler), and wraps
//! both behind a [`BeaconService`](service::BeaconService) that an application configures,
//! starts and stops. The radio is reached through the [`Transport`](transport::Transport)
//! trait, with an implementation for HCI controllers.
#![no_std]
#![allow(async_fn_in_trait)]

use frame::EncodingError;
use params::ConfigError;
use power::IndexOutOfRange;

mod fmt;

mod cursor;

pub mod ad_structure;
pub mod codec;
pub mod config;
pub mod frame;
pub mod params;
pub mod power;
pub mod runner;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod transport;
pub mod url;

pub mod prelude {
    pub use crate::ad_structure::{AdStructure, ADV_DATA_MAX, BR_EDR_NOT_SUPPORTED, LE_GENERAL_DISCOVERABLE};
    pub use crate::frame::{EncodingError, Frame, FrameType, InstanceId, NamespaceId, TelemetrySnapshot};
    pub use crate::params::{BeaconConfig, BeaconIdentity, ConfigError, FrameSlot};
    pub use crate::power::{PowerLevelTable, PowerLevels, DEFAULT_ADV_POWER_LEVELS, RADIO_POWER_LEVELS};
    pub use crate::runner::{Command, CommandChannel};
    pub use crate::scheduler::{AdvertisingScheduler, SchedulerState};
    pub use crate::service::{Actuator, BeaconService};
    pub use crate::storage::{BufferStore, ConfigStore};
    pub use crate::transport::{HciTransport, Transport};
    pub use crate::Error;
}

#[derive(Debug)]
pub enum Error<E> {
    /// The config was rejected, the previous one is still in effect.
    InvalidConfig(ConfigError),
    /// No enabled slot could be encoded.
    Encoding(EncodingError),
    IndexOutOfRange(u8),
    /// There is no enabled frame slot to advertise.
    NoFramesConfigured,
    /// The radio transport failed, the scheduler has stopped.
    Transport(E),
}

impl<E> From<ConfigError> for Error<E> {
    fn from(error: ConfigError) -> Self {
        Self::InvalidConfig(error)
    }
}

impl<E> From<EncodingError> for Error<E> {
    fn from(error: EncodingError) -> Self {
        Self::Encoding(error)
    }
}

impl<E> From<IndexOutOfRange> for Error<E> {
    fn from(error: IndexOutOfRange) -> Self {
        Self::IndexOutOfRange(error.0)
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for Error<E>
where
    E: defmt::Format,
{
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::InvalidConfig(value) => {
                defmt::write!(fmt, "InvalidConfig({})", value)
            }
            Error::Encoding(value) => {
                defmt::write!(fmt, "Encoding({})", value)
            }
            Error::IndexOutOfRange(value) => {
                defmt::write!(fmt, "IndexOutOfRange({})", value)
            }
            Error::NoFramesConfigured => {
                defmt::write!(fmt, "NoFramesConfigured")
            }
            Error::Transport(value) => {
                defmt::write!(fmt, "Transport({})", value)
            }
        }
    }
}
