//! Beacon parameters.
//!
//! A [`BeaconConfig`] is the complete set of values a beacon advertises with. It is
//! replaced as a whole, never field by field, once handed to the scheduler.
use heapless::{String, Vec};

use crate::codec;
use crate::config::MAX_FRAME_SLOTS;
use crate::cursor::{ReadCursor, WriteCursor};
use crate::frame::{FrameType, InstanceId, NamespaceId, GENERIC_DATA_MAX};
use crate::power::{PowerLevelTable, NUM_POWER_MODES};

/// Longest URL, before compression, a beacon identity can hold.
pub const URL_MAX_LEN: usize = 64;

pub const DEFAULT_NAMESPACE: NamespaceId = [0x3b, 0xe4, 0x01, 0xaa, 0x7c, 0x68, 0x9e, 0x99, 0x90, 0x85];
pub const DEFAULT_INSTANCE: InstanceId = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

pub const DEFAULT_POWER_INDEX: u8 = 2;
pub const DEFAULT_INTERVAL_MS: u32 = 1000;
pub const DEFAULT_INTERVAL_FLOOR_MS: u32 = 100;

/// Shortest advertising interval a legacy advertiser may use.
pub const ADV_INTERVAL_MIN_MS: u32 = 20;
/// Longest advertising interval a legacy advertiser may use.
pub const ADV_INTERVAL_MAX_MS: u32 = 10_240;

pub(crate) const MAGIC: [u8; 4] = *b"EDDY";
const FORMAT_VERSION: u8 = 1;

const KIND_UID: u8 = 0;
const KIND_URL: u8 = 1;
const KIND_TLM: u8 = 2;
const KIND_GENERIC: u8 = 3;

/// Upper bound of [`BeaconConfig::encode`] output.
pub const ENCODED_MAX_LEN: usize = MAGIC.len()
    + 1
    + 10
    + 6
    + 1
    + URL_MAX_LEN
    + 2 * NUM_POWER_MODES
    + 1
    + 4
    + 1
    + MAX_FRAME_SLOTS * (1 + 4 + 1 + 1 + 1 + GENERIC_DATA_MAX);

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconIdentity {
    pub namespace: NamespaceId,
    pub instance: InstanceId,
    /// Uncompressed URL advertised by URL frames.
    pub url: String<URL_MAX_LEN>,
}

impl Default for BeaconIdentity {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE,
            instance: DEFAULT_INSTANCE,
            url: String::new(),
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSlot {
    pub frame: FrameType,
    /// Advertising interval while this slot is on air.
    pub interval_ms: u32,
    pub enabled: bool,
}

impl FrameSlot {
    pub fn new(frame: FrameType, interval_ms: u32) -> Self {
        Self {
            frame,
            interval_ms,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No frame slots are configured.
    NoFrameSlots,
    /// The slot at this index has a zero advertising interval.
    ZeroInterval(u8),
    /// The slot at this index advertises more often than the interval floor allows.
    IntervalBelowFloor(u8),
    /// The slot at this index uses an interval legacy advertising cannot express.
    IntervalOutOfRange(u8),
    /// The selected power mode is not in the power level table.
    PowerIndexOutOfRange(u8),
    /// A slot could not be added, the slot sequence is full.
    TooManySlots,
    /// The URL does not fit in the beacon identity.
    UrlTooLong,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconConfig {
    pub identity: BeaconIdentity,
    pub power: PowerLevelTable,
    /// Power mode used for every frame.
    pub power_index: u8,
    /// Round-robin emission order.
    pub slots: Vec<FrameSlot, MAX_FRAME_SLOTS>,
    /// No slot may use a shorter advertising interval than this.
    pub interval_floor_ms: u32,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        let mut slots = Vec::new();
        // MAX_FRAME_SLOTS is at least one.
        let _ = slots.push(FrameSlot::new(FrameType::Uid, DEFAULT_INTERVAL_MS));
        Self {
            identity: BeaconIdentity::default(),
            power: PowerLevelTable::DEFAULT,
            power_index: DEFAULT_POWER_INDEX,
            slots,
            interval_floor_ms: DEFAULT_INTERVAL_FLOOR_MS,
        }
    }
}

impl BeaconConfig {
    /// An otherwise default config without any slots.
    pub fn empty() -> Self {
        let mut config = Self::default();
        config.slots.clear();
        config
    }

    /// Appends a slot at the end of the round-robin sequence.
    pub fn with_slot(mut self, slot: FrameSlot) -> Result<Self, ConfigError> {
        self.slots.push(slot).map_err(|_| ConfigError::TooManySlots)?;
        Ok(self)
    }

    pub fn set_url(&mut self, url: &str) -> Result<(), ConfigError> {
        let mut value = String::new();
        value.push_str(url).map_err(|_| ConfigError::UrlTooLong)?;
        self.identity.url = value;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::NoFrameSlots);
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.interval_ms == 0 {
                return Err(ConfigError::ZeroInterval(i as u8));
            }
            if slot.interval_ms < self.interval_floor_ms {
                return Err(ConfigError::IntervalBelowFloor(i as u8));
            }
            if !(ADV_INTERVAL_MIN_MS..=ADV_INTERVAL_MAX_MS).contains(&slot.interval_ms) {
                return Err(ConfigError::IntervalOutOfRange(i as u8));
            }
        }
        self.power
            .advertised_power_for(self.power_index)
            .and_then(|_| self.power.radio_power_for(self.power_index))
            .map_err(|e| ConfigError::PowerIndexOutOfRange(e.0))?;
        Ok(())
    }

    pub fn has_enabled_slot(&self) -> bool {
        self.slots.iter().any(|s| s.enabled)
    }

    /// Serializes the config for persistent storage.
    pub fn encode(&self, dest: &mut [u8]) -> Result<usize, codec::Error> {
        let mut w = WriteCursor::new(dest);
        w.append(&MAGIC)?;
        w.write(FORMAT_VERSION)?;
        w.append(&self.identity.namespace)?;
        w.append(&self.identity.instance)?;
        w.write(self.identity.url.len() as u8)?;
        w.append(self.identity.url.as_bytes())?;
        for level in self.power.advertised().iter().chain(self.power.radio().iter()) {
            w.write(*level)?;
        }
        w.write(self.power_index)?;
        w.write(self.interval_floor_ms)?;
        w.write(self.slots.len() as u8)?;
        for slot in self.slots.iter() {
            let kind = match slot.frame {
                FrameType::Uid => KIND_UID,
                FrameType::Url => KIND_URL,
                FrameType::Tlm => KIND_TLM,
                FrameType::Generic { .. } => KIND_GENERIC,
            };
            w.write(kind)?;
            w.write(slot.interval_ms)?;
            w.write(slot.enabled)?;
            if let FrameType::Generic { frame_type, data } = &slot.frame {
                w.write(*frame_type)?;
                w.write(data.len() as u8)?;
                w.append(data)?;
            }
        }
        Ok(w.len())
    }

    /// Parses a config written by [`BeaconConfig::encode`].
    ///
    /// The result is not validated.
    pub fn decode(src: &[u8]) -> Result<Self, codec::Error> {
        let mut r = ReadCursor::new(src);
        if r.array::<4>()? != MAGIC {
            return Err(codec::Error::InvalidValue);
        }
        let version: u8 = r.read()?;
        if version != FORMAT_VERSION {
            return Err(codec::Error::InvalidValue);
        }

        let namespace = r.array()?;
        let instance = r.array()?;
        let url_len: u8 = r.read()?;
        let url = core::str::from_utf8(r.slice(url_len as usize)?).map_err(|_| codec::Error::InvalidValue)?;
        let mut identity = BeaconIdentity {
            namespace,
            instance,
            url: String::new(),
        };
        identity.url.push_str(url).map_err(|_| codec::Error::InvalidValue)?;

        let mut advertised = [0; NUM_POWER_MODES];
        for level in advertised.iter_mut() {
            *level = r.read()?;
        }
        let mut radio = [0; NUM_POWER_MODES];
        for level in radio.iter_mut() {
            *level = r.read()?;
        }
        let power_index = r.read()?;
        let interval_floor_ms = r.read()?;

        let count: u8 = r.read()?;
        let mut slots = Vec::new();
        for _ in 0..count {
            let kind: u8 = r.read()?;
            let interval_ms = r.read()?;
            let enabled = r.read()?;
            let frame = match kind {
                KIND_UID => FrameType::Uid,
                KIND_URL => FrameType::Url,
                KIND_TLM => FrameType::Tlm,
                KIND_GENERIC => {
                    let frame_type = r.read()?;
                    let len: u8 = r.read()?;
                    let data = Vec::from_slice(r.slice(len as usize)?).map_err(|_| codec::Error::InvalidValue)?;
                    FrameType::Generic { frame_type, data }
                }
                _ => return Err(codec::Error::InvalidValue),
            };
            slots
                .push(FrameSlot {
                    frame,
                    interval_ms,
                    enabled,
                })
                .map_err(|_| codec::Error::InvalidValue)?;
        }

        Ok(Self {
            identity,
            power: PowerLevelTable::new(advertised, radio),
            power_index,
            slots,
            interval_floor_ms,
        })
    }
}
