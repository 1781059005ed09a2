//! Eddystone frame encoding.
//!
//! Every function in this module is a pure function of its inputs: frames are written
//! into a caller provided buffer and the written length is returned.
use heapless::Vec;

use crate::codec;
use crate::cursor::{ReadCursor, WriteCursor};
use crate::params::BeaconIdentity;
use crate::url;

/// 16-bit service UUID assigned to Eddystone.
pub const EDDYSTONE_UUID: u16 = 0xFEAA;

pub const FRAME_TYPE_UID: u8 = 0x00;
pub const FRAME_TYPE_URL: u8 = 0x10;
pub const FRAME_TYPE_TLM: u8 = 0x20;

/// Unencrypted telemetry version.
pub const TLM_VERSION: u8 = 0x00;

pub const UID_FRAME_LEN: usize = 20;
pub const TLM_FRAME_LEN: usize = 14;

/// Largest data section a generic frame may carry after its type and TX power bytes.
pub const GENERIC_DATA_MAX: usize = 18;

/// Largest encoded frame of any type.
pub const FRAME_MAX_LEN: usize = 2 + GENERIC_DATA_MAX;

pub type NamespaceId = [u8; 10];
pub type InstanceId = [u8; 6];

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The encoded URL does not fit in a URL frame.
    UrlTooLong,
    /// The URL does not start with a scheme Eddystone can encode.
    UnknownScheme,
    /// The URL contains a byte that is neither printable ASCII nor an expansion code.
    InvalidCharacter,
    /// The destination buffer is too small.
    InsufficientSpace,
    /// The frame is truncated or has an unexpected layout.
    InvalidFrame,
}

impl From<codec::Error> for EncodingError {
    fn from(error: codec::Error) -> Self {
        match error {
            codec::Error::InsufficientSpace => Self::InsufficientSpace,
            codec::Error::InvalidValue => Self::InvalidFrame,
        }
    }
}

/// The kind of frame a slot advertises.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameType {
    Uid,
    Url,
    Tlm,
    /// A frame type this crate has no encoder for. The data is emitted verbatim after the
    /// frame type and calibrated TX power bytes.
    Generic {
        frame_type: u8,
        data: Vec<u8, GENERIC_DATA_MAX>,
    },
}

impl FrameType {
    pub fn frame_type(&self) -> u8 {
        match self {
            FrameType::Uid => FRAME_TYPE_UID,
            FrameType::Url => FRAME_TYPE_URL,
            FrameType::Tlm => FRAME_TYPE_TLM,
            FrameType::Generic { frame_type, .. } => *frame_type,
        }
    }
}

/// Telemetry values carried by a TLM frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    /// Battery voltage in millivolts, 0 if not supported.
    pub battery_mv: u16,
    /// Beacon temperature in degrees Celsius, signed 8.8 fixed point.
    pub temperature: i16,
    /// Advertising frames emitted since boot.
    pub adv_count: u32,
    /// Time since boot in 0.1 second units.
    pub uptime_ds: u32,
}

/// Encodes `frame` for the given identity, writing it to `dest`.
///
/// `tx_power` is the calibrated advertised power written into UID, URL and generic frames.
/// `telemetry` is only read for TLM frames.
pub fn encode(
    frame: &FrameType,
    identity: &BeaconIdentity,
    tx_power: i8,
    telemetry: &TelemetrySnapshot,
    dest: &mut [u8],
) -> Result<usize, EncodingError> {
    match frame {
        FrameType::Uid => encode_uid(&identity.namespace, &identity.instance, tx_power, dest),
        FrameType::Url => encode_url(&identity.url, tx_power, dest),
        FrameType::Tlm => encode_tlm(telemetry, dest),
        FrameType::Generic { frame_type, data } => encode_generic(*frame_type, tx_power, data, dest),
    }
}

pub fn encode_uid(
    namespace: &NamespaceId,
    instance: &InstanceId,
    tx_power: i8,
    dest: &mut [u8],
) -> Result<usize, EncodingError> {
    let mut w = WriteCursor::new(dest);
    w.write(FRAME_TYPE_UID)?;
    w.write(tx_power)?;
    w.append(namespace)?;
    w.append(instance)?;
    // RFU
    w.append(&[0, 0])?;
    Ok(w.len())
}

pub fn encode_url(url: &str, tx_power: i8, dest: &mut [u8]) -> Result<usize, EncodingError> {
    let header = {
        let mut w = WriteCursor::new(dest);
        w.write(FRAME_TYPE_URL)?;
        w.write(tx_power)?;
        w.len()
    };
    let len = url::encode(url, &mut dest[header..])?;
    Ok(header + len)
}

pub fn encode_tlm(telemetry: &TelemetrySnapshot, dest: &mut [u8]) -> Result<usize, EncodingError> {
    let mut w = WriteCursor::new(dest);
    w.write(FRAME_TYPE_TLM)?;
    w.write(TLM_VERSION)?;
    w.write(telemetry.battery_mv)?;
    w.write(telemetry.temperature)?;
    w.write(telemetry.adv_count)?;
    w.write(telemetry.uptime_ds)?;
    Ok(w.len())
}

pub fn encode_generic(frame_type: u8, tx_power: i8, data: &[u8], dest: &mut [u8]) -> Result<usize, EncodingError> {
    if data.len() > GENERIC_DATA_MAX {
        return Err(EncodingError::InsufficientSpace);
    }
    let mut w = WriteCursor::new(dest);
    w.write(frame_type)?;
    w.write(tx_power)?;
    w.append(data)?;
    Ok(w.len())
}

/// A decoded Eddystone frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'d> {
    Uid {
        tx_power: i8,
        namespace: NamespaceId,
        instance: InstanceId,
    },
    Url {
        tx_power: i8,
        /// The encoded URL, see [`url::decode`].
        url: &'d [u8],
    },
    Tlm(TelemetrySnapshot),
    Other {
        frame_type: u8,
        /// Everything after the frame type byte.
        data: &'d [u8],
    },
}

impl<'d> Frame<'d> {
    pub fn decode(src: &'d [u8]) -> Result<Self, EncodingError> {
        let mut r = ReadCursor::new(src);
        let frame_type: u8 = r.read()?;
        match frame_type {
            FRAME_TYPE_UID => {
                let tx_power = r.read()?;
                let namespace = r.array()?;
                let instance = r.array()?;
                if r.available() != 2 {
                    return Err(EncodingError::InvalidFrame);
                }
                Ok(Frame::Uid {
                    tx_power,
                    namespace,
                    instance,
                })
            }
            FRAME_TYPE_URL => {
                let tx_power = r.read()?;
                let url = r.remaining();
                if url.is_empty() || url.len() > url::URL_DATA_MAX {
                    return Err(EncodingError::InvalidFrame);
                }
                Ok(Frame::Url { tx_power, url })
            }
            FRAME_TYPE_TLM => {
                let version: u8 = r.read()?;
                if version != TLM_VERSION || r.available() != TLM_FRAME_LEN - 2 {
                    return Err(EncodingError::InvalidFrame);
                }
                Ok(Frame::Tlm(TelemetrySnapshot {
                    battery_mv: r.read()?,
                    temperature: r.read()?,
                    adv_count: r.read()?,
                    uptime_ds: r.read()?,
                }))
            }
            frame_type => Ok(Frame::Other {
                frame_type,
                data: r.remaining(),
            }),
        }
    }
}
