use crate::codec;
use crate::cursor::{ReadCursor, WriteCursor};
use crate::frame::EDDYSTONE_UUID;

pub const LE_GENERAL_DISCOVERABLE: u8 = 0b00000010;
pub const BR_EDR_NOT_SUPPORTED: u8 = 0b00000100;

/// Legacy advertising data length.
pub const ADV_DATA_MAX: usize = 31;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdStructure<'a> {
    /// Device flags and baseband capabilities.
    ///
    /// This should be sent if any flags apply to the device. If not (ie. the value sent would be
    /// 0), this may be omitted.
    ///
    /// Must not be used in scan response data.
    Flags(u8),

    /// Complete list of 16-bit service UUIDs.
    ServiceUuids16(&'a [u16]),

    /// Service data with 16-bit service UUID.
    ServiceData16 {
        /// The 16-bit service UUID.
        uuid: u16,
        /// The associated service data. May be empty.
        data: &'a [u8],
    },

    /// An unknown or unimplemented AD structure stored as raw bytes.
    Unknown {
        /// Type byte.
        ty: u8,
        /// Raw data transmitted after the type.
        data: &'a [u8],
    },
}

impl<'d> AdStructure<'d> {
    pub fn encode_slice(data: &[AdStructure<'_>], dest: &mut [u8]) -> Result<usize, codec::Error> {
        let mut w = WriteCursor::new(dest);
        for item in data.iter() {
            item.encode(&mut w)?;
        }
        Ok(w.len())
    }

    // UUIDs are little endian in advertising data.
    pub fn encode(&self, w: &mut WriteCursor<'_>) -> Result<(), codec::Error> {
        match self {
            AdStructure::Flags(flags) => {
                w.append(&[0x02, 0x01, *flags])?;
            }
            AdStructure::ServiceUuids16(uuids) => {
                w.append(&[length(uuids.len() * 2)?, 0x03])?;
                for uuid in uuids.iter() {
                    w.append(&uuid.to_le_bytes())?;
                }
            }
            AdStructure::ServiceData16 { uuid, data } => {
                w.append(&[length(data.len() + 2)?, 0x16])?;
                w.append(&uuid.to_le_bytes())?;
                w.append(data)?;
            }
            AdStructure::Unknown { ty, data } => {
                w.append(&[length(data.len())?, *ty])?;
                w.append(data)?;
            }
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> impl Iterator<Item = Result<AdStructure<'_>, codec::Error>> {
        AdStructureIter {
            cursor: ReadCursor::new(data),
            failed: false,
        }
    }
}

/// Length byte for a structure carrying `data_len` bytes after its type.
fn length(data_len: usize) -> Result<u8, codec::Error> {
    data_len
        .checked_add(1)
        .and_then(|len| u8::try_from(len).ok())
        .ok_or(codec::Error::InvalidValue)
}

pub struct AdStructureIter<'d> {
    cursor: ReadCursor<'d>,
    failed: bool,
}

impl<'d> AdStructureIter<'d> {
    fn read(&mut self) -> Result<Option<AdStructure<'d>>, codec::Error> {
        let len: u8 = self.cursor.read()?;
        if len == 0 {
            // Zero padding ends the significant part.
            return Ok(None);
        }
        let code: u8 = self.cursor.read()?;
        let data = self.cursor.slice(len as usize - 1)?;
        match code {
            0x01 => data
                .first()
                .map(|flags| Some(AdStructure::Flags(*flags)))
                .ok_or(codec::Error::InvalidValue),
            0x16 if data.len() >= 2 => Ok(Some(AdStructure::ServiceData16 {
                uuid: u16::from_le_bytes([data[0], data[1]]),
                data: &data[2..],
            })),
            ty => Ok(Some(AdStructure::Unknown { ty, data })),
        }
    }
}

impl<'d> Iterator for AdStructureIter<'d> {
    type Item = Result<AdStructure<'d>, codec::Error>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.available() == 0 {
            return None;
        }
        match self.read() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.failed = true;
                None
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Wraps an encoded Eddystone frame into non-connectable advertising data.
pub fn encode_eddystone(frame: &[u8], dest: &mut [u8]) -> Result<usize, codec::Error> {
    let dest = match dest.len() {
        len if len > ADV_DATA_MAX => &mut dest[..ADV_DATA_MAX],
        _ => dest,
    };
    AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::ServiceUuids16(&[EDDYSTONE_UUID]),
            AdStructure::ServiceData16 {
                uuid: EDDYSTONE_UUID,
                data: frame,
            },
        ],
        dest,
    )
}

/// Finds the Eddystone frame in advertising data, if any.
pub fn find_eddystone(adv_data: &[u8]) -> Option<&[u8]> {
    AdStructure::decode(adv_data).find_map(|item| match item {
        Ok(AdStructure::ServiceData16 { uuid, data }) if uuid == EDDYSTONE_UUID => Some(data),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::UID_FRAME_LEN;

    #[test]
    fn eddystone_advertisement_layout() {
        let frame = [0x10, 0xeb, 0x00, b'a', 0x07];
        let mut buf = [0; ADV_DATA_MAX];
        let len = encode_eddystone(&frame, &mut buf).unwrap();
        assert_eq!(
            &buf[..len],
            &[0x02, 0x01, 0x06, 0x03, 0x03, 0xaa, 0xfe, 0x08, 0x16, 0xaa, 0xfe, 0x10, 0xeb, 0x00, b'a', 0x07]
        );
        assert_eq!(find_eddystone(&buf[..len]), Some(&frame[..]));
    }

    #[test]
    fn largest_frame_fits_legacy_advertising() {
        let frame = [0; UID_FRAME_LEN];
        let mut buf = [0; 64];
        assert_eq!(encode_eddystone(&frame, &mut buf), Ok(ADV_DATA_MAX));

        let frame = [0; UID_FRAME_LEN + 1];
        assert_eq!(encode_eddystone(&frame, &mut buf), Err(codec::Error::InsufficientSpace));
    }

    #[test]
    fn decode_stops_at_padding_and_errors() {
        let data = [0x02, 0x01, 0x06, 0x00, 0x00];
        let items: heapless::Vec<_, 4> = AdStructure::decode(&data).collect();
        assert_eq!(items.as_slice(), &[Ok(AdStructure::Flags(0x06))]);

        let name = [0x02, 0x09, b'a', 0x05, 0x09, b'a'];
        let mut iter = AdStructure::decode(&name);
        assert_eq!(iter.next(), Some(Ok(AdStructure::Unknown { ty: 0x09, data: b"a" })));
        assert_eq!(iter.next(), Some(Err(codec::Error::InsufficientSpace)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn oversized_structure_is_rejected() {
        let data = [0; 255];
        let mut buf = [0; 512];
        let mut w = WriteCursor::new(&mut buf);
        assert_eq!(
            AdStructure::ServiceData16 { uuid: EDDYSTONE_UUID, data: &data }.encode(&mut w),
            Err(codec::Error::InvalidValue)
        );
        assert_eq!(
            AdStructure::Unknown { ty: 0xff, data: &data }.encode(&mut w),
            Err(codec::Error::InvalidValue)
        );
        assert_eq!(w.len(), 0);

        assert_eq!(AdStructure::Unknown { ty: 0xff, data: &data[..254] }.encode(&mut w), Ok(()));
        assert_eq!(w.len(), 256);
        assert_eq!(buf[0], 0xff);
    }
}
