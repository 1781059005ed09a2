//! Opinionated beacon codec
//!
//! Assumes big endian for all types, which is the Eddystone byte order. Advertising
//! data fields that the Bluetooth core spec defines as little endian (16-bit UUIDs)
//! are written as raw bytes by their users.

pub trait FixedSize: Sized {
    const SIZE: usize;
}

pub trait Type: Sized {
    fn size(&self) -> usize;
}

pub trait Encode: Type {
    fn encode(&self, dest: &mut [u8]) -> Result<(), Error>;
}

pub trait Decode<'d>: Type {
    fn decode(src: &'d [u8]) -> Result<Self, Error>;
}

impl<T: FixedSize> Type for T {
    fn size(&self) -> usize {
        Self::SIZE
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    InsufficientSpace,
    InvalidValue,
}

macro_rules! impl_be {
    ($($ty:ty),*) => {
        $(
            impl FixedSize for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();
            }

            impl Decode<'_> for $ty {
                fn decode(src: &[u8]) -> Result<Self, Error> {
                    let bytes = src.get(..Self::SIZE).ok_or(Error::InsufficientSpace)?;
                    let mut raw = [0; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    Ok(<$ty>::from_be_bytes(raw))
                }
            }

            impl Encode for $ty {
                fn encode(&self, dest: &mut [u8]) -> Result<(), Error> {
                    let dest = dest.get_mut(..Self::SIZE).ok_or(Error::InsufficientSpace)?;
                    dest.copy_from_slice(&self.to_be_bytes()[..]);
                    Ok(())
                }
            }
        )*
    };
}

impl_be!(u8, i8, u16, i16, u32);

impl FixedSize for bool {
    const SIZE: usize = 1;
}

impl Decode<'_> for bool {
    fn decode(src: &[u8]) -> Result<Self, Error> {
        match src.first() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(_) => Err(Error::InvalidValue),
            None => Err(Error::InsufficientSpace),
        }
    }
}

impl Encode for bool {
    fn encode(&self, dest: &mut [u8]) -> Result<(), Error> {
        let dest = dest.first_mut().ok_or(Error::InsufficientSpace)?;
        *dest = *self as u8;
        Ok(())
    }
}
