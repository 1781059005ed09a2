//! Cursors over the byte slices frames and configs are built in.
use crate::codec::{Decode, Encode, Error};

/// Tracks how much of a frame buffer has been filled.
pub struct WriteCursor<'d> {
    pos: usize,
    data: &'d mut [u8],
}

impl<'d> WriteCursor<'d> {
    pub fn new(data: &'d mut [u8]) -> Self {
        Self { pos: 0, data }
    }

    fn reserve(&mut self, nbytes: usize) -> Result<&mut [u8], Error> {
        let start = self.pos;
        let end = start.checked_add(nbytes).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                self.pos = end;
                Ok(&mut self.data[start..end])
            }
            None => Err(Error::InsufficientSpace),
        }
    }

    pub fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        self.reserve(data.len())?.copy_from_slice(data);
        Ok(())
    }

    pub fn write<E: Encode>(&mut self, data: E) -> Result<(), Error> {
        data.encode(self.reserve(data.size())?)
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.pos
    }
}

pub struct ReadCursor<'d> {
    pos: usize,
    data: &'d [u8],
}

impl<'d> ReadCursor<'d> {
    pub fn new(data: &'d [u8]) -> Self {
        Self { pos: 0, data }
    }

    pub fn read<T: Decode<'d>>(&mut self) -> Result<T, Error> {
        let val = T::decode(&self.data[self.pos..])?;
        self.pos += val.size();
        Ok(val)
    }

    pub fn slice(&mut self, nbytes: usize) -> Result<&'d [u8], Error> {
        if self.available() < nbytes {
            return Err(Error::InsufficientSpace);
        }
        let src = &self.data[self.pos..self.pos + nbytes];
        self.pos += nbytes;
        Ok(src)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0; N];
        out.copy_from_slice(self.slice(N)?);
        Ok(out)
    }

    /// Bytes left to read.
    pub fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn remaining(self) -> &'d [u8] {
        &self.data[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut buf = [0; 8];
        let mut w = WriteCursor::new(&mut buf);
        w.write(0x20u8).unwrap();
        w.write(3000u16).unwrap();
        w.append(&[9, 9]).unwrap();
        assert_eq!(w.len(), 5);
        assert_eq!(&buf[..5], &[0x20, 0x0b, 0xb8, 9, 9]);

        let mut r = ReadCursor::new(&buf[..5]);
        assert_eq!(r.read::<u8>().unwrap(), 0x20);
        assert_eq!(r.read::<u16>().unwrap(), 3000);
        assert_eq!(r.array::<2>().unwrap(), [9, 9]);
        assert_eq!(r.available(), 0);
    }

    #[test]
    fn write_past_end_fails() {
        let mut buf = [0; 2];
        let mut w = WriteCursor::new(&mut buf);
        assert_eq!(w.append(&[1, 2, 3]), Err(Error::InsufficientSpace));
        assert_eq!(w.write(1u32), Err(Error::InsufficientSpace));
        assert_eq!(w.len(), 0);
        w.write(7u16).unwrap();
        assert_eq!(w.len(), 2);
    }
}
