//! Persistent storage of beacon parameters.
use crate::codec;
use crate::params::{BeaconConfig, ENCODED_MAX_LEN, MAGIC};

/// Trait for persistent storage of the beacon config.
///
/// MCU-specific crates implement this trait using their storage backend.
pub trait ConfigStore {
    /// Error type for storage operations
    type Error;

    /// Load the stored config, `None` if nothing was ever saved.
    fn load(&mut self) -> Result<Option<BeaconConfig>, Self::Error>;

    /// Replace the stored config.
    fn save(&mut self, config: &BeaconConfig) -> Result<(), Self::Error>;
}

impl<S: ConfigStore> ConfigStore for &mut S {
    type Error = S::Error;

    fn load(&mut self) -> Result<Option<BeaconConfig>, Self::Error> {
        (**self).load()
    }

    fn save(&mut self, config: &BeaconConfig) -> Result<(), Self::Error> {
        (**self).save(config)
    }
}

/// A store keeping the encoded config in a byte buffer, such as retained RAM or a
/// memory mapped flash page.
///
/// An erased buffer (no config header) loads as `None`.
pub struct BufferStore<'d> {
    buf: &'d mut [u8],
}

impl<'d> BufferStore<'d> {
    pub fn new(buf: &'d mut [u8]) -> Self {
        Self { buf }
    }

    /// Marks the buffer as holding no config.
    pub fn erase(&mut self) {
        self.buf.fill(0xff);
    }
}

impl ConfigStore for BufferStore<'_> {
    type Error = codec::Error;

    fn load(&mut self) -> Result<Option<BeaconConfig>, Self::Error> {
        if !self.buf.starts_with(&MAGIC) {
            return Ok(None);
        }
        BeaconConfig::decode(self.buf).map(Some)
    }

    fn save(&mut self, config: &BeaconConfig) -> Result<(), Self::Error> {
        let mut tmp = [0; ENCODED_MAX_LEN];
        let len = config.encode(&mut tmp)?;
        let dest = self.buf.get_mut(..len).ok_or(codec::Error::InsufficientSpace)?;
        dest.copy_from_slice(&tmp[..len]);
        Ok(())
    }
}
