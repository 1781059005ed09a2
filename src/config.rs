//! Compile-time configuration.
//!
//! `trouble-eddystone` has some configuration settings that are set at compile time.
//!
//! They are set via environment variables at build time: set the variable named
//! `TROUBLE_EDDYSTONE_<value>`. For example `TROUBLE_EDDYSTONE_MAX_FRAME_SLOTS=6 cargo build`.
//! You can also set them in the `[env]` section of `.cargo/config.toml`.
//!
//! ## Compatibility warning
//!
//! Changing `MAX_FRAME_SLOTS` changes how many slots a persisted [`BeaconConfig`](crate::params::BeaconConfig)
//! may hold. A config saved with more slots than the current build allows is rejected on load,
//! and the beacon falls back to its defaults.

mod raw {
    #![allow(unused)]
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}

/// Frame slots per beacon
///
/// The maximum number of frame slots a beacon config holds.
///
/// Default: 4.
pub const MAX_FRAME_SLOTS: usize = raw::MAX_FRAME_SLOTS;

/// Command queue size
///
/// Capacity of the [`CommandChannel`](crate::runner::CommandChannel) feeding a running beacon.
///
/// Default: 4.
pub const COMMAND_QUEUE_SIZE: usize = raw::COMMAND_QUEUE_SIZE;
