//! Advertising scheduler.
//!
//! The scheduler cycles through the enabled frame slots of its config snapshot, one slot
//! per tick, and hands every encoded frame to the radio transport together with the slot's
//! advertising interval. Ticks are driven from outside, see [`crate::runner`].
use embassy_time::Instant;

use crate::ad_structure::{self, ADV_DATA_MAX};
use crate::frame::{self, EncodingError, TelemetrySnapshot, FRAME_MAX_LEN};
use crate::params::BeaconConfig;
use crate::transport::Transport;
use crate::Error;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    /// Never started.
    Idle,
    Running,
    Stopped,
}

pub struct AdvertisingScheduler<T> {
    transport: T,
    state: SchedulerState,
    active: BeaconConfig,
    staged: Option<BeaconConfig>,
    /// Slot to consider first on the next tick.
    next: usize,
    interval_ms: u32,
    advertising: bool,
    adv_count: u32,
    battery_mv: u16,
    temperature: i16,
}

impl<T: Transport> AdvertisingScheduler<T> {
    /// Creates an idle scheduler. `config` is validated when the scheduler starts.
    pub fn new(transport: T, config: BeaconConfig) -> Self {
        Self {
            transport,
            state: SchedulerState::Idle,
            active: config,
            staged: None,
            next: 0,
            interval_ms: 0,
            advertising: false,
            adv_count: 0,
            battery_mv: 0,
            temperature: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// The config frames are currently built from.
    pub fn config(&self) -> &BeaconConfig {
        &self.active
    }

    /// A config waiting for the next tick boundary.
    pub fn staged(&self) -> Option<&BeaconConfig> {
        self.staged.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Advertising interval of the slot on air, 0 before the first emission.
    pub fn current_interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Frames handed to the transport since the scheduler was created.
    pub fn adv_count(&self) -> u32 {
        self.adv_count
    }

    /// Replaces the config snapshot.
    ///
    /// While running the config is staged and swapped in at the next tick, so no frame is
    /// ever built from a mix of the old and the new config. An invalid config is rejected
    /// and the current one stays in effect.
    pub fn stage(&mut self, config: BeaconConfig) -> Result<(), Error<T::Error>> {
        config.validate()?;
        if self.is_running() {
            debug!("[scheduler] staging config for next tick");
            self.staged = Some(config);
        } else {
            self.active = config;
            self.staged = None;
        }
        Ok(())
    }

    pub fn set_slot_enabled(&mut self, index: usize, enabled: bool) -> Result<(), Error<T::Error>> {
        let slot = self
            .active
            .slots
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange(index.min(u8::MAX as usize) as u8))?;
        slot.enabled = enabled;
        if let Some(slot) = self.staged.as_mut().and_then(|c| c.slots.get_mut(index)) {
            slot.enabled = enabled;
        }
        Ok(())
    }

    pub fn set_battery_voltage(&mut self, mv: u16) {
        self.battery_mv = mv;
    }

    /// Sets the beacon temperature, signed 8.8 fixed point degrees Celsius.
    pub fn set_temperature(&mut self, temperature: i16) {
        self.temperature = temperature;
    }

    /// Starts emitting from the first slot. Starting a running scheduler does nothing.
    pub fn start(&mut self) -> Result<(), Error<T::Error>> {
        if self.is_running() {
            return Ok(());
        }
        if let Some(config) = self.staged.take() {
            self.active = config;
        }
        self.active.validate()?;
        if !self.active.has_enabled_slot() {
            return Err(Error::NoFramesConfigured);
        }
        self.next = 0;
        self.interval_ms = 0;
        self.state = SchedulerState::Running;
        info!("[scheduler] started with {} slots", self.active.slots.len());
        Ok(())
    }

    /// Stops advertising. Stopping a scheduler that is not running does nothing.
    pub async fn stop(&mut self) -> Result<(), Error<T::Error>> {
        if !self.is_running() {
            return Ok(());
        }
        self.state = SchedulerState::Stopped;
        if let Some(config) = self.staged.take() {
            self.active = config;
        }
        if self.advertising {
            self.advertising = false;
            self.transport.stop_advertising().await.map_err(Error::Transport)?;
        }
        info!("[scheduler] stopped");
        Ok(())
    }

    /// Re-enables advertising after the radio dropped it, e.g. when a connection ended.
    pub async fn resume(&mut self) -> Result<(), Error<T::Error>> {
        if !self.is_running() || !self.advertising {
            return Ok(());
        }
        debug!("[scheduler] resuming advertising");
        match self.transport.start_advertising().await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Emits the next enabled slot.
    ///
    /// Returns the index of the emitted slot, or `None` if the scheduler is not running.
    /// Slots whose frame cannot be encoded are skipped; [`Error::Encoding`] is returned only
    /// if no enabled slot could be encoded, and the scheduler keeps running.
    pub async fn tick(&mut self, now: Instant) -> Result<Option<usize>, Error<T::Error>> {
        if !self.is_running() {
            return Ok(None);
        }
        if let Some(config) = self.staged.take() {
            debug!("[scheduler] applying staged config");
            self.active = config;
            self.next %= self.active.slots.len().max(1);
        }

        let power = &self.active.power;
        let index = self.active.power_index;
        let powers = power
            .advertised_power_for(index)
            .and_then(|adv| power.radio_power_for(index).map(|radio| (adv, radio)));
        let (adv_power, radio_power) = match powers {
            Ok(powers) => powers,
            Err(e) => {
                error!("[scheduler] power mode {} out of range, stopping", e.0);
                self.halt().await;
                return Err(e.into());
            }
        };
        let telemetry = self.telemetry(now);

        let count = self.active.slots.len();
        let mut frame_buf = [0; FRAME_MAX_LEN];
        let mut adv_data = [0; ADV_DATA_MAX];
        let mut last_error = None;

        for offset in 0..count {
            let index = (self.next + offset) % count;
            let slot = &self.active.slots[index];
            if !slot.enabled {
                continue;
            }
            let encoded = frame::encode(&slot.frame, &self.active.identity, adv_power, &telemetry, &mut frame_buf)
                .and_then(|len| {
                    ad_structure::encode_eddystone(&frame_buf[..len], &mut adv_data).map_err(EncodingError::from)
                });
            let len = match encoded {
                Ok(len) => len,
                Err(e) => {
                    warn!("[scheduler] skipping slot {}: {:?}", index, e);
                    last_error = Some(e);
                    continue;
                }
            };

            let interval_ms = slot.interval_ms;
            if let Err(e) = self.deliver(&adv_data[..len], interval_ms, radio_power).await {
                return Err(self.fail(e).await);
            }
            trace!("[scheduler] emitted slot {} ({} bytes, {} ms)", index, len, interval_ms);
            self.next = (index + 1) % count;
            self.interval_ms = interval_ms;
            self.adv_count = self.adv_count.wrapping_add(1);
            return Ok(Some(index));
        }

        match last_error {
            Some(e) => Err(Error::Encoding(e)),
            None => {
                warn!("[scheduler] no enabled frame slots, stopping");
                self.halt().await;
                Err(Error::NoFramesConfigured)
            }
        }
    }

    fn telemetry(&self, now: Instant) -> TelemetrySnapshot {
        TelemetrySnapshot {
            battery_mv: self.battery_mv,
            temperature: self.temperature,
            adv_count: self.adv_count,
            uptime_ds: (now.as_millis() / 100) as u32,
        }
    }

    async fn deliver(&mut self, payload: &[u8], interval_ms: u32, radio_power: i8) -> Result<(), T::Error> {
        self.transport.set_tx_power(radio_power).await?;
        self.transport.set_advertising_interval(interval_ms).await?;
        self.transport.set_advertising_payload(payload).await?;
        if !self.advertising {
            self.transport.start_advertising().await?;
            self.advertising = true;
        }
        Ok(())
    }

    async fn fail(&mut self, error: T::Error) -> Error<T::Error> {
        error!("[scheduler] transport failure, stopping");
        self.halt().await;
        Error::Transport(error)
    }

    /// Stops after an error, best effort.
    async fn halt(&mut self) {
        self.state = SchedulerState::Stopped;
        if self.advertising {
            self.advertising = false;
            if self.transport.stop_advertising().await.is_err() {
                warn!("[scheduler] failed to disable advertising");
            }
        }
    }
}
