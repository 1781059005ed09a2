//! Eddystone beacon service.
//!
//! [`BeaconService`] owns the beacon configuration and the advertising scheduler. It keeps
//! two configs: the *pending* one, edited by [`BeaconService::set_uid_data`] and
//! [`BeaconService::set_url_data`], and the *committed* one the scheduler advertises. A
//! pending edit only reaches the air through [`BeaconService::configure`] or the next
//! [`BeaconService::start_beacon_service`].
use embassy_time::Instant;

use crate::frame::{InstanceId, NamespaceId};
use crate::params::BeaconConfig;
use crate::scheduler::{AdvertisingScheduler, SchedulerState};
use crate::storage::ConfigStore;
use crate::transport::Transport;
use crate::Error;

/// Something driven by the control characteristic, such as an indicator LED.
///
/// Implementations driving active-low outputs invert the value themselves.
pub trait Actuator {
    fn set(&mut self, on: bool);
}

impl Actuator for () {
    fn set(&mut self, _on: bool) {}
}

pub struct BeaconService<T, A = ()> {
    scheduler: AdvertisingScheduler<T>,
    committed: BeaconConfig,
    pending: BeaconConfig,
    actuator: A,
    indicator: bool,
}

impl<T: Transport> BeaconService<T> {
    /// Creates a beacon advertising the compiled-in defaults.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, BeaconConfig::default())
    }

    /// Creates a beacon from the persisted config, falling back to the compiled-in
    /// defaults if there is none or it cannot be used.
    pub fn from_store<S: ConfigStore>(transport: T, store: &mut S) -> Self {
        let config = match store.load() {
            Ok(Some(config)) => match config.validate() {
                Ok(()) => {
                    info!("[beacon] using persisted config");
                    config
                }
                Err(e) => {
                    warn!("[beacon] persisted config rejected: {:?}, using defaults", e);
                    BeaconConfig::default()
                }
            },
            Ok(None) => {
                info!("[beacon] no persisted config, using defaults");
                BeaconConfig::default()
            }
            Err(_) => {
                warn!("[beacon] failed to load persisted config, using defaults");
                BeaconConfig::default()
            }
        };
        Self::with_config(transport, config)
    }

    fn with_config(transport: T, config: BeaconConfig) -> Self {
        Self {
            scheduler: AdvertisingScheduler::new(transport, config.clone()),
            committed: config.clone(),
            pending: config,
            actuator: (),
            indicator: false,
        }
    }
}

impl<T: Transport, A: Actuator> BeaconService<T, A> {
    /// Binds the actuator driven by control writes.
    pub fn with_actuator<B: Actuator>(self, actuator: B) -> BeaconService<T, B> {
        BeaconService {
            scheduler: self.scheduler,
            committed: self.committed,
            pending: self.pending,
            actuator,
            indicator: self.indicator,
        }
    }

    /// Validates and commits `config`.
    ///
    /// On failure the previous config stays in effect. While running, the new config is
    /// advertised from the next tick on.
    pub fn configure(&mut self, config: BeaconConfig) -> Result<(), Error<T::Error>> {
        self.scheduler.stage(config.clone())?;
        self.committed = config.clone();
        self.pending = config;
        Ok(())
    }

    /// Commits the pending config and starts advertising. Does nothing if already running.
    pub fn start_beacon_service(&mut self) -> Result<(), Error<T::Error>> {
        if self.scheduler.is_running() {
            return Ok(());
        }
        if self.pending != self.committed {
            self.configure(self.pending.clone())?;
        }
        self.scheduler.start()
    }

    pub async fn stop_beacon_service(&mut self) -> Result<(), Error<T::Error>> {
        self.scheduler.stop().await
    }

    pub fn set_uid_data(&mut self, namespace: NamespaceId, instance: InstanceId) {
        self.pending.identity.namespace = namespace;
        self.pending.identity.instance = instance;
    }

    pub fn set_url_data(&mut self, url: &str) -> Result<(), Error<T::Error>> {
        self.pending.set_url(url)?;
        Ok(())
    }

    /// The config edits are applied to.
    pub fn pending(&self) -> &BeaconConfig {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut BeaconConfig {
        &mut self.pending
    }

    /// The last config committed with [`BeaconService::configure`].
    pub fn config(&self) -> &BeaconConfig {
        &self.committed
    }

    /// Persists the committed config.
    pub fn save<S: ConfigStore>(&self, store: &mut S) -> Result<(), S::Error> {
        store.save(&self.committed)
    }

    /// Handles a write to the control characteristic; any non-zero byte means on.
    pub fn on_control_write(&mut self, value: u8) {
        self.indicator = value != 0;
        debug!("[beacon] indicator {}", self.indicator);
        self.actuator.set(self.indicator);
    }

    pub fn indicator(&self) -> bool {
        self.indicator
    }

    /// Handles the end of a connection, after which the radio has stopped advertising.
    pub async fn on_disconnect(&mut self) -> Result<(), Error<T::Error>> {
        self.scheduler.resume().await
    }

    pub fn update_battery_voltage(&mut self, mv: u16) {
        self.scheduler.set_battery_voltage(mv);
    }

    /// Updates the beacon temperature, signed 8.8 fixed point degrees Celsius.
    pub fn update_temperature(&mut self, temperature: i16) {
        self.scheduler.set_temperature(temperature);
    }

    pub fn set_slot_enabled(&mut self, index: usize, enabled: bool) -> Result<(), Error<T::Error>> {
        self.scheduler.set_slot_enabled(index, enabled)?;
        for config in [&mut self.committed, &mut self.pending] {
            if let Some(slot) = config.slots.get_mut(index) {
                slot.enabled = enabled;
            }
        }
        Ok(())
    }

    pub async fn tick(&mut self, now: Instant) -> Result<Option<usize>, Error<T::Error>> {
        self.scheduler.tick(now).await
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn scheduler(&self) -> &AdvertisingScheduler<T> {
        &self.scheduler
    }

    pub fn transport(&self) -> &T {
        self.scheduler.transport()
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::*;
    use crate::frame::FrameType;
    use crate::params::{ConfigError, FrameSlot, DEFAULT_NAMESPACE};

    struct Null;

    impl Transport for Null {
        type Error = Infallible;

        async fn set_advertising_payload(&mut self, _data: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn set_advertising_interval(&mut self, _interval_ms: u32) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn set_tx_power(&mut self, _dbm: i8) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn start_advertising(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn stop_advertising(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Led {
        on: bool,
        writes: usize,
    }

    impl Actuator for Led {
        fn set(&mut self, on: bool) {
            self.on = on;
            self.writes += 1;
        }
    }

    #[test]
    fn rejected_config_keeps_previous() {
        let mut service = BeaconService::new(Null);
        let before = service.config().clone();
        assert!(matches!(
            service.configure(BeaconConfig::empty()),
            Err(Error::InvalidConfig(ConfigError::NoFrameSlots))
        ));
        assert_eq!(service.config(), &before);
        assert_eq!(service.scheduler().config(), &before);
    }

    #[test]
    fn identity_edits_apply_on_start() {
        let mut service = BeaconService::new(Null);
        service.set_uid_data([1; 10], [2; 6]);
        assert_eq!(service.config().identity.namespace, DEFAULT_NAMESPACE);

        service.start_beacon_service().unwrap();
        assert_eq!(service.scheduler().config().identity.namespace, [1; 10]);
        assert_eq!(service.scheduler().config().identity.instance, [2; 6]);

        // Edits while running stay pending.
        service.set_uid_data([3; 10], [4; 6]);
        service.start_beacon_service().unwrap();
        assert_eq!(service.scheduler().config().identity.namespace, [1; 10]);
        assert!(service.scheduler().staged().is_none());
    }

    #[test]
    fn invalid_pending_config_blocks_start() {
        let mut service = BeaconService::new(Null);
        service.pending_mut().power_index = 9;
        assert!(matches!(
            service.start_beacon_service(),
            Err(Error::InvalidConfig(ConfigError::PowerIndexOutOfRange(9)))
        ));
        assert_eq!(service.state(), SchedulerState::Idle);
    }

    #[test]
    fn control_writes_drive_actuator() {
        let mut service = BeaconService::new(Null).with_actuator(Led::default());
        assert!(!service.indicator());
        service.on_control_write(1);
        assert!(service.indicator());
        assert!(service.actuator().on);
        service.on_control_write(0x80);
        assert!(service.actuator().on);
        service.on_control_write(0);
        assert!(!service.actuator().on);
        assert_eq!(service.actuator().writes, 3);
    }

    #[test]
    fn url_too_long_for_identity() {
        let mut service = BeaconService::new(Null);
        let url = "https://www.this-url-is-definitely-far-too-long-to-fit-into-a-beacon.example.com/";
        assert!(matches!(
            service.set_url_data(url),
            Err(Error::InvalidConfig(ConfigError::UrlTooLong))
        ));
    }

    #[test]
    fn slot_toggles_reach_committed_config() {
        let config = BeaconConfig::default()
            .with_slot(FrameSlot::new(FrameType::Tlm, 1000))
            .unwrap();
        let mut service = BeaconService::new(Null);
        service.configure(config).unwrap();
        service.set_slot_enabled(1, false).unwrap();
        assert!(!service.config().slots[1].enabled);
        assert!(!service.scheduler().config().slots[1].enabled);
    }
}
