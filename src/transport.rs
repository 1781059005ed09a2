//! Radio transport.
//!
//! The scheduler only talks to the radio through [`Transport`]. [`HciTransport`] implements
//! it on top of any HCI controller using legacy advertising commands.
use bt_hci::cmd::le::{LeSetAdvData, LeSetAdvEnable, LeSetAdvParams};
use bt_hci::cmd::SyncCmd;
use bt_hci::controller::{Controller, ControllerCmdSync};
use bt_hci::param::{AddrKind, AdvChannelMap, AdvFilterPolicy, AdvKind, BdAddr, Duration};

use crate::ad_structure::ADV_DATA_MAX;
use crate::params::{ADV_INTERVAL_MAX_MS, ADV_INTERVAL_MIN_MS};

pub trait Transport {
    /// Error type for radio operations
    type Error;

    /// Replace the advertised payload.
    async fn set_advertising_payload(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Set the interval used for the next advertising period.
    async fn set_advertising_interval(&mut self, interval_ms: u32) -> Result<(), Self::Error>;

    /// Set the radio transmit power.
    async fn set_tx_power(&mut self, dbm: i8) -> Result<(), Self::Error>;

    async fn start_advertising(&mut self) -> Result<(), Self::Error>;

    async fn stop_advertising(&mut self) -> Result<(), Self::Error>;
}

impl<T: Transport> Transport for &mut T {
    type Error = T::Error;

    async fn set_advertising_payload(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        (**self).set_advertising_payload(data).await
    }

    async fn set_advertising_interval(&mut self, interval_ms: u32) -> Result<(), Self::Error> {
        (**self).set_advertising_interval(interval_ms).await
    }

    async fn set_tx_power(&mut self, dbm: i8) -> Result<(), Self::Error> {
        (**self).set_tx_power(dbm).await
    }

    async fn start_advertising(&mut self) -> Result<(), Self::Error> {
        (**self).start_advertising().await
    }

    async fn stop_advertising(&mut self) -> Result<(), Self::Error> {
        (**self).stop_advertising().await
    }
}

/// Legacy advertising over an HCI controller.
pub struct HciTransport<C> {
    controller: C,
    kind: AdvKind,
    interval_ms: Option<u32>,
    tx_power: i8,
    enabled: bool,
}

impl<C: Controller> HciTransport<C> {
    /// Non-connectable undirected advertising.
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            kind: AdvKind::AdvNonconnInd,
            interval_ms: None,
            tx_power: 0,
            enabled: false,
        }
    }

    /// Connectable undirected advertising, for beacons that also expose a GATT service.
    pub fn connectable(mut self) -> Self {
        self.kind = AdvKind::AdvInd;
        self
    }

    /// The last transmit power requested.
    ///
    /// Legacy HCI has no standard command to set the advertising transmit power, so the
    /// value is only recorded for controllers configured out of band.
    pub fn tx_power(&self) -> i8 {
        self.tx_power
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn into_inner(self) -> C {
        self.controller
    }
}

impl<C> HciTransport<C>
where
    C: Controller + ControllerCmdSync<LeSetAdvParams> + ControllerCmdSync<LeSetAdvEnable>,
{
    async fn apply_params(&mut self, interval: Duration) -> Result<(), bt_hci::cmd::Error<C::Error>> {
        LeSetAdvParams::new(
            interval,
            interval,
            self.kind,
            AddrKind::PUBLIC,
            AddrKind::PUBLIC,
            BdAddr::default(),
            AdvChannelMap::ALL,
            AdvFilterPolicy::default(),
        )
        .exec(&self.controller)
        .await?;
        Ok(())
    }
}

/// Converts milliseconds to 0.625 ms units, `None` outside the legacy advertising range.
fn adv_interval(interval_ms: u32) -> Option<Duration> {
    if !(ADV_INTERVAL_MIN_MS..=ADV_INTERVAL_MAX_MS).contains(&interval_ms) {
        return None;
    }
    u16::try_from(interval_ms * 8 / 5).ok().map(Duration::from_u16)
}

impl<C> Transport for HciTransport<C>
where
    C: Controller
        + ControllerCmdSync<LeSetAdvData>
        + ControllerCmdSync<LeSetAdvParams>
        + ControllerCmdSync<LeSetAdvEnable>,
{
    type Error = bt_hci::cmd::Error<C::Error>;

    async fn set_advertising_payload(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let mut buf = [0; ADV_DATA_MAX];
        let to_copy = data.len().min(buf.len());
        buf[..to_copy].copy_from_slice(&data[..to_copy]);
        LeSetAdvData::new(to_copy as u8, buf).exec(&self.controller).await?;
        Ok(())
    }

    async fn set_advertising_interval(&mut self, interval_ms: u32) -> Result<(), Self::Error> {
        if self.interval_ms == Some(interval_ms) {
            return Ok(());
        }
        let interval = adv_interval(interval_ms).ok_or_else(|| {
            warn!("[transport] interval {} ms out of range", interval_ms);
            bt_hci::cmd::Error::Hci(bt_hci::param::Error::INVALID_HCI_PARAMETERS)
        })?;
        // Parameters can only be changed while advertising is disabled.
        if self.enabled {
            LeSetAdvEnable::new(false).exec(&self.controller).await?;
        }
        self.apply_params(interval).await?;
        self.interval_ms = Some(interval_ms);
        if self.enabled {
            LeSetAdvEnable::new(true).exec(&self.controller).await?;
        }
        Ok(())
    }

    async fn set_tx_power(&mut self, dbm: i8) -> Result<(), Self::Error> {
        trace!("[transport] tx power {} dBm", dbm);
        self.tx_power = dbm;
        Ok(())
    }

    async fn start_advertising(&mut self) -> Result<(), Self::Error> {
        trace!("[transport] enabling advertising");
        LeSetAdvEnable::new(true).exec(&self.controller).await?;
        self.enabled = true;
        Ok(())
    }

    async fn stop_advertising(&mut self) -> Result<(), Self::Error> {
        trace!("[transport] disabling advertising");
        LeSetAdvEnable::new(false).exec(&self.controller).await?;
        self.enabled = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use core::convert::Infallible;

    use bt_hci::cmd::{self, Cmd};
    use bt_hci::data::{AclPacket, IsoPacket, SyncPacket};
    use bt_hci::ControllerToHostPacket;
    use embassy_futures::block_on;
    use embassy_time::Instant;
    use heapless::Vec;

    use super::*;
    use crate::frame::FrameType;
    use crate::params::{BeaconConfig, ConfigError, FrameSlot};
    use crate::scheduler::AdvertisingScheduler;
    use crate::Error;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Sent {
        Data(u8),
        Params(u16),
        Enable(bool),
    }

    #[derive(Default)]
    struct MockController {
        sent: RefCell<Vec<Sent, 16>>,
    }

    impl MockController {
        fn record(&self, sent: Sent) {
            self.sent.borrow_mut().push(sent).unwrap();
        }

        fn take(&self) -> Vec<Sent, 16> {
            core::mem::take(&mut *self.sent.borrow_mut())
        }
    }

    impl embedded_io::ErrorType for MockController {
        type Error = Infallible;
    }

    impl Controller for MockController {
        async fn write_acl_data(&self, _packet: &AclPacket<'_>) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn write_sync_data(&self, _packet: &SyncPacket<'_>) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn write_iso_data(&self, _packet: &IsoPacket<'_>) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn read<'a>(&self, _buf: &'a mut [u8]) -> Result<ControllerToHostPacket<'a>, Self::Error> {
            core::future::pending().await
        }
    }

    impl ControllerCmdSync<LeSetAdvData> for MockController {
        async fn exec(&self, cmd: &LeSetAdvData) -> Result<(), cmd::Error<Infallible>> {
            self.record(Sent::Data(cmd.params().data_len));
            Ok(())
        }
    }

    impl ControllerCmdSync<LeSetAdvParams> for MockController {
        async fn exec(&self, cmd: &LeSetAdvParams) -> Result<(), cmd::Error<Infallible>> {
            let params = cmd.params();
            let (adv_interval_min, adv_interval_max) = (params.adv_interval_min, params.adv_interval_max);
            assert_eq!(adv_interval_min.as_u16(), adv_interval_max.as_u16());
            self.record(Sent::Params(adv_interval_min.as_u16()));
            Ok(())
        }
    }

    impl ControllerCmdSync<LeSetAdvEnable> for MockController {
        async fn exec(&self, cmd: &LeSetAdvEnable) -> Result<(), cmd::Error<Infallible>> {
            self.record(Sent::Enable(*cmd.params()));
            Ok(())
        }
    }

    fn uid_every(interval_ms: u32) -> BeaconConfig {
        BeaconConfig::empty()
            .with_slot(FrameSlot::new(FrameType::Uid, interval_ms))
            .unwrap()
    }

    #[test]
    fn interval_conversion_bounds() {
        assert_eq!(adv_interval(20).map(|d| d.as_u16()), Some(32));
        assert_eq!(adv_interval(1000).map(|d| d.as_u16()), Some(1600));
        assert_eq!(adv_interval(10_240).map(|d| d.as_u16()), Some(16_384));
        assert!(adv_interval(19).is_none());
        assert!(adv_interval(10_241).is_none());
        assert!(adv_interval(60_000).is_none());
        assert!(adv_interval(u32::MAX).is_none());
    }

    #[test]
    fn first_emission_sequence() {
        let mut scheduler = AdvertisingScheduler::new(HciTransport::new(MockController::default()), uid_every(100));
        scheduler.start().unwrap();
        block_on(scheduler.tick(Instant::from_millis(0))).unwrap();

        // Flags (3) + UUID list (4) + UID service data (24).
        let sent = scheduler.transport().controller().take();
        assert_eq!(&sent[..], &[Sent::Params(160), Sent::Data(31), Sent::Enable(true)]);
    }

    #[test]
    fn interval_change_while_enabled_restarts_advertising() {
        let mut transport = HciTransport::new(MockController::default());
        block_on(async {
            transport.set_advertising_interval(100).await.unwrap();
            transport.start_advertising().await.unwrap();
            transport.controller().take();

            transport.set_advertising_interval(250).await.unwrap();
        });
        let sent = transport.controller().take();
        assert_eq!(&sent[..], &[Sent::Enable(false), Sent::Params(400), Sent::Enable(true)]);
    }

    #[test]
    fn unchanged_interval_sends_nothing() {
        let mut transport = HciTransport::new(MockController::default());
        block_on(async {
            transport.set_advertising_interval(100).await.unwrap();
            transport.start_advertising().await.unwrap();
            transport.controller().take();

            transport.set_advertising_interval(100).await.unwrap();
            transport.set_tx_power(-4).await.unwrap();
        });
        assert!(transport.controller().take().is_empty());
        assert_eq!(transport.tx_power(), -4);
    }

    #[test]
    fn out_of_range_interval_is_an_error() {
        let mut transport = HciTransport::new(MockController::default());
        let result = block_on(async {
            transport.start_advertising().await.unwrap();
            transport.controller().take();
            transport.set_advertising_interval(60_000).await
        });
        assert!(matches!(
            result,
            Err(cmd::Error::Hci(bt_hci::param::Error::INVALID_HCI_PARAMETERS))
        ));
        // Advertising was not interrupted.
        assert!(transport.controller().take().is_empty());
    }

    #[test]
    fn scheduler_rejects_interval_beyond_legacy_range() {
        let mut scheduler = AdvertisingScheduler::new(HciTransport::new(MockController::default()), uid_every(60_000));
        assert!(matches!(
            scheduler.start(),
            Err(Error::InvalidConfig(ConfigError::IntervalOutOfRange(0)))
        ));
        assert!(matches!(block_on(scheduler.tick(Instant::from_millis(0))), Ok(None)));
        assert!(scheduler.transport().controller().take().is_empty());
    }
}
