//! Cooperative beacon runner.
//!
//! Ticks and external events are handled on the same task: the runner waits for either
//! the next tick deadline or a [`Command`], and handles commands only between ticks.
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Timer};

use crate::config::COMMAND_QUEUE_SIZE;
use crate::params::BeaconConfig;
use crate::service::{Actuator, BeaconService};
use crate::transport::Transport;
use crate::Error;

/// Events delivered to a running beacon.
pub enum Command {
    /// Stop advertising and return from [`BeaconService::run`].
    Stop,
    /// Replace the beacon config.
    Configure(BeaconConfig),
    /// A byte written to the control characteristic.
    ControlWrite(u8),
    /// A central disconnected.
    Disconnected,
}

pub type CommandChannel<M> = Channel<M, Command, COMMAND_QUEUE_SIZE>;

impl<T: Transport, A: Actuator> BeaconService<T, A> {
    /// Starts the beacon if needed and drives it until it stops.
    ///
    /// Returns `Ok` after a [`Command::Stop`], or the error that stopped the scheduler.
    pub async fn run<M: RawMutex>(&mut self, commands: &CommandChannel<M>) -> Result<(), Error<T::Error>> {
        self.start_beacon_service()?;
        let mut deadline = Instant::now();
        loop {
            match select(Timer::at(deadline), commands.receive()).await {
                Either::First(()) => {
                    match self.tick(Instant::now()).await {
                        Ok(_) => {}
                        Err(Error::Encoding(e)) => {
                            warn!("[runner] no frame could be encoded: {:?}", e);
                        }
                        Err(e) => return Err(e),
                    }
                    let interval = match self.scheduler().current_interval_ms() {
                        // Nothing emitted yet, retry at the first slot's pace.
                        0 => self.config().slots.first().map_or(1, |s| s.interval_ms.max(1)),
                        interval => interval,
                    };
                    deadline = Instant::now() + Duration::from_millis(interval as u64);
                }
                Either::Second(command) => self.handle(command).await?,
            }
            if !self.is_running() {
                return Ok(());
            }
        }
    }

    async fn handle(&mut self, command: Command) -> Result<(), Error<T::Error>> {
        match command {
            Command::Stop => self.stop_beacon_service().await,
            Command::Configure(config) => {
                if let Err(Error::InvalidConfig(e)) = self.configure(config) {
                    warn!("[runner] config rejected: {:?}", e);
                }
                Ok(())
            }
            Command::ControlWrite(value) => {
                self.on_control_write(value);
                Ok(())
            }
            Command::Disconnected => self.on_disconnect().await,
        }
    }
}
