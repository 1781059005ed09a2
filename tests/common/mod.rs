use std::cell::RefCell;
use std::rc::Rc;

use trouble_eddystone::ad_structure;
use trouble_eddystone::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Payload(Vec<u8>),
    Interval(u32),
    TxPower(i8),
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioFault;

#[derive(Default)]
pub struct Log {
    pub events: Vec<Event>,
    /// Fail the next payload update.
    pub fail_payload: bool,
}

impl Log {
    /// Eddystone frames handed to the radio, in order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Payload(p) => ad_structure::find_eddystone(p).map(|f| f.to_vec()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }
}

/// A radio recording every call into a shared log.
#[derive(Clone, Default)]
pub struct Radio {
    pub log: Rc<RefCell<Log>>,
}

impl Radio {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for Radio {
    type Error = RadioFault;

    async fn set_advertising_payload(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let mut log = self.log.borrow_mut();
        if log.fail_payload {
            log.fail_payload = false;
            return Err(RadioFault);
        }
        log.events.push(Event::Payload(data.to_vec()));
        Ok(())
    }

    async fn set_advertising_interval(&mut self, interval_ms: u32) -> Result<(), Self::Error> {
        self.log.borrow_mut().events.push(Event::Interval(interval_ms));
        Ok(())
    }

    async fn set_tx_power(&mut self, dbm: i8) -> Result<(), Self::Error> {
        self.log.borrow_mut().events.push(Event::TxPower(dbm));
        Ok(())
    }

    async fn start_advertising(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().events.push(Event::Start);
        Ok(())
    }

    async fn stop_advertising(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().events.push(Event::Stop);
        Ok(())
    }
}
