//! Test doubles shared by the unit tests.

use core::convert::Infallible;
use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::Timer;
use crate::interface::{Interface, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Pin and delay activity in call order, per test thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Pin(Level),
    Delay(u64),
}

thread_local! {
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
}

pub fn take_events() -> Vec<Event> {
    EVENTS.with(|events| events.take())
}

fn record(event: Event) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

/// Output pin that remembers every level it was driven to.
#[derive(Debug, Default, Clone)]
pub struct LevelPin {
    levels: Rc<RefCell<Vec<Level>>>,
}

impl LevelPin {
    pub fn levels(&self) -> Rc<RefCell<Vec<Level>>> {
        self.levels.clone()
    }

    fn drive(&mut self, level: Level) {
        self.levels.borrow_mut().push(level);
        record(Event::Pin(level));
    }
}

impl ErrorType for LevelPin {
    type Error = Infallible;
}

impl OutputPin for LevelPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(Level::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(Level::High);
        Ok(())
    }
}

pub struct LoggingTimer;

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "LoggingTimer",),
    async(feature = "async", keep_self)
)]
impl Timer for LoggingTimer {
    async fn delay_ms(milliseconds: u64) {
        record(Event::Delay(milliseconds));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Address(u8),
    Init,
    Begin,
    End,
    Burst(Mode, Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

/// Transport that logs every call and enforces its burst limit.
pub struct Recorder {
    ops: Rc<RefCell<Vec<Op>>>,
    limit: usize,
    pub fail_data: bool,
}

impl Recorder {
    pub fn new(limit: usize) -> Self {
        Self {
            ops: Rc::default(),
            limit,
            fail_data: false,
        }
    }

    pub fn ops(&self) -> Rc<RefCell<Vec<Op>>> {
        self.ops.clone()
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Recorder",),
    async(feature = "async", keep_self)
)]
impl Interface for Recorder {
    type Error = BusFault;

    fn max_burst(&self) -> usize {
        self.limit
    }

    fn set_address(&mut self, address: u8) {
        self.ops.borrow_mut().push(Op::Address(address));
    }

    async fn init(&mut self) -> Result<(), Self::Error> {
        self.ops.borrow_mut().push(Op::Init);
        Ok(())
    }

    async fn begin_session(&mut self) -> Result<(), Self::Error> {
        self.ops.borrow_mut().push(Op::Begin);
        Ok(())
    }

    async fn end_session(&mut self) -> Result<(), Self::Error> {
        self.ops.borrow_mut().push(Op::End);
        Ok(())
    }

    async fn write_burst(&mut self, mode: Mode, payload: &[u8]) -> Result<(), Self::Error> {
        assert!(!payload.is_empty());
        assert!(payload.len() < self.limit, "burst of {} over limit {}", payload.len() + 1, self.limit);
        if self.fail_data && mode == Mode::Data {
            return Err(BusFault);
        }
        self.ops.borrow_mut().push(Op::Burst(mode, payload.to_vec()));
        Ok(())
    }
}
