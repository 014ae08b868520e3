//! Pin-level HX711 simulation for unit tests
//!
//! Both pins share one device state. Every rising clock edge advances the
//! frame by one bit; edges past the 24th are counted as gain pulses and the
//! frame is closed the next time the data line is polled.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_timers::clock::Clock;
use embedded_timers::instant::Instant64;

/// Simulated clock, every `now()` advances one microsecond
pub struct SimClock {
    micros: Cell<u64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            micros: Cell::new(0),
        }
    }

    /// Microseconds elapsed so far
    pub fn micros(&self) -> u64 {
        self.micros.get()
    }
}

impl Clock for SimClock {
    type Instant = Instant64<1_000_000>;

    fn now(&self) -> Self::Instant {
        let micros = self.micros.get() + 1;
        self.micros.set(micros);
        Instant64::new(micros)
    }
}

const DATA_BITS: u32 = 24;

struct State {
    /// 24-bit raw samples, the last one repeats forever
    samples: Vec<u32>,
    next: usize,
    /// Polls answered "busy" before each frame, `usize::MAX` means never ready
    busy_polls: usize,
    busy_left: usize,
    clock_level: bool,
    /// Rising edges since the current frame started
    edges: u32,
    polls: usize,
    gain_log: Vec<u8>,
}

impl State {
    /// Close a frame whose data bits and gain pulses have all been clocked
    fn settle(&mut self) {
        if self.edges > DATA_BITS {
            self.gain_log.push((self.edges - DATA_BITS) as u8);
            self.edges = 0;
            if self.next + 1 < self.samples.len() {
                self.next += 1;
            }
            self.busy_left = self.busy_polls;
        }
    }

    fn data_level(&mut self) -> bool {
        self.settle();
        if self.edges == 0 {
            self.polls += 1;
            if self.busy_left > 0 {
                if self.busy_left != usize::MAX {
                    self.busy_left -= 1;
                }
                return true;
            }
            return false;
        }
        let bit = DATA_BITS - self.edges.min(DATA_BITS);
        (self.samples[self.next] >> bit) & 1 != 0
    }

    fn set_clock(&mut self, high: bool) {
        if high && !self.clock_level {
            self.edges += 1;
        }
        self.clock_level = high;
    }
}

/// Simulated HX711 handing out its two pins
#[derive(Clone)]
pub struct SimDevice {
    state: Rc<RefCell<State>>,
}

impl SimDevice {
    /// A device that delivers the given samples in order
    pub fn sequence(samples: &[i32]) -> Self {
        assert!(!samples.is_empty());
        Self::from_raw(samples.iter().map(|v| *v as u32 & 0x00FF_FFFF).collect())
    }

    /// A device that always delivers the same sample
    pub fn constant(value: i32) -> Self {
        Self::sequence(&[value])
    }

    /// A device that always delivers the same 24-bit pattern
    pub fn raw(bits: u32) -> Self {
        Self::from_raw(vec![bits & 0x00FF_FFFF])
    }

    fn from_raw(samples: Vec<u32>) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                samples,
                next: 0,
                busy_polls: 0,
                busy_left: 0,
                clock_level: false,
                edges: 0,
                polls: 0,
                gain_log: Vec::new(),
            })),
        }
    }

    /// Report busy for `polls` polls before every frame
    pub fn busy_polls(self, polls: usize) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.busy_polls = polls;
            state.busy_left = polls;
        }
        self
    }

    /// A device that never latches a conversion
    pub fn never_ready(self) -> Self {
        self.busy_polls(usize::MAX)
    }

    /// Replace the load, all following frames deliver `value`
    pub fn load(&self, value: i32) {
        let mut state = self.state.borrow_mut();
        state.settle();
        state.samples = vec![value as u32 & 0x00FF_FFFF];
        state.next = 0;
    }

    pub fn clock_pin(&self) -> SimClockPin {
        SimClockPin(self.state.clone())
    }

    pub fn data_pin(&self) -> SimDataPin {
        SimDataPin(self.state.clone())
    }

    pub fn clock_level(&self) -> bool {
        self.state.borrow().clock_level
    }

    pub fn set_clock_level(&self, high: bool) {
        self.state.borrow_mut().clock_level = high;
    }

    /// Readiness polls seen so far
    pub fn polls(&self) -> usize {
        self.state.borrow().polls
    }

    /// Gain pulse count of every completed frame
    pub fn gain_log(&self) -> Vec<u8> {
        let mut state = self.state.borrow_mut();
        state.settle();
        state.gain_log.clone()
    }

    pub fn frames(&self) -> usize {
        self.gain_log().len()
    }

    pub fn last_gain_pulses(&self) -> Option<u8> {
        self.gain_log().last().copied()
    }
}

pub struct SimClockPin(Rc<RefCell<State>>);

impl ErrorType for SimClockPin {
    type Error = Infallible;
}

impl OutputPin for SimClockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().set_clock(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().set_clock(true);
        Ok(())
    }
}

pub struct SimDataPin(Rc<RefCell<State>>);

impl ErrorType for SimDataPin {
    type Error = Infallible;
}

impl InputPin for SimDataPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow_mut().data_level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow_mut().data_level())
    }
}
