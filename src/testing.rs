//! Host-side fakes for pins, bus and delay that log every operation into a
//! shared timeline, so tests can assert the exact order of hardware actions.

use std::{
    cell::RefCell,
    rc::Rc,
    vec::Vec,
};

use embedded_hal::{
    delay::DelayNs,
    digital::{
        self,
        InputPin,
        OutputPin,
        StatefulOutputPin,
    },
    i2c::{
        self,
        I2c,
        NoAcknowledgeSource,
        Operation,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    High(&'static str),
    Low(&'static str),
    Write { address: u8, bytes: Vec<u8> },
    WriteFailed { address: u8, bytes: Vec<u8> },
    /// Blocking delay, in microseconds.
    Wait(u64),
}

pub fn high(pin: &'static str) -> Event {
    Event::High(pin)
}

pub fn low(pin: &'static str) -> Event {
    Event::Low(pin)
}

pub fn wait_us(us: u64) -> Event {
    Event::Wait(us)
}

pub fn wait_ms(ms: u64) -> Event {
    Event::Wait(ms * 1_000)
}

pub fn write(address: u8, register: u8, value: u8) -> Event {
    Event::Write {
        address,
        bytes: vec![register, value],
    }
}

#[derive(Default)]
struct Timeline {
    events: Vec<Event>,
    failing_writes: usize,
    failing_pins: Vec<&'static str>,
}

/// Shared handle to the timeline; clones observe the same events.
#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Timeline>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&self, name: &'static str) -> MockPin {
        MockPin {
            name,
            latched: false,
            pad: false,
            timeline: self.clone(),
        }
    }

    /// A pin that reads back high before anything drives it, as if a
    /// bootloader had left it asserted.
    pub fn pin_left_high(&self, name: &'static str) -> MockPin {
        MockPin {
            latched: true,
            pad: true,
            ..self.pin(name)
        }
    }

    /// A pin whose output latch says high while the pad reads low, as with
    /// a HAL output constructed high over a line that is not yet driven.
    pub fn pin_latched_high(&self, name: &'static str) -> MockPin {
        MockPin {
            latched: true,
            ..self.pin(name)
        }
    }

    pub fn i2c(&self) -> MockI2c {
        MockI2c {
            timeline: self.clone(),
        }
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay {
            timeline: self.clone(),
        }
    }

    /// Make the next `count` bus writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.0.borrow_mut().failing_writes = count;
    }

    /// Make every operation on `pin` fail.
    pub fn fail_pin(&self, pin: &'static str) {
        self.0.borrow_mut().failing_pins.push(pin);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    /// Drain the timeline.
    pub fn take(&self) -> Vec<Event> {
        core::mem::take(&mut self.0.borrow_mut().events)
    }

    pub fn count(&self, event: &Event) -> usize {
        self.0.borrow().events.iter().filter(|e| *e == event).count()
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }

    fn pin_fails(&self, pin: &'static str) -> bool {
        self.0.borrow().failing_pins.contains(&pin)
    }

    fn write_fails(&self) -> bool {
        let mut timeline = self.0.borrow_mut();
        if timeline.failing_writes > 0 {
            timeline.failing_writes -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Driving the pin moves both the latch and the pad; they only differ in
/// the state a pin is created with.
pub struct MockPin {
    name: &'static str,
    latched: bool,
    pad: bool,
    timeline: Recorder,
}

impl digital::ErrorType for MockPin {
    type Error = PinFault;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), PinFault> {
        if self.timeline.pin_fails(self.name) {
            return Err(PinFault);
        }
        self.latched = false;
        self.pad = false;
        self.timeline.push(Event::Low(self.name));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        if self.timeline.pin_fails(self.name) {
            return Err(PinFault);
        }
        self.latched = true;
        self.pad = true;
        self.timeline.push(Event::High(self.name));
        Ok(())
    }
}

impl StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> Result<bool, PinFault> {
        Ok(self.latched)
    }

    fn is_set_low(&mut self) -> Result<bool, PinFault> {
        Ok(!self.latched)
    }
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, PinFault> {
        Ok(self.pad)
    }

    fn is_low(&mut self) -> Result<bool, PinFault> {
        Ok(!self.pad)
    }
}

#[derive(Debug)]
pub struct BusFault;

impl i2c::Error for BusFault {
    fn kind(&self) -> i2c::ErrorKind {
        i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

pub struct MockI2c {
    timeline: Recorder,
}

impl i2c::ErrorType for MockI2c {
    type Error = BusFault;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), BusFault> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    let bytes = bytes.to_vec();
                    if self.timeline.write_fails() {
                        self.timeline.push(Event::WriteFailed { address, bytes });
                        return Err(BusFault);
                    }
                    self.timeline.push(Event::Write { address, bytes });
                }
                Operation::Read(buffer) => buffer.fill(0),
            }
        }
        Ok(())
    }
}

pub struct MockDelay {
    timeline: Recorder,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.timeline.push(Event::Wait(u64::from(ns) / 1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.timeline.push(Event::Wait(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.timeline.push(Event::Wait(u64::from(ms) * 1_000));
    }
}
