//! LM3632A panel power IC driver.
//!
//! The IC generates the panel's positive and negative bias rails. It is
//! brought up in a fixed order: primary enable, register configuration over
//! I2C, then the positive rail, then the negative rail. It forgets its
//! registers when the primary enable drops, so power-down is GPIO only.

use embassy_time::Duration;
use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
    i2c::I2c,
};

use crate::{
    Error,
    Result,
    delay::wait,
    registry::{
        ControllerIndex,
        ControllerRegistry,
        Line,
    },
    retry::with_retries,
};

/// 7-bit bus address of the IC.
pub const DEFAULT_ADDRESS: u8 = 0x11;

/// Attempts per register write before giving up.
pub const WRITE_ATTEMPTS: u8 = 3;

const RAIL_SETTLE: Duration = Duration::from_millis(5);
const NO_DELAY: Duration = Duration::from_ticks(0);

/// Last power state applied to a controller's panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Not sequenced since boot, or a sequence was aborted part-way.
    Unknown,
    Off,
    On,
}

/// GPIO lines of the IC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rail {
    /// Primary enable (`EN`).
    Enable,
    /// Positive supply enable (`ENP`).
    Positive,
    /// Negative supply enable (`ENN`).
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerAction {
    Drive { rail: Rail, high: bool },
    WriteRegister { register: u8, value: u8 },
}

/// One entry of a power sequence: an action and the settle time after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerStep {
    pub action: PowerAction,
    pub delay_after: Duration,
}

impl PowerStep {
    const fn drive(rail: Rail, high: bool, delay_after: Duration) -> Self {
        Self {
            action: PowerAction::Drive { rail, high },
            delay_after,
        }
    }

    const fn write(register: u8, value: u8) -> Self {
        Self {
            action: PowerAction::WriteRegister { register, value },
            delay_after: NO_DELAY,
        }
    }
}

/// Power-up: configuration must be complete before either rail comes up,
/// and the positive rail must settle before the negative one.
pub const ENABLE_SEQUENCE: [PowerStep; 14] = [
    PowerStep::drive(Rail::Enable, true, RAIL_SETTLE),
    PowerStep::write(0x09, 0x41),
    PowerStep::write(0x02, 0x50),
    PowerStep::write(0x03, 0x8D),
    PowerStep::write(0x04, 0x07),
    PowerStep::write(0x05, 0xFF),
    PowerStep::write(0x0A, 0x19),
    PowerStep::write(0x0D, 0x1C),
    PowerStep::write(0x0E, 0x1E),
    PowerStep::write(0x0F, 0x1E),
    PowerStep::write(0x0C, 0x1F),
    PowerStep::write(0x11, 0x0D),
    PowerStep::drive(Rail::Positive, true, RAIL_SETTLE),
    PowerStep::drive(Rail::Negative, true, NO_DELAY),
];

/// Power-down, the reverse of [`ENABLE_SEQUENCE`] without register writes.
pub const DISABLE_SEQUENCE: [PowerStep; 3] = [
    PowerStep::drive(Rail::Negative, false, RAIL_SETTLE),
    PowerStep::drive(Rail::Positive, false, NO_DELAY),
    PowerStep::drive(Rail::Enable, false, RAIL_SETTLE),
];

/// The IC's three enable lines.
pub struct Rails<EN, ENP, ENN> {
    pub enable: EN,
    pub positive: ENP,
    pub negative: ENN,
}

/// LM3632A driver bound to one display controller.
pub struct Lm3632a<'r, I2C, EN, ENP, ENN, D> {
    i2c: I2C,
    rails: Rails<EN, ENP, ENN>,
    delay: D,
    address: u8,
    controller: ControllerIndex,
    registry: &'r ControllerRegistry,
}

impl<'r, I2C, EN, ENP, ENN, D> Lm3632a<'r, I2C, EN, ENP, ENN, D>
where
    I2C: I2c,
    EN: OutputPin,
    ENP: OutputPin,
    ENN: OutputPin,
    D: DelayNs,
{
    pub const fn new(
        i2c: I2C,
        rails: Rails<EN, ENP, ENN>,
        delay: D,
        controller: ControllerIndex,
        registry: &'r ControllerRegistry,
    ) -> Self {
        Self {
            i2c,
            rails,
            delay,
            address: DEFAULT_ADDRESS,
            controller,
            registry,
        }
    }

    /// Use a different bus address.
    #[must_use]
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    pub const fn controller(&self) -> ControllerIndex {
        self.controller
    }

    pub const fn registry(&self) -> &'r ControllerRegistry {
        self.registry
    }

    /// Last applied power state, as recorded in the registry.
    pub fn state(&self) -> Result<PowerState> {
        self.registry.power(self.controller)
    }

    /// Run the power-up or power-down sequence.
    ///
    /// On failure the sequence stops where it failed and the recorded state
    /// becomes [`PowerState::Unknown`]; calling again re-runs it from the
    /// start.
    pub fn set_power(&mut self, enable: bool) -> Result<()> {
        if !self.registry.is_valid_controller(self.controller) {
            error!("panel power: invalid controller {}", self.controller.get());
            return Err(Error::InvalidDeviceHandle(self.controller));
        }

        let registry = self.registry;
        let claim = registry.claim(self.controller, Line::Power)?;
        // Requests for the current state still run the full sequence.
        debug!("panel power {:?} -> enable {}", claim.power(), enable);
        let sequence: &[PowerStep] = if enable {
            &ENABLE_SEQUENCE
        } else {
            &DISABLE_SEQUENCE
        };

        match self.run(sequence) {
            Ok(()) => {
                claim.set_power(if enable {
                    PowerState::On
                } else {
                    PowerState::Off
                });
                info!("panel power enable: {}", enable);
                Ok(())
            }
            Err(err) => {
                claim.set_power(PowerState::Unknown);
                error!("panel power sequence aborted: {:?}", err);
                Err(err)
            }
        }
    }

    /// Give back the bus, pins and delay.
    pub fn release(self) -> (I2C, Rails<EN, ENP, ENN>, D) {
        (self.i2c, self.rails, self.delay)
    }

    fn run(&mut self, sequence: &[PowerStep]) -> Result<()> {
        for step in sequence {
            match step.action {
                PowerAction::Drive { rail, high } => self.drive(rail, high)?,
                PowerAction::WriteRegister { register, value } => {
                    self.write_register(register, value)?;
                }
            }
            wait(&mut self.delay, step.delay_after);
        }
        Ok(())
    }

    fn drive(&mut self, rail: Rail, high: bool) -> Result<()> {
        let rails = &mut self.rails;
        match (rail, high) {
            (Rail::Enable, true) => rails.enable.set_high().map_err(Error::gpio),
            (Rail::Enable, false) => rails.enable.set_low().map_err(Error::gpio),
            (Rail::Positive, true) => rails.positive.set_high().map_err(Error::gpio),
            (Rail::Positive, false) => rails.positive.set_low().map_err(Error::gpio),
            (Rail::Negative, true) => rails.negative.set_high().map_err(Error::gpio),
            (Rail::Negative, false) => rails.negative.set_low().map_err(Error::gpio),
        }
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        let address = self.address;
        let i2c = &mut self.i2c;
        with_retries(WRITE_ATTEMPTS, |_| i2c.write(address, &[register, value]))
            .map_err(|err| Error::i2c(register, err))
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use embedded_hal::i2c::{
        ErrorKind,
        NoAcknowledgeSource,
    };

    use super::*;
    use crate::{
        error::TransportFault,
        testing::{
            Event,
            MockDelay,
            MockI2c,
            MockPin,
            Recorder,
            high,
            low,
            wait_ms,
            write,
        },
    };

    type Driver<'r> = Lm3632a<'r, MockI2c, MockPin, MockPin, MockPin, MockDelay>;

    fn driver<'r>(rec: &Recorder, registry: &'r ControllerRegistry) -> Driver<'r> {
        Lm3632a::new(
            rec.i2c(),
            Rails {
                enable: rec.pin("en"),
                positive: rec.pin("enp"),
                negative: rec.pin("enn"),
            },
            rec.delay(),
            ControllerIndex::PRIMARY,
            registry,
        )
    }

    const CONFIGURATION: [(u8, u8); 11] = [
        (0x09, 0x41),
        (0x02, 0x50),
        (0x03, 0x8D),
        (0x04, 0x07),
        (0x05, 0xFF),
        (0x0A, 0x19),
        (0x0D, 0x1C),
        (0x0E, 0x1E),
        (0x0F, 0x1E),
        (0x0C, 0x1F),
        (0x11, 0x0D),
    ];

    fn enable_events(address: u8) -> Vec<Event> {
        let mut events = vec![high("en"), wait_ms(5)];
        events.extend(
            CONFIGURATION
                .iter()
                .map(|&(register, value)| write(address, register, value)),
        );
        events.extend([high("enp"), wait_ms(5), high("enn")]);
        events
    }

    #[test]
    fn enable_configures_before_rails() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry);

        power.set_power(true).unwrap();

        assert_eq!(rec.events(), enable_events(DEFAULT_ADDRESS));
        assert_eq!(power.state(), Ok(PowerState::On));
    }

    #[test]
    fn disable_reverses_rails_without_bus_traffic() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry);

        power.set_power(false).unwrap();

        assert_eq!(
            rec.events(),
            [
                low("enn"),
                wait_ms(5),
                low("enp"),
                low("en"),
                wait_ms(5)
            ]
        );
        assert_eq!(power.state(), Ok(PowerState::Off));
    }

    #[test]
    fn sequence_tables_hold_eleven_writes_between_rails() {
        let writes = ENABLE_SEQUENCE
            .iter()
            .filter(|step| matches!(step.action, PowerAction::WriteRegister { .. }))
            .count();
        assert_eq!(writes, CONFIGURATION.len());
        assert!(
            DISABLE_SEQUENCE
                .iter()
                .all(|step| matches!(step.action, PowerAction::Drive { .. }))
        );
    }

    #[test]
    fn write_succeeding_on_third_attempt_continues() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry);
        rec.fail_next_writes(2);

        power.set_power(true).unwrap();

        let failed = Event::WriteFailed {
            address: DEFAULT_ADDRESS,
            bytes: vec![0x09, 0x41],
        };
        assert_eq!(rec.count(&failed), 2);
        assert_eq!(rec.count(&write(DEFAULT_ADDRESS, 0x09, 0x41)), 1);
        assert_eq!(rec.count(&write(DEFAULT_ADDRESS, 0x02, 0x50)), 1);
        assert_eq!(rec.events().last(), Some(&high("enn")));
        assert_eq!(power.state(), Ok(PowerState::On));
    }

    #[test]
    fn exhausted_retries_abort_before_rails() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry);
        rec.fail_next_writes(usize::from(WRITE_ATTEMPTS));

        assert_eq!(
            power.set_power(true),
            Err(Error::Transport(TransportFault::I2c {
                register: 0x09,
                kind: ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            }))
        );
        assert_eq!(rec.count(&high("enp")), 0);
        assert_eq!(rec.count(&high("enn")), 0);
        assert_eq!(rec.count(&write(DEFAULT_ADDRESS, 0x02, 0x50)), 0);
        assert_eq!(power.state(), Ok(PowerState::Unknown));
    }

    #[test]
    fn failed_sequence_can_be_reissued() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry);
        rec.fail_next_writes(usize::from(WRITE_ATTEMPTS));
        assert!(power.set_power(true).is_err());
        rec.take();

        power.set_power(true).unwrap();

        assert_eq!(rec.events(), enable_events(DEFAULT_ADDRESS));
        assert_eq!(power.state(), Ok(PowerState::On));
    }

    #[test]
    fn repeated_enable_resequences() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry);

        power.set_power(true).unwrap();
        rec.take();
        power.set_power(true).unwrap();

        assert_eq!(rec.events(), enable_events(DEFAULT_ADDRESS));
        assert_eq!(power.state(), Ok(PowerState::On));
    }

    #[test]
    fn custom_address_is_used_for_every_write() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry).with_address(0x3E);

        power.set_power(true).unwrap();

        assert_eq!(rec.events(), enable_events(0x3E));
    }

    #[test]
    fn rail_failure_is_a_transport_error() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry);
        rec.fail_pin("enp");

        assert!(matches!(
            power.set_power(true),
            Err(Error::Transport(TransportFault::Gpio { .. }))
        ));
        assert_eq!(rec.count(&high("enn")), 0);
        assert_eq!(power.state(), Ok(PowerState::Unknown));
    }

    #[test]
    fn reentry_on_same_controller_is_refused() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let mut power = driver(&rec, &registry);
        let _held = registry
            .claim(ControllerIndex::PRIMARY, Line::Power)
            .unwrap();

        assert_eq!(
            power.set_power(true),
            Err(Error::Busy(ControllerIndex::PRIMARY))
        );
        assert!(rec.events().is_empty());
    }

    #[test]
    fn invalid_controller_touches_nothing() {
        let rec = Recorder::new();
        let registry = ControllerRegistry::new();
        let index = ControllerIndex::new(9);
        let mut power = Lm3632a::new(
            rec.i2c(),
            Rails {
                enable: rec.pin("en"),
                positive: rec.pin("enp"),
                negative: rec.pin("enn"),
            },
            rec.delay(),
            index,
            &registry,
        );

        assert_eq!(
            power.set_power(true),
            Err(Error::InvalidDeviceHandle(index))
        );
        assert!(rec.events().is_empty());
    }
}
