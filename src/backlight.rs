//! KTD3102 backlight IC driver.
//!
//! The IC has no register interface. It is powered through an enable line
//! and stepped through a 32-position brightness ladder by pulsing its control
//! line: every low-to-high edge advances the ladder by one, wrapping from
//! the top back to the bottom. The driver can therefore only ever move
//! forward, and needs to remember where it left the ladder.
//!
//! The remembered position lives in the [`ControllerRegistry`], one slot per
//! display controller.

use embassy_time::Duration;
use embedded_hal::{
    delay::DelayNs,
    digital::{
        InputPin,
        OutputPin,
    },
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
};

/// Number of positions on the IC's brightness ladder.
pub const LADDER_SIZE: u8 = 32;

/// Ladder position the IC sits at right after power-on.
pub const FLOOR_LEVEL: u8 = 1;

const SHUTDOWN_SETTLE: Duration = Duration::from_millis(3);
const ENABLE_SETTLE: Duration = Duration::from_millis(1);
const CTRL_SETTLE: Duration = Duration::from_micros(100);
const PULSE_EDGE: Duration = Duration::from_micros(2);

/// Last level applied to a backlight IC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LevelState {
    /// Nothing applied since boot; the IC may have been left on.
    Uninitialized,
    Off,
    /// On at the given ladder position. `On(FLOOR_LEVEL)` is the state
    /// straight after power-on.
    On(u8),
}

impl LevelState {
    /// Ladder position, with `Off` as 0. `None` until the first update.
    pub const fn level(self) -> Option<u8> {
        match self {
            Self::Uninitialized => None,
            Self::Off => Some(0),
            Self::On(level) => Some(level),
        }
    }
}

/// The two lines of the IC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BacklightPin {
    Enable,
    Ctrl,
}

/// One hardware step of a brightness change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    Assert(BacklightPin),
    Deassert(BacklightPin),
    Wait(Duration),
}

use Action::{
    Assert,
    Deassert,
    Wait,
};
use BacklightPin::{
    Ctrl,
    Enable,
};

const RECONCILE: [Action; 2] = [Deassert(Ctrl), Wait(SHUTDOWN_SETTLE)];
const SHUTDOWN: [Action; 3] = [Deassert(Ctrl), Wait(SHUTDOWN_SETTLE), Deassert(Enable)];
const POWER_ON: [Action; 4] = [
    Assert(Enable),
    Wait(ENABLE_SETTLE),
    Assert(Ctrl),
    Wait(CTRL_SETTLE),
];
const PULSE: [Action; 4] = [
    Deassert(Ctrl),
    Wait(PULSE_EDGE),
    Assert(Ctrl),
    Wait(PULSE_EDGE),
];

/// Number of control pulses that move the ladder from `from` to `to`.
///
/// Always in `[0, LADDER_SIZE)`; moving down wraps through the top.
pub const fn pulse_count(from: u8, to: u8) -> u8 {
    let from = from % LADDER_SIZE;
    let to = to % LADDER_SIZE;
    (to + LADDER_SIZE - from) % LADDER_SIZE
}

/// A planned brightness change.
///
/// Planning is pure; [`Ktd3102`] executes the resulting actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    /// Pull down an IC the bootloader left running before powering it on.
    pub reconcile: bool,
    pub shutdown: bool,
    pub power_on: bool,
    pub pulses: u8,
    pub target: LevelState,
}

impl Transition {
    /// Plan the move from `state` to `level`.
    ///
    /// `ctrl_high` is the probed control line and only matters when `state`
    /// is [`LevelState::Uninitialized`].
    pub fn plan(state: LevelState, level: u8, ctrl_high: bool) -> Result<Self> {
        if level >= LADDER_SIZE {
            return Err(Error::OutOfRangeLevel(level));
        }

        if level == 0 {
            return Ok(Self {
                reconcile: false,
                shutdown: true,
                power_on: false,
                pulses: 0,
                target: LevelState::Off,
            });
        }

        // A control line left high means the IC is running, but at an
        // unknown ladder position. It is taken to be at the floor.
        let (reconcile, power_on, from) = match state {
            LevelState::Uninitialized => (ctrl_high, true, FLOOR_LEVEL),
            LevelState::Off => (false, true, FLOOR_LEVEL),
            LevelState::On(current) => (false, false, current),
        };

        Ok(Self {
            reconcile,
            shutdown: false,
            power_on,
            pulses: pulse_count(from, level),
            target: LevelState::On(level),
        })
    }

    /// Everything before the pulse train: reconciliation, shutdown or
    /// power-on.
    pub fn setup(self) -> impl Iterator<Item = Action> {
        let reconcile = self.reconcile.then_some(RECONCILE);
        let shutdown = self.shutdown.then_some(SHUTDOWN);
        let power_on = self.power_on.then_some(POWER_ON);
        reconcile
            .into_iter()
            .flatten()
            .chain(shutdown.into_iter().flatten())
            .chain(power_on.into_iter().flatten())
    }

    /// The timing-critical pulse train.
    pub fn pulse_train(self) -> impl Iterator<Item = Action> {
        core::iter::repeat(PULSE)
            .take(usize::from(self.pulses))
            .flatten()
    }

    /// All actions in order.
    pub fn actions(self) -> impl Iterator<Item = Action> {
        self.setup().chain(self.pulse_train())
    }
}

/// KTD3102 driver bound to one display controller.
pub struct Ktd3102<'r, EN, CTRL, D> {
    enable: EN,
    ctrl: CTRL,
    delay: D,
    controller: ControllerIndex,
    registry: &'r ControllerRegistry,
}

impl<'r, EN, CTRL, D> Ktd3102<'r, EN, CTRL, D>
where
    EN: OutputPin,
    CTRL: OutputPin + InputPin,
    D: DelayNs,
{
    /// Bind the IC's lines to a controller slot.
    ///
    /// Pins are left untouched so that an IC the bootloader left on is
    /// detected on the first update. The probe reads the control line's pad
    /// level, so `ctrl` must read back what the line is actually at, not
    /// just what was last written to it.
    pub const fn new(
        enable: EN,
        ctrl: CTRL,
        delay: D,
        controller: ControllerIndex,
        registry: &'r ControllerRegistry,
    ) -> Self {
        Self {
            enable,
            ctrl,
            delay,
            controller,
            registry,
        }
    }

    pub const fn controller(&self) -> ControllerIndex {
        self.controller
    }

    pub const fn registry(&self) -> &'r ControllerRegistry {
        self.registry
    }

    /// Last applied level, as recorded in the registry.
    pub fn state(&self) -> Result<LevelState> {
        self.registry.level(self.controller)
    }

    /// Move the IC to ladder position `level`; 0 switches it off.
    ///
    /// On a transport failure the slot is reset to
    /// [`LevelState::Uninitialized`] so the next call re-probes the IC.
    pub fn set_level(&mut self, level: u8) -> Result<()> {
        if !self.registry.is_valid_controller(self.controller) {
            error!("backlight: invalid controller {}", self.controller.get());
            return Err(Error::InvalidDeviceHandle(self.controller));
        }
        if level >= LADDER_SIZE {
            error!("backlight: level {} out of range", level);
            return Err(Error::OutOfRangeLevel(level));
        }

        let registry = self.registry;
        let claim = registry.claim(self.controller, Line::Backlight)?;
        let state = claim.level();

        let ctrl_high = if state == LevelState::Uninitialized && level != 0 {
            self.ctrl.is_high().map_err(Error::gpio)?
        } else {
            false
        };

        let transition = Transition::plan(state, level, ctrl_high)?;
        if transition.reconcile {
            warn!("backlight IC left on at boot, assuming floor level");
        }
        debug!(
            "backlight {:?} -> {}, {} pulses",
            state, level, transition.pulses
        );

        match self.run(transition) {
            Ok(()) => {
                claim.set_level(transition.target);
                if transition.shutdown {
                    info!("backlight IC off");
                }
                Ok(())
            }
            Err(err) => {
                claim.set_level(LevelState::Uninitialized);
                error!("backlight update to {} failed: {:?}", level, err);
                Err(err)
            }
        }
    }

    /// Switch the IC off.
    pub fn off(&mut self) -> Result<()> {
        self.set_level(0)
    }

    /// Give back the pins and delay.
    pub fn release(self) -> (EN, CTRL, D) {
        (self.enable, self.ctrl, self.delay)
    }

    fn run(&mut self, transition: Transition) -> Result<()> {
        for action in transition.setup() {
            self.apply(action)?;
        }
        if transition.power_on {
            info!("backlight IC on");
        }
        if transition.pulses == 0 {
            return Ok(());
        }
        // The IC counts edges; nothing may stretch or split the train.
        critical_section::with(|_| {
            transition
                .pulse_train()
                .try_for_each(|action| self.apply(action))
        })
    }

    fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Assert(Enable) => self.enable.set_high().map_err(Error::gpio),
            Deassert(Enable) => self.enable.set_low().map_err(Error::gpio),
            Assert(Ctrl) => self.ctrl.set_high().map_err(Error::gpio),
            Deassert(Ctrl) => self.ctrl.set_low().map_err(Error::gpio),
            Wait(duration) => {
                wait(&mut self.delay, duration);
                Ok(())
            }
        }
    }
}
