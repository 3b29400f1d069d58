//! Per-controller state shared by the backlight and power drivers.
//!
//! Each display controller (DSI link) gets one slot holding the last applied
//! backlight level, the last applied power state and whether a panel is
//! attached. Drivers borrow a registry by reference; [`CONTROLLERS`] is the
//! process-wide instance that lives for as long as the firmware runs.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{
    Mutex,
    raw::CriticalSectionRawMutex,
};

use crate::{
    Error,
    Result,
    backlight::LevelState,
    power::PowerState,
};

/// Number of display controllers the registry tracks.
pub const MAX_CONTROLLERS: usize = 2;

/// The process-wide controller registry.
pub static CONTROLLERS: ControllerRegistry = ControllerRegistry::new();

/// Index of a display controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerIndex(u8);

impl ControllerIndex {
    pub const PRIMARY: Self = Self(0);
    pub const SECONDARY: Self = Self(1);

    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for ControllerIndex {
    fn default() -> Self {
        Self::PRIMARY
    }
}

/// Which hardware line a [`Claim`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Line {
    Backlight,
    Power,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    attached: bool,
    level: LevelState,
    power: PowerState,
    backlight_claimed: bool,
    power_claimed: bool,
}

impl Slot {
    const BOOT: Self = Self {
        attached: false,
        level: LevelState::Uninitialized,
        power: PowerState::Unknown,
        backlight_claimed: false,
        power_claimed: false,
    };

    const fn claimed(&self, line: Line) -> bool {
        match line {
            Line::Backlight => self.backlight_claimed,
            Line::Power => self.power_claimed,
        }
    }

    const fn set_claimed(&mut self, line: Line, claimed: bool) {
        match line {
            Line::Backlight => self.backlight_claimed = claimed,
            Line::Power => self.power_claimed = claimed,
        }
    }
}

type SlotCell = Mutex<CriticalSectionRawMutex, Cell<Slot>>;

fn update<R>(slot: &SlotCell, f: impl FnOnce(&mut Slot) -> R) -> R {
    slot.lock(|cell| {
        let mut state = cell.get();
        let result = f(&mut state);
        cell.set(state);
        result
    })
}

/// Registry of controller slots, guarded by a critical-section mutex.
pub struct ControllerRegistry {
    slots: [SlotCell; MAX_CONTROLLERS],
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerRegistry {
    pub const fn new() -> Self {
        Self {
            slots: [const { Mutex::new(Cell::new(Slot::BOOT)) }; MAX_CONTROLLERS],
        }
    }

    /// Whether `index` names a controller this registry tracks.
    pub fn is_valid_controller(&self, index: ControllerIndex) -> bool {
        usize::from(index.get()) < MAX_CONTROLLERS
    }

    fn slot(&self, index: ControllerIndex) -> Result<&SlotCell> {
        self.slots.get(usize::from(index.get())).ok_or_else(|| {
            error!("invalid controller index {}", index.get());
            Error::InvalidDeviceHandle(index)
        })
    }

    /// Mark a panel as attached to (or detached from) the controller.
    pub fn set_attached(&self, index: ControllerIndex, attached: bool) -> Result<()> {
        update(self.slot(index)?, |slot| slot.attached = attached);
        Ok(())
    }

    pub fn is_attached(&self, index: ControllerIndex) -> Result<bool> {
        Ok(update(self.slot(index)?, |slot| slot.attached))
    }

    /// Last applied backlight level.
    pub fn level(&self, index: ControllerIndex) -> Result<LevelState> {
        Ok(update(self.slot(index)?, |slot| slot.level))
    }

    /// Last applied power state.
    pub fn power(&self, index: ControllerIndex) -> Result<PowerState> {
        Ok(update(self.slot(index)?, |slot| slot.power))
    }

    /// Return a slot to its boot state, as after a driver rebind.
    ///
    /// Fails with [`Error::Busy`] if a sequence is in progress.
    pub fn reset(&self, index: ControllerIndex) -> Result<()> {
        update(self.slot(index)?, |slot| {
            if slot.backlight_claimed || slot.power_claimed {
                return Err(Error::Busy(index));
            }
            *slot = Slot::BOOT;
            Ok(())
        })
    }

    /// Take exclusive use of one line of a controller until the returned
    /// claim is dropped.
    pub(crate) fn claim(&self, index: ControllerIndex, line: Line) -> Result<Claim<'_>> {
        let slot = self.slot(index)?;
        let acquired = update(slot, |state| {
            if state.claimed(line) {
                false
            } else {
                state.set_claimed(line, true);
                true
            }
        });
        if !acquired {
            warn!("controller {} busy ({:?})", index.get(), line);
            return Err(Error::Busy(index));
        }
        Ok(Claim { slot, line })
    }
}

/// Exclusive hold on one line of a controller slot.
pub(crate) struct Claim<'r> {
    slot: &'r SlotCell,
    line: Line,
}

impl Claim<'_> {
    pub fn level(&self) -> LevelState {
        update(self.slot, |slot| slot.level)
    }

    pub fn set_level(&self, level: LevelState) {
        update(self.slot, |slot| slot.level = level);
    }

    pub fn power(&self) -> PowerState {
        update(self.slot, |slot| slot.power)
    }

    pub fn set_power(&self, power: PowerState) {
        update(self.slot, |slot| slot.power = power);
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let line = self.line;
        update(self.slot, |slot| slot.set_claimed(line, false));
    }
}
