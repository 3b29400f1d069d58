//! Mapping from user brightness to backlight ladder positions.

use crate::backlight::{
    FLOOR_LEVEL,
    LADDER_SIZE,
};

/// Turns a raw user brightness into a ladder position.
///
/// Implementations must return a value below [`LADDER_SIZE`]; anything else
/// is rejected by the backlight driver.
pub trait Scale {
    fn scale(&self, raw: u8) -> u8;
}

impl<F: Fn(u8) -> u8> Scale for F {
    fn scale(&self, raw: u8) -> u8 {
        self(raw)
    }
}

/// Linear scaling of `1..=max_raw` onto `FLOOR_LEVEL..LADDER_SIZE`, with 0
/// kept as off. Inputs above `max_raw` clamp to the top of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinearScale {
    max_raw: u8,
}

impl Default for LinearScale {
    fn default() -> Self {
        Self::new(u8::MAX)
    }
}

impl LinearScale {
    pub const fn new(max_raw: u8) -> Self {
        Self { max_raw }
    }

    pub const fn max_raw(&self) -> u8 {
        self.max_raw
    }
}

impl Scale for LinearScale {
    fn scale(&self, raw: u8) -> u8 {
        const TOP: u8 = LADDER_SIZE - 1;

        if raw == 0 || self.max_raw == 0 {
            return 0;
        }
        if self.max_raw == 1 {
            return TOP;
        }

        let raw = u32::from(raw.min(self.max_raw) - 1);
        let span = u32::from(TOP - FLOOR_LEVEL);
        let den = u32::from(self.max_raw - 1);
        let step = (raw * span + den / 2) / den;
        // step <= span, so this stays on the ladder.
        FLOOR_LEVEL + step as u8
    }
}
