//! Blocking waits expressed as `embassy_time::Duration`.

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;

/// Block for `duration`, using millisecond granularity when it divides
/// evenly. Zero-length waits do nothing.
pub(crate) fn wait(delay: &mut impl DelayNs, duration: Duration) {
    let us = duration.as_micros();
    if us == 0 {
        return;
    }
    if us % 1_000 == 0 {
        delay.delay_ms(u32::try_from(us / 1_000).unwrap_or(u32::MAX));
    } else {
        delay.delay_us(u32::try_from(us).unwrap_or(u32::MAX));
    }
}
