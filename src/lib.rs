//! # tftpanel
//!
//! Power and backlight control for TFT display panels.
//!
//! Covers the parts of a panel that live outside the display controller:
//! - **Backlight**: KTD3102 single-wire backlight IC, stepped through its
//!   32-position brightness ladder by pulses on a control line
//! - **Power**: LM3632A bias supply, configured over I2C and sequenced
//!   through three enable lines
//! - **Panels**: per-model hooks the display subsystem calls around panel
//!   on/off, brightness and power changes
//! - **Registry**: per-controller record of the last applied level and
//!   power state, shared between the drivers
//!
//! Drivers are generic over `embedded-hal` traits. With the `esp32s3`
//! feature, [`board`] binds them to pins.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let mut backlight = tftpanel::Ktd3102::new(
//!     enable_pin,
//!     ctrl_pin,
//!     delay,
//!     tftpanel::ControllerIndex::PRIMARY,
//!     &tftpanel::CONTROLLERS,
//! );
//! backlight.set_level(12)?;
//! backlight.off()?;
//! ```

#![cfg_attr(not(test), no_std)]

// Must come first: the logging macros are textually scoped.
#[macro_use]
mod fmt;

mod backlight;
#[cfg(feature = "esp32s3")]
pub mod board;
mod config;
mod delay;
mod error;
pub mod panel;
pub mod power;
mod registry;
mod retry;
mod scale;
#[cfg(test)]
mod testing;

pub use backlight::{
    Action,
    BacklightPin,
    FLOOR_LEVEL,
    Ktd3102,
    LADDER_SIZE,
    LevelState,
    Transition,
    pulse_count,
};
pub use config::PanelConfig;
pub use error::{
    Error,
    Result,
    TransportFault,
};
pub use panel::{
    GpioSupply,
    Panel,
    PanelModel,
    S6d7at0b01,
    S6d78a0,
    Supply,
};
pub use power::{
    Lm3632a,
    PowerState,
    Rails,
};
pub use registry::{
    CONTROLLERS,
    ControllerIndex,
    ControllerRegistry,
    MAX_CONTROLLERS,
};
pub use retry::with_retries;
pub use scale::{
    LinearScale,
    Scale,
};
