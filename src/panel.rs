//! Panel models and the hooks the display subsystem calls on them.
//!
//! Each supported panel implements [`Panel`]. Hooks a panel has nothing to
//! do for keep the default, which only validates the controller. The model
//! is picked once, at configuration time, from the panel string the
//! bootloader hands over (see [`PanelModel::from_panel_string`]).

use embedded_hal::{
    delay::DelayNs,
    digital::{
        InputPin,
        OutputPin,
    },
    i2c::I2c,
};

use crate::{
    Error,
    Result,
    backlight::Ktd3102,
    power::Lm3632a,
    registry::{
        ControllerIndex,
        ControllerRegistry,
    },
    scale::{
        LinearScale,
        Scale,
    },
};

/// Length of the `"<n>:dsi:<n>:"` header in front of the panel name.
pub const PANEL_STRING_PREFIX_LEN: usize = 8;

/// Supported panel models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelModel {
    /// S6D78A0 driver IC on a BV050SQM glass, KTD3102 backlight.
    S6d78a0Bv050sqm,
    /// S6D7AT0B01 driver IC on a PM6003XB1 glass, LM3632A power.
    S6d7at0b01Pm6003xb1,
}

impl PanelModel {
    pub const ALL: [Self; 2] = [Self::S6d78a0Bv050sqm, Self::S6d7at0b01Pm6003xb1];

    /// Panel name as it appears in the bootloader panel string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::S6d78a0Bv050sqm => "ss_dsi_panel_S6D78A0_BV050SQM_QHD",
            Self::S6d7at0b01Pm6003xb1 => "ss_dsi_panel_S6D7AT0B01_PM6003XB1_WXGA",
        }
    }

    /// Pick the model named by a bootloader panel string such as
    /// `"1:dsi:0:ss_dsi_panel_S6D78A0_BV050SQM_QHD:config0"`.
    pub fn from_panel_string(panel: &str) -> Option<Self> {
        let name = panel.get(PANEL_STRING_PREFIX_LEN..)?;
        Self::ALL
            .into_iter()
            .find(|model| name.starts_with(model.name()))
    }
}

/// A switchable supply, such as the backlight IC's input regulator.
pub trait Supply {
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;
}

/// No supply control on this board.
impl Supply for () {
    fn set_enabled(&mut self, _enabled: bool) -> Result<()> {
        Ok(())
    }
}

/// Supply switched by a GPIO, active high.
pub struct GpioSupply<P> {
    pin: P,
}

impl<P: OutputPin> GpioSupply<P> {
    pub const fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> Supply for GpioSupply<P> {
    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.pin.set_high().map_err(Error::gpio)
        } else {
            self.pin.set_low().map_err(Error::gpio)
        }
    }
}

/// Hooks the display subsystem invokes on a panel.
pub trait Panel {
    fn model(&self) -> PanelModel;

    fn controller(&self) -> ControllerIndex;

    fn registry(&self) -> &ControllerRegistry;

    /// Fail with [`Error::InvalidDeviceHandle`] unless the controller is
    /// known to the registry.
    fn check(&self) -> Result<()> {
        let controller = self.controller();
        if self.registry().is_valid_controller(controller) {
            Ok(())
        } else {
            error!(
                "{:?}: invalid controller {}",
                self.model(),
                controller.get()
            );
            Err(Error::InvalidDeviceHandle(controller))
        }
    }

    /// One-time setup when the panel is selected.
    fn init(&mut self) -> Result<()> {
        self.check()?;
        info!("panel init: {}", self.model().name());
        self.registry().set_attached(self.controller(), true)
    }

    fn on_pre(&mut self) -> Result<()> {
        self.check()?;
        info!("{:?} on_pre {}", self.model(), self.controller().get());
        self.registry().set_attached(self.controller(), true)
    }

    fn on_post(&mut self) -> Result<()> {
        self.check()
    }

    fn off_pre(&mut self) -> Result<()> {
        self.check()
    }

    fn off_post(&mut self) -> Result<()> {
        self.check()
    }

    /// Called once the first frame is out and the backlight may come up.
    fn backlight_late_on(&mut self) -> Result<()> {
        self.check()
    }

    fn revision(&mut self) -> Result<u8> {
        self.check()?;
        Ok(0)
    }

    /// Apply a raw user brightness.
    ///
    /// Panels without a pulse-driven backlight accept and ignore it.
    fn set_brightness(&mut self, raw: u8) -> Result<()> {
        self.check()?;
        debug!("{:?}: no backlight control, brightness {} ignored", self.model(), raw);
        Ok(())
    }

    /// Panel power hook, called at panel on/off boundaries.
    fn set_power(&mut self, _enable: bool) -> Result<()> {
        self.check()
    }

    fn outdoor_mode_update(&mut self) -> Result<()> {
        self.check()?;
        info!("{:?}: outdoor mode update", self.model());
        Ok(())
    }
}

// ── S6D78A0 / BV050SQM ──────────────────────────────────────────────────────

/// S6D78A0 panel: brightness through a KTD3102, whose input supply is
/// switched separately.
pub struct S6d78a0<'r, EN, CTRL, D, S, SC = LinearScale> {
    backlight: Ktd3102<'r, EN, CTRL, D>,
    supply: S,
    scale: SC,
    /// Last non-zero raw brightness.
    raw: u8,
}

impl<'r, EN, CTRL, D, S, SC> S6d78a0<'r, EN, CTRL, D, S, SC> {
    pub const fn new(backlight: Ktd3102<'r, EN, CTRL, D>, supply: S, scale: SC) -> Self {
        Self {
            backlight,
            supply,
            scale,
            raw: 0,
        }
    }

    pub const fn backlight(&self) -> &Ktd3102<'r, EN, CTRL, D> {
        &self.backlight
    }

    pub const fn backlight_mut(&mut self) -> &mut Ktd3102<'r, EN, CTRL, D> {
        &mut self.backlight
    }
}

impl<EN, CTRL, D, S, SC> Panel for S6d78a0<'_, EN, CTRL, D, S, SC>
where
    EN: OutputPin,
    CTRL: OutputPin + InputPin,
    D: DelayNs,
    S: Supply,
    SC: Scale,
{
    fn model(&self) -> PanelModel {
        PanelModel::S6d78a0Bv050sqm
    }

    fn controller(&self) -> ControllerIndex {
        self.backlight.controller()
    }

    fn registry(&self) -> &ControllerRegistry {
        self.backlight.registry()
    }

    fn off_pre(&mut self) -> Result<()> {
        self.check()?;
        self.supply.set_enabled(false)
    }

    fn backlight_late_on(&mut self) -> Result<()> {
        self.check()?;
        // Without a panel attached (bare board boot) keep the IC unpowered.
        let attached = self.registry().is_attached(self.controller())?;
        self.supply.set_enabled(attached)
    }

    /// A raw 0 re-applies the last non-zero brightness; the backlight goes
    /// dark through the off hooks or [`Ktd3102::off`], not through here.
    /// Before any non-zero request it keeps the IC off.
    fn set_brightness(&mut self, raw: u8) -> Result<()> {
        self.check()?;
        if raw != 0 {
            self.raw = raw;
        }
        let level = self.scale.scale(self.raw);
        info!("brightness raw {} -> level {}", raw, level);
        self.backlight.set_level(level)
    }
}

// ── S6D7AT0B01 / PM6003XB1 ──────────────────────────────────────────────────

/// S6D7AT0B01 panel: bias rails from an LM3632A.
pub struct S6d7at0b01<'r, I2C, EN, ENP, ENN, D> {
    power: Lm3632a<'r, I2C, EN, ENP, ENN, D>,
}

impl<'r, I2C, EN, ENP, ENN, D> S6d7at0b01<'r, I2C, EN, ENP, ENN, D> {
    pub const fn new(power: Lm3632a<'r, I2C, EN, ENP, ENN, D>) -> Self {
        Self { power }
    }

    pub const fn power(&self) -> &Lm3632a<'r, I2C, EN, ENP, ENN, D> {
        &self.power
    }
}

impl<I2C, EN, ENP, ENN, D> Panel for S6d7at0b01<'_, I2C, EN, ENP, ENN, D>
where
    I2C: I2c,
    EN: OutputPin,
    ENP: OutputPin,
    ENN: OutputPin,
    D: DelayNs,
{
    fn model(&self) -> PanelModel {
        PanelModel::S6d7at0b01Pm6003xb1
    }

    fn controller(&self) -> ControllerIndex {
        self.power.controller()
    }

    fn registry(&self) -> &ControllerRegistry {
        self.power.registry()
    }

    fn set_power(&mut self, enable: bool) -> Result<()> {
        self.power.set_power(enable)
    }
}
