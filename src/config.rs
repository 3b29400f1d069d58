//! Static panel configuration.

use crate::{
    panel::PanelModel,
    power::DEFAULT_ADDRESS,
    registry::ControllerIndex,
    scale::LinearScale,
};

/// Everything needed to pick and bind a panel, resolved before the drivers
/// are built.
///
/// ```rust
/// use tftpanel::{
///     ControllerIndex,
///     PanelConfig,
///     PanelModel,
/// };
///
/// let config = PanelConfig::from_panel_string("0:dsi:0:ss_dsi_panel_S6D7AT0B01_PM6003XB1_WXGA")
///     .unwrap()
///     .with_controller(ControllerIndex::SECONDARY);
/// assert_eq!(config.model(), PanelModel::S6d7at0b01Pm6003xb1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig {
    model: PanelModel,
    controller: ControllerIndex,
    power_address: u8,
    max_raw_brightness: u8,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            model: PanelModel::S6d78a0Bv050sqm,
            controller: ControllerIndex::PRIMARY,
            power_address: DEFAULT_ADDRESS,
            max_raw_brightness: u8::MAX,
        }
    }
}

impl PanelConfig {
    /// Default configuration for the model named by a bootloader panel
    /// string, or `None` for an unsupported panel.
    pub fn from_panel_string(panel: &str) -> Option<Self> {
        PanelModel::from_panel_string(panel).map(|model| Self::default().with_model(model))
    }

    #[must_use]
    pub const fn with_model(mut self, model: PanelModel) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn with_controller(mut self, controller: ControllerIndex) -> Self {
        self.controller = controller;
        self
    }

    /// Bus address of the power IC.
    #[must_use]
    pub const fn with_power_address(mut self, address: u8) -> Self {
        self.power_address = address;
        self
    }

    /// Raw brightness value that maps to the top of the ladder.
    #[must_use]
    pub const fn with_max_raw_brightness(mut self, max: u8) -> Self {
        self.max_raw_brightness = max;
        self
    }

    pub const fn model(&self) -> PanelModel {
        self.model
    }

    pub const fn controller(&self) -> ControllerIndex {
        self.controller
    }

    pub const fn power_address(&self) -> u8 {
        self.power_address
    }

    pub const fn scale(&self) -> LinearScale {
        LinearScale::new(self.max_raw_brightness)
    }
}
