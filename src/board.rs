//! ESP32-S3 board bindings.
//!
//! Assigns the panel control lines to pins and builds the drivers on top of
//! `esp-hal`, bound to the process-wide [`CONTROLLERS`] registry.
//!
//! ```rust,ignore
//! let peripherals = tftpanel::board::init();
//! let resources = tftpanel::split_resources!(peripherals);
//! let config = tftpanel::PanelConfig::from_panel_string(PANEL).unwrap_or_default();
//!
//! let panel = tftpanel::board::panel(resources, config)?;
//! panel.init()?;
//! panel.set_power(true)?;
//! panel.set_brightness(128)?;
//! ```

use esp_hal::{
    Blocking,
    assign_resources,
    clock::CpuClock,
    delay::Delay,
    gpio::{
        Flex,
        Level,
        Output,
        OutputConfig,
        Pin,
    },
    i2c::master::{
        Config as I2cConfig,
        ConfigError,
        I2c,
    },
    time::Rate,
};

use crate::{
    CONTROLLERS,
    Ktd3102,
    Lm3632a,
    Panel,
    PanelConfig,
    PanelModel,
    Rails,
    panel::{
        GpioSupply,
        S6d7at0b01,
        S6d78a0,
    },
    scale::LinearScale,
};

/// Moves a value into its own `static`. Each expansion site runs once.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write($val);
        x
    }};
}

// ── Pin / peripheral assignments ────────────────────────────────────────────

assign_resources! {
    pub Resources<'d> {
        backlight: BacklightResources<'d> {
            enable: GPIO19,
            ctrl: GPIO20,
        },
        supply: SupplyResources<'d> {
            pin: GPIO21,
        },
        power: PowerResources<'d> {
            sda: GPIO8,
            scl: GPIO9,
            enable: GPIO10,
            positive: GPIO11,
            negative: GPIO12,
            i2c: I2C0,
        }
    }
}

pub type Backlight = Ktd3102<'static, Flex<'static>, Flex<'static>, Delay>;

pub type PanelPower = Lm3632a<
    'static,
    I2c<'static, Blocking>,
    Output<'static>,
    Output<'static>,
    Output<'static>,
    Delay,
>;

type BoardS6d78a0 = S6d78a0<
    'static,
    Flex<'static>,
    Flex<'static>,
    Delay,
    GpioSupply<Output<'static>>,
    LinearScale,
>;
type BoardS6d7at0b01 = S6d7at0b01<
    'static,
    I2c<'static, Blocking>,
    Output<'static>,
    Output<'static>,
    Output<'static>,
    Delay,
>;

/// Initialise the chip and return the raw peripheral set.
#[must_use]
pub fn init() -> esp_hal::peripherals::Peripherals {
    esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()))
}

impl From<esp_hal::peripherals::Peripherals> for Resources<'_> {
    fn from(peripherals: esp_hal::peripherals::Peripherals) -> Self {
        split_resources!(peripherals)
    }
}

/// Take over a line at whatever level it is at. The pad is sampled with the
/// input buffer on and the output latch is set to match before the line is
/// driven, so the pin keeps reading back its real level.
fn hold_line(pin: impl Pin + 'static) -> Flex<'static> {
    let mut line = Flex::new(pin);
    line.set_input_enable(true);
    let level = line.level();
    line.set_level(level);
    line.set_output_enable(true);
    line
}

/// Backlight IC driver for `config`'s controller.
///
/// Both lines keep the level the bootloader left them at. The first update
/// reads the control line to tell a lit backlight from a cold one.
pub fn backlight(res: BacklightResources<'static>, config: &PanelConfig) -> Backlight {
    Ktd3102::new(
        hold_line(res.enable),
        hold_line(res.ctrl),
        Delay::new(),
        config.controller(),
        &CONTROLLERS,
    )
}

/// Power IC driver for `config`'s controller. All rails start low.
pub fn panel_power(
    res: PowerResources<'static>,
    config: &PanelConfig,
) -> Result<PanelPower, ConfigError> {
    let i2c = I2c::new(res.i2c, I2cConfig::default().with_frequency(Rate::from_khz(400)))?
        .with_sda(res.sda)
        .with_scl(res.scl);

    let rails = Rails {
        enable: Output::new(res.enable, Level::Low, OutputConfig::default()),
        positive: Output::new(res.positive, Level::Low, OutputConfig::default()),
        negative: Output::new(res.negative, Level::Low, OutputConfig::default()),
    };

    Ok(
        Lm3632a::new(i2c, rails, Delay::new(), config.controller(), &CONTROLLERS)
            .with_address(config.power_address()),
    )
}

/// Build the panel `config` selects and park it in a static.
///
/// Call at most once; a second call panics.
pub fn panel(
    res: Resources<'static>,
    config: PanelConfig,
) -> Result<&'static mut dyn Panel, ConfigError> {
    match config.model() {
        PanelModel::S6d78a0Bv050sqm => {
            let supply = GpioSupply::new(Output::new(
                res.supply.pin,
                Level::Low,
                OutputConfig::default(),
            ));
            let backlight = backlight(res.backlight, &config);
            Ok(mk_static!(
                BoardS6d78a0,
                S6d78a0::new(backlight, supply, config.scale())
            ))
        }
        PanelModel::S6d7at0b01Pm6003xb1 => {
            let power = panel_power(res.power, &config)?;
            Ok(mk_static!(BoardS6d7at0b01, S6d7at0b01::new(power)))
        }
    }
}
