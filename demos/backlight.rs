//! Ramps the panel backlight up through its brightness range, then blanks
//! it and brings it back, once per cycle.

#![no_std]
#![no_main]

use defmt::{
    info,
    warn,
};
use embassy_executor::Spawner;
use embassy_time::{
    Duration,
    Timer,
};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;
use tftpanel::{
    Panel,
    PanelConfig,
    board,
    split_resources,
};

extern crate alloc;

esp_bootloader_esp_idf::esp_app_desc!();

const PANEL: &str = "1:dsi:0:ss_dsi_panel_S6D78A0_BV050SQM_QHD";

#[embassy_executor::task]
async fn brightness_task(panel: &'static mut dyn Panel) {
    info!("Brightness task started on {}", panel.model().name());

    if let Err(err) = panel.init().and_then(|()| panel.backlight_late_on()) {
        warn!("panel bring-up failed: {}", err);
    }

    loop {
        for raw in (16..=u8::MAX).step_by(16) {
            match panel.set_brightness(raw) {
                Ok(()) => info!("Brightness: {}", raw),
                Err(err) => warn!("brightness {} failed: {}", raw, err),
            }
            Timer::after(Duration::from_millis(250)).await;
        }

        info!("Backlight supply off");
        if let Err(err) = panel.off_pre() {
            warn!("off_pre failed: {}", err);
        }
        Timer::after(Duration::from_secs(1)).await;

        if let Err(err) = panel.on_pre().and_then(|()| panel.backlight_late_on()) {
            warn!("panel back on failed: {}", err);
        }
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    let peripherals = board::init();
    let resources = split_resources!(peripherals);

    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let config = PanelConfig::from_panel_string(PANEL).unwrap_or_default();
    let panel = board::panel(resources, config).unwrap();
    spawner.must_spawn(brightness_task(panel));

    loop {
        Timer::after(Duration::from_secs(600)).await;
    }
}
