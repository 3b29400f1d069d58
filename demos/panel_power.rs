//! Cycles the panel bias supply: on for five seconds, off for two.

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
    PanelModel,
    board,
    split_resources,
};

extern crate alloc;

esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn power_task(panel: &'static mut dyn Panel) {
    info!("Power task started on {}", panel.model().name());

    if let Err(err) = panel.init() {
        warn!("panel init failed: {}", err);
    }

    loop {
        match panel.set_power(true) {
            Ok(()) => info!("Panel power: ON"),
            Err(err) => warn!("power on failed: {}", err),
        }
        Timer::after(Duration::from_secs(5)).await;

        match panel.set_power(false) {
            Ok(()) => info!("Panel power: OFF"),
            Err(err) => warn!("power off failed: {}", err),
        }
        Timer::after(Duration::from_secs(2)).await;
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    let peripherals = board::init();
    let resources = split_resources!(peripherals);

    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let config = PanelConfig::default().with_model(PanelModel::S6d7at0b01Pm6003xb1);
    let panel = board::panel(resources, config).unwrap();
    spawner.must_spawn(power_task(panel));

    loop {
        Timer::after(Duration::from_secs(600)).await;
    }
}
