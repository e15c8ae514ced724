use std::sync::Arc;

use anyhow::anyhow;
use esp_idf_svc::hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::spi::{SpiDeviceDriver, SpiDriver};
use esp_idf_svc::hal::timer::{Timer, TimerDriver, config::Config as TimerConfig};
use gantry::config::ENDSTOP_SAMPLE_HZ;
use gantry::endstop::{EndstopMonitor, sample_word};
use gantry::hw::TagReader;
use gantry::inventory::{PalletId, format_uid};
use log::{debug, info, warn};
use mfrc522::comm::blocking::spi::SpiInterface;
use mfrc522::{Initialized, Mfrc522};

type LimitSwitch = PinDriver<'static, AnyIOPin, Input>;
type RfidSpi = SpiDeviceDriver<'static, SpiDriver<'static>>;

// the switches pull their line to ground when hit
fn limit_switch(pin: AnyIOPin) -> anyhow::Result<LimitSwitch> {
    let mut switch = PinDriver::input(pin)?;
    switch.set_pull(Pull::Up)?;
    Ok(switch)
}

// samples the three limit switches from a timer isr. keeps running for as
// long as this value lives
pub struct EndstopSampler {
    _timer: TimerDriver<'static>,
}

impl EndstopSampler {
    pub fn start<T: Timer>(
        timer: impl Peripheral<P = T> + 'static,
        monitor: Arc<EndstopMonitor>,
        [x, y, z]: [AnyIOPin; 3],
    ) -> anyhow::Result<Self> {
        let switches = [limit_switch(x)?, limit_switch(y)?, limit_switch(z)?];

        let mut timer = TimerDriver::new(timer, &TimerConfig::new().auto_reload(true))?;
        let period = timer.tick_hz() / u64::from(ENDSTOP_SAMPLE_HZ);
        timer.set_counter(0)?;
        timer.set_alarm(period)?;

        // SAFETY: reads three input levels and stores one atomic word
        unsafe {
            timer.subscribe(move || {
                let levels = [
                    switches[0].is_high(),
                    switches[1].is_high(),
                    switches[2].is_high(),
                ];
                monitor.record_sample(sample_word(levels));
            })?;
        }
        timer.enable_interrupt()?;
        timer.enable_alarm(true)?;
        timer.enable(true)?;

        info!("endstop sampler running at {ENDSTOP_SAMPLE_HZ} Hz");
        Ok(Self { _timer: timer })
    }
}

pub struct RfidReader {
    mfrc: Mfrc522<SpiInterface<RfidSpi>, Initialized>,
}

impl RfidReader {
    pub fn new(spi: RfidSpi) -> anyhow::Result<Self> {
        let mut mfrc = Mfrc522::new(SpiInterface::new(spi))
            .init()
            .map_err(|err| anyhow!("MFRC522 init failed: {err:?}"))?;
        match mfrc.version() {
            Ok(version) => info!("MFRC522 version {version:#04x}"),
            Err(err) => warn!("MFRC522 version read failed: {err:?}"),
        }
        Ok(Self { mfrc })
    }
}

impl TagReader for RfidReader {
    fn scan_for_tag(&mut self) -> Option<PalletId> {
        let atqa = self.mfrc.new_card_present().ok()?;
        let uid = match self.mfrc.select(&atqa) {
            Ok(uid) => uid,
            Err(err) => {
                debug!("tag answered but select failed: {err:?}");
                return None;
            }
        };
        // park the card so the next scan starts from a fresh request
        let _ = self.mfrc.hlta();
        Some(format_uid(uid.as_bytes()))
    }
}
