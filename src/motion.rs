use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use esp_idf_svc::hal::gpio::{AnyOutputPin, Level, Output, PinDriver};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::timer::{Timer, TimerDriver, config::Config as TimerConfig};
use esp_idf_svc::sys::EspError;
use gantry::GantryError;
use gantry::hw::PulseChannel;

type OutputPinDriver = PinDriver<'static, AnyOutputPin, Output>;

// one step pin driven from a hardware timer alarm. the isr toggles the pin
// every half period and counts edges down, so a train stops by itself
pub struct StepChannel {
    timer: TimerDriver<'static>,
    dir: OutputPinDriver,
    _en: OutputPinDriver,
    edges: Arc<AtomicU32>,
}

impl StepChannel {
    pub fn new<T: Timer>(
        timer: impl Peripheral<P = T> + 'static,
        step: AnyOutputPin,
        dir: AnyOutputPin,
        en: AnyOutputPin,
    ) -> anyhow::Result<Self> {
        let mut timer = TimerDriver::new(timer, &TimerConfig::new().auto_reload(true))?;

        let mut step = PinDriver::output(step)?;
        step.set_low()?;
        // drivers are enabled with the line low and stay enabled
        let mut en = PinDriver::output(en)?;
        en.set_low()?;

        let edges = Arc::new(AtomicU32::new(0));
        let countdown = edges.clone();
        // SAFETY: the callback only touches its own step pin and an atomic
        unsafe {
            timer.subscribe(move || {
                match countdown.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1)) {
                    Ok(_) => {
                        let _ = step.toggle();
                    }
                    Err(_) => {
                        let _ = step.set_low();
                    }
                }
            })?;
        }

        Ok(Self {
            timer,
            dir: PinDriver::output(dir)?,
            _en: en,
            edges,
        })
    }

    fn arm(&mut self, pulses: u32, interval_us: u32) -> Result<(), EspError> {
        self.timer.enable(false)?;
        let half_period = self.timer.tick_hz() * u64::from(interval_us) / 2_000_000;
        self.timer.set_counter(0)?;
        self.timer.set_alarm(half_period.max(1))?;
        self.edges.store(pulses.saturating_mul(2), Ordering::Release);
        self.timer.enable_interrupt()?;
        self.timer.enable_alarm(true)?;
        self.timer.enable(true)
    }
}

impl PulseChannel for StepChannel {
    fn set_direction(&mut self, level: bool) -> Result<(), GantryError> {
        self.dir.set_level(Level::from(level)).map_err(peripheral)
    }

    fn begin(&mut self, pulses: u32, interval_us: u32) -> Result<(), GantryError> {
        self.arm(pulses, interval_us).map_err(peripheral)
    }

    fn halt(&mut self) -> Result<(), GantryError> {
        self.edges.store(0, Ordering::Release);
        self.timer.enable(false).map_err(peripheral)
    }

    fn pulses_remaining(&mut self) -> u32 {
        let remaining = self.edges.load(Ordering::Acquire).div_ceil(2);
        if remaining == 0 {
            // idle timer, nothing left to toggle
            let _ = self.timer.enable(false);
        }
        remaining
    }
}

pub fn peripheral(err: EspError) -> GantryError {
    GantryError::Peripheral(err.to_string())
}
