mod display;
mod events;
mod gripper;
mod motion;
mod sense;

use std::sync::Arc;
use std::sync::mpsc::channel;
use std::thread;

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{IOPin, OutputPin};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::spi::config::Config as SpiConfig;
use esp_idf_svc::hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use gantry::display::status_line;
use gantry::hw::StatusDisplay;
use gantry::{CellOperator, EndstopMonitor, Gantry, MotionCoordinator, Timing, Worker};
use log::{error, info};

use crate::display::Lcd1602;
use crate::events::{Announcer, Dispatcher, EventBus, forward_reports, read_console};
use crate::gripper::Electromagnet;
use crate::motion::StepChannel;
use crate::sense::{EndstopSampler, RfidReader};

const MOTION_STACK: usize = 16 * 1024;
const CONSOLE_STACK: usize = 8 * 1024;
const REPORT_STACK: usize = 4 * 1024;

struct Board {
    channels: [StepChannel; 3],
    sampler: EndstopSampler,
    magnet: Electromagnet,
    rfid: RfidReader,
}

fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(err) = run() {
        error!("FATAL: {err:#}");
    }
    loop {
        FreeRtos::delay_ms(1000);
    }
}

fn run() -> anyhow::Result<()> {
    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // lcd comes up first so later failures can still be shown
    let config = I2cConfig::new().baudrate(100.kHz().into());
    let i2c = I2cDriver::new(peripherals.i2c0, pins.gpio8, pins.gpio9, &config)?;
    let mut lcd = Lcd1602::new(i2c)?;
    lcd.write_line(0, &status_line("Initializing..."));

    let endstops = Arc::new(EndstopMonitor::new());

    let board = (|| -> anyhow::Result<Board> {
        // step, dir, enable per axis
        let channels = [
            StepChannel::new(
                peripherals.timer00,
                pins.gpio14.downgrade_output(),
                pins.gpio15.downgrade_output(),
                pins.gpio16.downgrade_output(),
            )?,
            StepChannel::new(
                peripherals.timer01,
                pins.gpio4.downgrade_output(),
                pins.gpio5.downgrade_output(),
                pins.gpio6.downgrade_output(),
            )?,
            StepChannel::new(
                peripherals.timer10,
                pins.gpio21.downgrade_output(),
                pins.gpio47.downgrade_output(),
                pins.gpio48.downgrade_output(),
            )?,
        ];

        // limit switches x, y, z
        let sampler = EndstopSampler::start(
            peripherals.timer11,
            endstops.clone(),
            [
                pins.gpio10.downgrade(),
                pins.gpio11.downgrade(),
                pins.gpio12.downgrade(),
            ],
        )?;

        let magnet = Electromagnet::new(pins.gpio7.downgrade_output())?;

        // mfrc522 on spi2: sclk 40, mosi 41, miso 42, cs 39
        let spi = SpiDriver::new(
            peripherals.spi2,
            pins.gpio40,
            pins.gpio41,
            Some(pins.gpio42),
            &SpiDriverConfig::new(),
        )?;
        let spi = SpiDeviceDriver::new(
            spi,
            Some(pins.gpio39),
            &SpiConfig::new().baudrate(1.MHz().into()),
        )?;
        let rfid = RfidReader::new(spi)?;

        Ok(Board {
            channels,
            sampler,
            magnet,
            rfid,
        })
    })();

    let board = match board {
        Ok(board) => board,
        Err(err) => {
            lcd.write_line(0, &status_line("FATAL ERROR"));
            lcd.write_line(1, &status_line("See console"));
            return Err(err);
        }
    };

    let timing = Timing::default();
    let (gantry, commands) = Gantry::new();
    let motion = MotionCoordinator::new(
        board.channels,
        endstops,
        gantry.event_log(),
        timing.motion_poll,
    );
    let operator = CellOperator::new(
        motion,
        board.magnet,
        board.rfid,
        lcd,
        gantry.inventory_store(),
        gantry.event_log(),
        timing,
    );

    let mut bus = EventBus::new();
    bus.register_handler(Box::new(Dispatcher::new(gantry.clone())));
    bus.register_handler(Box::new(Announcer));

    let (report_tx, report_rx) = channel();
    let _worker = Worker::new(operator)
        .with_reports(report_tx)
        .spawn(commands, MOTION_STACK)?;

    let reports = bus.sender();
    thread::Builder::new()
        .name("reports".into())
        .stack_size(REPORT_STACK)
        .spawn(move || forward_reports(report_rx, reports))?;

    let console = bus.sender();
    thread::Builder::new()
        .name("console".into())
        .stack_size(CONSOLE_STACK)
        .spawn(move || read_console(console))?;

    gantry.push_log("System initialized");
    info!("gantry ready");

    // sampling stops when this goes out of scope
    let _sampler = board.sampler;
    bus.run()
}
