use esp_idf_svc::hal::delay::{BLOCK, Ets};
use esp_idf_svc::hal::i2c::I2cDriver;
use esp_idf_svc::sys::EspError;
use gantry::config::STATUS_WIDTH;
use gantry::hw::StatusDisplay;
use log::warn;

// pcf8574 backpack in front of a hd44780, driven in 4 bit mode
pub const LCD_ADDR: u8 = 0x27;

const BACKLIGHT: u8 = 0x08;
const ENABLE: u8 = 0x04;
const MODE_COMMAND: u8 = 0;
const MODE_CHAR: u8 = 1;

const CLEAR: u8 = 0x01;
const ENTRY_MODE_SET: u8 = 0x04;
const ENTRY_LEFT: u8 = 0x02;
const DISPLAY_CONTROL: u8 = 0x08;
const DISPLAY_ON: u8 = 0x04;
const FUNCTION_SET: u8 = 0x20;
const TWO_LINES: u8 = 0x08;

const LINE_ADDR: [u8; 2] = [0x80, 0xC0];
const ENABLE_DELAY_US: u32 = 600;

pub struct Lcd1602 {
    i2c: I2cDriver<'static>,
}

impl Lcd1602 {
    pub fn new(i2c: I2cDriver<'static>) -> Result<Self, EspError> {
        let mut lcd = Self { i2c };
        for cmd in [0x03, 0x03, 0x03, 0x02] {
            lcd.send(cmd, MODE_COMMAND)?;
        }
        lcd.send(ENTRY_MODE_SET | ENTRY_LEFT, MODE_COMMAND)?;
        lcd.send(FUNCTION_SET | TWO_LINES, MODE_COMMAND)?;
        lcd.send(DISPLAY_CONTROL | DISPLAY_ON, MODE_COMMAND)?;
        lcd.send(CLEAR, MODE_COMMAND)?;
        Ok(lcd)
    }

    fn write_byte(&mut self, val: u8) -> Result<(), EspError> {
        self.i2c.write(LCD_ADDR, &[val], BLOCK)
    }

    fn toggle_enable(&mut self, val: u8) -> Result<(), EspError> {
        Ets::delay_us(ENABLE_DELAY_US);
        self.write_byte(val | ENABLE)?;
        Ets::delay_us(ENABLE_DELAY_US);
        self.write_byte(val & !ENABLE)?;
        Ets::delay_us(ENABLE_DELAY_US);
        Ok(())
    }

    // a byte goes out as two nibbles, high first
    fn send(&mut self, val: u8, mode: u8) -> Result<(), EspError> {
        let high = mode | (val & 0xF0) | BACKLIGHT;
        let low = mode | ((val << 4) & 0xF0) | BACKLIGHT;
        self.write_byte(high)?;
        self.toggle_enable(high)?;
        self.write_byte(low)?;
        self.toggle_enable(low)
    }

    fn put_line(&mut self, slot: u8, text: &str) -> Result<(), EspError> {
        self.send(LINE_ADDR[slot as usize], MODE_COMMAND)?;
        for byte in text.bytes().take(STATUS_WIDTH) {
            self.send(byte, MODE_CHAR)?;
        }
        Ok(())
    }
}

impl StatusDisplay for Lcd1602 {
    fn write_line(&mut self, slot: u8, text: &str) {
        if slot as usize >= LINE_ADDR.len() {
            return;
        }
        // a dead display must never hold up motion
        if let Err(err) = self.put_line(slot, text) {
            warn!("lcd write failed: {err}");
        }
    }
}
