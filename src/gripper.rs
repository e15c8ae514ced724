use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
use gantry::GantryError;
use gantry::hw::Gripper;

use crate::motion::peripheral;

pub struct Electromagnet {
    coil: PinDriver<'static, AnyOutputPin, Output>,
}

impl Electromagnet {
    pub fn new(pin: AnyOutputPin) -> anyhow::Result<Self> {
        let mut coil = PinDriver::output(pin)?;
        coil.set_low()?;
        Ok(Self { coil })
    }
}

impl Gripper for Electromagnet {
    fn gripper_on(&mut self) -> Result<(), GantryError> {
        self.coil.set_high().map_err(peripheral)
    }

    fn gripper_off(&mut self) -> Result<(), GantryError> {
        self.coil.set_low().map_err(peripheral)
    }

    fn gripper_state(&self) -> bool {
        self.coil.is_set_high()
    }
}
