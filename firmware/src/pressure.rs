//! The force sensor under the item.

use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// One raw ADC sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureReading(pub u16);

impl PressureReading {
    pub fn classify(self, threshold: u16) -> Presence {
        if self.0 >= threshold {
            Presence::Present
        } else {
            Presence::Absent
        }
    }
}

/// Anything that can be sampled for a pressure reading.
pub trait PressureSensor {
    fn sample(&mut self) -> Result<PressureReading, Error>;
}
