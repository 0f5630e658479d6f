//! Device configuration.

use crate::{errors::Error, Millis};

/// Tunables of the lock. Defaults match the deployed hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Consecutive denied scans that trigger the lockout reset
    pub max_failed_scans: u8,
    /// Minimum time between two accepted scans
    pub scan_debounce_ms: Millis,
    /// How long after unlocking the item may be absent before alerting
    pub item_grace_ms: Millis,
    /// Raw ADC readings at or above this value mean "item present"
    pub pressure_threshold: u16,
    /// Servo angle (degrees) of the locked position
    pub locked_angle: u8,
    /// Servo angle (degrees) of the unlocked position
    pub unlocked_angle: u8,
}

impl DeviceConfig {
    pub const fn new() -> Self {
        Self {
            max_failed_scans: 3,
            scan_debounce_ms: 500,
            item_grace_ms: 15_000,
            // 12 bit ADC, force sensor in a voltage divider
            pressure_threshold: 800,
            locked_angle: 70,
            unlocked_angle: 160,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_failed_scans == 0 || self.locked_angle > 180 || self.unlocked_angle > 180 {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}
