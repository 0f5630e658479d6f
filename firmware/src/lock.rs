//! The lock and the servo that moves the bolt.

use embedded_hal::PwmPin;

use crate::{config::DeviceConfig, errors::Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Locked,
    Unlocked,
}

impl LockState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Locked => Self::Unlocked,
            Self::Unlocked => Self::Locked,
        }
    }
}

/// Anything that can move the bolt. Failures are reported as
/// [`Error::LockActuatorError`].
pub trait LockActuator {
    fn drive(&mut self, state: LockState) -> Result<(), Error>;
}

// Hobby servo timing at 50 Hz
const PERIOD_US: u32 = 20_000;
const MIN_PULSE_US: u32 = 544;
const MAX_PULSE_US: u32 = 2_400;

/// Servo on a PWM channel configured for 50 Hz.
pub struct ServoLock<P> {
    pwm: P,
    locked_angle: u8,
    unlocked_angle: u8,
}

impl<P: PwmPin<Duty = u16>> ServoLock<P> {
    pub fn new(mut pwm: P, config: &DeviceConfig) -> Self {
        pwm.enable();
        Self {
            pwm,
            locked_angle: config.locked_angle,
            unlocked_angle: config.unlocked_angle,
        }
    }

    /// Duty cycle that holds the servo at `angle` degrees.
    pub fn duty_for(&self, angle: u8) -> u16 {
        let angle = u32::from(angle.min(180));
        let pulse_us = MIN_PULSE_US + (MAX_PULSE_US - MIN_PULSE_US) * angle / 180;
        let duty = u32::from(self.pwm.get_max_duty()) * pulse_us / PERIOD_US;
        // pulse_us < PERIOD_US, so duty < max duty
        duty as u16
    }
}

impl<P: PwmPin<Duty = u16>> LockActuator for ServoLock<P> {
    fn drive(&mut self, state: LockState) -> Result<(), Error> {
        let angle = match state {
            LockState::Locked => self.locked_angle,
            LockState::Unlocked => self.unlocked_angle,
        };
        let duty = self.duty_for(angle);
        self.pwm.set_duty(duty);
        Ok(())
    }
}
