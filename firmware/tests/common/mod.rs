//! Mock hardware for the integration tests.
//!
//! Records every actuator call so tests can assert on the full history
//! without touching real GPIO or PWM registers.

// Each test binary uses a different subset of the helpers
#![allow(dead_code)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::PwmPin;
use rfid_lock_firmware::config::DeviceConfig;
use rfid_lock_firmware::device::{Device, Inputs};
use rfid_lock_firmware::lock::ServoLock;
use rfid_lock_firmware::pressure::PressureReading;
use rfid_lock_firmware::uid::{AllowList, TagUid};
use rfid_lock_firmware::Millis;

pub const PRESENT: PressureReading = PressureReading(3_000);
pub const ABSENT: PressureReading = PressureReading(50);

/// Buzzer GPIO. Clones share the recorded level history.
#[derive(Clone, Default)]
pub struct MockPin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl MockPin {
    pub fn is_high(&self) -> bool {
        self.levels.borrow().last().copied().unwrap_or(false)
    }

    /// Number of rising edges seen so far.
    pub fn beeps(&self) -> usize {
        let levels = self.levels.borrow();
        let mut prev = false;
        let mut count = 0;
        for level in levels.iter() {
            if *level && !prev {
                count += 1;
            }
            prev = *level;
        }
        count
    }
}

impl OutputPin for MockPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Servo PWM channel. Clones share the recorded duty history.
#[derive(Clone, Default)]
pub struct MockPwm {
    pub duties: Rc<RefCell<Vec<u16>>>,
}

impl MockPwm {
    pub fn last_duty(&self) -> Option<u16> {
        self.duties.borrow().last().copied()
    }
}

impl PwmPin for MockPwm {
    type Duty = u16;

    fn disable(&mut self) {}

    fn enable(&mut self) {}

    fn get_duty(&self) -> u16 {
        self.last_duty().unwrap_or(0)
    }

    fn get_max_duty(&self) -> u16 {
        20_000
    }

    fn set_duty(&mut self, duty: u16) {
        self.duties.borrow_mut().push(duty);
    }
}

pub type TestDevice = Device<ServoLock<MockPwm>, MockPin, 4>;

pub struct Rig {
    pub device: TestDevice,
    pub buzzer: MockPin,
    pub servo: MockPwm,
}

pub fn rig() -> Rig {
    rig_with(DeviceConfig::default())
}

pub fn rig_with(config: DeviceConfig) -> Rig {
    let buzzer = MockPin::default();
    let servo = MockPwm::default();
    let allow_list = AllowList::from_strs(&["AA BB CC DD"]).unwrap();
    let device = Device::new(
        config,
        allow_list,
        ServoLock::new(servo.clone(), &config),
        buzzer.clone(),
    )
    .unwrap();
    Rig {
        device,
        buzzer,
        servo,
    }
}

pub fn uid(s: &str) -> TagUid {
    TagUid::parse(s).unwrap()
}

pub fn idle(now: Millis, pressure: PressureReading) -> Inputs<'static> {
    Inputs {
        now,
        pressure,
        tag: None,
        command: None,
    }
}

pub fn scan(now: Millis, pressure: PressureReading, tag: &TagUid) -> Inputs<'_> {
    Inputs {
        now,
        pressure,
        tag: Some(tag),
        command: None,
    }
}

pub fn command(now: Millis, pressure: PressureReading, byte: u8) -> Inputs<'static> {
    Inputs {
        now,
        pressure,
        tag: None,
        command: Some(byte),
    }
}
