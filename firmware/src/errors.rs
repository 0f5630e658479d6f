//! Error handling.

use heapless::spsc::Queue;
use ufmt::{uDisplay, uWrite, Formatter};

/// All possible error types
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Error {
    /// A UID string contained something other than hex byte tokens
    InvalidUid,
    /// A UID was empty or longer than the reader can report
    UidLength,
    AllowListFull,
    InvalidConfig,
    BuzzerGpioWriteError,
    /// The bolt could not be moved
    LockActuatorError,
    UfmtSerialWriteError,
    RtcReadTimeError,
    RfidInitFailed,
    PressureReadError,
}

impl Error {
    /// Record the error, dropping the oldest entry if the queue is full.
    pub fn log<const N: usize>(&self, queue: &mut Queue<Self, N>) {
        match queue.enqueue(*self) {
            Ok(()) => { /* Enqueued */ }
            Err(e) => {
                // Queue full, drop the oldest value and try again
                queue.dequeue();
                queue.enqueue(e).ok();
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUid => "UID: Invalid hex byte",
            Self::UidLength => "UID: Length out of range",
            Self::AllowListFull => "Allow-list: Capacity exceeded",
            Self::InvalidConfig => "Config: Value out of range",
            Self::BuzzerGpioWriteError => "Buzzer GPIO write error",
            Self::LockActuatorError => "Lock: Driving actuator failed",
            Self::UfmtSerialWriteError => "Write serial log using ufmt failed",
            Self::RtcReadTimeError => "RTC: Reading time failed",
            Self::RfidInitFailed => "MFRC522: Initialization failed",
            Self::PressureReadError => "ADC: Reading pressure sensor failed",
        }
    }
}

impl uDisplay for Error {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}
