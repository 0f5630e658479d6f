//! Access control: authorization, lock toggling and the failed scan lockout.

use ufmt::{uDisplay, uWrite, Formatter};

use crate::{
    buzzer::{BuzzerPlayer, FAILURE, SUCCESS},
    errors::Error,
    lock::{LockActuator, LockState},
    uid::{AllowList, TagUid},
    Millis,
};

/// Result of a scan as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Locked,
    Unlocked,
    Denied,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "LOCKED",
            Self::Unlocked => "UNLOCKED",
            Self::Denied => "DENIED",
        }
    }
}

impl uDisplay for ScanStatus {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub status: ScanStatus,
    /// The scan hit the failed scan limit and the controller was reset
    pub reset: bool,
    /// The lockout reset could not drive the bolt home. The controller state
    /// is reset regardless.
    pub fault: Option<Error>,
}

/// Exists from unlocking until the door is locked again or the item is back,
/// so while it exists the lock is waiting for the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockSession {
    pub unlocked_at: Millis,
}

pub struct AccessController<L, const N: usize> {
    allow_list: AllowList<N>,
    actuator: L,
    max_failed_scans: u8,
    lock: LockState,
    failed_scans: u8,
    session: Option<UnlockSession>,
}

impl<L: LockActuator, const N: usize> AccessController<L, N> {
    /// Create the controller and bring it into its startup state.
    pub fn new(allow_list: AllowList<N>, actuator: L, max_failed_scans: u8) -> Result<Self, Error> {
        if max_failed_scans == 0 {
            return Err(Error::InvalidConfig);
        }
        let mut controller = Self {
            allow_list,
            actuator,
            max_failed_scans,
            lock: LockState::Locked,
            failed_scans: 0,
            session: None,
        };
        controller.reset()?;
        Ok(controller)
    }

    /// Return to the startup state: locked, no failed scans, no session.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.lock = LockState::Locked;
        self.failed_scans = 0;
        self.session = None;
        self.actuator.drive(LockState::Locked)
    }

    /// Handle a complete tag read. Feedback is queued on `feedback`.
    pub fn on_scan(
        &mut self,
        uid: &TagUid,
        now: Millis,
        feedback: &mut BuzzerPlayer,
    ) -> Result<ScanOutcome, Error> {
        if !self.allow_list.contains(uid) {
            return self.deny(now, feedback);
        }

        let state = self.lock.toggled();
        self.actuator.drive(state)?;
        self.lock = state;
        self.failed_scans = 0;
        self.session = match state {
            LockState::Unlocked => Some(UnlockSession { unlocked_at: now }),
            LockState::Locked => None,
        };
        feedback.play(SUCCESS, now);

        let status = match state {
            LockState::Locked => ScanStatus::Locked,
            LockState::Unlocked => ScanStatus::Unlocked,
        };
        Ok(ScanOutcome {
            status,
            reset: false,
            fault: None,
        })
    }

    fn deny(&mut self, now: Millis, feedback: &mut BuzzerPlayer) -> Result<ScanOutcome, Error> {
        self.failed_scans += 1;
        let reset = self.failed_scans >= self.max_failed_scans;
        let fault = if reset { self.reset().err() } else { None };
        feedback.play(FAILURE, now);
        Ok(ScanOutcome {
            status: ScanStatus::Denied,
            reset,
            fault,
        })
    }

    /// The item is back, the session is over. The door stays unlocked.
    pub fn end_session(&mut self) {
        self.session = None;
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn failed_scans(&self) -> u8 {
        self.failed_scans
    }

    pub fn session(&self) -> Option<&UnlockSession> {
        self.session.as_ref()
    }

    pub fn actuator(&self) -> &L {
        &self.actuator
    }
}
