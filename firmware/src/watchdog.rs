//! Item watchdog.
//!
//! After the door is unlocked the item has to be back on the force sensor
//! within the grace period. If it is not, the watchdog alerts until the item
//! is detected or the door is locked again. The condition is level
//! triggered: every poll re-evaluates it from scratch.

use crate::{elapsed, pressure::Presence, Millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Armed { since: Millis },
    Alerting,
}

pub struct ItemWatchdog {
    grace_ms: Millis,
    state: WatchState,
}

impl ItemWatchdog {
    pub fn new(grace_ms: Millis) -> Self {
        Self {
            grace_ms,
            state: WatchState::Idle,
        }
    }

    /// Start watching. Called when the door gets unlocked.
    pub fn arm(&mut self, now: Millis) {
        self.state = WatchState::Armed { since: now };
    }

    /// Stop watching, whatever the sensor says. Called on re-lock.
    pub fn cancel(&mut self) {
        self.state = WatchState::Idle;
    }

    pub fn poll(&mut self, now: Millis, presence: Presence) -> WatchState {
        self.state = match (self.state, presence) {
            (WatchState::Idle, _) => WatchState::Idle,
            (_, Presence::Present) => WatchState::Idle,
            (WatchState::Armed { since }, Presence::Absent) => {
                if elapsed(now, since) > self.grace_ms {
                    WatchState::Alerting
                } else {
                    WatchState::Armed { since }
                }
            }
            (WatchState::Alerting, Presence::Absent) => WatchState::Alerting,
        };
        self.state
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn is_watching(&self) -> bool {
        self.state != WatchState::Idle
    }

    pub fn is_alerting(&self) -> bool {
        self.state == WatchState::Alerting
    }
}
