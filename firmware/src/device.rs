//! The control loop.
//!
//! [`Device`] owns every piece of state on the lock. The board calls
//! [`Device::poll`] once per loop iteration with whatever arrived since the
//! previous one. Nothing in here blocks; timeouts are evaluated by comparing
//! timestamps on each poll.

use embedded_hal::digital::v2::OutputPin;

use crate::{
    buzzer::Buzzer,
    command::{ExternalAlert, HostCommand},
    config::DeviceConfig,
    controller::{AccessController, ScanStatus},
    elapsed,
    errors::Error,
    lock::{LockActuator, LockState},
    pressure::PressureReading,
    uid::{AllowList, TagUid},
    watchdog::ItemWatchdog,
    Millis,
};

/// Everything the board sampled in one loop iteration.
#[derive(Debug, Clone, Copy)]
pub struct Inputs<'a> {
    pub now: Millis,
    pub pressure: PressureReading,
    pub tag: Option<&'a TagUid>,
    pub command: Option<u8>,
}

/// A handled scan, to be logged to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub uid: TagUid,
    pub status: ScanStatus,
    /// The scan triggered the failed scan lockout and the device was reset
    pub reset: bool,
    /// The bolt did not follow the lockout reset
    pub fault: Option<Error>,
}

pub struct Device<L, P, const N: usize> {
    config: DeviceConfig,
    controller: AccessController<L, N>,
    watchdog: ItemWatchdog,
    alert: ExternalAlert,
    buzzer: Buzzer<P>,
    last_scan: Option<Millis>,
}

impl<L: LockActuator, P: OutputPin, const N: usize> Device<L, P, N> {
    pub fn new(
        config: DeviceConfig,
        allow_list: AllowList<N>,
        actuator: L,
        buzzer_pin: P,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            controller: AccessController::new(allow_list, actuator, config.max_failed_scans)?,
            watchdog: ItemWatchdog::new(config.item_grace_ms),
            alert: ExternalAlert::new(),
            buzzer: Buzzer::new(buzzer_pin)?,
            last_scan: None,
        })
    }

    /// Whether a scan at `now` would be accepted. Lets the board skip
    /// talking to the reader during the debounce window.
    pub fn ready_for_scan(&self, now: Millis) -> bool {
        match self.last_scan {
            Some(at) => elapsed(now, at) >= self.config.scan_debounce_ms,
            None => true,
        }
    }

    pub fn poll(&mut self, inputs: Inputs<'_>) -> Result<Option<ScanEvent>, Error> {
        let now = inputs.now;

        if let Some(command) = inputs.command.and_then(HostCommand::from_byte) {
            self.alert.apply(command);
        }

        let presence = inputs.pressure.classify(self.config.pressure_threshold);

        let event = match inputs.tag {
            Some(uid) if self.ready_for_scan(now) => {
                self.last_scan = Some(now);
                Some(self.handle_scan(uid, now)?)
            }
            _ => None,
        };

        self.watchdog.poll(now, presence);
        if !self.watchdog.is_watching() {
            self.controller.end_session();
        }
        let external = self.alert.poll(presence);

        self.buzzer
            .update(now, self.watchdog.is_alerting() || external)?;

        Ok(event)
    }

    fn handle_scan(&mut self, uid: &TagUid, now: Millis) -> Result<ScanEvent, Error> {
        let was_alerting = self.watchdog.is_alerting();
        let outcome = self.controller.on_scan(uid, now, self.buzzer.player())?;
        if outcome.reset {
            self.watchdog.cancel();
            self.alert.clear();
        }
        match outcome.status {
            ScanStatus::Unlocked => self.watchdog.arm(now),
            ScanStatus::Locked => {
                self.watchdog.cancel();
                // Re-locking an alerting lock silences it at once; the tone
                // stopping is the acknowledgement.
                if was_alerting {
                    self.buzzer.player().stop();
                }
            }
            ScanStatus::Denied => {}
        }
        Ok(ScanEvent {
            uid: uid.clone(),
            status: outcome.status,
            reset: outcome.reset,
            fault: outcome.fault,
        })
    }

    pub fn lock_state(&self) -> LockState {
        self.controller.lock_state()
    }

    pub fn failed_scans(&self) -> u8 {
        self.controller.failed_scans()
    }

    pub fn controller(&self) -> &AccessController<L, N> {
        &self.controller
    }

    pub fn watchdog(&self) -> &ItemWatchdog {
        &self.watchdog
    }

    pub fn external_alert(&self) -> &ExternalAlert {
        &self.alert
    }

    pub fn buzzer_on(&self) -> bool {
        self.buzzer.is_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watchdog::WatchState;
    use core::convert::Infallible;

    struct Bolt;

    impl LockActuator for Bolt {
        fn drive(&mut self, _state: LockState) -> Result<(), Error> {
            Ok(())
        }
    }

    /// Works for `moves_left` moves, then jams.
    struct JammingBolt {
        moves_left: u8,
    }

    impl LockActuator for JammingBolt {
        fn drive(&mut self, _state: LockState) -> Result<(), Error> {
            if self.moves_left == 0 {
                return Err(Error::LockActuatorError);
            }
            self.moves_left -= 1;
            Ok(())
        }
    }

    struct Pin;

    impl OutputPin for Pin {
        type Error = Infallible;
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    const PRESENT: PressureReading = PressureReading(2_000);
    const ABSENT: PressureReading = PressureReading(10);

    fn device() -> Device<Bolt, Pin, 4> {
        let allow_list = AllowList::from_strs(&["AA BB CC DD"]).unwrap();
        Device::new(DeviceConfig::default(), allow_list, Bolt, Pin).unwrap()
    }

    fn idle(now: Millis, pressure: PressureReading) -> Inputs<'static> {
        Inputs {
            now,
            pressure,
            tag: None,
            command: None,
        }
    }

    fn scan(now: Millis, pressure: PressureReading, tag: &TagUid) -> Inputs<'_> {
        Inputs {
            now,
            pressure,
            tag: Some(tag),
            command: None,
        }
    }

    #[test]
    fn test_debounce() {
        let mut dev = device();
        let tag = TagUid::parse("AA BB CC DD").unwrap();

        assert!(dev.poll(scan(1_000, PRESENT, &tag)).unwrap().is_some());
        assert!(!dev.ready_for_scan(1_499));
        assert_eq!(dev.poll(scan(1_200, PRESENT, &tag)).unwrap(), None);
        assert_eq!(dev.lock_state(), LockState::Unlocked);

        assert!(dev.ready_for_scan(1_500));
        let event = dev.poll(scan(1_500, PRESENT, &tag)).unwrap().unwrap();
        assert_eq!(event.status, ScanStatus::Locked);
    }

    #[test]
    fn test_unlock_arms_watchdog() {
        let mut dev = device();
        let tag = TagUid::parse("AA BB CC DD").unwrap();

        dev.poll(scan(0, ABSENT, &tag)).unwrap();
        assert_eq!(dev.watchdog().state(), WatchState::Armed { since: 0 });
        assert!(dev.controller().session().is_some());
    }

    #[test]
    fn test_item_present_ends_session() {
        let mut dev = device();
        let tag = TagUid::parse("AA BB CC DD").unwrap();

        dev.poll(scan(0, ABSENT, &tag)).unwrap();
        dev.poll(idle(3_000, PRESENT)).unwrap();
        assert_eq!(dev.watchdog().state(), WatchState::Idle);
        assert!(dev.controller().session().is_none());
        assert_eq!(dev.lock_state(), LockState::Unlocked);
    }

    #[test]
    fn test_unknown_command_ignored() {
        let mut dev = device();
        let mut inputs = idle(0, ABSENT);
        inputs.command = Some(b'x');
        dev.poll(inputs).unwrap();
        assert!(!dev.external_alert().is_asserted());
        assert!(!dev.buzzer_on());
    }

    #[test]
    fn test_lockout_with_jammed_bolt_silences_watchdog() {
        let allow_list = AllowList::from_strs(&["AA BB CC DD"]).unwrap();
        let bolt = JammingBolt { moves_left: 2 };
        let mut dev: Device<_, _, 4> =
            Device::new(DeviceConfig::default(), allow_list, bolt, Pin).unwrap();
        let tag = TagUid::parse("AA BB CC DD").unwrap();
        let stranger = TagUid::parse("11 22 33 44").unwrap();

        dev.poll(scan(0, ABSENT, &tag)).unwrap();
        dev.poll(idle(16_000, ABSENT)).unwrap();
        assert!(dev.watchdog().is_alerting());

        let mut alert_on = idle(16_100, ABSENT);
        alert_on.command = Some(b'F');
        dev.poll(alert_on).unwrap();

        dev.poll(scan(17_000, ABSENT, &stranger)).unwrap();
        dev.poll(scan(18_000, ABSENT, &stranger)).unwrap();
        let event = dev.poll(scan(19_000, ABSENT, &stranger)).unwrap().unwrap();

        assert!(event.reset);
        assert_eq!(event.fault, Some(Error::LockActuatorError));
        assert_eq!(dev.lock_state(), LockState::Locked);
        assert_eq!(dev.watchdog().state(), WatchState::Idle);
        assert!(!dev.external_alert().is_asserted());

        // Only the failure pattern was left, and it has finished
        dev.poll(idle(25_000, ABSENT)).unwrap();
        assert!(!dev.buzzer_on());
    }
}
