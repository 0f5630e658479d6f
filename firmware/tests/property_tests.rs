//! Property tests for the access controller and the item watchdog.

mod common;

use common::{idle, rig_with, scan, uid, ABSENT, PRESENT};
use proptest::prelude::*;
use rfid_lock_firmware::config::DeviceConfig;
use rfid_lock_firmware::controller::ScanStatus;
use rfid_lock_firmware::lock::LockState;
use rfid_lock_firmware::pressure::Presence;
use rfid_lock_firmware::watchdog::{ItemWatchdog, WatchState};

const AUTHORIZED: &str = "AA BB CC DD";

fn arb_uid() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(AUTHORIZED.to_string()),
        Just("aa bb cc dd".to_string()),
        proptest::collection::vec(any::<u8>(), 1..=10).prop_map(|bytes| {
            bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ")
        }),
    ]
}

proptest! {
    /// Authorized scans toggle exactly once and clear the counter; denied
    /// scans leave the lock alone and count up until the lockout fires.
    #[test]
    fn scans_follow_the_model(
        uids in proptest::collection::vec(arb_uid(), 1..40),
        max_failed in 1u8..=5,
    ) {
        let config = DeviceConfig {
            max_failed_scans: max_failed,
            ..DeviceConfig::new()
        };
        let mut rig = rig_with(config);
        let authorized = uid(AUTHORIZED);

        let mut lock = LockState::Locked;
        let mut failed = 0u8;
        for (i, raw) in uids.iter().enumerate() {
            let tag = uid(raw);
            let now = (i as u32 + 1) * 1_000;
            let event = rig.device.poll(scan(now, PRESENT, &tag)).unwrap().unwrap();

            if tag == authorized {
                lock = lock.toggled();
                failed = 0;
                prop_assert_ne!(event.status, ScanStatus::Denied);
                prop_assert!(!event.reset);
            } else {
                failed += 1;
                prop_assert_eq!(event.status, ScanStatus::Denied);
                if failed == max_failed {
                    prop_assert!(event.reset);
                    lock = LockState::Locked;
                    failed = 0;
                } else {
                    prop_assert!(!event.reset);
                }
            }

            prop_assert_eq!(rig.device.lock_state(), lock);
            prop_assert_eq!(rig.device.failed_scans(), failed);
            prop_assert!(rig.device.failed_scans() < max_failed);
        }
    }

    /// Two authorized scans in a row always come back to the same state.
    #[test]
    fn double_toggle_law(prefix in 0usize..5) {
        let mut rig = rig_with(DeviceConfig::default());
        let authorized = uid(AUTHORIZED);
        let mut now = 0;
        for _ in 0..prefix {
            now += 1_000;
            rig.device.poll(scan(now, PRESENT, &authorized)).unwrap();
        }

        let before = rig.device.lock_state();
        rig.device.poll(scan(now + 1_000, PRESENT, &authorized)).unwrap();
        rig.device.poll(scan(now + 2_000, PRESENT, &authorized)).unwrap();
        prop_assert_eq!(rig.device.lock_state(), before);
    }

    /// Absent for longer than the grace period means alerting, and it stays
    /// that way for as long as the item is missing.
    #[test]
    fn watchdog_alerts_after_grace(
        armed_at in any::<u32>(),
        overshoot in 1u32..100_000,
        later in 0u32..1_000_000,
    ) {
        let grace = 15_000;
        let mut wd = ItemWatchdog::new(grace);
        wd.arm(armed_at);

        let first = armed_at.wrapping_add(grace).wrapping_add(overshoot);
        prop_assert_eq!(wd.poll(first, Presence::Absent), WatchState::Alerting);
        prop_assert_eq!(wd.poll(first.wrapping_add(later), Presence::Absent), WatchState::Alerting);
    }

    /// The item coming back always disarms, before or after the deadline.
    #[test]
    fn watchdog_present_disarms(
        absent_polls in proptest::collection::vec(0u32..40_000, 0..20),
        back_at in 0u32..60_000,
    ) {
        let mut wd = ItemWatchdog::new(15_000);
        wd.arm(0);
        let mut sorted = absent_polls;
        sorted.sort_unstable();
        for t in sorted {
            wd.poll(t, Presence::Absent);
        }
        prop_assert_eq!(wd.poll(back_at, Presence::Present), WatchState::Idle);
    }

    /// One poll past the deadline is enough, however late it comes.
    #[test]
    fn alert_level_triggered(extra in 1u32..30_000) {
        let mut rig = rig_with(DeviceConfig::default());
        let authorized = uid(AUTHORIZED);
        rig.device.poll(scan(0, ABSENT, &authorized)).unwrap();
        rig.device.poll(idle(15_000 + extra, ABSENT)).unwrap();
        prop_assert!(rig.device.watchdog().is_alerting());
        prop_assert!(rig.buzzer.is_high());
    }
}
