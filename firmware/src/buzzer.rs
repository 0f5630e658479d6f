//! Non-blocking buzzer feedback.
//!
//! Feedback patterns are short lists of [`Pulse`]s that the [`BuzzerPlayer`]
//! walks through as the control loop polls it, so playing a pattern never
//! stalls tag scanning. A continuous alert overrides whatever pattern is
//! playing.

use embedded_hal::digital::v2::OutputPin;

use crate::{elapsed, errors::Error, Millis};

/// One slice of a feedback pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub duration_ms: Millis,
    pub on: bool,
}

impl Pulse {
    pub const fn on(duration_ms: Millis) -> Self {
        Self { duration_ms, on: true }
    }

    pub const fn off(duration_ms: Millis) -> Self {
        Self {
            duration_ms,
            on: false,
        }
    }
}

/// Single short beep for an accepted tag.
pub const SUCCESS: &[Pulse] = &[Pulse::on(500)];

/// Two beeps for a rejected tag.
pub const FAILURE: &[Pulse] = &[
    Pulse::on(500),
    Pulse::off(250),
    Pulse::on(500),
    Pulse::off(250),
];

/// Plays one pattern at a time.
#[derive(Debug, Default)]
pub struct BuzzerPlayer {
    pattern: &'static [Pulse],
    index: usize,
    step_started: Millis,
}

impl BuzzerPlayer {
    pub const fn new() -> Self {
        Self {
            pattern: &[],
            index: 0,
            step_started: 0,
        }
    }

    /// Start `pattern` at `now`, replacing the one playing.
    pub fn play(&mut self, pattern: &'static [Pulse], now: Millis) {
        self.pattern = pattern;
        self.index = 0;
        self.step_started = now;
    }

    pub fn stop(&mut self) {
        self.pattern = &[];
        self.index = 0;
    }

    pub fn is_playing(&self) -> bool {
        self.index < self.pattern.len()
    }

    /// Advance to `now` and return whether the pattern wants the buzzer on.
    pub fn tick(&mut self, now: Millis) -> bool {
        while let Some(pulse) = self.pattern.get(self.index) {
            if elapsed(now, self.step_started) < pulse.duration_ms {
                return pulse.on;
            }
            self.step_started = self.step_started.wrapping_add(pulse.duration_ms);
            self.index += 1;
        }
        false
    }
}

/// Buzzer on a push-pull GPIO.
pub struct Buzzer<P> {
    pin: P,
    player: BuzzerPlayer,
    level: bool,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(mut pin: P) -> Result<Self, Error> {
        pin.set_low().map_err(|_| Error::BuzzerGpioWriteError)?;
        Ok(Self {
            pin,
            player: BuzzerPlayer::new(),
            level: false,
        })
    }

    pub fn player(&mut self) -> &mut BuzzerPlayer {
        &mut self.player
    }

    pub fn is_on(&self) -> bool {
        self.level
    }

    /// Drive the pin for this cycle. `continuous` keeps it on regardless of
    /// the pattern. The pin is only written when the level changes.
    pub fn update(&mut self, now: Millis, continuous: bool) -> Result<bool, Error> {
        let pattern_on = self.player.tick(now);
        let level = continuous || pattern_on;
        if level != self.level {
            let written = if level {
                self.pin.set_high()
            } else {
                self.pin.set_low()
            };
            written.map_err(|_| Error::BuzzerGpioWriteError)?;
            self.level = level;
        }
        Ok(level)
    }

    pub fn release(self) -> P {
        self.pin
    }
}
