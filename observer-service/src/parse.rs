//! Parsing of the lines the lock writes to the serial port.

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessStatus {
    Locked,
    Unlocked,
    Denied,
}

impl FromStr for AccessStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCKED" => Ok(Self::Locked),
            "UNLOCKED" => Ok(Self::Unlocked),
            "DENIED" => Ok(Self::Denied),
            other => Err(anyhow!("Unknown access status {:?}", other)),
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Locked => "LOCKED",
            Self::Unlocked => "UNLOCKED",
            Self::Denied => "DENIED",
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct LogEntry {
    /// Normalized UID: uppercase, two hex digits per byte, single spaces
    pub uid: String,
    pub status: AccessStatus,
    /// Time of day from the lock's RTC, if it sent one
    pub time: Option<NaiveTime>,
}

#[derive(Debug, PartialEq)]
pub enum Event {
    /// A scan was handled
    Access(LogEntry),
    /// The lock booted
    Ready,
    /// Too many failed scans, the lock reset itself
    Reset,
}

/// Parse a line and return the event it describes, if any.
pub fn parse_line(line: &str) -> Option<Event> {
    // Patterns
    lazy_static! {
        static ref LOG_RE: Regex = Regex::new(
            r"^LOG:(?P<uid>[0-9A-Fa-f ]+),(?P<status>[A-Z]+)(?:,(?P<time>[0-9]{1,2}:[0-9]{2}:[0-9]{2}))?$"
        )
        .unwrap();
        static ref READY_RE: Regex = Regex::new(r"^System ready\b").unwrap();
        static ref RESET_RE: Regex = Regex::new(r"^System reset\b").unwrap();
    }

    let line = line.trim();

    // Check for matches
    if let Some(capture) = LOG_RE.captures(line) {
        let uid = normalize_uid(&capture["uid"])?;
        let status = capture["status"].parse().ok()?;
        let time = match capture.name("time") {
            Some(time) => Some(NaiveTime::parse_from_str(time.as_str(), "%H:%M:%S").ok()?),
            None => None,
        };
        return Some(Event::Access(LogEntry { uid, status, time }));
    }
    if READY_RE.is_match(line) {
        return Some(Event::Ready);
    }
    if RESET_RE.is_match(line) {
        return Some(Event::Reset);
    }

    // No match
    None
}

/// Uppercase, zero padded, single space separated. `None` if a token is not
/// a hex byte.
fn normalize_uid(raw: &str) -> Option<String> {
    let bytes = raw
        .split_whitespace()
        .map(|token| {
            if token.len() > 2 {
                return None;
            }
            u8::from_str_radix(token, 16).ok()
        })
        .collect::<Option<Vec<u8>>>()?;
    if bytes.is_empty() {
        return None;
    }
    Some(
        bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" "),
    )
}
