//! Log lines for the host.
//!
//! Every handled scan produces one line on the serial port:
//!
//! ```text
//! LOG:<uid>,<status>[,<hh:mm:ss>]
//! ```
//!
//! The time is left out when the RTC could not be read.

use ufmt::{uDisplay, uWrite, uwrite, Formatter};

use crate::{controller::ScanStatus, uid::TagUid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(Self {
            hour,
            minute,
            second,
        })
    }
}

struct TwoDigits(u8);

impl uDisplay for TwoDigits {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        if self.0 < 10 {
            f.write_str("0")?;
        }
        uwrite!(f, "{}", self.0)
    }
}

impl uDisplay for TimeOfDay {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        uwrite!(
            f,
            "{}:{}:{}",
            TwoDigits(self.hour),
            TwoDigits(self.minute),
            TwoDigits(self.second)
        )
    }
}

pub struct LogLine<'a> {
    pub uid: &'a TagUid,
    pub status: ScanStatus,
    pub time: Option<TimeOfDay>,
}

impl uDisplay for LogLine<'_> {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        uwrite!(f, "LOG:{},{}", self.uid, self.status)?;
        if let Some(time) = &self.time {
            uwrite!(f, ",{}", time)?;
        }
        Ok(())
    }
}

/// Write `line` terminated with CRLF.
pub fn write_log_line<W: uWrite + ?Sized>(w: &mut W, line: &LogLine<'_>) -> Result<(), W::Error> {
    uwrite!(w, "{}\r\n", line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct Buf(String);

    impl uWrite for Buf {
        type Error = Infallible;
        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            self.0.push_str(s);
            Ok(())
        }
    }

    fn render(line: &LogLine<'_>) -> String {
        let mut buf = Buf(String::new());
        write_log_line(&mut buf, line).unwrap();
        buf.0
    }

    #[test]
    fn test_line_without_time() {
        let uid = TagUid::parse("73 c9 2d 20").unwrap();
        let line = LogLine {
            uid: &uid,
            status: ScanStatus::Unlocked,
            time: None,
        };
        assert_eq!(render(&line), "LOG:73 C9 2D 20,UNLOCKED\r\n");
    }

    #[test]
    fn test_line_with_time() {
        let uid = TagUid::parse("11 22 33 44").unwrap();
        let line = LogLine {
            uid: &uid,
            status: ScanStatus::Denied,
            time: TimeOfDay::new(7, 5, 9),
        };
        assert_eq!(render(&line), "LOG:11 22 33 44,DENIED,07:05:09\r\n");
    }

    #[test]
    fn test_time_of_day_range() {
        assert!(TimeOfDay::new(23, 59, 59).is_some());
        assert!(TimeOfDay::new(24, 0, 0).is_none());
        assert!(TimeOfDay::new(0, 60, 0).is_none());
        assert!(TimeOfDay::new(0, 0, 60).is_none());
    }
}
