//! Tag UIDs and the allow-list of authorized tags.
//!
//! The textual form of a UID is uppercase hex, two digits per byte, single
//! space separated (`"0A BB CC DD"`). Parsing is lenient: any case, any
//! whitespace between tokens and one-digit tokens (`"a bb cc dd"`) are
//! accepted, so entries written without zero padding still match.

use heapless::Vec;
use ufmt::{uDisplay, uWrite, Formatter};

use crate::errors::Error;

/// Longest UID an ISO 14443A tag reports (triple size)
pub const MAX_UID_LEN: usize = 10;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUid(Vec<u8, MAX_UID_LEN>);

impl TagUid {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::UidLength);
        }
        Vec::from_slice(bytes).map(Self).map_err(|_| Error::UidLength)
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        for token in s.split_whitespace() {
            if token.len() > 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::InvalidUid);
            }
            let byte = u8::from_str_radix(token, 16).map_err(|_| Error::InvalidUid)?;
            bytes.push(byte).map_err(|_| Error::UidLength)?;
        }
        if bytes.is_empty() {
            return Err(Error::UidLength);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl uDisplay for TagUid {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        for (i, byte) in self.0.iter().enumerate() {
            let digits = [
                b' ',
                HEX_DIGITS[usize::from(byte >> 4)],
                HEX_DIGITS[usize::from(byte & 0x0f)],
            ];
            // Only ASCII above, the conversion cannot fail
            let text = core::str::from_utf8(&digits).unwrap_or_default();
            f.write_str(if i == 0 { &text[1..] } else { text })?;
        }
        Ok(())
    }
}

/// Static set of authorized tags, filled once at startup.
#[derive(Debug, Default)]
pub struct AllowList<const N: usize> {
    entries: Vec<TagUid, N>,
}

impl<const N: usize> AllowList<N> {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn from_strs(uids: &[&str]) -> Result<Self, Error> {
        let mut list = Self::new();
        for uid in uids {
            list.insert(TagUid::parse(uid)?)?;
        }
        Ok(list)
    }

    pub fn insert(&mut self, uid: TagUid) -> Result<(), Error> {
        if self.contains(&uid) {
            return Ok(());
        }
        self.entries.push(uid).map_err(|_| Error::AllowListFull)
    }

    pub fn contains(&self, uid: &TagUid) -> bool {
        self.entries.iter().any(|entry| entry == uid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
