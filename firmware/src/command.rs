//! Single byte commands from the host.
//!
//! | Byte  | Command                     |
//! |-------|-----------------------------|
//! | `F`   | Assert the continuous alert |
//! | `S`   | Clear the continuous alert  |
//!
//! Every other byte is ignored.

use crate::pressure::Presence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    ForceAlert,
    StopAlert,
}

impl HostCommand {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'F' => Some(Self::ForceAlert),
            b'S' => Some(Self::StopAlert),
            _ => None,
        }
    }
}

/// Alert asserted by the host.
///
/// While asserted, the buzzer sounds whenever the item is missing, no matter
/// whether the door is locked. The assertion clears itself as soon as the
/// item is detected.
#[derive(Debug, Default)]
pub struct ExternalAlert {
    asserted: bool,
}

impl ExternalAlert {
    pub const fn new() -> Self {
        Self { asserted: false }
    }

    pub fn apply(&mut self, command: HostCommand) {
        self.asserted = command == HostCommand::ForceAlert;
    }

    pub fn clear(&mut self) {
        self.asserted = false;
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    /// Returns whether the buzzer has to sound this cycle.
    pub fn poll(&mut self, presence: Presence) -> bool {
        if presence == Presence::Present {
            self.asserted = false;
        }
        self.asserted
    }
}
