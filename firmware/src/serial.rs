//! Helpers for using the serial port.

use heapless::spsc::Producer;
use usb_device::{bus::UsbBus, UsbError};
use usbd_serial::SerialPort;

use crate::errors::Error;

// Configure serial buffer
pub const SERIAL_READ_BUFFER_BYTES: usize = 256;
pub const SERIAL_WRITE_BUFFER_BYTES: usize = 512;

/// USB CDC serial port with statically sized buffers
pub type BufferedSerialPort<'a, B> =
    SerialPort<'a, B, [u8; SERIAL_READ_BUFFER_BYTES], [u8; SERIAL_WRITE_BUFFER_BYTES]>;

/// Wrapper for a `SerialPort` that supports ufmt
pub struct SerialWriter<'a, 'b, B: UsbBus>(pub &'a mut BufferedSerialPort<'b, B>);

impl<'a, 'b, B: UsbBus> ufmt::uWrite for SerialWriter<'a, 'b, B> {
    type Error = Error;
    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        match self.0.write(s.as_bytes()) {
            Ok(written) if written == s.len() => Ok(()),
            _ => Err(Error::UfmtSerialWriteError),
        }
    }
}

/// Move received bytes into `commands`. Bytes that do not fit are dropped.
///
/// Returns the number of bytes queued.
pub fn receive_commands<B: UsbBus, const N: usize>(
    port: &mut BufferedSerialPort<'_, B>,
    commands: &mut Producer<'_, u8, N>,
) -> usize {
    let mut buf = [0u8; 16];
    let mut queued = 0;
    loop {
        match port.read(&mut buf) {
            Ok(0) | Err(UsbError::WouldBlock) => return queued,
            Ok(count) => {
                for byte in &buf[..count] {
                    if commands.enqueue(*byte).is_ok() {
                        queued += 1;
                    }
                }
            }
            Err(_) => return queued,
        }
    }
}
