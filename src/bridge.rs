//! Loopback echo: every received byte is handed back to the transmitter

use crate::engine::{TickInputs, TickOutputs};
use tracing::trace;

/// One-byte buffer between the receive and transmit handshakes
///
/// A byte is taken from the receiver only while the buffer is empty, and given
/// to the transmitter only while it is full, so the two never happen on the
/// same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Echo {
    data: u8,
    empty: bool,
}

impl Echo {
    /// Create an empty bridge
    pub fn new() -> Self {
        Echo {
            data: 0,
            empty: true,
        }
    }

    /// Whether no byte is buffered
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Drive the handshake inputs for the next tick from the last outputs
    ///
    /// `incoming_line` is passed through untouched; reset is never asserted.
    pub fn drive(&mut self, last: &TickOutputs, incoming_line: bool) -> TickInputs {
        let take = last.rx_ready && self.empty;
        let give = last.tx_ack && !self.empty;

        let inputs = TickInputs {
            incoming_line,
            producer_ready: give,
            producer_byte: self.data,
            consumer_ack: take,
            reset: false,
        };

        if take {
            trace!(byte = last.received_byte, "echo buffered");
            self.data = last.received_byte;
            self.empty = false;
        }
        if give {
            self.empty = true;
        }
        inputs
    }
}

impl Default for Echo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(rx_ready: bool, byte: u8, tx_ack: bool) -> TickOutputs {
        TickOutputs {
            outgoing_line: true,
            received_byte: byte,
            rx_ready,
            rx_error: false,
            rx_fault: None,
            tx_ack,
        }
    }

    #[test]
    fn test_takes_then_gives() {
        let mut echo = Echo::new();

        let inputs = echo.drive(&outputs(true, 0x5A, true), true);
        assert!(inputs.consumer_ack);
        assert!(!inputs.producer_ready);
        assert!(!echo.is_empty());

        let inputs = echo.drive(&outputs(false, 0, true), true);
        assert!(inputs.producer_ready);
        assert_eq!(inputs.producer_byte, 0x5A);
        assert!(!inputs.consumer_ack);
        assert!(echo.is_empty());
    }

    #[test]
    fn test_full_buffer_withholds_ack() {
        let mut echo = Echo::new();
        echo.drive(&outputs(true, 0x01, false), true);
        // transmitter busy: the next received byte is left waiting
        let inputs = echo.drive(&outputs(true, 0x02, false), true);
        assert!(!inputs.consumer_ack);
        assert!(!inputs.producer_ready);
    }
}
