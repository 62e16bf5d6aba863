//! Packed line status register

use bitfield::bitfield;

bitfield! {
    /// Per-tick flags packed into one byte
    ///
    /// Layout:
    /// - Bit 0: received byte waiting for acknowledge
    /// - Bit 1: receive fault latched
    /// - Bit 2: latched fault is a framing error
    /// - Bit 3: latched fault is an overflow
    /// - Bit 4: transmitter ready for a byte
    /// - Bit 5: incoming line level
    /// - Bit 6: outgoing line level
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusRegister(u8);
    impl Debug;
    pub rx_ready, set_rx_ready: 0;
    pub rx_error, set_rx_error: 1;
    pub framing_error, set_framing_error: 2;
    pub overflow_error, set_overflow_error: 3;
    pub tx_ack, set_tx_ack: 4;
    pub incoming_line, set_incoming_line: 5;
    pub outgoing_line, set_outgoing_line: 6;
}

impl StatusRegister {
    /// Wrap a raw register value
    pub fn from_bits(bits: u8) -> Self {
        StatusRegister(bits)
    }

    /// Raw register value
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rx[{}{}] tx[{}] line[{}{}]",
            if self.rx_ready() { "R" } else { "-" },
            if self.framing_error() {
                "F"
            } else if self.overflow_error() {
                "O"
            } else {
                "-"
            },
            if self.tx_ack() { "A" } else { "-" },
            u8::from(self.incoming_line()),
            u8::from(self.outgoing_line()),
        )
    }
}
