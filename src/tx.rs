//! Transmit direction: bytes in, line levels out

use crate::clock::BitClock;
use crate::divisor::BitPeriod;
use crate::framing::DATA_BITS;
use tracing::{debug, trace};

/// Transmitter state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TxState {
    /// Ready for a byte, line held high
    Idle,
    /// Byte latched, start bit goes out on the next strobe
    Start,
    /// Shifting data bits out
    Data,
    /// Stop bit goes out on the next strobe
    Stop,
}

/// Byte being shifted out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransmitLatch {
    /// Remaining bits, next one in bit 0
    pub data: u8,
    /// Number of data bits already driven
    pub bit: u8,
}

impl TransmitLatch {
    fn load(byte: u8) -> Self {
        TransmitLatch { data: byte, bit: 0 }
    }

    /// Drop the bit just driven, filling from the top with ones
    fn shift(self) -> Self {
        TransmitLatch {
            data: (self.data >> 1) | 0x80,
            bit: self.bit + 1,
        }
    }

    fn next_level(&self) -> bool {
        self.data & 1 != 0
    }
}

/// Inputs seen by the transmitter on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxInput {
    /// Bit clock strobe for this tick
    pub strobe: bool,
    /// Producer has a byte for us
    pub ready: bool,
    /// The producer's byte
    pub byte: u8,
}

/// Result of one transmitter transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxTransition {
    /// State for the next tick
    pub state: TxState,
    /// Latch contents for the next tick
    pub latch: TransmitLatch,
    /// Line level for the next tick
    pub line: bool,
    /// Restart the bit clock at a full period
    pub restart_clock: bool,
}

/// Pure next-state function of the transmitter
pub fn transition(state: TxState, latch: TransmitLatch, line: bool, input: TxInput) -> TxTransition {
    let stay = TxTransition {
        state,
        latch,
        line,
        restart_clock: false,
    };

    match state {
        TxState::Idle if input.ready => TxTransition {
            state: TxState::Start,
            latch: TransmitLatch::load(input.byte),
            restart_clock: true,
            ..stay
        },
        TxState::Idle => TxTransition { line: true, ..stay },
        TxState::Start if input.strobe => TxTransition {
            state: TxState::Data,
            line: false,
            ..stay
        },
        TxState::Data if input.strobe => {
            let shifted = latch.shift();
            let state = if usize::from(shifted.bit) == DATA_BITS {
                TxState::Stop
            } else {
                TxState::Data
            };
            TxTransition {
                state,
                latch: shifted,
                line: latch.next_level(),
                restart_clock: false,
            }
        }
        TxState::Stop if input.strobe => TxTransition {
            state: TxState::Idle,
            line: true,
            ..stay
        },
        _ => stay,
    }
}

/// Producer-facing signals and the line level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutputs {
    /// Level driven onto the outgoing line
    pub line: bool,
    /// Ready to accept a new byte
    pub ack: bool,
}

/// Transmit state machine with its own bit clock
#[derive(Debug, Clone)]
pub struct TransmitEngine {
    clock: BitClock,
    state: TxState,
    latch: TransmitLatch,
    line: bool,
}

impl TransmitEngine {
    /// Create an idle transmitter with the line high
    pub fn new(period: BitPeriod) -> Self {
        TransmitEngine {
            clock: BitClock::new(period),
            state: TxState::Idle,
            latch: TransmitLatch::default(),
            line: true,
        }
    }

    /// Current state
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Current latch contents
    pub fn latch(&self) -> TransmitLatch {
        self.latch
    }

    /// Level currently driven onto the line
    pub fn line(&self) -> bool {
        self.line
    }

    /// Producer-facing signals for the current state
    pub fn outputs(&self) -> TxOutputs {
        TxOutputs {
            line: self.line,
            ack: self.state == TxState::Idle,
        }
    }

    /// Advance one tick with the producer's handshake
    pub fn step(&mut self, ready: bool, byte: u8) -> TxOutputs {
        let input = TxInput {
            strobe: self.clock.tick(),
            ready,
            byte,
        };

        let next = transition(self.state, self.latch, self.line, input);
        if next.restart_clock {
            self.clock.realign(self.clock.period().reload());
            debug!(byte, "tx byte latched");
        }
        if input.strobe && next.line != self.line {
            trace!(state = ?self.state, line = next.line, "tx strobe");
        }
        if self.state == TxState::Stop && next.state == TxState::Idle {
            debug!("tx frame complete");
        }

        self.state = next.state;
        self.latch = next.latch;
        self.line = next.line;
        self.outputs()
    }

    /// Abandon any frame in flight and return to idle with the line high
    pub fn reset(&mut self) {
        if self.state != TxState::Idle {
            debug!(state = ?self.state, "tx reset");
        }
        self.state = TxState::Idle;
        self.latch = TransmitLatch::default();
        self.line = true;
        self.clock.reset();
    }
}
