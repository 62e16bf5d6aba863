//! Receive direction: line samples in, bytes out
//!
//! The receiver waits for the start bit's falling edge, moves its bit clock so
//! every later strobe lands on tick `P/2` of a bit cell, then shifts in eight
//! data bits (least significant first) and checks the stop bit.
//!
//! ```text
//! IDLE --edge--> START --strobe--> DATA x8 --strobe--> STOP --high--> FULL --ack--> IDLE
//!                                                        |              |
//!                                                       low           edge
//!                                                        v              v
//!                                                      ERROR <----------+
//! ```

use crate::clock::BitClock;
use crate::config::StartDetect;
use crate::divisor::BitPeriod;
use crate::error::ReceiveFault;
use crate::framing::DATA_BITS;
use tracing::{debug, trace, warn};

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RxState {
    /// Line idle, waiting for a start edge
    Idle,
    /// Inside the start bit
    Start,
    /// Shifting in data bits
    Data,
    /// Waiting to sample the stop bit
    Stop,
    /// Byte complete, waiting for acknowledge
    Full,
    /// Latched fault, cleared only by reset
    Error(ReceiveFault),
}

/// Data bits assembled so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReceiveFrame {
    /// Shift register, filled from the top so the first bit ends up in bit 0
    pub data: u8,
    /// Index of the next data bit, `0..8`
    pub bit: u8,
}

impl ReceiveFrame {
    /// Shift one sampled bit in
    fn push(self, level: bool) -> Self {
        ReceiveFrame {
            data: (self.data >> 1) | if level { 0x80 } else { 0 },
            bit: self.bit + 1,
        }
    }

    /// Whether all data bits have been sampled
    fn is_complete(&self) -> bool {
        usize::from(self.bit) == DATA_BITS
    }
}

/// Inputs seen by the receiver on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxInput {
    /// Current line level
    pub line: bool,
    /// Start condition detected on this tick
    pub start: bool,
    /// Bit clock strobe for this tick
    pub strobe: bool,
    /// Consumer acknowledge
    pub ack: bool,
}

/// Result of one receiver transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxTransition {
    /// State for the next tick
    pub state: RxState,
    /// Frame contents for the next tick
    pub frame: ReceiveFrame,
    /// Move the bit clock to the middle of the cell starting on this tick
    pub realign: bool,
}

/// Pure next-state function of the receiver
pub fn transition(state: RxState, frame: ReceiveFrame, input: RxInput) -> RxTransition {
    let stay = RxTransition {
        state,
        frame,
        realign: false,
    };

    match state {
        RxState::Idle if input.start => RxTransition {
            state: RxState::Start,
            frame: ReceiveFrame::default(),
            realign: true,
        },
        RxState::Start if input.strobe => RxTransition {
            state: RxState::Data,
            ..stay
        },
        RxState::Data if input.strobe => {
            let frame = frame.push(input.line);
            let state = if frame.is_complete() {
                RxState::Stop
            } else {
                RxState::Data
            };
            RxTransition {
                state,
                frame,
                realign: false,
            }
        }
        RxState::Stop if input.strobe => {
            let state = if input.line {
                RxState::Full
            } else {
                RxState::Error(ReceiveFault::Framing)
            };
            RxTransition { state, ..stay }
        }
        // acknowledge wins over overflow, and the start edge still counts
        RxState::Full if input.ack && input.start => RxTransition {
            state: RxState::Start,
            frame: ReceiveFrame::default(),
            realign: true,
        },
        RxState::Full if input.ack => RxTransition {
            state: RxState::Idle,
            frame: ReceiveFrame::default(),
            realign: false,
        },
        RxState::Full if input.start => RxTransition {
            state: RxState::Error(ReceiveFault::Overflow),
            ..stay
        },
        _ => stay,
    }
}

/// Snapshot of the receiver's consumer-facing signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxOutputs {
    /// Received byte, valid while `ready` is set
    pub data: u8,
    /// A byte is waiting for acknowledge
    pub ready: bool,
    /// A fault is latched
    pub error: bool,
}

/// Receive state machine with its own bit clock
#[derive(Debug, Clone)]
pub struct ReceiveEngine {
    clock: BitClock,
    state: RxState,
    frame: ReceiveFrame,
    prev_line: bool,
    start_detect: StartDetect,
}

impl ReceiveEngine {
    /// Create an idle receiver
    pub fn new(period: BitPeriod, start_detect: StartDetect) -> Self {
        ReceiveEngine {
            clock: BitClock::new(period),
            state: RxState::Idle,
            frame: ReceiveFrame::default(),
            prev_line: true,
            start_detect,
        }
    }

    /// Current state
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Current frame contents
    pub fn frame(&self) -> ReceiveFrame {
        self.frame
    }

    /// The receive bit clock
    pub fn clock(&self) -> &BitClock {
        &self.clock
    }

    /// Latched fault, if any
    pub fn fault(&self) -> Option<ReceiveFault> {
        match self.state {
            RxState::Error(fault) => Some(fault),
            _ => None,
        }
    }

    /// The completed byte while one is waiting for acknowledge
    pub fn byte(&self) -> Option<u8> {
        match self.state {
            RxState::Full => Some(self.frame.data),
            _ => None,
        }
    }

    /// Consumer-facing signals for the current state
    pub fn outputs(&self) -> RxOutputs {
        RxOutputs {
            data: self.frame.data,
            ready: self.state == RxState::Full,
            error: matches!(self.state, RxState::Error(_)),
        }
    }

    fn start_seen(&self, line: bool) -> bool {
        match self.start_detect {
            StartDetect::Edge => self.prev_line && !line,
            StartDetect::Level => !line,
        }
    }

    /// Advance one tick with the sampled line and the consumer's acknowledge
    pub fn step(&mut self, line: bool, ack: bool) -> RxOutputs {
        let input = RxInput {
            line,
            start: self.start_seen(line),
            strobe: self.clock.tick(),
            ack,
        };

        let next = transition(self.state, self.frame, input);
        if next.realign {
            self.clock.realign(self.clock.period().mid_cell());
        }
        if input.strobe && self.state != next.state {
            trace!(from = ?self.state, to = ?next.state, "rx strobe");
        }
        match next.state {
            RxState::Full if self.state != RxState::Full => {
                debug!(byte = next.frame.data, "rx frame complete");
            }
            RxState::Error(fault) if self.state != next.state => {
                warn!(%fault, "rx fault latched");
            }
            _ => {}
        }

        self.state = next.state;
        self.frame = next.frame;
        self.prev_line = line;
        self.outputs()
    }

    /// Return to idle with the frame cleared
    ///
    /// `line` is the level currently on the wire; a line held low through the
    /// reset does not count as a start edge afterwards.
    pub fn reset(&mut self, line: bool) {
        if self.state != RxState::Idle {
            debug!(state = ?self.state, "rx reset");
        }
        self.state = RxState::Idle;
        self.frame = ReceiveFrame::default();
        self.clock.reset();
        self.prev_line = line;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::frame_bits;

    fn engine(ticks: u32) -> ReceiveEngine {
        ReceiveEngine::new(BitPeriod::new(ticks).unwrap(), StartDetect::Edge)
    }

    /// Hold each frame bit on the line for one bit period
    fn feed(rx: &mut ReceiveEngine, bits: &[bool], ticks_per_bit: u32) -> RxOutputs {
        let mut out = rx.outputs();
        for &bit in bits {
            for _ in 0..ticks_per_bit {
                out = rx.step(bit, false);
            }
        }
        out
    }

    #[test]
    fn test_transition_idle_waits_for_start() {
        let next = transition(
            RxState::Idle,
            ReceiveFrame::default(),
            RxInput {
                line: true,
                strobe: true,
                ..Default::default()
            },
        );
        assert_eq!(next.state, RxState::Idle);
        assert!(!next.realign);
    }

    #[test]
    fn test_transition_start_realigns() {
        let next = transition(
            RxState::Idle,
            ReceiveFrame { data: 0xAA, bit: 3 },
            RxInput {
                start: true,
                ..Default::default()
            },
        );
        assert_eq!(next.state, RxState::Start);
        assert_eq!(next.frame, ReceiveFrame::default());
        assert!(next.realign);
    }

    #[test]
    fn test_transition_ack_beats_overflow() {
        let frame = ReceiveFrame { data: 0x42, bit: 8 };
        let next = transition(
            RxState::Full,
            frame,
            RxInput {
                start: true,
                ack: true,
                ..Default::default()
            },
        );
        assert_eq!(next.state, RxState::Start);
        assert_eq!(next.frame, ReceiveFrame::default());
        assert!(next.realign);

        let next = transition(
            RxState::Full,
            frame,
            RxInput {
                line: true,
                ack: true,
                ..Default::default()
            },
        );
        assert_eq!(next.state, RxState::Idle);
        assert!(!next.realign);
    }

    #[test]
    fn test_receive_byte() {
        let mut rx = engine(4);
        let out = feed(&mut rx, &frame_bits(0x55), 4);
        assert!(out.ready);
        assert!(!out.error);
        assert_eq!(out.data, 0x55);
        assert_eq!(rx.byte(), Some(0x55));
    }

    #[test]
    fn test_full_is_stable_without_ack() {
        let mut rx = engine(4);
        feed(&mut rx, &frame_bits(0xC3), 4);
        for _ in 0..40 {
            let out = rx.step(true, false);
            assert!(out.ready);
            assert_eq!(out.data, 0xC3);
        }
    }

    #[test]
    fn test_ack_returns_to_idle() {
        let mut rx = engine(4);
        feed(&mut rx, &frame_bits(0x81), 4);
        let out = rx.step(true, true);
        assert!(!out.ready);
        assert_eq!(rx.state(), RxState::Idle);
        assert_eq!(rx.byte(), None);

        let out = feed(&mut rx, &frame_bits(0xA5), 4);
        assert_eq!(out.data, 0xA5);
        assert!(out.ready);
    }

    #[test]
    fn test_framing_error() {
        let mut rx = engine(4);
        let mut bits = frame_bits(0xFF);
        bits[9] = false;
        let out = feed(&mut rx, &bits, 4);
        assert!(out.error);
        assert_eq!(rx.fault(), Some(ReceiveFault::Framing));

        // a valid frame is ignored until reset
        let out = feed(&mut rx, &[true; 2], 4);
        let out2 = feed(&mut rx, &frame_bits(0x12), 4);
        assert!(out.error && out2.error);
        assert!(!out2.ready);

        rx.reset(true);
        assert!(!rx.outputs().error);
        let out = feed(&mut rx, &frame_bits(0x12), 4);
        assert_eq!((out.data, out.ready), (0x12, true));
    }

    #[test]
    fn test_overflow_error() {
        let mut rx = engine(4);
        feed(&mut rx, &frame_bits(0xFF), 4);
        let out = rx.step(false, false);
        assert!(out.error);
        assert!(!out.ready);
        assert_eq!(rx.fault(), Some(ReceiveFault::Overflow));
    }

    #[test]
    fn test_edge_required_after_reset() {
        let mut rx = engine(4);
        rx.reset(false);
        // a line stuck low is not a start bit
        for _ in 0..20 {
            rx.step(false, false);
        }
        assert_eq!(rx.state(), RxState::Idle);
        rx.step(true, false);
        rx.step(false, false);
        assert_eq!(rx.state(), RxState::Start);
    }

    #[test]
    fn test_level_detect_starts_on_low() {
        let mut rx = ReceiveEngine::new(BitPeriod::new(4).unwrap(), StartDetect::Level);
        rx.reset(false);
        rx.step(false, false);
        assert_eq!(rx.state(), RxState::Start);
    }

    #[test]
    fn test_samples_centred() {
        // with a large period every strobe falls in the middle of its cell
        let mut rx = engine(100);
        rx.step(true, false);
        rx.step(false, false);
        assert_eq!(rx.state(), RxState::Start);
        assert_eq!(rx.clock().counter(), 49);

        let strobe_at = (1..=100).find(|_| {
            let before = rx.state();
            rx.step(false, false);
            before != rx.state()
        });
        assert_eq!(strobe_at, Some(50));
    }

    /// Feed 0x55 then 0xA5 with no gap, acknowledging the first byte on tick `ack_at`
    fn back_to_back(detect: StartDetect, ticks: u32, ack_at: usize) -> Vec<u8> {
        let mut rx = ReceiveEngine::new(BitPeriod::new(ticks).unwrap(), detect);
        let mut levels: Vec<bool> = frame_bits(0x55)
            .iter()
            .chain(frame_bits(0xA5).iter())
            .flat_map(|&bit| std::iter::repeat(bit).take(ticks as usize))
            .collect();
        levels.extend([true; 8]);

        let mut bytes = Vec::new();
        for (tick, &line) in levels.iter().enumerate() {
            let ack = tick == ack_at && rx.byte().is_some();
            if ack {
                bytes.extend(rx.byte());
            }
            rx.step(line, ack);
            assert_eq!(rx.fault(), None, "fault at tick {tick}");
        }
        bytes.extend(rx.byte());
        bytes
    }

    #[test]
    fn test_back_to_back_frames() {
        // no idle gap between the stop bit and the next start bit
        for detect in [StartDetect::Edge, StartDetect::Level] {
            for ticks in [2, 3, 4, 5, 16] {
                let stop_sample = (9 * ticks + ticks / 2) as usize;
                let bytes = back_to_back(detect, ticks, stop_sample + 1);
                assert_eq!(bytes, vec![0x55, 0xA5], "{detect:?} at {ticks} ticks/bit");
            }
        }
    }

    #[test]
    fn test_ack_on_start_edge() {
        // the consumer acks on exactly the tick the next start bit begins
        for detect in [StartDetect::Edge, StartDetect::Level] {
            for ticks in [2, 4, 7] {
                let next_edge = (10 * ticks) as usize;
                let bytes = back_to_back(detect, ticks, next_edge);
                assert_eq!(bytes, vec![0x55, 0xA5], "{detect:?} at {ticks} ticks/bit");
            }
        }
    }
}
