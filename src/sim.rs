//! Line-level simulation harness
//!
//! [`Harness`] wraps a [`Uart`] with a sender queue, a receiving endpoint, a
//! script of incoming line samples and a recording of the outgoing line. The
//! tick count lives in the engine and is reported back explicitly.

use crate::config::UartConfig;
use crate::divisor::BitPeriod;
use crate::engine::{TickInputs, TickOutputs, Uart};
use crate::error::{Result, UartError};
use crate::framing::{frame_bits, DATA_BITS, STOP_LEVEL};
use crate::handshake::{Receiver, Sender};
use crate::rx::RxState;
use crate::tx::TxState;
use std::collections::VecDeque;

/// Repeat every level for one bit period
pub fn expand(levels: &[bool], period: BitPeriod) -> Vec<bool> {
    levels
        .iter()
        .flat_map(|&level| std::iter::repeat(level).take(period.ticks() as usize))
        .collect()
}

/// Decode 8N1 frames from per-tick line samples
///
/// Reference decoder independent of the receive engine: it finds each falling
/// edge and samples the middle of the following cells. Frames with a low stop
/// bit are dropped.
pub fn decode_line(samples: &[bool], period: BitPeriod) -> Vec<u8> {
    let p = period.ticks() as usize;
    let sample_at = |edge: usize, cell: usize| samples.get(edge + cell * p + p / 2).copied();

    let mut bytes = Vec::new();
    let mut prev = STOP_LEVEL;
    let mut i = 0;
    while i < samples.len() {
        if !(prev && !samples[i]) {
            prev = samples[i];
            i += 1;
            continue;
        }

        let Some(stop) = sample_at(i, DATA_BITS + 1) else {
            break;
        };
        let mut byte = 0u8;
        for bit in 0..DATA_BITS {
            if sample_at(i, bit + 1) == Some(true) {
                byte |= 1 << bit;
            }
        }
        if stop {
            bytes.push(byte);
        }
        i += (DATA_BITS + 1) * p + p / 2;
        prev = samples.get(i - 1).copied().unwrap_or(STOP_LEVEL);
    }
    bytes
}

/// Engine plus endpoints, stepped one tick at a time
#[derive(Debug, Clone)]
pub struct Harness {
    uart: Uart,
    sender: Sender,
    receiver: Receiver,
    script: VecDeque<bool>,
    loopback: bool,
    recorded: Vec<bool>,
}

impl Harness {
    /// Harness whose incoming line follows the script
    pub fn new(config: UartConfig) -> Result<Self> {
        Ok(Harness {
            uart: Uart::new(config)?,
            sender: Sender::new(),
            receiver: Receiver::new(),
            script: VecDeque::new(),
            loopback: false,
            recorded: Vec::new(),
        })
    }

    /// Harness whose outgoing line is wired back to its incoming line
    pub fn loopback(config: UartConfig) -> Result<Self> {
        let mut harness = Self::new(config)?;
        harness.loopback = true;
        Ok(harness)
    }

    /// The engine under test
    pub fn uart(&self) -> &Uart {
        &self.uart
    }

    /// The receiving endpoint
    pub fn receiver_mut(&mut self) -> &mut Receiver {
        &mut self.receiver
    }

    /// Bytes acknowledged so far
    pub fn received(&self) -> &[u8] {
        self.receiver.received()
    }

    /// Outgoing line level after every tick
    pub fn recorded(&self) -> &[bool] {
        &self.recorded
    }

    /// Queue bytes for transmission
    pub fn send(&mut self, bytes: &[u8]) {
        self.sender.enqueue(bytes);
    }

    /// Script one incoming frame carrying `byte`, followed by one idle bit period
    pub fn drive_frame(&mut self, byte: u8) {
        self.drive_levels(&frame_bits(byte));
        self.drive_levels(&[STOP_LEVEL]);
    }

    /// Script frames back to back, with no idle time between stop and start bits
    pub fn drive_burst(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.drive_levels(&frame_bits(byte));
        }
    }

    /// Script levels on the incoming line, one bit period each
    pub fn drive_levels(&mut self, levels: &[bool]) {
        let samples = expand(levels, self.uart.bit_period());
        self.script.extend(samples);
    }

    /// Script raw per-tick samples on the incoming line
    pub fn drive_samples(&mut self, samples: &[bool]) {
        self.script.extend(samples.iter().copied());
    }

    fn next_line(&mut self) -> bool {
        if self.loopback {
            self.uart.outputs().outgoing_line
        } else {
            self.script.pop_front().unwrap_or(STOP_LEVEL)
        }
    }

    /// Advance one tick with an explicit incoming line level
    pub fn step_with_line(&mut self, incoming_line: bool) -> TickOutputs {
        let last = self.uart.outputs();
        let offer = self.sender.offer(last.tx_ack);
        let ack = self.receiver.accept(last.rx_ready, last.received_byte);

        let out = self.uart.tick(TickInputs {
            incoming_line,
            producer_ready: offer.ready,
            producer_byte: offer.byte,
            consumer_ack: ack,
            reset: false,
        });
        self.recorded.push(out.outgoing_line);
        out
    }

    /// Advance one tick, taking the line from the script or the loopback
    pub fn step(&mut self) -> TickOutputs {
        let line = self.next_line();
        self.step_with_line(line)
    }

    /// Advance `ticks` ticks
    pub fn run(&mut self, ticks: u64) -> TickOutputs {
        let mut out = self.uart.outputs();
        for _ in 0..ticks {
            out = self.step();
        }
        out
    }

    /// Step until `done` holds, returning the engine's tick count at that point
    pub fn run_until(
        &mut self,
        max_ticks: u64,
        mut done: impl FnMut(&TickOutputs) -> bool,
    ) -> Result<u64> {
        for _ in 0..max_ticks {
            let out = self.step();
            if done(&out) {
                return Ok(self.uart.ticks());
            }
        }
        Err(UartError::timeout(format!(
            "condition not met within {} ticks",
            max_ticks
        )))
    }

    /// Whether nothing is scripted, queued or in flight
    pub fn is_quiet(&self) -> bool {
        self.script.is_empty()
            && self.sender.pending() == 0
            && self.uart.tx().state() == TxState::Idle
            && matches!(self.uart.rx().state(), RxState::Idle | RxState::Error(_))
    }

    /// Step until [`is_quiet`](Self::is_quiet), returning the tick count
    pub fn settle(&mut self, max_ticks: u64) -> Result<u64> {
        for _ in 0..max_ticks {
            if self.is_quiet() {
                return Ok(self.uart.ticks());
            }
            self.step();
        }
        if self.is_quiet() {
            return Ok(self.uart.ticks());
        }
        Err(UartError::timeout(format!(
            "still busy after {} ticks (rx {:?}, tx {:?})",
            max_ticks,
            self.uart.rx().state(),
            self.uart.tx().state()
        )))
    }

    /// Assert the reset input for one tick with the line idle
    pub fn reset_pulse(&mut self) -> TickOutputs {
        let out = self.uart.tick(TickInputs {
            reset: true,
            ..TickInputs::default()
        });
        self.recorded.push(out.outgoing_line);
        out
    }
}

/// Advance two harnesses one tick with their lines crossed
pub fn step_linked(a: &mut Harness, b: &mut Harness) -> (TickOutputs, TickOutputs) {
    let a_line = a.uart.outputs().outgoing_line;
    let b_line = b.uart.outputs().outgoing_line;
    (a.step_with_line(b_line), b.step_with_line(a_line))
}
