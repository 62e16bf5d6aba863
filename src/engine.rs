//! Full-duplex engine driven one tick at a time

use crate::config::UartConfig;
use crate::divisor::BitPeriod;
use crate::error::{ReceiveFault, Result, UartError};
use crate::rx::ReceiveEngine;
use crate::status::StatusRegister;
use crate::tx::TransmitEngine;
use tracing::info;

/// Signals sampled by the engine on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickInputs {
    /// Level of the line driven by the peer
    pub incoming_line: bool,
    /// Producer has a byte for the transmitter
    pub producer_ready: bool,
    /// The producer's byte
    pub producer_byte: u8,
    /// Consumer takes the received byte
    pub consumer_ack: bool,
    /// Force the receiver back to idle
    pub reset: bool,
}

impl Default for TickInputs {
    /// Idle line, no handshake activity
    fn default() -> Self {
        TickInputs {
            incoming_line: true,
            producer_ready: false,
            producer_byte: 0,
            consumer_ack: false,
            reset: false,
        }
    }
}

/// Signals presented by the engine after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickOutputs {
    /// Level driven onto the outgoing line
    pub outgoing_line: bool,
    /// Received byte, valid only while `rx_ready` is set
    pub received_byte: u8,
    /// A received byte waits for acknowledge
    pub rx_ready: bool,
    /// A receive fault is latched
    pub rx_error: bool,
    /// The latched fault, if any
    pub rx_fault: Option<ReceiveFault>,
    /// The transmitter accepts a byte
    pub tx_ack: bool,
}

impl TickOutputs {
    /// Pack the flags into a status register, together with the incoming line level
    pub fn status(&self, incoming_line: bool) -> StatusRegister {
        let mut status = StatusRegister::default();
        status.set_rx_ready(self.rx_ready);
        status.set_rx_error(self.rx_error);
        status.set_framing_error(self.rx_fault == Some(ReceiveFault::Framing));
        status.set_overflow_error(self.rx_fault == Some(ReceiveFault::Overflow));
        status.set_tx_ack(self.tx_ack);
        status.set_incoming_line(incoming_line);
        status.set_outgoing_line(self.outgoing_line);
        status
    }
}

/// Receiver and transmitter sharing one tick source
///
/// The two directions have separate bit clocks and no shared state; only the
/// tick count is common.
#[derive(Debug, Clone)]
pub struct Uart {
    config: UartConfig,
    period: BitPeriod,
    rx: ReceiveEngine,
    tx: TransmitEngine,
    ticks: u64,
    last_incoming: bool,
}

impl Uart {
    /// Validate the configuration and build an idle engine
    pub fn new(config: UartConfig) -> Result<Self> {
        let period = config.bit_period()?;
        info!(
            tick_rate = config.tick_rate,
            bit_rate = config.bit_rate,
            %period,
            "uart engine configured"
        );
        Ok(Uart {
            config,
            period,
            rx: ReceiveEngine::new(period, config.start_detect),
            tx: TransmitEngine::new(period),
            ticks: 0,
            last_incoming: true,
        })
    }

    /// The configuration the engine was built from
    pub fn config(&self) -> &UartConfig {
        &self.config
    }

    /// Ticks per bit
    pub fn bit_period(&self) -> BitPeriod {
        self.period
    }

    /// Number of ticks processed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The receive direction
    pub fn rx(&self) -> &ReceiveEngine {
        &self.rx
    }

    /// The transmit direction
    pub fn tx(&self) -> &TransmitEngine {
        &self.tx
    }

    /// Signals as they stand after the last tick
    pub fn outputs(&self) -> TickOutputs {
        let rx = self.rx.outputs();
        let tx = self.tx.outputs();
        TickOutputs {
            outgoing_line: tx.line,
            received_byte: rx.data,
            rx_ready: rx.ready,
            rx_error: rx.error,
            rx_fault: self.rx.fault(),
            tx_ack: tx.ack,
        }
    }

    /// Packed status after the last tick
    pub fn status(&self) -> StatusRegister {
        self.outputs().status(self.last_incoming)
    }

    /// Advance both directions by one tick
    pub fn tick(&mut self, inputs: TickInputs) -> TickOutputs {
        if inputs.reset {
            self.rx.reset(inputs.incoming_line);
        } else {
            self.rx.step(inputs.incoming_line, inputs.consumer_ack);
        }
        self.tx.step(inputs.producer_ready, inputs.producer_byte);

        self.last_incoming = inputs.incoming_line;
        self.ticks += 1;
        self.outputs()
    }

    /// Surface a latched receive fault as an error
    pub fn check(&self) -> Result<()> {
        match self.rx.fault() {
            Some(fault) => Err(UartError::from_fault(fault, self.ticks)),
            None => Ok(()),
        }
    }

    /// Return both directions to idle, abandoning any frame in flight
    pub fn reset(&mut self) {
        self.rx.reset(self.last_incoming);
        self.tx.reset();
    }
}
