//! # UART Line Engine
//!
//! A cycle-accurate asynchronous serial (UART) engine that turns a single
//! timing-only line into framed byte transfers, and back.
//!
//! Everything advances on a discrete tick supplied by the host. Each tick the
//! host passes the sampled incoming line and the producer/consumer handshake
//! signals, and reads back the outgoing line level and the receive flags.
//! This library provides:
//!
//! - Bit-period derivation with a parts-per-million tolerance check
//! - Independent receive and transmit bit clocks
//! - A receiver that samples the middle of each bit cell and latches framing
//!   and overflow faults until reset
//! - A transmitter with a ready/acknowledge producer handshake
//! - Handshake endpoints, a loopback echo bridge and a simulation harness
//! - A small register store reachable through the same request/acknowledge shape
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization support
//!
//! ## Example
//!
//! ```
//! use uart_line_engine::{TickInputs, Uart, UartConfig};
//!
//! let mut uart = Uart::new(UartConfig::new(4800, 1200))?;
//! assert_eq!(uart.bit_period().ticks(), 4);
//!
//! let out = uart.tick(TickInputs {
//!     producer_ready: true,
//!     producer_byte: 0x55,
//!     ..TickInputs::default()
//! });
//! assert!(!out.tx_ack);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bridge;
pub mod clock;
pub mod config;
pub mod divisor;
pub mod engine;
pub mod error;
pub mod handshake;
pub mod rx;
pub mod sim;
pub mod status;
pub mod store;
pub mod tx;

pub use clock::BitClock;
pub use config::{StartDetect, UartConfig, UartConfigBuilder};
pub use divisor::{divisor, BitPeriod};
pub use engine::{TickInputs, TickOutputs, Uart};
pub use error::{ReceiveFault, Result, UartError};
pub use rx::{ReceiveEngine, RxState};
pub use status::StatusRegister;
pub use tx::{TransmitEngine, TxState};

/// Fixed 8N1 frame layout
pub mod framing {
    /// Level of the start bit
    pub const START_LEVEL: bool = false;

    /// Level of the stop bit and of the idle line
    pub const STOP_LEVEL: bool = true;

    /// Data bits per frame, least significant first
    pub const DATA_BITS: usize = 8;

    /// Bits on the wire per frame: start, data, stop
    pub const FRAME_BITS: usize = 1 + DATA_BITS + 1;

    /// Line levels of one frame carrying `byte`, one entry per bit cell
    pub fn frame_bits(byte: u8) -> [bool; FRAME_BITS] {
        let mut bits = [STOP_LEVEL; FRAME_BITS];
        bits[0] = START_LEVEL;
        for (i, bit) in bits[1..=DATA_BITS].iter_mut().enumerate() {
            *bit = (byte >> i) & 1 != 0;
        }
        bits
    }

}
