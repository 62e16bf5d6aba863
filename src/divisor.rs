//! Clock-rate division for the bit clocks

use crate::error::{Result, UartError};
use std::num::NonZeroU32;

/// Shortest bit period the receiver can sample: the start edge needs its own tick
pub const MIN_TICKS: u32 = 2;

/// Number of driving-clock ticks per transmitted bit
///
/// Derived once from the configuration and never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitPeriod(NonZeroU32);

impl BitPeriod {
    /// Create a bit period from a raw tick count, rejecting anything below [`MIN_TICKS`]
    pub fn new(ticks: u32) -> Result<Self> {
        NonZeroU32::new(ticks)
            .filter(|t| t.get() >= MIN_TICKS)
            .map(BitPeriod)
            .ok_or_else(|| {
                UartError::invalid_configuration(format!(
                    "bit period of {} ticks is below the minimum of {}",
                    ticks, MIN_TICKS
                ))
            })
    }

    /// Ticks per bit
    pub fn ticks(&self) -> u32 {
        self.0.get()
    }

    /// Value the sample counter is reloaded with after each strobe
    pub fn reload(&self) -> u32 {
        self.0.get() - 1
    }

    /// Counter value that moves the next strobe to the middle of a bit cell
    ///
    /// Committed on the first tick of a cell, it makes the strobe fire on tick
    /// `ticks / 2` of that cell, leaving the same margin on both sides.
    pub fn mid_cell(&self) -> u32 {
        self.0.get() / 2 - 1
    }
}

impl std::fmt::Display for BitPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ticks/bit", self.0)
    }
}

/// Deviation of the bit rate implied by `divisor` from `bit_rate`, in parts per million
pub fn deviation_ppm(tick_rate: u32, bit_rate: u32, divisor: u32) -> f64 {
    let actual = f64::from(tick_rate) / f64::from(divisor);
    let requested = f64::from(bit_rate);
    1_000_000.0 * (actual - requested).abs() / requested
}

/// Compute the bit period for `bit_rate` on a `tick_rate` clock
///
/// `divisor = floor(tick_rate / bit_rate)`. When `max_deviation_ppm` is given,
/// the rate actually produced by that divisor must be within the tolerance.
pub fn divisor(tick_rate: u32, bit_rate: u32, max_deviation_ppm: Option<u32>) -> Result<BitPeriod> {
    if bit_rate == 0 {
        return Err(UartError::invalid_configuration("bit rate must be non-zero"));
    }

    let divisor = tick_rate / bit_rate;
    if divisor < MIN_TICKS {
        return Err(UartError::invalid_configuration(format!(
            "bit rate {} exceeds half the tick rate {}",
            bit_rate, tick_rate
        )));
    }

    if let Some(max_ppm) = max_deviation_ppm {
        let ppm = deviation_ppm(tick_rate, bit_rate, divisor);
        if ppm > f64::from(max_ppm) {
            return Err(UartError::invalid_configuration(format!(
                "bit rate deviation {:.0} ppm exceeds {} ppm (requested {}, actual {:.1})",
                ppm,
                max_ppm,
                bit_rate,
                f64::from(tick_rate) / f64::from(divisor)
            )));
        }
    }

    BitPeriod::new(divisor)
}
