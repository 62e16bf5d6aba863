//! Free-running bit clocks

use crate::divisor::BitPeriod;

/// Countdown that emits one strobe per bit period
///
/// The strobe is true on the tick where the counter reads zero; the counter is
/// then reloaded with `period - 1`, otherwise it counts down by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitClock {
    period: BitPeriod,
    counter: u32,
}

impl BitClock {
    /// Create a clock whose first strobe fires on the first tick
    pub fn new(period: BitPeriod) -> Self {
        BitClock { period, counter: 0 }
    }

    /// The configured bit period
    pub fn period(&self) -> BitPeriod {
        self.period
    }

    /// Current counter value
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Whether the current tick is a strobe tick
    pub fn strobe(&self) -> bool {
        self.counter == 0
    }

    /// Advance one tick, returning the strobe seen on this tick
    pub fn tick(&mut self) -> bool {
        let strobe = self.strobe();
        self.counter = if strobe {
            self.period.reload()
        } else {
            self.counter - 1
        };
        strobe
    }

    /// Force the counter value committed for the next tick
    ///
    /// Called after [`tick`](Self::tick) within the same tick, it overrides the
    /// normal reload or decrement. Values past the reload point are clamped.
    pub fn realign(&mut self, to_value: u32) {
        self.counter = to_value.min(self.period.reload());
    }

    /// Return the counter to its power-on value
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(ticks: u32) -> BitClock {
        BitClock::new(BitPeriod::new(ticks).unwrap())
    }

    #[test]
    fn test_strobe_every_period() {
        let mut clk = clock(4);
        let strobes: Vec<bool> = (0..12).map(|_| clk.tick()).collect();
        assert_eq!(
            strobes,
            vec![true, false, false, false, true, false, false, false, true, false, false, false]
        );
    }

    #[test]
    fn test_shortest_period() {
        let mut clk = clock(2);
        let strobes: Vec<bool> = (0..6).map(|_| clk.tick()).collect();
        assert_eq!(strobes, vec![true, false, true, false, true, false]);
        clk.realign(0);
        assert!(clk.tick());
    }

    #[test]
    fn test_realign_overrides_reload() {
        let mut clk = clock(4);
        clk.tick();
        clk.tick();
        clk.realign(2);
        assert_eq!(clk.counter(), 2);
        // two more ticks count down, third one strobes
        assert!(!clk.tick());
        assert!(!clk.tick());
        assert!(clk.tick());
        assert_eq!(clk.counter(), 3);
    }

    #[test]
    fn test_realign_clamped() {
        let mut clk = clock(4);
        clk.realign(100);
        assert_eq!(clk.counter(), 3);
    }

    #[test]
    fn test_reset() {
        let mut clk = clock(4);
        clk.tick();
        clk.reset();
        assert!(clk.strobe());
    }
}
