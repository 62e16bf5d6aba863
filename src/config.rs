//! Engine configuration

use crate::divisor::{divisor, BitPeriod};
use crate::error::Result;

/// How the idle receiver recognises the beginning of a start bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StartDetect {
    /// A high sample followed by a low sample
    #[default]
    Edge,
    /// Any low sample while idle (assumes the line was high before)
    Level,
}

/// Rates and tolerances fixed before the engine starts ticking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UartConfig {
    /// Ticks per second of the driving clock
    pub tick_rate: u32,
    /// Requested bits per second on the line
    pub bit_rate: u32,
    /// Allowed deviation of the real bit rate, in parts per million
    pub max_deviation_ppm: Option<u32>,
    /// Start-bit detection policy of the receiver
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_detect: StartDetect,
}

impl UartConfig {
    /// Tolerance applied when none is given explicitly
    pub const DEFAULT_MAX_DEVIATION_PPM: u32 = 50_000;

    /// Create a configuration with the default tolerance
    pub fn new(tick_rate: u32, bit_rate: u32) -> Self {
        UartConfig {
            tick_rate,
            bit_rate,
            max_deviation_ppm: Some(Self::DEFAULT_MAX_DEVIATION_PPM),
            start_detect: StartDetect::default(),
        }
    }

    /// Check the rates and derive the bit period
    pub fn bit_period(&self) -> Result<BitPeriod> {
        divisor(self.tick_rate, self.bit_rate, self.max_deviation_ppm)
    }

    /// Check the rates without keeping the result
    pub fn validate(&self) -> Result<()> {
        self.bit_period().map(|_| ())
    }
}

impl Default for UartConfig {
    /// 9600 baud on a 12 MHz clock
    fn default() -> Self {
        Self::new(12_000_000, 9600)
    }
}

/// Builder for [`UartConfig`]
pub struct UartConfigBuilder {
    config: UartConfig,
}

impl UartConfigBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        UartConfigBuilder {
            config: UartConfig::default(),
        }
    }

    /// Set the driving clock rate
    pub fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.config.tick_rate = tick_rate;
        self
    }

    /// Set the requested bit rate
    pub fn with_bit_rate(mut self, bit_rate: u32) -> Self {
        self.config.bit_rate = bit_rate;
        self
    }

    /// Set the tolerance in parts per million
    pub fn with_max_deviation_ppm(mut self, ppm: u32) -> Self {
        self.config.max_deviation_ppm = Some(ppm);
        self
    }

    /// Accept whatever rate the truncated divisor gives
    pub fn without_tolerance(mut self) -> Self {
        self.config.max_deviation_ppm = None;
        self
    }

    /// Set the start-bit detection policy
    pub fn with_start_detect(mut self, start_detect: StartDetect) -> Self {
        self.config.start_detect = start_detect;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<UartConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for UartConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UartError;

    #[test]
    fn test_default_config() -> Result<()> {
        let config = UartConfig::default();
        assert_eq!(config.bit_period()?.ticks(), 1250);
        assert_eq!(config.start_detect, StartDetect::Edge);
        Ok(())
    }

    #[test]
    fn test_builder() -> Result<()> {
        let config = UartConfigBuilder::new()
            .with_tick_rate(4800)
            .with_bit_rate(1200)
            .with_start_detect(StartDetect::Level)
            .build()?;
        assert_eq!(config.bit_period()?.ticks(), 4);
        assert_eq!(config.start_detect, StartDetect::Level);
        Ok(())
    }

    #[test]
    fn test_builder_rejects_invalid() {
        let result = UartConfigBuilder::new()
            .with_tick_rate(1000)
            .with_bit_rate(300)
            .build();
        assert!(matches!(result, Err(UartError::InvalidConfiguration(_))));

        let result = UartConfigBuilder::new()
            .with_tick_rate(1000)
            .with_bit_rate(300)
            .without_tolerance()
            .build();
        assert!(result.is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_json() {
        let json = r#"{"tick_rate":4800,"bit_rate":1200,"max_deviation_ppm":null}"#;
        let config: UartConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_deviation_ppm, None);
        assert_eq!(config.start_detect, StartDetect::Edge);
    }
}
