//! Error types for the UART line engine

use thiserror::Error;

/// Result type for UART engine operations
pub type Result<T> = std::result::Result<T, UartError>;

/// Runtime fault latched by the receiver
///
/// Both faults leave the receiver in its error state until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReceiveFault {
    /// The stop bit was sampled low
    Framing,
    /// A new start edge arrived before the previous byte was acknowledged
    Overflow,
}

impl std::fmt::Display for ReceiveFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiveFault::Framing => write!(f, "framing error"),
            ReceiveFault::Overflow => write!(f, "overflow error"),
        }
    }
}

/// Error types raised by configuration, the receiver and the register store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UartError {
    /// Tick rate, bit rate or tolerance do not give a usable bit period
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Stop bit sampled low
    #[error("Framing error: {0}")]
    FramingError(String),

    /// Received byte overwritten before acknowledgment
    #[error("Overflow error: {0}")]
    OverflowError(String),

    /// Handshake partner did not answer in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Key table has no free slot
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),
}

impl UartError {
    /// Create a new InvalidConfiguration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        UartError::InvalidConfiguration(msg.into())
    }

    /// Create a new FramingError
    pub fn framing_error(msg: impl Into<String>) -> Self {
        UartError::FramingError(msg.into())
    }

    /// Create a new OverflowError
    pub fn overflow_error(msg: impl Into<String>) -> Self {
        UartError::OverflowError(msg.into())
    }

    /// Create a new Timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        UartError::Timeout(msg.into())
    }

    /// Create a new CapacityExceeded error
    pub fn capacity_exceeded(msg: impl Into<String>) -> Self {
        UartError::CapacityExceeded(msg.into())
    }

    /// Map a latched receive fault to its error value
    pub fn from_fault(fault: ReceiveFault, tick: u64) -> Self {
        match fault {
            ReceiveFault::Framing => {
                Self::framing_error(format!("stop bit sampled low (tick {tick})"))
            }
            ReceiveFault::Overflow => {
                Self::overflow_error(format!("start edge before acknowledge (tick {tick})"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UartError::invalid_configuration("test");
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_from_fault() {
        let err = UartError::from_fault(ReceiveFault::Framing, 39);
        assert!(matches!(err, UartError::FramingError(_)));
        assert!(err.to_string().contains("tick 39"));

        let err = UartError::from_fault(ReceiveFault::Overflow, 7);
        assert!(matches!(err, UartError::OverflowError(_)));
    }

    #[test]
    fn test_fault_display() {
        assert_eq!(ReceiveFault::Framing.to_string(), "framing error");
        assert_eq!(ReceiveFault::Overflow.to_string(), "overflow error");
    }
}
