//! Error types for the EMAC descriptor-ring engine
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Initialization and configuration failures (fatal to the instance)
//! - [`DmaError`]: Descriptor ring and buffer pool issues
//! - [`IoError`]: Runtime failures, including every bounded hardware wait
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most driver methods.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and initialization errors
///
/// These are detected once, at `init`, and leave the interface unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Driver already initialized
    AlreadyInitialized,
    /// Buffer size cannot hold a maximum-size frame or exceeds the descriptor limit
    InvalidBufferSize,
    /// Buffer alignment is not a power of two, or does not divide the buffer size
    InvalidBufferAlignment,
    /// Receive buffer offset is misaligned or leaves no room for a frame
    InvalidBufferOffset,
    /// Descriptor ring has fewer than two entries
    InvalidRingSize,
    /// Invalid PHY address (must be 0-31)
    InvalidPhyAddress,
    /// Invalid PHY register address (must be 0-31)
    InvalidRegisterAddress,
    /// Software reset failed or timed out
    ResetFailed,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::AlreadyInitialized => "already initialized",
            ConfigError::InvalidBufferSize => "invalid buffer size",
            ConfigError::InvalidBufferAlignment => "invalid buffer alignment",
            ConfigError::InvalidBufferOffset => "invalid buffer offset",
            ConfigError::InvalidRingSize => "invalid descriptor ring size",
            ConfigError::InvalidPhyAddress => "invalid PHY address",
            ConfigError::InvalidRegisterAddress => "invalid PHY register address",
            ConfigError::ResetFailed => "software reset failed",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Descriptor ring and buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// The external buffer pool could not supply a buffer
    OutOfMemory,
    /// No transmit descriptor is free; retry once Tx resources are signalled
    TxBusy,
    /// Invalid frame length (zero or exceeds the buffer size)
    InvalidLength,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::OutOfMemory => "buffer pool exhausted",
            DmaError::TxBusy => "transmit ring busy",
            DmaError::InvalidLength => "invalid frame length",
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// A bounded wait expired, or a contended resource was not available
    Timeout,
    /// Invalid state for operation (e.g., not running)
    InvalidState,
    /// No completed frame is waiting in the receive ring
    NoFrame,
    /// A management-bus GPIO line could not be driven or sampled
    PinFault,
    /// A multicast hash bucket already holds the maximum number of references
    RefCountOverflow,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::Timeout => "operation timed out",
            IoError::InvalidState => "invalid state for operation",
            IoError::NoFrame => "no frame available",
            IoError::PinFault => "MDIO pin access failed",
            IoError::RefCountOverflow => "multicast reference count overflow",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match emac.transmit(buffer, len) {
///     Err(Error::Dma(DmaError::TxBusy)) => { /* wait for signal_tx_ready */ }
///     Err(Error::Io(IoError::InvalidState)) => { /* interface not started */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
    /// I/O error
    Io(IoError),
}

impl Error {
    /// `true` for back-pressure, which the caller should retry rather than report
    #[must_use]
    pub const fn is_tx_busy(&self) -> bool {
        matches!(self, Error::Dma(DmaError::TxBusy))
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

/// Result type alias for driver operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for DMA operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

/// Result type alias for I/O operations
pub type IoResult<T> = core::result::Result<T, IoError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn config_error_as_str_non_empty() {
        let variants = [
            ConfigError::AlreadyInitialized,
            ConfigError::InvalidBufferSize,
            ConfigError::InvalidBufferAlignment,
            ConfigError::InvalidBufferOffset,
            ConfigError::InvalidRingSize,
            ConfigError::InvalidPhyAddress,
            ConfigError::InvalidRegisterAddress,
            ConfigError::ResetFailed,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "{variant:?} has empty string");
        }
    }

    #[test]
    fn config_error_display() {
        let display = format!("{}", ConfigError::InvalidBufferOffset);
        assert_eq!(display, "invalid buffer offset");
    }

    #[test]
    fn dma_error_display() {
        assert_eq!(format!("{}", DmaError::TxBusy), "transmit ring busy");
        assert_eq!(format!("{}", DmaError::OutOfMemory), "buffer pool exhausted");
    }

    #[test]
    fn io_error_display() {
        assert_eq!(format!("{}", IoError::Timeout), "operation timed out");
        assert_eq!(format!("{}", IoError::NoFrame), "no frame available");
    }

    #[test]
    fn error_from_domain_errors() {
        assert_eq!(
            Error::from(ConfigError::ResetFailed),
            Error::Config(ConfigError::ResetFailed)
        );
        assert_eq!(Error::from(DmaError::TxBusy), Error::Dma(DmaError::TxBusy));
        assert_eq!(Error::from(IoError::Timeout), Error::Io(IoError::Timeout));
    }

    #[test]
    fn error_display_prefixes_domain() {
        let display = format!("{}", Error::Dma(DmaError::InvalidLength));
        assert!(display.starts_with("dma:"));
        assert!(display.contains("frame length"));

        let display = format!("{}", Error::Config(ConfigError::InvalidRingSize));
        assert!(display.starts_with("config:"));
    }

    #[test]
    fn tx_busy_is_backpressure() {
        assert!(Error::Dma(DmaError::TxBusy).is_tx_busy());
        assert!(!Error::Dma(DmaError::OutOfMemory).is_tx_busy());
        assert!(!Error::Io(IoError::Timeout).is_tx_busy());
    }

    #[test]
    fn question_mark_converts_domain_errors() {
        fn inner() -> IoResult<()> {
            Err(IoError::Timeout)
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        assert_eq!(outer(), Err(Error::Io(IoError::Timeout)));
    }
}
