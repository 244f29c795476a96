//! Error types for the FTL link
//!
//! Errors are organized by domain:
//! - [`ConfigError`]: Initialization and configuration failures
//! - [`DmaError`]: DMA transfer timeouts and stalls
//! - [`LinkError`]: Pool, queue and mailbox backpressure on the send path
//! - [`FrameError`]: Wire-level rejections, counted by the RX parser
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by the fallible facade methods.
//!
//! Framing and CRC errors never reach the caller; the parser counts them and
//! resynchronizes on the next start delimiter. [`FrameError`] exists so the
//! parser can name what it rejected in logs and in its own return values.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and initialization errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Link already initialized
    AlreadyInitialized,
    /// Operation requires an initialized link
    NotInitialized,
    /// Invalid configuration parameter
    InvalidConfig,
    /// UART or DMA hardware could not be claimed
    HardwareUnavailable,
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
            ConfigError::NotInitialized => "not initialized",
            ConfigError::InvalidConfig => "invalid configuration",
            ConfigError::HardwareUnavailable => "UART/DMA hardware unavailable",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// DMA transfer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Previous TX transfer did not finish before the deadline
    Timeout,
    /// RX channels could not be restarted; the link is down
    Stall,
    /// Frame too large for the TX buffer
    FrameTooLarge,
    /// TX channel busy
    Busy,
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
            DmaError::Timeout => "DMA transfer timed out",
            DmaError::Stall => "DMA stalled and could not be restarted",
            DmaError::FrameTooLarge => "frame too large for TX buffer",
            DmaError::Busy => "DMA channel busy",
        }
    }
}

// =============================================================================
// Link Errors
// =============================================================================

/// Send-path errors
///
/// All of these mean "try again later"; none is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Message pool has no free slot
    AllocationExhausted,
    /// TX queue is full
    QueueFull,
    /// Cross-core mailbox is full
    MailboxFull,
    /// Payload exceeds the maximum payload size
    PayloadTooLarge,
    /// Payload is empty
    EmptyPayload,
    /// Handle does not refer to a live slot
    InvalidHandle,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LinkError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LinkError::AllocationExhausted => "message pool exhausted",
            LinkError::QueueFull => "TX queue full",
            LinkError::MailboxFull => "cross-core mailbox full",
            LinkError::PayloadTooLarge => "payload too large",
            LinkError::EmptyPayload => "empty payload",
            LinkError::InvalidHandle => "invalid message handle",
        }
    }
}

// =============================================================================
// Frame Errors
// =============================================================================

/// Wire-level frame rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Bad end delimiter
    FramingError,
    /// Payload CRC does not match the transmitted CRC
    CrcMismatch,
    /// Length byte is zero or exceeds the maximum payload size
    InvalidLength,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FrameError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FrameError::FramingError => "bad frame delimiter",
            FrameError::CrcMismatch => "CRC mismatch",
            FrameError::InvalidLength => "invalid frame length",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match link.try_send(b"PING") {
///     Err(Error::Link(LinkError::QueueFull)) => { /* retry next tick */ }
///     Err(Error::Dma(DmaError::Stall)) => { /* link is down */ }
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
    /// Send-path error
    Link(LinkError),
    /// Frame error
    Frame(FrameError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Link(e) => write!(f, "link: {}", e.as_str()),
            Error::Frame(e) => write!(f, "frame: {}", e.as_str()),
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

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Error::Link(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}

/// Result type alias for link operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for DMA operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

/// Result type alias for send-path operations
pub type LinkResult<T> = core::result::Result<T, LinkError>;

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
            ConfigError::NotInitialized,
            ConfigError::InvalidConfig,
            ConfigError::HardwareUnavailable,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "ConfigError::{variant:?} has empty string");
        }
    }

    #[test]
    fn dma_error_display() {
        assert_eq!(format!("{}", DmaError::Timeout), "DMA transfer timed out");
        assert_eq!(format!("{}", DmaError::Stall), "DMA stalled and could not be restarted");
    }

    #[test]
    fn link_error_as_str_non_empty() {
        let variants = [
            LinkError::AllocationExhausted,
            LinkError::QueueFull,
            LinkError::MailboxFull,
            LinkError::PayloadTooLarge,
            LinkError::EmptyPayload,
            LinkError::InvalidHandle,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "LinkError::{variant:?} has empty string");
        }
    }

    #[test]
    fn frame_error_display() {
        assert_eq!(format!("{}", FrameError::CrcMismatch), "CRC mismatch");
    }

    #[test]
    fn error_from_domain_errors() {
        assert_eq!(Error::from(ConfigError::InvalidConfig), Error::Config(ConfigError::InvalidConfig));
        assert_eq!(Error::from(DmaError::Stall), Error::Dma(DmaError::Stall));
        assert_eq!(Error::from(LinkError::QueueFull), Error::Link(LinkError::QueueFull));
        assert_eq!(Error::from(FrameError::InvalidLength), Error::Frame(FrameError::InvalidLength));
    }

    #[test]
    fn error_display_prefixes_domain() {
        let display = format!("{}", Error::Link(LinkError::MailboxFull));
        assert!(display.starts_with("link: "));
        assert!(display.contains("mailbox"));

        let display = format!("{}", Error::Dma(DmaError::Timeout));
        assert!(display.starts_with("dma: "));
    }

    #[test]
    fn question_mark_converts_domain_error() {
        fn inner() -> LinkResult<()> {
            Err(LinkError::PayloadTooLarge)
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }

        assert_eq!(outer(), Err(Error::Link(LinkError::PayloadTooLarge)));
    }
}
