//! Configuration types for the FTL link

use crate::driver::error::{ConfigError, ConfigResult};
use crate::internal::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_POLL_INTERVAL_US, DEFAULT_RX_PIN, DEFAULT_RX_READY_TIMEOUT_US,
    DEFAULT_TX_BUSY_TIMEOUT_US, DEFAULT_TX_PIN,
};

/// UART data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataBits {
    /// 5 data bits
    Five = 5,
    /// 6 data bits
    Six = 6,
    /// 7 data bits
    Seven = 7,
    /// 8 data bits
    #[default]
    Eight = 8,
}

/// UART stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StopBits {
    /// 1 stop bit
    #[default]
    One = 1,
    /// 2 stop bits
    Two = 2,
}

/// UART parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// UART line and pin settings handed to [`UartPort::configure`](crate::hal::UartPort::configure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// UART instance number
    pub id: u8,
    /// Baud rate
    pub baud_rate: u32,
    /// TX GPIO
    pub tx_pin: u8,
    /// RX GPIO
    pub rx_pin: u8,
    /// Data bits
    pub data_bits: DataBits,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Parity
    pub parity: Parity,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl UartConfig {
    /// UART0 at 115200 8N1 on GPIO0/GPIO1
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: 0,
            baud_rate: DEFAULT_BAUD_RATE,
            tx_pin: DEFAULT_TX_PIN,
            rx_pin: DEFAULT_RX_PIN,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

/// Bounded-wait settings for the DMA engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaTimeouts {
    /// Longest wait for a previous TX transfer, in microseconds
    pub tx_busy_us: u32,
    /// Longest wait for an armed RX channel to go active, in microseconds
    pub rx_ready_us: u32,
    /// Sleep between checks, in microseconds
    pub poll_interval_us: u32,
}

impl Default for DmaTimeouts {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaTimeouts {
    /// Default deadlines
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tx_busy_us: DEFAULT_TX_BUSY_TIMEOUT_US,
            rx_ready_us: DEFAULT_RX_READY_TIMEOUT_US,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
        }
    }
}

/// Link lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// `initialize` has not succeeded yet
    #[default]
    Uninitialized,
    /// UART and DMA running
    Initialized,
    /// RX DMA could not be restarted; the link stays down
    Failed,
}

/// Complete link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FtlConfig {
    /// UART settings
    pub uart: UartConfig,
    /// Source id stamped on outgoing frames (0 is reserved)
    pub source_id: u8,
    /// DMA wait deadlines
    pub timeouts: DmaTimeouts,
}

impl Default for FtlConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FtlConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            uart: UartConfig::new(),
            source_id: 1,
            timeouts: DmaTimeouts::new(),
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set all UART settings
    #[must_use]
    pub const fn with_uart(mut self, uart: UartConfig) -> Self {
        self.uart = uart;
        self
    }

    /// Set the UART instance
    #[must_use]
    pub const fn with_uart_id(mut self, id: u8) -> Self {
        self.uart.id = id;
        self
    }

    /// Set the baud rate
    #[must_use]
    pub const fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.uart.baud_rate = baud_rate;
        self
    }

    /// Set the TX and RX pins
    #[must_use]
    pub const fn with_pins(mut self, tx_pin: u8, rx_pin: u8) -> Self {
        self.uart.tx_pin = tx_pin;
        self.uart.rx_pin = rx_pin;
        self
    }

    /// Set the source id
    #[must_use]
    pub const fn with_source_id(mut self, source_id: u8) -> Self {
        self.source_id = source_id;
        self
    }

    /// Derive the source id from a board's 64-bit unique id
    #[must_use]
    pub const fn with_board_id(mut self, board_id: &[u8; 8]) -> Self {
        self.source_id = source_id_from_board_id(board_id);
        self
    }

    /// Set the TX busy deadline
    #[must_use]
    pub const fn with_tx_busy_timeout_us(mut self, timeout_us: u32) -> Self {
        self.timeouts.tx_busy_us = timeout_us;
        self
    }

    /// Set the RX ready deadline
    #[must_use]
    pub const fn with_rx_ready_timeout_us(mut self, timeout_us: u32) -> Self {
        self.timeouts.rx_ready_us = timeout_us;
        self
    }

    /// Set the sleep between checks of a bounded wait
    #[must_use]
    pub const fn with_poll_interval_us(mut self, interval_us: u32) -> Self {
        self.timeouts.poll_interval_us = interval_us;
        self
    }

    /// Reject settings the link cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        let t = &self.timeouts;
        if self.uart.baud_rate == 0
            || self.uart.tx_pin == self.uart.rx_pin
            || self.source_id == 0
            || t.tx_busy_us == 0
            || t.rx_ready_us == 0
            || t.poll_interval_us == 0
        {
            return Err(ConfigError::InvalidConfig);
        }
        Ok(())
    }
}

/// Fold a 64-bit unique board id into a one-byte source id.
///
/// XORs the eight bytes; `0` is reserved, so it maps to `1`.
#[must_use]
pub const fn source_id_from_board_id(board_id: &[u8; 8]) -> u8 {
    let mut id = 0u8;
    let mut i = 0;
    while i < board_id.len() {
        id ^= board_id[i];
        i += 1;
    }
    if id == 0 { 1 } else { id }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = FtlConfig::new();
        assert_eq!(config.uart.baud_rate, 115_200);
        assert_eq!(config.uart.tx_pin, 0);
        assert_eq!(config.uart.rx_pin, 1);
        assert_eq!(config.uart.data_bits, DataBits::Eight);
        assert_eq!(config.uart.stop_bits, StopBits::One);
        assert_eq!(config.uart.parity, Parity::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_default_trait_matches_new() {
        assert_eq!(FtlConfig::default(), FtlConfig::new());
    }

    #[test]
    fn config_builder_chaining() {
        let config = FtlConfig::new()
            .with_uart_id(1)
            .with_baud_rate(921_600)
            .with_pins(4, 5)
            .with_source_id(0x33)
            .with_tx_busy_timeout_us(50)
            .with_rx_ready_timeout_us(60)
            .with_poll_interval_us(2);

        assert_eq!(config.uart.id, 1);
        assert_eq!(config.uart.baud_rate, 921_600);
        assert_eq!((config.uart.tx_pin, config.uart.rx_pin), (4, 5));
        assert_eq!(config.source_id, 0x33);
        assert_eq!(config.timeouts.tx_busy_us, 50);
        assert_eq!(config.timeouts.rx_ready_us, 60);
        assert_eq!(config.timeouts.poll_interval_us, 2);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let bad = [
            FtlConfig::new().with_baud_rate(0),
            FtlConfig::new().with_pins(3, 3),
            FtlConfig::new().with_source_id(0),
            FtlConfig::new().with_tx_busy_timeout_us(0),
            FtlConfig::new().with_rx_ready_timeout_us(0),
            FtlConfig::new().with_poll_interval_us(0),
        ];
        for config in bad {
            assert_eq!(config.validate(), Err(ConfigError::InvalidConfig), "{config:?}");
        }
    }

    #[test]
    fn board_id_folds_with_xor() {
        assert_eq!(source_id_from_board_id(&[1, 2, 4, 8, 0, 0, 0, 0]), 15);
        assert_eq!(source_id_from_board_id(&[0xFF, 0, 0, 0, 0, 0, 0, 0x0F]), 0xF0);
    }

    #[test]
    fn board_id_zero_maps_to_one() {
        assert_eq!(source_id_from_board_id(&[0; 8]), 1);
        assert_eq!(source_id_from_board_id(&[7, 7, 0, 0, 0, 0, 0, 0]), 1);
        assert_eq!(FtlConfig::new().with_board_id(&[0; 8]).source_id, 1);
    }

    #[test]
    fn state_default() {
        assert_eq!(State::default(), State::Uninitialized);
    }
}
