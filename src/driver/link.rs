//! FTL link facade
//!
//! Ties the pool, DMA engine, RX parser, TX scheduler and cross-core bridge
//! into the API the application sees.
//!
//! # Core ownership
//!
//! [`FtlState`] is the shared context. It holds everything both cores touch
//! and lives in a `static`. The owning core builds one [`Ftl`] over it; `Ftl`
//! is `!Send`, owns the UART and DMA drivers and is the only way to reach
//! `poll`. The other core gets a [`RemoteSender`], whose only job is to hand
//! filled slots across the mailbox.
//!
//! ```ignore
//! static LINK: FtlState = FtlState::new();
//!
//! // Owning core
//! let mut ftl = Ftl::new(&LINK, uart, dma, mailbox_rx)?;
//! ftl.initialize(FtlConfig::new().with_board_id(&uid), &mut delay)?;
//! loop {
//!     ftl.poll(&mut delay)?;
//!     while let Some(msg) = ftl.get_msg() {
//!         handle(msg.data());
//!     }
//! }
//!
//! // Other core
//! let mut remote = LINK.remote_sender(mailbox_tx);
//! remote.send_text("hello from core 1");
//! ```

use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embedded_hal::delay::DelayNs;

use super::config::{DmaTimeouts, FtlConfig, State};
use super::error::{ConfigError, ConfigResult, Error, Result};
use crate::hal::{MailboxRx, MailboxTx, UartDma, UartPort};
use crate::internal::constants::{
    RX_CIRCULAR_BUFFER_SIZE, RX_DMA_CHUNK_SIZE, RX_READ_CHUNK_SIZE, TX_BUFFER_SIZE,
};
use crate::internal::dma::{DmaBuffers, DmaEngine, DmaStatistics};
use crate::internal::fmt::{debug, error, info};
use crate::messages::Message;
use crate::pool::{LinkPool, OwnedMessage};
use crate::transport::bridge::{Bridge, BridgeStatistics};
use crate::transport::rx::{RxParser, RxStatistics};
use crate::transport::tx::{TxScheduler, TxStatistics, acquire_and_encode, acquire_and_fill_message};

/// DMA buffers sized for the link
pub type LinkDmaBuffers = DmaBuffers<RX_DMA_CHUNK_SIZE, TX_BUFFER_SIZE>;

/// DMA engine sized for the link
pub type LinkDmaEngine<'a, D> =
    DmaEngine<'a, D, RX_DMA_CHUNK_SIZE, RX_CIRCULAR_BUFFER_SIZE, TX_BUFFER_SIZE>;

// =============================================================================
// Shared context
// =============================================================================

/// State shared by both cores. Create one in a `static`.
pub struct FtlState {
    pool: LinkPool,
    bridge: Bridge,
    dma_buffers: LinkDmaBuffers,
    source_id: AtomicU8,
    initialized: AtomicBool,
    owner_claimed: AtomicBool,
}

impl Default for FtlState {
    fn default() -> Self {
        Self::new()
    }
}

impl FtlState {
    /// Empty context. Usable in `static` initializers.
    pub const fn new() -> Self {
        Self {
            pool: LinkPool::new(),
            bridge: Bridge::new(),
            dma_buffers: LinkDmaBuffers::new(),
            source_id: AtomicU8::new(0),
            initialized: AtomicBool::new(false),
            owner_claimed: AtomicBool::new(false),
        }
    }

    /// The message pool
    pub fn pool(&self) -> &LinkPool {
        &self.pool
    }

    /// Whether the owning core has finished `initialize`
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Source id stamped on outgoing frames (0 before initialization)
    pub fn source_id(&self) -> u8 {
        self.source_id.load(Ordering::Acquire)
    }

    /// Bridge counters
    pub fn bridge_statistics(&self) -> BridgeStatistics {
        self.bridge.statistics()
    }

    /// Sender for the non-owning core
    pub fn remote_sender<M: MailboxTx>(&self, mailbox: M) -> RemoteSender<'_, M> {
        RemoteSender {
            shared: self,
            mailbox,
        }
    }
}

// =============================================================================
// Sending
// =============================================================================

/// Anything that can put a message on the link.
///
/// Implemented by [`Ftl`] on the owning core and by [`RemoteSender`] on the
/// other one, so code written against `MessageSink` takes the right path on
/// either core.
pub trait MessageSink {
    /// Queue `data` for transmission
    fn try_send(&mut self, data: &[u8]) -> Result<()>;

    /// Encode a typed message straight into a pool slot and queue it
    fn try_send_typed<'m, M: Message<'m>>(&mut self, msg: &M) -> Result<()>;

    /// Whether a send right now would find room on this path
    fn is_tx_ready(&self) -> bool;

    /// Queue `data`; `false` means try again later
    fn send_msg(&mut self, data: &[u8]) -> bool {
        self.try_send(data).is_ok()
    }

    /// Queue a text message
    fn send_text(&mut self, text: &str) -> bool {
        self.send_msg(text.as_bytes())
    }

    /// Queue a typed message; `false` means try again later
    fn send_typed<'m, M: Message<'m>>(&mut self, msg: &M) -> bool {
        self.try_send_typed(msg).is_ok()
    }
}

// =============================================================================
// Owning core
// =============================================================================

/// The link as seen from the owning core.
///
/// Owns the UART and DMA drivers. Not `Send`: it must stay on the core that
/// created it.
pub struct Ftl<'a, U: UartPort, D: UartDma, M: MailboxRx> {
    shared: &'a FtlState,
    uart: U,
    dma: LinkDmaEngine<'a, D>,
    mailbox: M,
    rx: RxParser<'a>,
    tx: TxScheduler<'a>,
    config: FtlConfig,
    state: State,
    _not_send: PhantomData<*const ()>,
}

impl<'a, U: UartPort, D: UartDma, M: MailboxRx> Ftl<'a, U, D, M> {
    /// Claim the owning-core side of `shared`.
    ///
    /// Fails with [`ConfigError::AlreadyInitialized`] if another `Ftl` over
    /// the same context is alive.
    pub fn new(shared: &'a FtlState, uart: U, dma: D, mailbox: M) -> ConfigResult<Self> {
        if shared.owner_claimed.swap(true, Ordering::AcqRel) {
            return Err(ConfigError::AlreadyInitialized);
        }

        Ok(Self {
            shared,
            uart,
            dma: DmaEngine::new(dma, &shared.dma_buffers, DmaTimeouts::new()),
            mailbox,
            rx: RxParser::new(&shared.pool),
            tx: TxScheduler::new(&shared.pool),
            config: FtlConfig::new(),
            state: State::Uninitialized,
            _not_send: PhantomData,
        })
    }

    /// Current state
    #[inline(always)]
    pub fn state(&self) -> State {
        self.state
    }

    /// Configuration applied by the last successful `initialize`
    pub fn config(&self) -> &FtlConfig {
        &self.config
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Bring the link up.
    ///
    /// Configures the UART, arms both RX DMA chunks and publishes the source
    /// id to the other core. Calling it again once initialized is a no-op.
    /// After a DMA failure it may be called again to retry.
    pub fn initialize(&mut self, config: FtlConfig, delay: &mut impl DelayNs) -> Result<()> {
        if self.state == State::Initialized {
            return Ok(());
        }
        config.validate()?;

        self.uart.configure(&config.uart)?;
        self.uart.drain_rx();

        self.dma.set_timeouts(config.timeouts);
        if let Err(e) = self.dma.init(delay) {
            if matches!(e, Error::Dma(_)) {
                self.state = State::Failed;
            }
            error!("FTL DMA init failed: {}", e);
            return Err(e);
        }

        self.rx.reset();
        self.tx.reset();

        self.shared.source_id.store(config.source_id, Ordering::Release);
        self.shared.initialized.store(true, Ordering::Release);
        self.config = config;
        self.state = State::Initialized;

        info!(
            "FTL initialized: source id {}, {} baud",
            config.source_id, config.uart.baud_rate
        );
        Ok(())
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Run one service pass: DMA, RX parsing, bridge drain, TX.
    ///
    /// Call regularly. Returns [`DmaError::Stall`](crate::DmaError::Stall)
    /// once the RX DMA could not be restarted; the link is then down until
    /// `initialize` succeeds again.
    pub fn poll(&mut self, delay: &mut impl DelayNs) -> Result<()> {
        match self.state {
            State::Initialized => {}
            State::Uninitialized => return Err(ConfigError::NotInitialized.into()),
            State::Failed => return Err(crate::DmaError::Stall.into()),
        }

        if let Err(e) = self.dma.process_rx_dma(delay) {
            self.state = State::Failed;
            self.shared.initialized.store(false, Ordering::Release);
            error!("FTL link down: {}", e.as_str());
            return Err(e.into());
        }

        let mut chunk = [0u8; RX_READ_CHUNK_SIZE];
        loop {
            let n = self.dma.read(&mut chunk);
            if n == 0 {
                break;
            }
            self.rx.process_bytes(&chunk[..n]);
        }

        let shared = self.shared;
        shared
            .bridge
            .process_fifo_messages(&mut self.mailbox, &shared.pool, &mut self.tx);

        self.tx.process_tx_queue(&mut self.dma, delay);
        Ok(())
    }

    // =========================================================================
    // Receiving
    // =========================================================================

    /// Whether a received message is waiting
    pub fn has_msg(&self) -> bool {
        self.state == State::Initialized && self.rx.has_message()
    }

    /// Take the oldest received message
    pub fn get_msg(&mut self) -> Option<OwnedMessage<'a>> {
        if self.state != State::Initialized {
            return None;
        }
        self.rx.take_message()
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Source id stamped on outgoing frames
    pub fn get_my_source_id(&self) -> u8 {
        self.shared.source_id()
    }

    /// RX counters
    pub fn rx_statistics(&self) -> RxStatistics {
        self.rx.statistics()
    }

    /// TX counters
    pub fn tx_statistics(&self) -> TxStatistics {
        self.tx.statistics()
    }

    /// Bridge counters
    pub fn bridge_statistics(&self) -> BridgeStatistics {
        self.shared.bridge_statistics()
    }

    /// DMA counters
    pub fn dma_statistics(&self) -> DmaStatistics {
        self.dma.statistics()
    }

    /// Messages waiting in the RX delivery queue
    pub fn get_queue_count(&self) -> usize {
        self.rx.queue_count()
    }

    /// Messages waiting in the TX queue
    pub fn tx_queue_count(&self) -> usize {
        self.tx.queue_count()
    }

    /// Pool slots currently in use, on either core
    pub fn pool_allocated_count(&self) -> usize {
        self.shared.pool.allocated_count()
    }
}

impl<U: UartPort, D: UartDma, M: MailboxRx> MessageSink for Ftl<'_, U, D, M> {
    fn try_send(&mut self, data: &[u8]) -> Result<()> {
        if self.state != State::Initialized {
            return Err(ConfigError::NotInitialized.into());
        }
        let handle = acquire_and_fill_message(&self.shared.pool, self.shared.source_id(), data)?;
        self.tx.enqueue(handle).inspect_err(|e| {
            debug!("send dropped: {}", e.as_str());
        })?;
        Ok(())
    }

    fn try_send_typed<'m, T: Message<'m>>(&mut self, msg: &T) -> Result<()> {
        if self.state != State::Initialized {
            return Err(ConfigError::NotInitialized.into());
        }
        let handle = acquire_and_encode(&self.shared.pool, self.shared.source_id(), msg)?;
        self.tx.enqueue(handle)?;
        Ok(())
    }

    /// `true` before initialization, so a caller waiting for room does not
    /// spin forever; the send itself will still fail.
    fn is_tx_ready(&self) -> bool {
        self.state != State::Initialized || self.tx.is_ready()
    }
}

impl<U: UartPort, D: UartDma, M: MailboxRx> Drop for Ftl<'_, U, D, M> {
    fn drop(&mut self) {
        self.shared.initialized.store(false, Ordering::Release);
        self.shared
            .bridge
            .discard_pending(&mut self.mailbox, &self.shared.pool);
        self.shared.owner_claimed.store(false, Ordering::Release);
    }
}

// =============================================================================
// Non-owning core
// =============================================================================

/// Send-only view of the link for the non-owning core.
///
/// Never blocks: a full pool or a full mailbox makes the send fail at once.
pub struct RemoteSender<'a, M: MailboxTx> {
    shared: &'a FtlState,
    mailbox: M,
}

impl<M: MailboxTx> RemoteSender<'_, M> {
    /// Whether the mailbox has room for another handle
    pub fn is_ready(&self) -> bool {
        self.shared.is_initialized() && self.mailbox.is_writable()
    }
}

impl<M: MailboxTx> MessageSink for RemoteSender<'_, M> {
    fn try_send(&mut self, data: &[u8]) -> Result<()> {
        if !self.shared.is_initialized() {
            return Err(ConfigError::NotInitialized.into());
        }
        let handle = acquire_and_fill_message(&self.shared.pool, self.shared.source_id(), data)?;
        self.shared.bridge.send_from_remote(&mut self.mailbox, handle)?;
        Ok(())
    }

    fn try_send_typed<'m, T: Message<'m>>(&mut self, msg: &T) -> Result<()> {
        if !self.shared.is_initialized() {
            return Err(ConfigError::NotInitialized.into());
        }
        let handle = acquire_and_encode(&self.shared.pool, self.shared.source_id(), msg)?;
        self.shared.bridge.send_from_remote(&mut self.mailbox, handle)?;
        Ok(())
    }

    fn is_tx_ready(&self) -> bool {
        self.is_ready()
    }
}

// =============================================================================
// Tests
// =============================================================================
