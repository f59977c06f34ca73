//! Connection lifecycle
//!
//! ```text
//!              connect                 transport open
//! Disconnected ───────► Connecting ─────────────────► Connected
//!      ▲                    │                             │
//!      │  resolve/open fail │       close / error /       │
//!      ├────────────────────┘       disconnect            │
//!      └──────────────────────────────────────────────────┘
//!
//! Connected ──reconnect──► Connecting
//! ```
//!
//! All transitions go through [`ConnectionManager`], which keeps the state,
//! the outbound half of the live connection and the in-flight connect
//! attempt behind one mutex. Every attempt gets a new *epoch*; a task that
//! belongs to an older epoch (a stale receive loop, a connect that was
//! superseded by `disconnect`) cannot change the slot anymore.
//!
//! State changes are also published on a `watch` channel.

use crate::entrypoint::EntrypointProvider;
use crate::reconnect::ReconnectionStrategy;
use futures::future::{BoxFuture, Shared};
use jsonlink_core::{Error, Result};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Where the client is in its connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection and no attempt in flight
    Disconnected,
    /// Resolving the entrypoint or opening the transport
    Connecting,
    /// The transport is open; requests can be sent
    Connected,
}

impl ConnectionState {
    /// Gauge value used by metrics (0, 1, 2)
    pub fn as_gauge(self) -> i64 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// A connect attempt every concurrent `connect` caller awaits
pub(crate) type SharedConnect = Shared<BoxFuture<'static, Result<()>>>;

/// The live connection: where to write, and the switch that stops its reader
pub(crate) struct ActiveConnection {
    outbound: mpsc::UnboundedSender<String>,
    // Dropping it stops the receive loop.
    _shutdown: oneshot::Sender<()>,
}

impl ActiveConnection {
    pub(crate) fn new(outbound: mpsc::UnboundedSender<String>, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            outbound,
            _shutdown: shutdown,
        }
    }
}

struct Slot {
    state: ConnectionState,
    epoch: u64,
    attempt: Option<SharedConnect>,
    active: Option<ActiveConnection>,
    provider: Option<Arc<dyn EntrypointProvider>>,
}

impl Slot {
    /// Tear down the current connection and attempt, invalidating their tasks
    fn reset(&mut self) {
        self.epoch += 1;
        self.state = ConnectionState::Disconnected;
        self.attempt = None;
        self.active = None;
    }
}

pub(crate) struct ConnectionManager {
    slot: Mutex<Slot>,
    state_tx: watch::Sender<ConnectionState>,
    strategy: Mutex<Option<Box<dyn ReconnectionStrategy>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub(crate) fn new(strategy: Option<Box<dyn ReconnectionStrategy>>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            slot: Mutex::new(Slot {
                state: ConnectionState::Disconnected,
                epoch: 0,
                attempt: None,
                active: None,
                provider: None,
            }),
            state_tx,
            strategy: Mutex::new(strategy),
            reconnect_task: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        crate::lock(&self.slot).state
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn publish(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Join the in-flight attempt, or start one with `start(epoch, provider)`
    ///
    /// While Connecting or Connected the existing attempt is returned and
    /// `provider` is ignored.
    pub(crate) fn begin_connect<F>(&self, provider: Arc<dyn EntrypointProvider>, start: F) -> SharedConnect
    where
        F: FnOnce(u64, Arc<dyn EntrypointProvider>) -> SharedConnect,
    {
        let mut slot = crate::lock(&self.slot);
        if slot.state != ConnectionState::Disconnected {
            if let Some(attempt) = &slot.attempt {
                return attempt.clone();
            }
        }

        slot.epoch += 1;
        self.start_locked(&mut slot, provider, start)
    }

    /// Drop whatever connection exists and start a fresh attempt
    ///
    /// `drain` runs under the slot lock after the old connection is gone, so
    /// nothing can register against it in between.
    pub(crate) fn restart<D, F>(
        &self,
        provider: Arc<dyn EntrypointProvider>,
        drain: D,
        start: F,
    ) -> SharedConnect
    where
        D: FnOnce(),
        F: FnOnce(u64, Arc<dyn EntrypointProvider>) -> SharedConnect,
    {
        let mut slot = crate::lock(&self.slot);
        self.cancel_reconnect();
        slot.reset();
        drain();
        self.start_locked(&mut slot, provider, start)
    }

    fn start_locked<F>(&self, slot: &mut Slot, provider: Arc<dyn EntrypointProvider>, start: F) -> SharedConnect
    where
        F: FnOnce(u64, Arc<dyn EntrypointProvider>) -> SharedConnect,
    {
        slot.state = ConnectionState::Connecting;
        slot.provider = Some(provider.clone());
        let attempt = start(slot.epoch, provider);
        slot.attempt = Some(attempt.clone());
        self.publish(ConnectionState::Connecting);
        attempt
    }

    /// Promote attempt `epoch` to Connected
    ///
    /// Returns false (and drops `active`) if the attempt was superseded.
    pub(crate) fn connected(&self, epoch: u64, active: ActiveConnection) -> bool {
        let mut slot = crate::lock(&self.slot);
        if slot.epoch != epoch || slot.state != ConnectionState::Connecting {
            return false;
        }
        slot.state = ConnectionState::Connected;
        slot.active = Some(active);
        self.publish(ConnectionState::Connected);
        true
    }

    /// Record that attempt `epoch` failed to resolve or open
    pub(crate) fn connect_failed(&self, epoch: u64) -> bool {
        let mut slot = crate::lock(&self.slot);
        if slot.epoch != epoch || slot.state != ConnectionState::Connecting {
            return false;
        }
        slot.state = ConnectionState::Disconnected;
        slot.attempt = None;
        self.publish(ConnectionState::Disconnected);
        true
    }

    /// Record that connection `epoch` closed or failed
    ///
    /// `drain` runs under the slot lock; `None` means the loss was stale.
    /// With a reconnection strategy, `respawn` is handed the last provider
    /// and its task is stored before the lock is released, so a concurrent
    /// `close` always sees and cancels it.
    pub(crate) fn lost<T>(
        &self,
        epoch: u64,
        drain: impl FnOnce() -> T,
        respawn: impl FnOnce(Arc<dyn EntrypointProvider>) -> JoinHandle<()>,
    ) -> Option<T> {
        let mut slot = crate::lock(&self.slot);
        if slot.epoch != epoch || slot.state != ConnectionState::Connected {
            return None;
        }
        slot.reset();
        let drained = drain();
        self.publish(ConnectionState::Disconnected);

        if self.reconnect_enabled() {
            if let Some(provider) = slot.provider.clone() {
                let task = respawn(provider);
                if let Some(previous) = crate::lock(&self.reconnect_task).replace(task) {
                    previous.abort();
                }
            }
        }
        Some(drained)
    }

    /// Deliberate disconnect; also stops automatic reconnection
    ///
    /// Returns `None` if there was nothing to tear down.
    pub(crate) fn close<T>(&self, drain: impl FnOnce() -> T) -> Option<T> {
        let mut slot = crate::lock(&self.slot);
        self.cancel_reconnect();
        if slot.state == ConnectionState::Disconnected {
            return None;
        }
        slot.reset();
        let drained = drain();
        self.publish(ConnectionState::Disconnected);
        Some(drained)
    }

    /// Run `f` with the outbound channel of the live connection
    pub(crate) fn with_outbound<T>(
        &self,
        f: impl FnOnce(&mpsc::UnboundedSender<String>) -> Result<T>,
    ) -> Result<T> {
        let slot = crate::lock(&self.slot);
        match (&slot.state, &slot.active) {
            (ConnectionState::Connected, Some(active)) => f(&active.outbound),
            _ => Err(Error::TransportUnavailable),
        }
    }

    pub(crate) fn reconnect_enabled(&self) -> bool {
        crate::lock(&self.strategy).is_some()
    }

    pub(crate) fn next_reconnect_delay(&self, attempt: u32) -> Option<Duration> {
        crate::lock(&self.strategy)
            .as_mut()
            .and_then(|strategy| strategy.next_delay(attempt))
    }

    pub(crate) fn reset_strategy(&self) {
        if let Some(strategy) = crate::lock(&self.strategy).as_mut() {
            strategy.reset();
        }
    }

    // Callers hold the slot lock.
    fn cancel_reconnect(&self) {
        if let Some(task) = crate::lock(&self.reconnect_task).take() {
            task.abort();
        }
    }
}
