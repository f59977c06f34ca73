//! Transport contract
//!
//! The client never touches sockets directly. A [`Transport`] opens a
//! connection to a URL and hands back a [`TransportConnection`]:
//!
//! - an outbound side where the client drops raw JSON text; sending never
//!   blocks and never fails towards the caller, a dead peer shows up as an
//!   event instead
//! - an inbound stream of [`TransportEvent`]s (messages, close, error)
//!
//! A successful `open` is the "open" event of the connection. The stream
//! ending without an explicit event is treated like a close.
//!
//! Two implementations ship with the crate: [`WebSocketTransport`] and
//! [`MemoryTransport`] for in-process use.
//!
//! [`WebSocketTransport`]: crate::WebSocketTransport
//! [`MemoryTransport`]: crate::MemoryTransport

use async_trait::async_trait;
use jsonlink_core::Result;
use tokio::sync::mpsc;

/// Something that happened on an open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A raw text message arrived
    Message(String),
    /// The peer closed the connection, with an optional reason
    Closed(Option<String>),
    /// The connection failed; no further events follow
    Error(String),
}

/// Both directions of an open connection
pub struct TransportConnection {
    outbound: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportConnection {
    /// Assemble a connection from its channel halves
    ///
    /// Dropping the receiving end of `outbound` is how a transport learns the
    /// client let go of the connection.
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self { outbound, events }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        (self.outbound, self.events)
    }
}

/// Opens connections for the client
///
/// Implementations must map every failure to open into an error; the client
/// reports it as `Error::ConnectFailed`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `url`
    async fn open(&self, url: &str) -> Result<TransportConnection>;
}
