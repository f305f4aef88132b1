//! Point-to-point channel substrate.
//!
//! The session never talks to sockets directly: it opens an [`Endpoint`]
//! through a [`Transport`], dials or accepts [`Channel`]s, and consumes the
//! resulting [`TransportEvent`]s from a single queue.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::errors::TransportError;

pub mod memory;

pub use memory::MemoryHub;

/// Queue an endpoint reports its events into.
pub type TransportSink = flume::Sender<TransportEvent>;

/// Metadata attached to an outgoing connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectMetadata {
    pub name: String,
}

pub enum TransportEvent {
    /// A remote peer dialed this endpoint. It is followed by `Open`.
    Incoming(Arc<dyn Channel>),
    /// The channel to `remote` is ready for traffic.
    Open(String),
    Data { from: String, payload: String },
    Closed(String),
    Error(TransportError),
}

impl std::fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming(channel) => write!(f, "Incoming({})", channel.remote()),
            Self::Open(remote) => write!(f, "Open({})", remote),
            Self::Data { from, payload } => {
                write!(f, "Data {{ from: {}, bytes: {} }}", from, payload.len())
            }
            Self::Closed(remote) => write!(f, "Closed({})", remote),
            Self::Error(e) => write!(f, "Error({})", e),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Registers a local endpoint. With an `address` the endpoint listens on
    /// it, which is how a host becomes reachable; without one the transport
    /// assigns an id.
    async fn open(
        &self,
        address: Option<&str>,
        sink: TransportSink,
    ) -> Result<Arc<dyn Endpoint>, TransportError>;
}

pub trait Endpoint: Send + Sync {
    /// Transport-level id of this endpoint.
    fn id(&self) -> &str;

    /// Dials `address`. The returned channel is not usable until an
    /// `Open` event for it arrives; an unreachable address is reported as a
    /// `TransportError::PeerUnavailable` event.
    fn connect(
        &self,
        address: &str,
        metadata: ConnectMetadata,
    ) -> Result<Arc<dyn Channel>, TransportError>;

    /// Closes every channel and releases the address.
    fn destroy(&self);
}

pub trait Channel: Send + Sync {
    /// Transport-level id of the other side.
    fn remote(&self) -> &str;
    fn metadata(&self) -> &ConnectMetadata;
    fn is_open(&self) -> bool;
    fn send(&self, payload: String) -> Result<(), TransportError>;
    fn close(&self);
}
