use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{Channel, ConnectMetadata, Endpoint, Transport, TransportEvent, TransportSink};
use crate::common::errors::TransportError;

/// In-process transport: every endpoint opened through the same hub shares
/// one address namespace, and channels are pairs of queues.
#[derive(Clone, Default)]
pub struct MemoryHub {
    endpoints: Arc<DashMap<String, Arc<MemoryEndpoint>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_listening(&self, address: &str) -> bool {
        self.endpoints.contains_key(address)
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

#[async_trait]
impl Transport for MemoryHub {
    async fn open(
        &self,
        address: Option<&str>,
        sink: TransportSink,
    ) -> Result<Arc<dyn Endpoint>, TransportError> {
        let id = address
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        let endpoint = Arc::new(MemoryEndpoint {
            id: id.clone(),
            sink,
            channels: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
            registry: self.endpoints.clone(),
        });

        match self.endpoints.entry(id.clone()) {
            Entry::Occupied(_) => return Err(TransportError::AddressInUse(id)),
            Entry::Vacant(slot) => {
                slot.insert(endpoint.clone());
            }
        }

        debug!("[memory] endpoint {} opened", id);
        Ok(endpoint)
    }
}

pub struct MemoryEndpoint {
    id: String,
    sink: TransportSink,
    channels: Mutex<Vec<Arc<MemoryChannel>>>,
    destroyed: AtomicBool,
    registry: Arc<DashMap<String, Arc<MemoryEndpoint>>>,
}

impl Endpoint for MemoryEndpoint {
    fn id(&self) -> &str {
        &self.id
    }

    fn connect(
        &self,
        address: &str,
        metadata: ConnectMetadata,
    ) -> Result<Arc<dyn Channel>, TransportError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(TransportError::Endpoint(format!(
                "endpoint {} is destroyed",
                self.id
            )));
        }

        let target = self.registry.get(address).map(|e| e.value().clone());
        let Some(target) = target else {
            debug!("[memory] {} dialed unknown address {}", self.id, address);
            let _ = self.sink.send(TransportEvent::Error(TransportError::PeerUnavailable(
                address.to_string(),
            )));
            let (dead_tx, _) = flume::unbounded();
            return Ok(Arc::new(MemoryChannel {
                local: self.id.clone(),
                remote: address.to_string(),
                metadata,
                open: Arc::new(AtomicBool::new(false)),
                local_sink: self.sink.clone(),
                remote_sink: dead_tx,
            }));
        };

        let open = Arc::new(AtomicBool::new(true));
        let outgoing = Arc::new(MemoryChannel {
            local: self.id.clone(),
            remote: target.id.clone(),
            metadata: metadata.clone(),
            open: open.clone(),
            local_sink: self.sink.clone(),
            remote_sink: target.sink.clone(),
        });
        let incoming = Arc::new(MemoryChannel {
            local: target.id.clone(),
            remote: self.id.clone(),
            metadata,
            open,
            local_sink: target.sink.clone(),
            remote_sink: self.sink.clone(),
        });

        self.channels.lock().push(outgoing.clone());
        target.channels.lock().push(incoming.clone());

        let _ = target.sink.send(TransportEvent::Incoming(incoming));
        let _ = target.sink.send(TransportEvent::Open(self.id.clone()));
        let _ = self.sink.send(TransportEvent::Open(target.id.clone()));

        debug!("[memory] {} connected to {}", self.id, target.id);
        Ok(outgoing)
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.registry
            .remove_if(&self.id, |_, endpoint| std::ptr::eq(endpoint.as_ref(), self));

        let channels = std::mem::take(&mut *self.channels.lock());
        for channel in channels {
            channel.close();
        }
        debug!("[memory] endpoint {} destroyed", self.id);
    }
}

pub struct MemoryChannel {
    local: String,
    remote: String,
    metadata: ConnectMetadata,
    /// Shared by both halves of the pair.
    open: Arc<AtomicBool>,
    local_sink: TransportSink,
    remote_sink: TransportSink,
}

impl Channel for MemoryChannel {
    fn remote(&self) -> &str {
        &self.remote
    }

    fn metadata(&self) -> &ConnectMetadata {
        &self.metadata
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn send(&self, payload: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::ChannelClosed);
        }
        trace!("[memory] {} -> {}: {}", self.local, self.remote, payload);
        self.remote_sink
            .send(TransportEvent::Data {
                from: self.local.clone(),
                payload,
            })
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn close(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        let _ = self.local_sink.send(TransportEvent::Closed(self.remote.clone()));
        let _ = self.remote_sink.send(TransportEvent::Closed(self.local.clone()));
    }
}
