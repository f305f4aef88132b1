use std::sync::Arc;

use tracing::{trace, warn};

use crate::{
    common::types::{PeerId, TrackId},
    protocol::PeerRecord,
};

/// Peers of the room in join order, keyed by id.
///
/// Authoritative on the host. On a member it is a replica that starts
/// unseeded, is replaced wholesale by the host's snapshot, and is patched by
/// incremental events afterwards; patches that arrive before the snapshot are
/// dropped.
///
/// Every mutation produces a new peer list; a snapshot handed out earlier
/// never changes under its holder.
#[derive(Debug, Clone, Default)]
pub struct MembershipDirectory {
    peers: Arc<Vec<PeerRecord>>,
    seeded: bool,
}

impl MembershipDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host's directory: just its own record.
    pub fn for_host(name: &str) -> Self {
        Self {
            peers: Arc::new(vec![PeerRecord::host(name)]),
            seeded: true,
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<PeerRecord>> {
        self.peers.clone()
    }

    pub fn peers(&self) -> &[PeerRecord] {
        &self.peers
    }

    pub fn get(&self, id: &PeerId) -> Option<&PeerRecord> {
        self.peers.iter().find(|p| &p.id == id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Replaces the whole directory with a host snapshot.
    pub fn replace(&mut self, mut peers: Vec<PeerRecord>) {
        let hosts = peers.iter().filter(|p| p.is_host).count();
        if hosts != 1 {
            warn!("Room snapshot carries {} host records", hosts);
        }
        for peer in peers.iter_mut().filter(|p| p.is_host) {
            peer.ready = true;
        }
        self.peers = Arc::new(peers);
        self.seeded = true;
    }

    /// Appends `record`, or replaces the record with the same id in place.
    pub fn upsert(&mut self, record: PeerRecord) -> bool {
        if !self.accepts_patches("upsert") {
            return false;
        }
        let peers = Arc::make_mut(&mut self.peers);
        match peers.iter_mut().find(|p| p.id == record.id) {
            Some(existing) => *existing = record,
            None => peers.push(record),
        }
        true
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<PeerRecord> {
        if !self.accepts_patches("remove") {
            return None;
        }
        let index = self.peers.iter().position(|p| &p.id == id)?;
        Some(Arc::make_mut(&mut self.peers).remove(index))
    }

    pub fn set_latency(&mut self, id: &PeerId, latency_ms: u64) -> bool {
        self.update(id, |p| p.latency_ms = latency_ms)
    }

    pub fn set_track(&mut self, id: &PeerId, track_id: Option<TrackId>) -> bool {
        self.update(id, |p| p.track_id = track_id)
    }

    pub fn set_slot(&mut self, id: &PeerId, slot: Option<u32>) -> bool {
        self.update(id, |p| p.slot = slot)
    }

    /// The host record stays ready whatever is asked.
    pub fn set_ready(&mut self, id: &PeerId, ready: bool) -> bool {
        self.update(id, |p| p.ready = ready || p.is_host)
    }

    /// Clears every member's ready flag.
    pub fn reset_ready(&mut self) {
        if self.peers.iter().all(|p| p.ready == p.is_host) {
            return;
        }
        for peer in Arc::make_mut(&mut self.peers) {
            peer.ready = peer.is_host;
        }
    }

    pub fn max_latency(&self) -> u64 {
        self.peers.iter().map(|p| p.latency_ms).max().unwrap_or(0)
    }

    pub fn all_members_ready(&self) -> bool {
        self.peers.iter().filter(|p| !p.is_host).all(|p| p.ready)
    }

    pub fn clear(&mut self) {
        self.peers = Arc::new(Vec::new());
        self.seeded = false;
    }

    fn update(&mut self, id: &PeerId, apply: impl FnOnce(&mut PeerRecord)) -> bool {
        if !self.accepts_patches("update") {
            return false;
        }
        let Some(index) = self.peers.iter().position(|p| &p.id == id) else {
            return false;
        };
        apply(&mut Arc::make_mut(&mut self.peers)[index]);
        true
    }

    fn accepts_patches(&self, op: &str) -> bool {
        if !self.seeded {
            trace!("Dropping directory {} before the room snapshot", op);
        }
        self.seeded
    }
}
