//! Room lifecycle and the event pump that drives every other component.
//!
//! A [`BandSession`] owns all room state. Transport events and timer firings
//! land on two queues that belong to the current room; the pump takes them
//! one at a time, so no two handlers ever run concurrently. Leaving a room
//! drops both queues, which turns any continuation still in flight into a
//! no-op.

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::Arc,
};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    time::{Duration, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    common::{
        clock::{Clock, SystemClock},
        errors::{SessionError, TransportError},
        types::{PeerId, TrackId},
    },
    configs::SessionConfig,
    media::{MediaStore, TrackInspector},
    playback::{
        PlaybackArtifact, PlaybackCoordinator, PlaybackEngine, PlaybackPhase,
        drift::corrector_from_config,
    },
    protocol::{MediaPayload, PlayMode, SongRef, SyncPulse, Track, WireMessage},
    transport::{Channel, ConnectMetadata, Endpoint, Transport, TransportEvent},
};

pub mod constants;
pub mod directory;
mod latency;
mod playback;
mod ready;
pub mod room_code;
mod roster;
pub mod router;
mod song;
pub mod timers;


pub use directory::MembershipDirectory;
pub use room_code::RoomCode;
pub use router::RouteOutcome;

use constants::JOIN_TIMEOUT_MS;
use timers::{TimerEvent, TimerSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Host,
    #[default]
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionInfo {
    pub role: Role,
    pub room_code: Option<RoomCode>,
    pub status: SessionStatus,
    pub play_mode: PlayMode,
}

/// The song everyone in the room is about to play.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSong {
    pub name: String,
    pub filename: String,
    /// Where the local copy lives, once there is one.
    pub path: Option<PathBuf>,
    /// Encoded file, kept by the host for late joiners.
    pub payload: Option<MediaPayload>,
    /// Selected, but neither found locally nor received yet.
    pub pending: bool,
}

impl SelectedSong {
    pub fn song_ref(&self) -> SongRef {
        SongRef {
            name: self.name.clone(),
            filename: self.filename.clone(),
        }
    }

    pub fn artifact(&self) -> Option<PlaybackArtifact> {
        self.path.as_ref().map(|path| PlaybackArtifact {
            name: self.name.clone(),
            path: path.clone(),
        })
    }
}

/// Everything that only exists while connected to a room.
struct RoomLink {
    endpoint: Arc<dyn Endpoint>,
    /// Id of our own record in the directory.
    local: PeerId,
    /// The host's rendezvous address, on members.
    host_address: Option<String>,
    /// Open channels in the order they opened.
    channels: Vec<(PeerId, Arc<dyn Channel>)>,
    /// Incoming channels that have not reported `Open` yet.
    accepting: HashMap<String, Arc<dyn Channel>>,
    probes: HashMap<PeerId, CancellationToken>,
    events: flume::Receiver<TransportEvent>,
    /// Transport events that arrived while waiting for the host to open.
    backlog: VecDeque<TransportEvent>,
    timer_tx: TimerSink,
    timers: UnboundedReceiver<TimerEvent>,
    /// Parent of every timer token of this room.
    cancel: CancellationToken,
}

impl RoomLink {
    fn new(
        endpoint: Arc<dyn Endpoint>,
        local: PeerId,
        host_address: Option<String>,
        events: flume::Receiver<TransportEvent>,
    ) -> Self {
        let (timer_tx, timers) = mpsc::unbounded_channel();
        Self {
            endpoint,
            local,
            host_address,
            channels: Vec::new(),
            accepting: HashMap::new(),
            probes: HashMap::new(),
            events,
            backlog: VecDeque::new(),
            timer_tx,
            timers,
            cancel: CancellationToken::new(),
        }
    }

    fn channel(&self, peer: &PeerId) -> Option<&Arc<dyn Channel>> {
        self.channels
            .iter()
            .find(|(id, _)| id == peer)
            .map(|(_, channel)| channel)
    }
}

enum Pumped {
    Transport(TransportEvent),
    Timer(TimerEvent),
}

pub struct BandSession {
    transport: Arc<dyn Transport>,
    engine: Arc<dyn PlaybackEngine>,
    media: Arc<dyn MediaStore>,
    inspector: Arc<dyn TrackInspector>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    host_delay_ms: u64,
    info: SessionInfo,
    directory: MembershipDirectory,
    tracks: Vec<Track>,
    song: Option<SelectedSong>,
    my_track_id: Option<TrackId>,
    my_slot: Option<u32>,
    my_ready: bool,
    coordinator: PlaybackCoordinator,
    link: Option<RoomLink>,
}

impl BandSession {
    pub fn new(
        transport: Arc<dyn Transport>,
        engine: Arc<dyn PlaybackEngine>,
        media: Arc<dyn MediaStore>,
        inspector: Arc<dyn TrackInspector>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            engine,
            media,
            inspector,
            clock: Arc::new(SystemClock),
            host_delay_ms: config.host_delay_ms(),
            coordinator: PlaybackCoordinator::new(corrector_from_config(&config.drift)),
            config,
            info: SessionInfo::default(),
            directory: MembershipDirectory::new(),
            tracks: Vec::new(),
            song: None,
            my_track_id: None,
            my_slot: None,
            my_ready: false,
            link: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn is_host(&self) -> bool {
        self.link.is_some() && self.info.role == Role::Host
    }

    pub fn in_room(&self) -> bool {
        self.link.is_some()
    }

    /// Id of our own record, while in a room.
    pub fn local_id(&self) -> Option<&PeerId> {
        self.link.as_ref().map(|link| &link.local)
    }

    pub fn directory(&self) -> &MembershipDirectory {
        &self.directory
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn selected_song(&self) -> Option<&SelectedSong> {
        self.song.as_ref()
    }

    pub fn my_ready(&self) -> bool {
        self.my_ready
    }

    pub fn my_slot(&self) -> Option<u32> {
        self.my_slot
    }

    pub fn my_track_id(&self) -> Option<TrackId> {
        self.my_track_id
    }

    pub fn playback_phase(&self) -> PlaybackPhase {
        self.coordinator.phase()
    }

    pub fn last_sync_pulse(&self) -> Option<&SyncPulse> {
        self.coordinator.last_pulse()
    }

    pub fn host_delay_ms(&self) -> u64 {
        self.host_delay_ms
    }

    /// Opens a room and listens for members on its rendezvous address.
    pub async fn create_room(&mut self, name: &str) -> Result<RoomCode, SessionError> {
        if self.link.is_some() {
            return Err(SessionError::AlreadyInRoom);
        }

        let code = RoomCode::generate();
        let address = code.rendezvous(&self.config.rendezvous_prefix);
        let (tx, rx) = flume::unbounded();

        let endpoint = match self.transport.open(Some(&address), tx).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!("[{}] Failed to open room: {}", code, e);
                self.info.status = SessionStatus::Error;
                return Err(SessionError::Connection(e));
            }
        };

        self.link = Some(RoomLink::new(endpoint, PeerId::host(), None, rx));
        self.info = SessionInfo {
            role: Role::Host,
            room_code: Some(code.clone()),
            status: SessionStatus::Connected,
            play_mode: PlayMode::default(),
        };
        self.directory = MembershipDirectory::for_host(name);

        info!("[{}] Room created by {}", code, name);
        Ok(code)
    }

    /// Connects to the host of `code` and announces ourselves as `name`.
    pub async fn join_room(&mut self, code: &str, name: &str) -> Result<RoomCode, SessionError> {
        if self.link.is_some() {
            return Err(SessionError::AlreadyInRoom);
        }

        let code = RoomCode::normalize(code);
        let address = code.rendezvous(&self.config.rendezvous_prefix);
        let (tx, rx) = flume::unbounded();

        let endpoint = match self.transport.open(None, tx).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!("[{}] Failed to open endpoint: {}", code, e);
                self.info.status = SessionStatus::Error;
                return Err(SessionError::Connection(e));
            }
        };
        self.info.status = SessionStatus::Connecting;
        debug!("[{}] Dialing {} as {}", code, address, endpoint.id());

        let mut backlog = VecDeque::new();
        let opened = match endpoint.connect(
            &address,
            ConnectMetadata {
                name: name.to_string(),
            },
        ) {
            Ok(channel) => {
                let wait = wait_for_open(&rx, &address, &mut backlog);
                match timeout(Duration::from_millis(JOIN_TIMEOUT_MS), wait).await {
                    Ok(Ok(())) => Ok(channel),
                    Ok(Err(e)) => Err(e),
                    Err(_) => {
                        warn!("[{}] Host did not answer in time", code);
                        Err(SessionError::RoomNotFound)
                    }
                }
            }
            Err(e) => Err(SessionError::Connection(e)),
        };

        let channel = match opened {
            Ok(channel) => channel,
            Err(e) => {
                endpoint.destroy();
                self.info.status = SessionStatus::Error;
                warn!("[{}] Join failed: {}", code, e);
                return Err(e);
            }
        };

        let local = PeerId::from(endpoint.id());
        let mut link = RoomLink::new(endpoint, local, Some(address), rx);
        link.backlog = backlog;
        link.channels.push((PeerId::host(), channel));
        self.link = Some(link);
        self.info = SessionInfo {
            role: Role::Member,
            room_code: Some(code.clone()),
            status: SessionStatus::Connected,
            play_mode: PlayMode::default(),
        };
        self.directory = MembershipDirectory::new();

        self.send_to(
            &PeerId::host(),
            &WireMessage::Join {
                name: name.to_string(),
            },
        );
        self.start_probe(PeerId::host());

        info!("[{}] Joined room as {}", code, name);
        Ok(code)
    }

    /// Leaves the room. The host tells every member the room is closed
    /// first. Safe to call when not in a room.
    pub async fn leave_room(&mut self) {
        if self.is_host() {
            self.broadcast(&WireMessage::RoomClosed, None);
        }
        if let Some(code) = &self.info.room_code {
            info!("[{}] Leaving room", code);
        }
        self.teardown();
    }

    /// The host closed the room: stop playing and reset without telling
    /// anyone.
    pub(crate) async fn on_room_closed(&mut self) {
        if let Some(code) = &self.info.room_code {
            info!("[{}] Host closed the room", code);
        }
        if let Err(e) = self.engine.stop().await {
            warn!("Failed to stop playback on room close: {}", e);
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        self.coordinator.reset();

        if let Some(link) = self.link.take() {
            link.cancel.cancel();
            for (_, channel) in &link.channels {
                channel.close();
            }
            for channel in link.accepting.values() {
                channel.close();
            }
            link.endpoint.destroy();
        }

        self.info = SessionInfo::default();
        self.directory.clear();
        self.tracks.clear();
        self.song = None;
        self.my_track_id = None;
        self.my_slot = None;
        self.my_ready = false;
    }

    /// Waits for and handles one event. Returns `false` once there is no
    /// room to take events from.
    pub async fn next_event(&mut self) -> bool {
        let pumped = {
            let Some(link) = self.link.as_mut() else {
                return false;
            };
            if let Some(event) = link.backlog.pop_front() {
                Pumped::Transport(event)
            } else {
                tokio::select! {
                    event = link.events.recv_async() => match event {
                        Ok(event) => Pumped::Transport(event),
                        Err(_) => {
                            warn!("Transport event queue closed");
                            return false;
                        }
                    },
                    Some(event) = link.timers.recv() => Pumped::Timer(event),
                }
            }
        };

        self.dispatch(pumped).await;
        true
    }

    /// Handles every event that is already queued, without waiting.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(pumped) = self.try_next() {
            self.dispatch(pumped).await;
            handled += 1;
        }
        handled
    }

    /// Pumps events until the room is left, closed, or the host is lost.
    pub async fn run(&mut self) {
        while self.next_event().await {
            if self.info.status != SessionStatus::Connected {
                break;
            }
        }
    }

    fn try_next(&mut self) -> Option<Pumped> {
        let link = self.link.as_mut()?;
        if let Some(event) = link.backlog.pop_front() {
            return Some(Pumped::Transport(event));
        }
        if let Ok(event) = link.events.try_recv() {
            return Some(Pumped::Transport(event));
        }
        link.timers.try_recv().ok().map(Pumped::Timer)
    }

    async fn dispatch(&mut self, pumped: Pumped) {
        match pumped {
            Pumped::Transport(event) => self.on_transport_event(event).await,
            Pumped::Timer(event) => self.on_timer(event).await,
        }
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        trace!("Transport event: {:?}", event);
        match event {
            TransportEvent::Incoming(channel) => {
                if let Some(link) = self.link.as_mut() {
                    link.accepting.insert(channel.remote().to_string(), channel);
                }
            }
            TransportEvent::Open(remote) => self.on_channel_open(remote),
            TransportEvent::Data { from, payload } => {
                let peer = self.peer_of(&from);
                self.route(&peer, &payload).await;
            }
            TransportEvent::Closed(remote) => self.on_channel_closed(&remote),
            TransportEvent::Error(e) => warn!("Transport error: {}", e),
        }
    }

    async fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Ping(peer) => self.on_ping_tick(&peer),
            TimerEvent::SyncPulse => self.on_sync_tick(),
            TimerEvent::Execute { action, token } => {
                if token.is_cancelled() {
                    trace!("Dropping cancelled {:?}", action);
                    return;
                }
                self.execute(action).await;
            }
        }
    }

    fn on_channel_open(&mut self, remote: String) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        let Some(channel) = link.accepting.remove(&remote) else {
            trace!("Open for {} without a pending channel", remote);
            return;
        };

        let peer = PeerId::from(remote);
        debug!("Peer {} connected as {}", peer, channel.metadata().name);
        link.channels.push((peer.clone(), channel));
        self.start_probe(peer);
    }

    fn on_channel_closed(&mut self, remote: &str) {
        let peer = self.peer_of(remote);
        let Some(link) = self.link.as_mut() else {
            return;
        };
        let before = link.channels.len();
        link.channels.retain(|(id, _)| id != &peer);
        link.accepting.remove(remote);
        if link.channels.len() == before {
            return;
        }

        info!("Peer {} disconnected", peer);
        self.stop_probe(&peer);
        self.directory.remove(&peer);

        if self.is_host() {
            self.broadcast(&WireMessage::PeerLeft { peer_id: peer }, None);
        } else if peer.is_host() {
            self.info.status = SessionStatus::Disconnected;
        }
    }

    /// Maps a transport id onto a directory id: on a member, the host's
    /// rendezvous address is the `host` record.
    fn peer_of(&self, remote: &str) -> PeerId {
        match self.link.as_ref().and_then(|l| l.host_address.as_deref()) {
            Some(host) if host == remote => PeerId::host(),
            _ => PeerId::from(remote),
        }
    }

    fn is_self(&self, peer: &PeerId) -> bool {
        self.link.as_ref().is_some_and(|link| &link.local == peer)
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn send_to(&self, peer: &PeerId, message: &WireMessage) {
        let Some(channel) = self.link.as_ref().and_then(|link| link.channel(peer)) else {
            debug!("No channel to {} for {}", peer, message.tag());
            return;
        };
        if let Some(text) = encode(message) {
            deliver(peer, channel.as_ref(), text);
        }
    }

    /// Sends `message` to every open channel except `exclude`.
    fn broadcast(&self, message: &WireMessage, exclude: Option<&PeerId>) {
        let Some(link) = self.link.as_ref() else {
            return;
        };
        let Some(text) = encode(message) else {
            return;
        };
        for (peer, channel) in &link.channels {
            if Some(peer) != exclude && channel.is_open() {
                deliver(peer, channel.as_ref(), text.clone());
            }
        }
    }
}

async fn wait_for_open(
    events: &flume::Receiver<TransportEvent>,
    address: &str,
    backlog: &mut VecDeque<TransportEvent>,
) -> Result<(), SessionError> {
    loop {
        match events.recv_async().await {
            Ok(TransportEvent::Open(remote)) if remote == address => return Ok(()),
            Ok(TransportEvent::Error(TransportError::PeerUnavailable(_))) => {
                return Err(SessionError::RoomNotFound);
            }
            Ok(TransportEvent::Error(e)) => return Err(SessionError::Connection(e)),
            Ok(other) => backlog.push_back(other),
            Err(_) => return Err(SessionError::Connection(TransportError::ChannelClosed)),
        }
    }
}

fn encode(message: &WireMessage) -> Option<String> {
    match message.encode() {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to encode {}: {}", message.tag(), e);
            None
        }
    }
}

fn deliver(peer: &PeerId, channel: &dyn Channel, text: String) {
    if let Err(e) = channel.send(text) {
        debug!("Send to {} failed: {}", peer, e);
    }
}
