//! Fakes for the session's collaborators.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    common::{
        clock::Clock,
        errors::{MediaError, PlaybackError, TransportError},
    },
    configs::SessionConfig,
    media::{MediaStore, TrackInspector},
    playback::{PlayOptions, PlaybackArtifact, PlaybackEngine, TimelineEngine},
    protocol::{MediaPayload, Track},
    session::BandSession,
    transport::{
        Channel, ConnectMetadata, Endpoint, MemoryHub, Transport, TransportSink,
    },
};

/// Wall clock that follows tokio's (pausable) time, starting at `base`.
pub struct PausedClock {
    base: u64,
    origin: Instant,
}

impl PausedClock {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            origin: Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now_ms(&self) -> u64 {
        self.base + self.origin.elapsed().as_millis() as u64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Seek(f64),
    Start(PlaybackArtifact, PlayOptions),
    PauseOrResume,
    Stop,
}

/// A [`TimelineEngine`] that also records every call with its instant.
#[derive(Default)]
pub struct RecordingEngine {
    timeline: TimelineEngine,
    calls: Mutex<Vec<(Instant, EngineCall)>>,
}

impl RecordingEngine {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    /// When the last `start_playback` happened.
    pub fn last_start(&self) -> Option<(Instant, PlayOptions)> {
        self.calls.lock().iter().rev().find_map(|(at, call)| match call {
            EngineCall::Start(_, options) => Some((*at, options.clone())),
            _ => None,
        })
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push((Instant::now(), call));
    }
}

#[async_trait]
impl PlaybackEngine for RecordingEngine {
    async fn seek_to(&self, position: f64) -> Result<(), PlaybackError> {
        self.record(EngineCall::Seek(position));
        self.timeline.seek_to(position).await
    }

    async fn start_playback(
        &self,
        artifact: &PlaybackArtifact,
        options: &PlayOptions,
    ) -> Result<(), PlaybackError> {
        self.record(EngineCall::Start(artifact.clone(), options.clone()));
        self.timeline.start_playback(artifact, options).await
    }

    async fn pause_or_resume(&self) -> Result<(), PlaybackError> {
        self.record(EngineCall::PauseOrResume);
        self.timeline.pause_or_resume().await
    }

    async fn stop(&self) -> Result<(), PlaybackError> {
        self.record(EngineCall::Stop);
        self.timeline.stop().await
    }

    fn current_position(&self) -> f64 {
        self.timeline.current_position()
    }

    fn is_paused(&self) -> bool {
        self.timeline.is_paused()
    }
}

/// In-memory song library and temp directory.
#[derive(Default)]
pub struct MemoryMedia {
    /// Readable files, by path.
    pub files: Mutex<HashMap<PathBuf, MediaPayload>>,
    /// Local copies, by filename.
    pub library: Mutex<HashMap<String, PathBuf>>,
    pub persisted: Mutex<HashMap<String, MediaPayload>>,
    pub fail_persist: Mutex<bool>,
}

impl MemoryMedia {
    pub fn with_file(self, path: &str, contents: &str) -> Self {
        self.files
            .lock()
            .insert(PathBuf::from(path), MediaPayload(contents.to_string()));
        self
    }
}

#[async_trait]
impl MediaStore for MemoryMedia {
    async fn read_encoded(&self, path: &Path) -> Result<MediaPayload, MediaError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| MediaError::Read {
                path: path.display().to_string(),
                reason: "no such file".into(),
            })
    }

    async fn exists_locally(&self, filename: &str) -> Option<PathBuf> {
        self.library.lock().get(filename).cloned()
    }

    async fn persist_temporary(
        &self,
        filename: &str,
        payload: &MediaPayload,
    ) -> Result<PathBuf, MediaError> {
        if *self.fail_persist.lock() {
            return Err(MediaError::Persist {
                filename: filename.to_string(),
                reason: "disk full".into(),
            });
        }
        self.persisted
            .lock()
            .insert(filename.to_string(), payload.clone());
        Ok(PathBuf::from("/tmp/bandlink").join(filename))
    }
}

/// Returns the same tracks for every file, or fails when empty.
#[derive(Default)]
pub struct FixedInspector(pub Vec<Track>);

#[async_trait]
impl TrackInspector for FixedInspector {
    async fn extract_tracks(&self, path: &Path) -> Result<Vec<Track>, MediaError> {
        if self.0.is_empty() {
            return Err(MediaError::Inspect {
                path: path.display().to_string(),
                reason: "no tracks".into(),
            });
        }
        Ok(self.0.clone())
    }
}

/// A transport where nobody ever answers: dials neither open nor fail.
#[derive(Default)]
pub struct VoidTransport;

#[async_trait]
impl Transport for VoidTransport {
    async fn open(
        &self,
        _address: Option<&str>,
        sink: TransportSink,
    ) -> Result<Arc<dyn Endpoint>, TransportError> {
        Ok(Arc::new(VoidEndpoint { _sink: sink }))
    }
}

struct VoidEndpoint {
    _sink: TransportSink,
}

impl Endpoint for VoidEndpoint {
    fn id(&self) -> &str {
        "void"
    }

    fn connect(
        &self,
        address: &str,
        metadata: ConnectMetadata,
    ) -> Result<Arc<dyn Channel>, TransportError> {
        Ok(Arc::new(VoidChannel {
            remote: address.to_string(),
            metadata,
        }))
    }

    fn destroy(&self) {}
}

struct VoidChannel {
    remote: String,
    metadata: ConnectMetadata,
}

impl Channel for VoidChannel {
    fn remote(&self) -> &str {
        &self.remote
    }

    fn metadata(&self) -> &ConnectMetadata {
        &self.metadata
    }

    fn is_open(&self) -> bool {
        false
    }

    fn send(&self, _payload: String) -> Result<(), TransportError> {
        Err(TransportError::ChannelClosed)
    }

    fn close(&self) {}
}

pub fn tracks() -> Vec<Track> {
    vec![
        Track {
            id: 0,
            name: "Piano".into(),
            note_count: 412,
        },
        Track {
            id: 1,
            name: "Bass".into(),
            note_count: 128,
        },
    ]
}

/// One peer wired to its own fakes.
pub struct TestPeer {
    pub session: BandSession,
    pub engine: Arc<RecordingEngine>,
    pub media: Arc<MemoryMedia>,
}

impl TestPeer {
    pub fn new(transport: Arc<dyn Transport>, media: MemoryMedia) -> Self {
        let engine = Arc::new(RecordingEngine::default());
        let media = Arc::new(media);
        let session = BandSession::new(
            transport,
            engine.clone(),
            media.clone(),
            Arc::new(FixedInspector(tracks())),
            SessionConfig::default(),
        )
        .with_clock(Arc::new(PausedClock::new(1_700_000_000_000)));
        Self {
            session,
            engine,
            media,
        }
    }

    pub fn on(hub: &MemoryHub) -> Self {
        Self::new(Arc::new(hub.clone()), MemoryMedia::default())
    }
}

/// Pumps every peer until none of them has anything queued.
pub async fn settle(peers: &mut [&mut TestPeer]) {
    loop {
        let mut handled = 0;
        for peer in peers.iter_mut() {
            handled += peer.session.process_pending().await;
        }
        if handled == 0 {
            break;
        }
    }
}
