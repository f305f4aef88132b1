/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

/// Identifier the directory uses for the host's own record, on every peer.
pub const HOST_PEER_ID: &str = "host";

/// Strongly typed peer identifier.
///
/// Members are keyed by their transport-level id; the host is always keyed as
/// [`HOST_PEER_ID`] so that members can address it without knowing its
/// rendezvous address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn host() -> Self {
        Self(HOST_PEER_ID.to_string())
    }

    pub fn is_host(&self) -> bool {
        self.0 == HOST_PEER_ID
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::ops::Deref for PeerId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a musical part inside the shared artifact.
pub type TrackId = u32;

/// Milliseconds since the Unix epoch on the local wall clock.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
