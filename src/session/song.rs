use std::path::Path;

use tracing::{debug, info, warn};

use super::{BandSession, SelectedSong};
use crate::{
    media::filename_of,
    protocol::{MediaPayload, WireMessage},
};

impl BandSession {
    /// Host side: make the song at `path` the room's song and ship it to
    /// every member. A file that cannot be read is still selected; members
    /// then need their own copy.
    pub async fn select_song(&mut self, name: &str, path: &Path) {
        if !self.is_host() {
            return;
        }

        let display = path.to_string_lossy();
        let filename = filename_of(&display).to_string();
        let payload = match self.media.read_encoded(path).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };

        self.song = Some(SelectedSong {
            name: name.to_string(),
            filename: filename.clone(),
            path: Some(path.to_path_buf()),
            payload: payload.clone(),
            pending: false,
        });
        self.reset_ready_gate();

        // The previous song's tracks are meaningless for this one.
        match self.inspector.extract_tracks(path).await {
            Ok(tracks) => self.set_available_tracks(tracks),
            Err(e) => {
                warn!("{}", e);
                self.set_available_tracks(Vec::new());
            }
        }

        info!("Selected {} ({})", name, filename);
        self.broadcast(
            &WireMessage::SongSelect {
                name: name.to_string(),
                filename: filename.clone(),
            },
            None,
        );
        if let Some(payload) = payload {
            self.broadcast(
                &WireMessage::SongData {
                    filename,
                    file_data: payload,
                },
                None,
            );
        }
    }

    /// Member side: use a local copy when there is one, otherwise wait for
    /// the host's `song_data`.
    pub(super) async fn on_song_select(&mut self, name: String, filename: String) {
        self.my_ready = false;

        let song = match self.media.exists_locally(&filename).await {
            Some(path) => {
                debug!("Using local copy {}", path.display());
                SelectedSong {
                    name,
                    filename,
                    path: Some(path),
                    payload: None,
                    pending: false,
                }
            }
            None => {
                debug!("{} not found locally, waiting for transfer", filename);
                SelectedSong {
                    name,
                    filename,
                    path: None,
                    payload: None,
                    pending: true,
                }
            }
        };
        self.song = Some(song);
    }

    /// Member side: keep the transferred file and point the song at it.
    pub(super) async fn on_song_data(&mut self, filename: String, payload: MediaPayload) {
        let path = match self.media.persist_temporary(&filename, &payload).await {
            Ok(path) => path,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };
        debug!("Saved {} to {}", filename, path.display());

        match self.song.as_mut() {
            Some(song) => {
                song.path = Some(path);
                song.pending = false;
            }
            None => {
                self.song = Some(SelectedSong {
                    name: filename.clone(),
                    filename,
                    path: Some(path),
                    payload: None,
                    pending: false,
                });
            }
        }
    }
}
