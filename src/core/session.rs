//! Session state: the aggregate the orchestrator reads and mutates, plus
//! snapshot persistence.
//!
//! A session owns the logo, asset library, palette book, canvas shape and
//! state, the conversation log, and the latest error slot. A run-state
//! machine guards against reentrant orchestration: only one run may be
//! active at a time and new submissions are rejected while one is in
//! flight.
//!
//! Snapshots persist as a single JSON blob at a fixed path under the
//! platform data directory. Conversation turns are stripped of image
//! attachments on save; images round-trip only through the canvas fields.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::assets::{AssetLibrary, ImageAsset};
use crate::core::canvas::{default_shape, CanvasShape, CanvasState};
use crate::core::message::Message;
use crate::core::palette::{Palette, PaletteBook};

const SESSION_FILE: &str = "session.json";

const GREETING: &str = "Hello! I'm your AI graphic designer. To get started, please upload your \
logo, select a color palette and design type. You can also upload reusable brand assets. Then, \
tell me what you'd like to create!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
}

/// A run was requested while another one is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunInProgress;

impl std::fmt::Display for RunInProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a design operation is already in progress")
    }
}

impl std::error::Error for RunInProgress {}

pub struct SessionContext {
    pub logo: Option<ImageAsset>,
    pub assets: AssetLibrary,
    pub palettes: PaletteBook,
    pub shape: CanvasShape,
    pub canvas: CanvasState,
    pub conversation: Vec<Message>,
    pub last_error: Option<String>,
    run_state: RunState,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            logo: None,
            assets: AssetLibrary::new(),
            palettes: PaletteBook::new(),
            shape: default_shape(),
            canvas: CanvasState::default(),
            conversation: vec![Message::model(GREETING)],
            last_error: None,
            run_state: RunState::Idle,
        }
    }

    /// Enter the Running state, rejecting the request if a run is already
    /// active. The caller must pair this with [`finish_run`](Self::finish_run)
    /// on every path.
    pub fn try_begin_run(&mut self) -> Result<(), RunInProgress> {
        match self.run_state {
            RunState::Running => Err(RunInProgress),
            RunState::Idle => {
                self.run_state = RunState::Running;
                Ok(())
            }
        }
    }

    pub fn finish_run(&mut self) {
        self.run_state = RunState::Idle;
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn push(&mut self, message: Message) {
        self.conversation.push(message);
    }

    /// Set the logo: it becomes the canvas image, any carousel in progress
    /// is dropped, and the exchange is acknowledged in the log.
    pub fn set_logo(&mut self, asset: ImageAsset) {
        self.canvas.current_image = Some(asset.image.clone());
        self.canvas.clear_slides();
        self.logo = Some(asset);
        self.push(Message::user("I've uploaded my logo."));
        self.push(Message::model(
            "Great! Your logo is loaded. What should we create today?",
        ));
    }

    /// Add a brand asset; duplicate names are rejected silently.
    pub fn upload_asset(&mut self, asset: ImageAsset) -> bool {
        self.assets.add(asset)
    }

    pub fn delete_asset(&mut self, name: &str) -> bool {
        self.assets.remove(name)
    }

    pub fn select_palette(&mut self, name: &str) -> bool {
        if !self.palettes.select(name) {
            return false;
        }
        let chosen = self.palettes.selected().name.clone();
        self.push(Message::user(format!(
            "I've selected the '{chosen}' color palette."
        )));
        self.push(Message::model("Excellent color choice! The palette is set."));
        true
    }

    /// Install a palette extracted from a user image and select it.
    pub fn apply_extracted_palette(&mut self, source_name: &str, colors: Vec<String>) {
        let palette = Palette::new(format!("Custom - {source_name}"), colors);
        self.palettes.add_extracted(palette);
        self.push(Message::model(
            "I've created a new palette from your image! I've selected it for you.",
        ));
    }

    /// Switch the canvas shape by name. Clears any in-progress carousel.
    pub fn set_shape(&mut self, shape: CanvasShape) {
        self.canvas.clear_slides();
        self.push(Message::user(format!(
            "I've selected the '{}' design type.",
            shape.name
        )));
        self.push(Message::model(format!(
            "Perfect! The canvas is now set for a {}.",
            shape.name
        )));
        self.shape = shape;
    }

    /// Reset the canvas for a fresh design: back to the logo (or empty),
    /// default shape, first palette.
    pub fn new_design(&mut self) {
        self.canvas.current_image = self.logo.as_ref().map(|l| l.image.clone());
        self.canvas.clear_slides();
        self.shape = default_shape();
        self.palettes.select_first();
        self.push(Message::model(
            "Let's start a new design. The canvas has been cleared.",
        ));
    }

    pub fn select_slide(&mut self, index: usize) -> bool {
        self.canvas.select_slide(index)
    }

    /// Decode the canvas image into a timestamped download.
    pub fn export_current(&self) -> Result<(String, Vec<u8>), Box<dyn std::error::Error>> {
        let image = self
            .canvas
            .current_image
            .as_ref()
            .ok_or("There is no image to download.")?;
        let bytes = image.decode()?;
        let filename = format!("design-{}.png", chrono::Utc::now().timestamp_millis());
        Ok((filename, bytes))
    }

    /// The persistable view of this session. Conversation image attachments
    /// are stripped here.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            logo: self.logo.clone(),
            assets: self.assets.clone(),
            palettes: self.palettes.clone(),
            shape: self.shape.clone(),
            canvas: self.canvas.clone(),
            conversation: self.conversation.iter().map(|m| m.without_images()).collect(),
        }
    }

    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.logo = snapshot.logo;
        self.assets = snapshot.assets;
        self.palettes = snapshot.palettes;
        self.shape = snapshot.shape;
        self.canvas = snapshot.canvas;
        self.conversation = snapshot.conversation;
        self.last_error = None;
        self.run_state = RunState::Idle;
    }

    pub fn save(&self) -> Result<PathBuf, SessionStoreError> {
        let path = default_session_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), SessionStoreError> {
        let write_err = |source| SessionStoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let contents = serde_json::to_vec_pretty(&self.snapshot()).map_err(|source| {
            SessionStoreError::Encode {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(write_err)?;
        temp_file.write_all(&contents).map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;
        temp_file.persist(path).map_err(|err| write_err(err.error))?;
        Ok(())
    }

    pub fn load(&mut self) -> Result<PathBuf, SessionStoreError> {
        let path = default_session_path();
        self.load_from_path(&path)?;
        Ok(path)
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), SessionStoreError> {
        if !path.exists() {
            return Err(SessionStoreError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path).map_err(|source| SessionStoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: SessionSnapshot =
            serde_json::from_str(&contents).map_err(|source| SessionStoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        self.restore(snapshot);
        Ok(())
    }
}

/// The unit of save/load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub logo: Option<ImageAsset>,
    pub assets: AssetLibrary,
    pub palettes: PaletteBook,
    pub shape: CanvasShape,
    pub canvas: CanvasState,
    pub conversation: Vec<Message>,
}

pub fn default_session_path() -> PathBuf {
    match ProjectDirs::from("org", "maquette", "maquette") {
        Some(dirs) => dirs.data_dir().join(SESSION_FILE),
        None => PathBuf::from(SESSION_FILE),
    }
}

/// Errors from saving or loading a session snapshot.
#[derive(Debug)]
pub enum SessionStoreError {
    /// No saved session exists at the path.
    NotFound { path: PathBuf },

    /// Failed to read the session file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the session file to disk.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The session could not be serialized.
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The saved blob is not a valid session snapshot.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStoreError::NotFound { path } => {
                write!(f, "No saved design found at {}", path.display())
            }
            SessionStoreError::Read { path, source } => {
                write!(f, "Failed to read session at {}: {}", path.display(), source)
            }
            SessionStoreError::Write { path, source } => {
                write!(f, "Failed to save session at {}: {}", path.display(), source)
            }
            SessionStoreError::Encode { path, source } => {
                write!(f, "Failed to encode session for {}: {}", path.display(), source)
            }
            SessionStoreError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to load session at {}: data may be corrupt ({})",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for SessionStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionStoreError::NotFound { .. } => None,
            SessionStoreError::Read { source, .. } | SessionStoreError::Write { source, .. } => {
                Some(source)
            }
            SessionStoreError::Encode { source, .. } | SessionStoreError::Parse { source, .. } => {
                Some(source)
            }
        }
    }
}
