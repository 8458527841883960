//! Note payloads and their capabilities.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::{env, io};

use resvg::tiny_skia::Pixmap;
use uuid::Uuid;

use crate::config::Gesture;
use crate::geometry::Size;

pub use crate::note::image::ImageNote;
pub use crate::note::path::PathNote;
pub use crate::note::text::TextNote;

mod image;
mod path;
mod text;

/// Background color used for notes without a host rendering.
const PLACEHOLDER_RGB: (u8, u8, u8) = (39, 41, 42);

/// Unique identifier of a note, stable for its entire lifetime.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NoteId(Uuid);

impl NoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Produce the data carried out of the application by a drag-out gesture.
pub trait DragPayloadProvider {
    /// Materialize all payload formats for a native drag.
    ///
    /// This may persist temporary files.
    fn drag_formats(&mut self) -> Result<Vec<PayloadFormat>, PayloadError>;
}

/// Produce a thumbnail of the note.
pub trait Snapshot {
    /// Get the note's current rendering.
    ///
    /// Repeated calls return the same image until the content is edited.
    fn snapshot(&mut self) -> Option<Pixmap>;
}

/// Capability set of one note kind.
pub trait NoteContent: DragPayloadProvider + Snapshot {
    /// Size of the note's window at 100% scale.
    fn natural_size(&self, gesture: &Gesture) -> Size;

    /// Short label used in logs.
    fn kind(&self) -> &'static str;

    /// Inform the note about the size it was laid out at.
    fn layout(&mut self, _size: Size) {}
}

/// Native drag payload of a note.
#[derive(Clone, Debug)]
pub struct DragPayload {
    /// Note the payload originates from.
    pub source: NoteId,
    pub formats: Vec<PayloadFormat>,
}

impl DragPayload {
    /// Ask a note for its drag payload, tagging it with the note's ID.
    pub fn materialize(
        source: NoteId,
        provider: &mut dyn DragPayloadProvider,
    ) -> Result<Self, PayloadError> {
        let formats = provider.drag_formats()?;
        if formats.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(Self { source, formats })
    }

    /// Get the first bitmap format.
    pub fn bitmap(&self) -> Option<&Pixmap> {
        self.formats.iter().find_map(|format| match format {
            PayloadFormat::Bitmap(pixmap) => Some(pixmap),
            _ => None,
        })
    }
}

/// Single data format of a drag payload.
#[derive(Clone, Debug)]
pub enum PayloadFormat {
    /// Files for file managers and upload targets.
    Files(Vec<PathBuf>),
    /// Image data for image editors.
    Bitmap(Pixmap),
    /// Unicode text for text fields.
    Text(String),
}

/// Drag payload materialization failure.
#[derive(thiserror::Error, Debug)]
pub enum PayloadError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("png encoding failed: {0}")]
    Encode(String),
    #[error("path {0:?} does not exist")]
    MissingPath(PathBuf),
    #[error("note has no drag payload")]
    Empty,
}

/// Get a unique path for a temporary drag artifact.
fn temp_artifact(extension: &str) -> PathBuf {
    env::temp_dir().join(format!("clipnote_{}.{extension}", Uuid::new_v4().simple()))
}

/// Solid tile used as snapshot until a real rendering is available.
fn placeholder(size: Size) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(size.width, size.height)?;
    let (r, g, b) = PLACEHOLDER_RGB;
    pixmap.fill(resvg::tiny_skia::Color::from_rgba8(r, g, b, 255));
    Some(pixmap)
}
