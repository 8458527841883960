//! File reference notes.

use std::path::{Path, PathBuf};
use std::{env, io};

use resvg::tiny_skia::Pixmap;

use crate::config::Gesture;
use crate::geometry::Size;
use crate::note::{
    DragPayloadProvider, NoteContent, PayloadError, PayloadFormat, Snapshot, placeholder,
};

/// Note referencing a file on disk.
pub struct PathNote {
    path: PathBuf,
    size: Option<Size>,
    rendering: Option<Pixmap>,
}

impl PathNote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), size: None, rendering: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store the rendering produced by the file detail layout.
    pub fn set_rendering(&mut self, rendering: Pixmap) {
        self.rendering = Some(rendering);
    }

    fn absolute_path(&self) -> io::Result<PathBuf> {
        if self.path.is_absolute() {
            Ok(self.path.clone())
        } else {
            Ok(env::current_dir()?.join(&self.path))
        }
    }
}

impl DragPayloadProvider for PathNote {
    fn drag_formats(&mut self) -> Result<Vec<PayloadFormat>, PayloadError> {
        if !self.path.exists() {
            return Err(PayloadError::MissingPath(self.path.clone()));
        }

        let absolute = self.absolute_path()?;
        let mut formats = vec![PayloadFormat::Text(absolute.to_string_lossy().into_owned())];
        if let Some(rendering) = self.snapshot() {
            formats.push(PayloadFormat::Bitmap(rendering));
        }
        formats.push(PayloadFormat::Files(vec![self.path.clone()]));

        Ok(formats)
    }
}

impl Snapshot for PathNote {
    fn snapshot(&mut self) -> Option<Pixmap> {
        if self.rendering.is_none() {
            self.rendering = placeholder(self.size?);
        }
        self.rendering.clone()
    }
}

impl NoteContent for PathNote {
    fn natural_size(&self, gesture: &Gesture) -> Size {
        Size::new(gesture.max_width as u32, gesture.max_height as u32 / 3 * 2)
    }

    fn kind(&self) -> &'static str {
        "path"
    }

    fn layout(&mut self, size: Size) {
        self.size = Some(size);
    }
}
