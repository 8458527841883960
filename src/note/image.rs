//! Screenshot notes.

use std::fs;

use resvg::tiny_skia::Pixmap;
use tracing::debug;

use crate::config::Gesture;
use crate::geometry::Size;
use crate::note::{
    DragPayloadProvider, NoteContent, PayloadError, PayloadFormat, Snapshot, temp_artifact,
};

/// Note displaying a bitmap.
pub struct ImageNote {
    image: Pixmap,
}

impl ImageNote {
    pub fn new(image: Pixmap) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &Pixmap {
        &self.image
    }
}

impl DragPayloadProvider for ImageNote {
    fn drag_formats(&mut self) -> Result<Vec<PayloadFormat>, PayloadError> {
        let png = self.image.encode_png().map_err(|err| PayloadError::Encode(err.to_string()))?;

        let path = temp_artifact("png");
        fs::write(&path, png)?;
        debug!("Persisted drag image to {path:?}");

        Ok(vec![PayloadFormat::Files(vec![path]), PayloadFormat::Bitmap(self.image.clone())])
    }
}

impl Snapshot for ImageNote {
    fn snapshot(&mut self) -> Option<Pixmap> {
        Some(self.image.clone())
    }
}

impl NoteContent for ImageNote {
    /// Fit the image into the maximum note size, preserving its aspect ratio.
    fn natural_size(&self, gesture: &Gesture) -> Size {
        let (width, height) = (self.image.width() as u64, self.image.height() as u64);
        let max_width = gesture.max_width as u64;
        let max_height = gesture.max_height as u64;

        // Slivers still need a visible pixel.
        if height > width {
            Size::new((width * max_height / height).max(1) as u32, max_height as u32)
        } else {
            Size::new(max_width as u32, (height * max_width / width).max(1) as u32)
        }
    }

    fn kind(&self) -> &'static str {
        "image"
    }
}
