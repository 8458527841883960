//! Text snippet notes.

use std::fs;

use resvg::tiny_skia::Pixmap;

use crate::config::Gesture;
use crate::geometry::Size;
use crate::note::{
    DragPayloadProvider, NoteContent, PayloadError, PayloadFormat, Snapshot, placeholder,
    temp_artifact,
};

/// Note displaying editable text.
pub struct TextNote {
    text: String,
    size: Option<Size>,
    rendering: Option<Pixmap>,
}

impl TextNote {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), size: None, rendering: None }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text, invalidating the cached rendering.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.rendering = None;
    }

    /// Store the rendering produced by the text layout layer.
    pub fn set_rendering(&mut self, rendering: Pixmap) {
        self.rendering = Some(rendering);
    }
}

impl DragPayloadProvider for TextNote {
    fn drag_formats(&mut self) -> Result<Vec<PayloadFormat>, PayloadError> {
        let mut formats = Vec::new();

        if !self.text.is_empty() {
            formats.push(PayloadFormat::Text(self.text.clone()));
        }

        if let Some(rendering) = self.snapshot() {
            formats.push(PayloadFormat::Bitmap(rendering));
        }

        // File managers and upload targets only accept real files.
        let path = temp_artifact("txt");
        fs::write(&path, &self.text)?;
        formats.push(PayloadFormat::Files(vec![path]));

        Ok(formats)
    }
}

impl Snapshot for TextNote {
    fn snapshot(&mut self) -> Option<Pixmap> {
        if self.rendering.is_none() {
            self.rendering = placeholder(self.size?);
        }
        self.rendering.clone()
    }
}

impl NoteContent for TextNote {
    fn natural_size(&self, gesture: &Gesture) -> Size {
        Size::new(gesture.max_width as u32, gesture.max_height as u32 / 3 * 2)
    }

    fn kind(&self) -> &'static str {
        "text"
    }

    fn layout(&mut self, size: Size) {
        self.size = Some(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_cached_until_edit() {
        let mut note = TextNote::new("hello");
        note.layout(Size::new(30, 20));

        let mut rendering = Pixmap::new(5, 5).unwrap();
        rendering.fill(resvg::tiny_skia::Color::WHITE);
        note.set_rendering(rendering.clone());

        assert_eq!(note.snapshot(), Some(rendering.clone()));
        assert_eq!(note.snapshot(), Some(rendering));

        note.edit("changed");
        let placeholder = note.snapshot().unwrap();
        assert_eq!((placeholder.width(), placeholder.height()), (30, 20));
    }

    #[test]
    fn payload_contains_text_and_file() {
        let mut note = TextNote::new("drag me");
        let formats = note.drag_formats().unwrap();

        assert!(matches!(&formats[0], PayloadFormat::Text(text) if text == "drag me"));
        match &formats[1] {
            PayloadFormat::Files(files) => {
                assert_eq!(fs::read_to_string(&files[0]).unwrap(), "drag me");
                let _ = fs::remove_file(&files[0]);
            },
            format => panic!("unexpected format {format:?}"),
        }
    }

    #[test]
    fn laid_out_payload_carries_bitmap() {
        let mut note = TextNote::new("shelve me");
        note.layout(Size::new(30, 20));

        let formats = note.drag_formats().unwrap();
        let bitmap = formats.iter().find_map(|format| match format {
            PayloadFormat::Bitmap(bitmap) => Some(bitmap),
            _ => None,
        });
        assert_eq!(bitmap.map(|bitmap| (bitmap.width(), bitmap.height())), Some((30, 20)));

        for format in &formats {
            if let PayloadFormat::Files(files) = format {
                let _ = fs::remove_file(&files[0]);
            }
        }
    }

    #[test]
    fn natural_size_is_two_thirds_height() {
        let note = TextNote::new("");
        assert_eq!(note.natural_size(&Gesture::default()), Size::new(300, 200));
    }
}
