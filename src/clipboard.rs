//! Clipboard image detection.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use resvg::tiny_skia::{IntSize, Pixmap};
use tracing::{debug, warn};

use crate::Error;

/// Raw RGBA image read from the clipboard.
#[derive(Clone, Debug)]
pub struct ClipboardImage {
    pub width: u32,
    pub height: u32,
    /// Non-premultiplied RGBA8 pixel data.
    pub bytes: Vec<u8>,
}

impl ClipboardImage {
    /// Convert to a premultiplied pixmap.
    fn into_pixmap(self) -> Option<Pixmap> {
        let size = IntSize::from_wh(self.width, self.height)?;

        let mut data = self.bytes;
        for pixel in data.chunks_exact_mut(4) {
            let alpha = pixel[3] as u16;
            for channel in &mut pixel[..3] {
                *channel = (*channel as u16 * alpha / 255) as u8;
            }
        }

        Pixmap::from_vec(data, size)
    }

    fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.width.hash(&mut hasher);
        self.height.hash(&mut hasher);
        self.bytes.hash(&mut hasher);
        hasher.finish()
    }
}

/// Clipboard backend.
pub trait ClipboardSource {
    /// Get the current clipboard image, if there is one.
    fn image(&mut self) -> Result<Option<ClipboardImage>, Error>;
}

impl ClipboardSource for arboard::Clipboard {
    fn image(&mut self) -> Result<Option<ClipboardImage>, Error> {
        match self.get_image() {
            Ok(image) => Ok(Some(ClipboardImage {
                width: image.width as u32,
                height: image.height as u32,
                bytes: image.bytes.into_owned(),
            })),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Detect new images on the clipboard.
pub struct ClipboardWatcher {
    source: Box<dyn ClipboardSource>,
    last_trigger: Option<Instant>,
    last_digest: Option<u64>,
}

impl ClipboardWatcher {
    pub fn new(source: Box<dyn ClipboardSource>) -> Self {
        Self { source, last_trigger: None, last_digest: None }
    }

    /// Connect to the system clipboard.
    pub fn system() -> Result<Self, Error> {
        Ok(Self::new(Box::new(arboard::Clipboard::new()?)))
    }

    /// Check the clipboard for an image that wasn't seen before.
    ///
    /// Images arriving less than `cooldown` after the last one are ignored.
    pub fn poll(&mut self, now: Instant, cooldown: Duration) -> Option<Pixmap> {
        let image = match self.source.image() {
            Ok(Some(image)) => image,
            Ok(None) => {
                // Copying the same image again should trigger again.
                self.last_digest = None;
                return None;
            },
            Err(err) => {
                warn!("Failed to read clipboard: {err}");
                return None;
            },
        };

        let digest = image.digest();
        if self.last_digest == Some(digest) {
            return None;
        }
        self.last_digest = Some(digest);

        let since_trigger = self.last_trigger.map(|last| now.saturating_duration_since(last));
        if since_trigger.is_some_and(|elapsed| elapsed < cooldown) {
            debug!("Ignoring clipboard image during cooldown");
            return None;
        }

        let (width, height) = (image.width, image.height);
        let pixmap = image.into_pixmap();
        match &pixmap {
            Some(_) => {
                debug!("New {width}x{height} clipboard image");
                self.last_trigger = Some(now);
            },
            None => warn!("Invalid {width}x{height} clipboard image"),
        }

        pixmap
    }
}
