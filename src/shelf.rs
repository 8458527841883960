//! Tray collecting parked notes.

use resvg::tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::geometry::Point;
use crate::note::{NoteId, PayloadFormat, Snapshot};
use crate::platform::ShelfSurface;

/// Parked note.
#[derive(Clone, Debug)]
pub struct ShelfItem {
    pub source: NoteId,
    pub thumbnail: Pixmap,
}

/// Collection of parked notes and the tray window showing them.
#[derive(Default)]
pub struct Shelf {
    items: Vec<ShelfItem>,
    surface: Option<Box<dyn ShelfSurface>>,
}

impl Shelf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the tray window, showing all items already collected.
    pub fn attach(&mut self, mut surface: Box<dyn ShelfSurface>) {
        for item in &self.items {
            surface.show_item(item.source, &item.thumbnail);
        }
        self.surface = Some(surface);
    }

    /// Check whether the tray currently accepts notes.
    pub fn is_receiving(&self) -> bool {
        self.surface.as_ref().is_some_and(|surface| surface.is_visible() && !surface.is_disposed())
    }

    /// Toggle tray visibility.
    pub fn toggle(&mut self) {
        if let Some(surface) = self.surface.as_mut().filter(|surface| !surface.is_disposed()) {
            let visible = !surface.is_visible();
            surface.set_visible(visible);
            debug!("Shelf visible: {visible}");
        }
    }

    /// Park a note if `cursor` is over the visible tray.
    ///
    /// Returns `false` without side effects if the note was not accepted.
    pub fn try_deposit(
        &mut self,
        source: NoteId,
        cursor: Point,
        snapshot: &mut dyn Snapshot,
    ) -> bool {
        let over_shelf = self.is_receiving()
            && self.surface.as_ref().is_some_and(|surface| surface.bounds().contains(cursor));
        if !over_shelf {
            return false;
        }

        match snapshot.snapshot() {
            Some(thumbnail) => {
                self.deposit(source, thumbnail);
                true
            },
            None => false,
        }
    }

    /// Store a thumbnail, replacing any previous item of the same note.
    pub fn deposit(&mut self, source: NoteId, thumbnail: Pixmap) {
        match self.items.iter_mut().find(|item| item.source == source) {
            Some(item) => item.thumbnail = thumbnail,
            None => self.items.push(ShelfItem { source, thumbnail }),
        }

        if let Some(surface) = &mut self.surface {
            if let Some(item) = self.items.iter().find(|item| item.source == source) {
                surface.show_item(source, &item.thumbnail);
            }
        }

        info!("Parked note {source} on the shelf");
    }

    /// Remove a parked note.
    pub fn take(&mut self, source: NoteId) -> Option<ShelfItem> {
        let index = self.items.iter().position(|item| item.source == source)?;
        let item = self.items.remove(index);

        if let Some(surface) = &mut self.surface {
            surface.remove_item(source);
        }

        Some(item)
    }

    pub fn get(&self, source: NoteId) -> Option<&ShelfItem> {
        self.items.iter().find(|item| item.source == source)
    }

    pub fn items(&self) -> &[ShelfItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Data dropped onto the tray by a native drag.
#[derive(Clone, Debug)]
pub struct ShelfDrop {
    /// Note the drag originated from, if it is one of ours.
    pub source: Option<NoteId>,
    pub formats: Vec<PayloadFormat>,
}

impl ShelfDrop {
    pub fn bitmap(&self) -> Option<&Pixmap> {
        self.formats.iter().find_map(|format| match format {
            PayloadFormat::Bitmap(pixmap) => Some(pixmap),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::testing::FakeShelfSurface;

    struct Thumbnail(Option<Pixmap>);

    impl Snapshot for Thumbnail {
        fn snapshot(&mut self) -> Option<Pixmap> {
            self.0.clone()
        }
    }

    fn thumbnail() -> Thumbnail {
        Thumbnail(Pixmap::new(4, 4))
    }

    fn visible_shelf() -> (Shelf, FakeShelfSurface) {
        let surface = FakeShelfSurface::new(Rect::new(1600, 600, 290, 400));
        let mut shelf = Shelf::new();
        shelf.attach(Box::new(surface.clone()));
        (shelf, surface)
    }

    #[test]
    fn deposit_inside_bounds() {
        let (mut shelf, surface) = visible_shelf();
        let id = NoteId::new();

        assert!(shelf.try_deposit(id, Point::new(1700, 700), &mut thumbnail()));
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf.items()[0].source, id);
        assert_eq!(surface.state().items, vec![id]);
    }

    #[test]
    fn outside_bounds_has_no_side_effects() {
        let (mut shelf, surface) = visible_shelf();
        assert!(!shelf.try_deposit(NoteId::new(), Point::new(10, 10), &mut thumbnail()));
        assert!(shelf.is_empty());
        assert!(surface.state().items.is_empty());
    }

    #[test]
    fn hidden_or_disposed_shelf_rejects() {
        let (mut shelf, surface) = visible_shelf();
        let cursor = Point::new(1700, 700);

        surface.state_mut().visible = false;
        assert!(!shelf.try_deposit(NoteId::new(), cursor, &mut thumbnail()));

        surface.state_mut().visible = true;
        surface.state_mut().disposed = true;
        assert!(!shelf.try_deposit(NoteId::new(), cursor, &mut thumbnail()));

        assert!(!Shelf::new().try_deposit(NoteId::new(), cursor, &mut thumbnail()));
    }

    #[test]
    fn missing_thumbnail_is_rejected() {
        let (mut shelf, _surface) = visible_shelf();
        let mut empty = Thumbnail(None);
        assert!(!shelf.try_deposit(NoteId::new(), Point::new(1700, 700), &mut empty));
        assert!(shelf.is_empty());
    }

    #[test]
    fn same_id_is_not_duplicated() {
        let (mut shelf, _surface) = visible_shelf();
        let id = NoteId::new();

        shelf.deposit(id, Pixmap::new(4, 4).unwrap());
        shelf.deposit(id, Pixmap::new(8, 8).unwrap());

        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf.get(id).map(|item| item.thumbnail.width()), Some(8));
    }

    #[test]
    fn take_removes_item() {
        let (mut shelf, surface) = visible_shelf();
        let id = NoteId::new();
        shelf.deposit(id, Pixmap::new(4, 4).unwrap());

        assert!(shelf.take(id).is_some());
        assert!(shelf.take(id).is_none());
        assert!(surface.state().items.is_empty());
    }

    #[test]
    fn toggle_flips_visibility() {
        let (mut shelf, surface) = visible_shelf();
        shelf.toggle();
        assert!(!surface.state().visible);
        assert!(!shelf.is_receiving());
        shelf.toggle();
        assert!(shelf.is_receiving());
    }
}
