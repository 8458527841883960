//! Registry of all live notes.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use resvg::tiny_skia::Pixmap;
use tracing::{debug, info, warn};

use crate::Error;
use crate::config::Config;
use crate::geometry::{Point, Rect};
use crate::note::{ImageNote, NoteContent, NoteId, PathNote, PayloadFormat, TextNote};
use crate::platform::{DropEffect, Platform, ShelfSurface};
use crate::shelf::{Shelf, ShelfDrop};
use crate::window::{Context, FloatingWindow, NoteEvent, Phase};

/// Owner of all note windows and the shelf.
pub struct WindowManager {
    windows: Vec<FloatingWindow>,
    shelf: Shelf,
    config: Config,
    events: VecDeque<NoteEvent>,
}

impl WindowManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            windows: Default::default(),
            shelf: Default::default(),
            events: Default::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Apply a new configuration to all future ticks.
    pub fn update_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn shelf(&self) -> &Shelf {
        &self.shelf
    }

    /// Attach the native shelf tray.
    pub fn attach_shelf(&mut self, surface: Box<dyn ShelfSurface>) {
        self.shelf.attach(surface);
    }

    pub fn toggle_shelf(&mut self) {
        self.shelf.toggle();
    }

    /// Show a new note at the bottom-right of the primary screen.
    pub fn spawn(
        &mut self,
        platform: &mut dyn Platform,
        content: Box<dyn NoteContent>,
    ) -> Result<NoteId, Error> {
        let size = content.natural_size(&self.config.gesture);
        let area = platform.primary_usable_bounds();
        let margin = self.config.gesture.screen_margin as i32;
        let x = area.right() - margin - size.width as i32;
        let y = area.bottom() - margin - size.height as i32;
        let bounds = Rect { origin: Point::new(x, y), size };

        self.spawn_at(platform, NoteId::new(), content, bounds)
    }

    pub fn spawn_image(
        &mut self,
        platform: &mut dyn Platform,
        image: Pixmap,
    ) -> Result<NoteId, Error> {
        self.spawn(platform, Box::new(ImageNote::new(image)))
    }

    pub fn spawn_text(
        &mut self,
        platform: &mut dyn Platform,
        text: impl Into<String>,
    ) -> Result<NoteId, Error> {
        self.spawn(platform, Box::new(TextNote::new(text)))
    }

    pub fn spawn_path(
        &mut self,
        platform: &mut dyn Platform,
        path: impl Into<PathBuf>,
    ) -> Result<NoteId, Error> {
        self.spawn(platform, Box::new(PathNote::new(path)))
    }

    fn spawn_at(
        &mut self,
        platform: &mut dyn Platform,
        id: NoteId,
        content: Box<dyn NoteContent>,
        bounds: Rect,
    ) -> Result<NoteId, Error> {
        let surface = platform.create_surface(id)?;
        let mut window =
            FloatingWindow::new(id, content, surface, bounds, &self.config, platform.now());
        self.events.extend(window.take_events());
        self.windows.push(window);
        Ok(id)
    }

    pub fn window(&self, id: NoteId) -> Option<&FloatingWindow> {
        self.windows.iter().find(|window| window.id() == id)
    }

    pub fn window_mut(&mut self, id: NoteId) -> Option<&mut FloatingWindow> {
        self.windows.iter_mut().find(|window| window.id() == id)
    }

    pub fn windows(&self) -> impl Iterator<Item = &FloatingWindow> {
        self.windows.iter()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn pointer_down(&mut self, platform: &mut dyn Platform, id: NoteId) -> bool {
        self.with_window(platform, id, |window, cx| window.pointer_down(cx))
    }

    pub fn pointer_motion(&mut self, id: NoteId, time: Instant, position: Point) {
        if let Some(window) = self.window_mut(id) {
            window.pointer_motion(time, position);
        }
    }

    pub fn pointer_up(&mut self, platform: &mut dyn Platform, id: NoteId) -> bool {
        self.with_window(platform, id, |window, cx| window.pointer_up(cx))
    }

    pub fn toggle_pin(&mut self, platform: &mut dyn Platform, id: NoteId) -> bool {
        self.with_window(platform, id, |window, cx| {
            window.toggle_pin(cx.config, cx.platform.now())
        })
    }

    /// Close a single note.
    pub fn close(&mut self, id: NoteId) -> bool {
        let Some(window) = self.window_mut(id) else {
            return false;
        };
        window.close();

        self.collect_events();
        self.prune();
        true
    }

    pub fn close_all(&mut self) {
        info!("Closing all {} notes", self.windows.len());

        for window in &mut self.windows {
            window.close();
        }

        self.collect_events();
        self.prune();
    }

    /// Temporarily hide all notes on screen.
    pub fn hide_all(&mut self) {
        for window in &mut self.windows {
            window.set_visible(false);
        }
    }

    /// Reveal all notes hidden by [`Self::hide_all`].
    ///
    /// Notes parked on the shelf stay hidden.
    pub fn show_all(&mut self) {
        for window in self.windows.iter_mut().filter(|window| window.phase() != Phase::Hidden) {
            window.set_visible(true);
        }
    }

    /// Take a note off the shelf and start dragging it.
    ///
    /// If the note's window is gone, a new image note is created from the
    /// shelf thumbnail. Returns `false` if the ID is unknown.
    pub fn restore_from_shelf(
        &mut self,
        platform: &mut dyn Platform,
        id: NoteId,
        cursor: Point,
        item_bounds: Rect,
    ) -> Result<bool, Error> {
        let item = self.shelf.take(id);

        let woken = self.with_window(platform, id, |window, cx| {
            window.wake_from_shelf(cx, cursor, item_bounds)
        });
        if woken {
            return Ok(true);
        }

        let Some(item) = item else {
            debug!("Ignoring restore of unknown note {id}");
            return Ok(false);
        };

        info!("Recreating closed note {id} from its shelf thumbnail");

        let content = ImageNote::new(item.thumbnail);
        let size = content.natural_size(&self.config.gesture);
        let bounds = Rect { origin: item_bounds.origin, size };
        self.spawn_at(platform, id, Box::new(content), bounds)?;

        Ok(self.with_window(platform, id, |window, cx| {
            window.wake_from_shelf(cx, cursor, item_bounds)
        }))
    }

    /// Accept a native drop onto the shelf tray.
    pub fn shelf_drop(
        &mut self,
        platform: &mut dyn Platform,
        data: ShelfDrop,
    ) -> Result<DropEffect, Error> {
        // Our own notes are parked under their ID, never copied.
        if let Some(id) = data.source {
            let thumbnail = match data.bitmap() {
                Some(bitmap) => Some(bitmap.clone()),
                None => self.window_mut(id).and_then(|window| window.content_mut().snapshot()),
            };

            let Some(thumbnail) = thumbnail else {
                debug!("Rejecting drop of note {id} without thumbnail");
                return Ok(DropEffect::None);
            };

            self.shelf.deposit(id, thumbnail);
            return Ok(DropEffect::Move);
        }

        if let Some(bitmap) = data.bitmap() {
            self.shelf.deposit(NoteId::new(), bitmap.clone());
            return Ok(DropEffect::Move);
        }

        let mut effect = DropEffect::None;
        for format in &data.formats {
            match format {
                PayloadFormat::Files(paths) => {
                    for path in paths.iter().filter(|path| is_png(path)) {
                        match Pixmap::load_png(path) {
                            Ok(image) => {
                                self.shelf.deposit(NoteId::new(), image);
                                effect = DropEffect::Move;
                            },
                            Err(err) => warn!("Skipping dropped image {path:?}: {err}"),
                        }
                    }
                },
                PayloadFormat::Text(text) if effect == DropEffect::None => {
                    self.shelve_text(platform, text.clone())?;
                    effect = DropEffect::Copy;
                },
                _ => (),
            }
        }

        Ok(effect)
    }

    /// Create a note for dropped text directly on the shelf.
    fn shelve_text(&mut self, platform: &mut dyn Platform, text: String) -> Result<(), Error> {
        let id = self.spawn_text(platform, text)?;
        let Some(window) = self.windows.iter_mut().find(|window| window.id() == id) else {
            return Ok(());
        };

        window.hide();
        if let Some(thumbnail) = window.content_mut().snapshot() {
            self.shelf.deposit(id, thumbnail);
            self.events.push_back(NoteEvent::Shelved(id));
        }

        Ok(())
    }

    /// Advance all notes by one clock tick.
    pub fn tick(&mut self, platform: &mut dyn Platform) {
        let mut cx = Context { platform, shelf: &mut self.shelf, config: &self.config };
        for window in &mut self.windows {
            window.tick(&mut cx);
        }

        self.collect_events();
        self.prune();
    }

    /// Check whether any note needs the animation clock.
    pub fn is_animating(&self) -> bool {
        self.windows.iter().any(|window| window.is_animating())
    }

    /// Next instant the clock has to fire at.
    pub fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        if self.is_animating() {
            return Some(now + self.config.animation.tick_interval());
        }

        self.windows.iter().filter_map(|window| window.lifetime_deadline()).min()
    }

    /// Take all queued lifecycle events.
    pub fn drain_events(&mut self) -> impl Iterator<Item = NoteEvent> + '_ {
        self.events.drain(..)
    }

    /// Run an operation on a single window.
    fn with_window(
        &mut self,
        platform: &mut dyn Platform,
        id: NoteId,
        f: impl FnOnce(&mut FloatingWindow, &mut Context<'_>),
    ) -> bool {
        let Some(window) = self.windows.iter_mut().find(|window| window.id() == id) else {
            return false;
        };

        let mut cx = Context { platform, shelf: &mut self.shelf, config: &self.config };
        f(window, &mut cx);
        self.events.extend(window.take_events());

        true
    }

    fn collect_events(&mut self) {
        for window in &mut self.windows {
            self.events.extend(window.take_events());
        }
    }

    /// Forget windows whose native surface is gone.
    fn prune(&mut self) {
        self.windows.retain(|window| !window.is_closed());
    }
}

fn is_png(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("png"))
}
