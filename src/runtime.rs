//! Event loop integration.
//!
//! All notes share a single clock timer. While any note is animating, it
//! fires at the configured tick interval; otherwise it sleeps until the
//! earliest lifetime deadline, or is removed entirely when there is nothing
//! left to wait for.

use std::path::PathBuf;
use std::time::Instant;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use configory::{Manager as ConfigManager, Options as ConfigOptions};
use resvg::tiny_skia::Pixmap;
use tracing::{debug, error, info, trace};

use crate::Error;
use crate::clipboard::ClipboardWatcher;
use crate::config::{Config, ConfigEventHandler};
use crate::geometry::{Point, Rect};
use crate::manager::WindowManager;
use crate::note::NoteId;
use crate::platform::{DropEffect, Platform, ShelfSurface};
use crate::shelf::ShelfDrop;
use crate::window::NoteEvent;

/// Note manager driven by a calloop event loop.
pub struct Runtime<P: Platform> {
    manager: WindowManager,
    platform: P,

    event_loop: LoopHandle<'static, Self>,
    clock: Option<RegistrationToken>,

    clipboard: Option<ClipboardWatcher>,
    clipboard_poll: Option<RegistrationToken>,

    _config_manager: Option<ConfigManager>,
}

impl<P: Platform + 'static> Runtime<P> {
    /// Create a runtime with the user's configuration file.
    pub fn new(event_loop: &LoopHandle<'static, Self>, platform: P) -> Result<Self, Error> {
        // Initialize configuration state.
        let config_options = ConfigOptions::new("clipnote").notify(true);
        let config_handler = ConfigEventHandler::new(event_loop);
        let config_manager = ConfigManager::with_options(&config_options, config_handler)?;
        let config = config_manager
            .get::<&str, Config>(&[])
            .inspect_err(|err| error!("Config error: {err}"))
            .ok()
            .flatten()
            .unwrap_or_default();

        Ok(Self::from_parts(event_loop, platform, config, Some(config_manager)))
    }

    /// Create a runtime with a fixed configuration.
    pub fn with_config(
        event_loop: &LoopHandle<'static, Self>,
        platform: P,
        config: Config,
    ) -> Self {
        Self::from_parts(event_loop, platform, config, None)
    }

    fn from_parts(
        event_loop: &LoopHandle<'static, Self>,
        platform: P,
        config: Config,
        config_manager: Option<ConfigManager>,
    ) -> Self {
        Self {
            platform,
            manager: WindowManager::new(config),
            event_loop: event_loop.clone(),
            _config_manager: config_manager,
            clipboard_poll: Default::default(),
            clipboard: Default::default(),
            clock: Default::default(),
        }
    }

    pub fn manager(&self) -> &WindowManager {
        &self.manager
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Apply a reloaded configuration.
    pub fn update_config(&mut self, config: Config) {
        if &config == self.manager.config() {
            return;
        }

        info!("Applying new configuration");
        self.manager.update_config(config);
        self.schedule();
    }

    /// Spawn image notes for new clipboard images.
    pub fn watch_clipboard(&mut self, watcher: ClipboardWatcher) -> Result<(), Error> {
        if let Some(token) = self.clipboard_poll.take() {
            self.event_loop.remove(token);
        }

        let token = self
            .event_loop
            .insert_source(Timer::immediate(), |_, _, runtime| runtime.poll_clipboard())?;
        self.clipboard_poll = Some(token);
        self.clipboard = Some(watcher);

        Ok(())
    }

    /// Stop watching the clipboard.
    pub fn unwatch_clipboard(&mut self) {
        if let Some(token) = self.clipboard_poll.take() {
            self.event_loop.remove(token);
        }
        self.clipboard = None;
    }

    pub fn spawn_image(&mut self, image: Pixmap) -> Result<NoteId, Error> {
        let id = self.manager.spawn_image(&mut self.platform, image)?;
        self.schedule();
        Ok(id)
    }

    pub fn spawn_text(&mut self, text: impl Into<String>) -> Result<NoteId, Error> {
        let id = self.manager.spawn_text(&mut self.platform, text)?;
        self.schedule();
        Ok(id)
    }

    pub fn spawn_path(&mut self, path: impl Into<PathBuf>) -> Result<NoteId, Error> {
        let id = self.manager.spawn_path(&mut self.platform, path)?;
        self.schedule();
        Ok(id)
    }

    pub fn pointer_down(&mut self, id: NoteId) {
        if self.manager.pointer_down(&mut self.platform, id) {
            self.schedule();
        }
    }

    pub fn pointer_motion(&mut self, id: NoteId, time: Instant, position: Point) {
        self.manager.pointer_motion(id, time, position);
    }

    pub fn pointer_up(&mut self, id: NoteId) {
        if self.manager.pointer_up(&mut self.platform, id) {
            self.schedule();
        }
    }

    pub fn toggle_pin(&mut self, id: NoteId) {
        if self.manager.toggle_pin(&mut self.platform, id) {
            self.schedule();
        }
    }

    pub fn close(&mut self, id: NoteId) {
        if self.manager.close(id) {
            self.schedule();
        }
    }

    pub fn close_all(&mut self) {
        self.manager.close_all();
        self.schedule();
    }

    pub fn hide_all(&mut self) {
        self.manager.hide_all();
    }

    pub fn show_all(&mut self) {
        self.manager.show_all();
    }

    pub fn attach_shelf(&mut self, surface: Box<dyn ShelfSurface>) {
        self.manager.attach_shelf(surface);
    }

    pub fn toggle_shelf(&mut self) {
        self.manager.toggle_shelf();
    }

    pub fn restore_from_shelf(
        &mut self,
        id: NoteId,
        cursor: Point,
        item_bounds: Rect,
    ) -> Result<bool, Error> {
        let platform = &mut self.platform;
        let restored = self.manager.restore_from_shelf(platform, id, cursor, item_bounds)?;
        self.schedule();
        Ok(restored)
    }

    pub fn shelf_drop(&mut self, data: ShelfDrop) -> Result<DropEffect, Error> {
        let effect = self.manager.shelf_drop(&mut self.platform, data)?;
        self.schedule();
        Ok(effect)
    }

    /// Take all queued lifecycle events.
    pub fn drain_events(&mut self) -> impl Iterator<Item = NoteEvent> + '_ {
        self.manager.drain_events()
    }

    /// Reschedule the clock for the current state of all notes.
    pub fn schedule(&mut self) {
        if let Some(token) = self.clock.take() {
            self.event_loop.remove(token);
        }

        let now = self.platform.now();
        let Some(deadline) = self.manager.next_wakeup(now) else {
            trace!("No pending note updates, stopping clock");
            return;
        };

        let timer = Timer::from_deadline(deadline);
        match self.event_loop.insert_source(timer, |_, _, runtime| runtime.on_clock()) {
            Ok(token) => self.clock = Some(token),
            Err(err) => error!("Failed to schedule note clock: {err}"),
        }
    }

    /// Handle clock timer expiry.
    fn on_clock(&mut self) -> TimeoutAction {
        self.manager.tick(&mut self.platform);

        let now = self.platform.now();
        match self.manager.next_wakeup(now) {
            Some(deadline) => TimeoutAction::ToInstant(deadline),
            None => {
                debug!("All notes at rest, stopping clock");
                self.clock = None;
                TimeoutAction::Drop
            },
        }
    }

    /// Handle clipboard poll timer expiry.
    fn poll_clipboard(&mut self) -> TimeoutAction {
        let clipboard = &self.manager.config().clipboard;
        let (interval, cooldown) = (clipboard.poll_interval(), clipboard.cooldown());

        let Some(watcher) = &mut self.clipboard else {
            self.clipboard_poll = None;
            return TimeoutAction::Drop;
        };

        let now = self.platform.now();
        if let Some(image) = watcher.poll(now, cooldown) {
            if let Err(err) = self.spawn_image(image) {
                error!("Failed to spawn clipboard note: {err}");
            }
        }

        TimeoutAction::ToDuration(interval)
    }
}
