//! Configuration options.

use std::time::Duration;

use calloop::LoopHandle;
use calloop::channel::{self, Event, Sender};
use configory::EventHandler;
use configory::docgen::Docgen;
use serde::Deserialize;
use tracing::{error, info};

use crate::platform::Platform;
use crate::runtime::Runtime;

/// # Clipnote
///
/// ## Syntax
///
/// Clipnote's configuration file uses the TOML format. The format's
/// specification can be found at _https://toml.io/en/v1.0.0_.
///
/// ## Location
///
/// Clipnote doesn't create the configuration file for you, but it looks for
/// one at `clipnote/clipnote.toml` inside the platform's configuration
/// directory.
///
/// ## Fields
#[derive(Docgen, Deserialize, Default, PartialEq, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// This section documents the `[gesture]` table.
    pub gesture: Gesture,
    /// This section documents the `[physics]` table.
    pub physics: Physics,
    /// This section documents the `[animation]` table.
    pub animation: Animation,
    /// This section documents the `[lifetime]` table.
    pub lifetime: Lifetime,
    /// This section documents the `[clipboard]` table.
    pub clipboard: Clipboard,
}

/// Drag gesture configuration.
#[derive(Docgen, Deserialize, PartialEq, Copy, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Gesture {
    /// Milliseconds the pointer must rest before a drag-out starts.
    pub hold_ms: u16,
    /// Pixels of movement that cancel a pending or active drag-out.
    pub cancel_distance: f64,
    /// Scale of a note while it is being dragged.
    pub shrink_scale: f64,
    /// Extra pixels a shrunken note is lifted above the cursor.
    pub lift_offset: f64,
    /// Maximum natural width of an image note.
    pub max_width: u16,
    /// Maximum natural height of an image note.
    pub max_height: u16,
    /// Distance between a new note and the screen corner.
    pub screen_margin: u16,
}

impl Default for Gesture {
    fn default() -> Self {
        Self {
            hold_ms: 200,
            cancel_distance: 100.,
            shrink_scale: 0.2,
            lift_offset: 8.,
            max_width: 300,
            max_height: 300,
            screen_margin: 16,
        }
    }
}

impl Gesture {
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_ms as u64)
    }
}

/// Throw physics configuration.
#[derive(Docgen, Deserialize, PartialEq, Copy, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Physics {
    /// Percentage of velocity retained each tick.
    pub friction: f64,
    /// Velocity multiplier applied when bouncing off a screen edge.
    ///
    /// Values above `1` add energy on every bounce.
    pub bounce: f64,
    /// Velocity below which a thrown note comes to rest.
    pub min_velocity: f64,
    /// Maximum velocity per axis in pixels per tick.
    pub max_velocity: f64,
    /// Milliseconds of pointer history used to estimate throw velocity.
    pub smoothing_ms: u16,
    /// Release speed in pixels per tick required to throw a note.
    pub throw_threshold: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            friction: 0.87,
            bounce: 0.85,
            min_velocity: 0.85,
            max_velocity: 80.,
            smoothing_ms: 14,
            throw_threshold: 1.,
        }
    }
}

impl Physics {
    pub fn smoothing_window(&self) -> Duration {
        Duration::from_millis(self.smoothing_ms as u64)
    }
}

/// Animation clock configuration.
#[derive(Docgen, Deserialize, PartialEq, Copy, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Animation {
    /// Milliseconds between animation ticks.
    pub tick_interval_ms: u16,
    /// Fraction of the remaining scale difference covered each tick.
    pub ease_factor: f64,
    /// Scale difference below which the animation snaps to its target.
    pub snap_epsilon: f64,
    /// Opacity removed each tick while fading out.
    pub fade_step: f64,
}

impl Default for Animation {
    fn default() -> Self {
        Self { tick_interval_ms: 8, ease_factor: 0.25, snap_epsilon: 0.005, fade_step: 0.05 }
    }
}

impl Animation {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1) as u64)
    }
}

/// Note lifetime configuration.
#[derive(Docgen, Deserialize, PartialEq, Copy, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Lifetime {
    /// Seconds a new note stays on screen before fading out.
    pub default_seconds: u16,
    /// Seconds a note stays on screen after it was unpinned.
    pub unpinned_seconds: u16,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self { default_seconds: 5, unpinned_seconds: 2 }
    }
}

/// Clipboard watcher configuration.
#[derive(Docgen, Deserialize, PartialEq, Copy, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Clipboard {
    /// Milliseconds between clipboard checks.
    pub poll_interval_ms: u16,
    /// Minimum milliseconds between two spawned screenshots.
    pub cooldown_ms: u16,
}

impl Default for Clipboard {
    fn default() -> Self {
        Self { poll_interval_ms: 250, cooldown_ms: 500 }
    }
}

impl Clipboard {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1) as u64)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms as u64)
    }
}

/// Event handler for configuration manager updates.
pub struct ConfigEventHandler {
    tx: Sender<Config>,
}

impl ConfigEventHandler {
    pub fn new<P: Platform + 'static>(event_loop: &LoopHandle<'static, Runtime<P>>) -> Self {
        // Create calloop channel to apply config updates.
        let (tx, rx) = channel::channel();
        let _ = event_loop
            .insert_source(rx, |event, _, runtime| {
                if let Event::Msg(config) = event {
                    runtime.update_config(config);
                }
            })
            .inspect_err(|err| error!("Failed to insert config source: {err}"));

        Self { tx }
    }

    /// Reload the configuration file.
    fn reload_config(&self, config: &configory::Config) {
        info!("Reloading configuration file");

        // Parse config or fall back to the default.
        let parsed = config
            .get::<&str, Config>(&[])
            .inspect_err(|err| error!("Config error: {err}"))
            .ok()
            .flatten()
            .unwrap_or_default();

        if let Err(err) = self.tx.send(parsed) {
            error!("Failed to send on config channel: {err}");
        }
    }
}

impl EventHandler<()> for ConfigEventHandler {
    fn file_changed(&self, config: &configory::Config) {
        self.reload_config(config);
    }

    fn ipc_changed(&self, config: &configory::Config) {
        self.reload_config(config);
    }

    fn file_error(&self, _config: &configory::Config, err: configory::Error) {
        error!("Configuration file error: {err}");
    }
}
