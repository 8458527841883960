//! Collaborator interfaces implemented by the windowing backend.
//!
//! The note core never talks to the operating system directly. Everything it
//! needs from the desktop (pointer state, screen geometry, the native
//! drag-and-drop loop and the note surfaces themselves) goes through the
//! traits in this module.

use std::time::Instant;

use resvg::tiny_skia::Pixmap;

use crate::Error;
use crate::geometry::{Point, Rect};
use crate::note::{DragPayload, NoteId};

/// Desktop services shared by all notes.
pub trait Platform {
    /// Current time of the animation clock.
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// Global pointer position in screen coordinates.
    fn cursor_position(&self) -> Point;

    /// Whether the primary pointer button is physically held down.
    fn primary_pressed(&self) -> bool;

    /// Usable area of the screen containing `window`, excluding panels and
    /// taskbars.
    fn usable_bounds(&self, window: Rect) -> Rect;

    /// Usable area of the primary screen.
    fn primary_usable_bounds(&self) -> Rect;

    /// Create the native surface for a new note.
    fn create_surface(&mut self, id: NoteId) -> Result<Box<dyn Surface>, Error>;

    /// Run the blocking native drag-and-drop loop.
    ///
    /// The backend must call `progress` whenever the loop asks whether to
    /// continue and whenever it gives drag feedback. Returning
    /// [`DragAction::Cancel`] asks the loop to abort the drag.
    fn run_drag_loop(
        &mut self,
        payload: DragPayload,
        progress: &mut dyn FnMut(DragProgress) -> DragAction,
    ) -> Result<DropEffect, DragLoopError>;
}

/// Native window showing a single note.
pub trait Surface {
    /// Move and resize the window.
    fn set_bounds(&mut self, bounds: Rect);

    fn set_opacity(&mut self, opacity: f64);

    fn set_visible(&mut self, visible: bool);

    /// Let pointer events pass through the window.
    fn set_hit_test_transparent(&mut self, transparent: bool);

    /// Toggle secondary controls like the pin and edit buttons.
    fn set_affordances_visible(&mut self, visible: bool);

    /// Whether the native window still exists.
    fn is_alive(&self) -> bool;

    /// Destroy the native window.
    fn close(&mut self);
}

/// Native window of the shelf tray.
pub trait ShelfSurface {
    fn bounds(&self) -> Rect;

    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    fn is_disposed(&self) -> bool;

    /// Show a new or updated item.
    fn show_item(&mut self, id: NoteId, thumbnail: &Pixmap);

    /// Remove an item from display.
    fn remove_item(&mut self, id: NoteId);
}

/// Native drag loop state handed to the progress callback.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DragProgress {
    pub cursor: Point,
    pub time: Instant,
}

/// Response to a native drag loop progress query.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DragAction {
    Continue,
    Cancel,
}

/// Final result of a native drag loop.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DropEffect {
    /// No target accepted the payload, or the drag was cancelled.
    None,
    /// The target copied the payload.
    Copy,
    /// The target took ownership of the payload.
    Move,
}

/// Failure inside the native drag loop.
#[derive(thiserror::Error, Debug)]
pub enum DragLoopError {
    #[error("payload export failed: {0}")]
    Export(String),
    #[error("drag loop failed: {0}")]
    Native(String),
}
