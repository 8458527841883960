//! Drag-out of a note's payload to other applications.
//!
//! Holding a dragged note still escalates the window drag into a native
//! drag-and-drop operation. The native loop blocks the animation clock, so
//! the window follows the cursor from the loop's progress callback instead.
//! Moving too far away from where the drag-out started cancels it again and
//! resumes the plain window drag.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::geometry::Point;
use crate::note::DragPayload;
use crate::platform::{DragAction, DropEffect};
use crate::window::{Context, FloatingWindow, follow_cursor};

/// Result of a drag-out session.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SessionOutcome {
    /// A drop target moved the payload out of the note.
    Consumed,
    /// The pointer moved beyond the cancel distance.
    CancelledByMovement,
    /// Dropped somewhere, or cancelled without movement.
    Dropped,
    /// No drag payload could be created.
    Aborted,
}

/// Pointer rest tracking for drag-out escalation.
#[derive(Debug)]
pub struct HoldTimer {
    last_move: Instant,
    wait_start: Point,
    last_position: Point,
}

impl HoldTimer {
    pub fn new(now: Instant, cursor: Point) -> Self {
        Self { last_move: now, wait_start: cursor, last_position: cursor }
    }

    /// Restart the rest period at `cursor`.
    pub fn reset(&mut self, now: Instant, cursor: Point) {
        *self = Self::new(now, cursor);
    }

    /// Update the cursor position and get the time it has been at rest.
    pub fn update(&mut self, now: Instant, cursor: Point, cancel_distance: f64) -> Duration {
        if cursor != self.last_position {
            self.last_move = now;
            self.last_position = cursor;

            // Re-anchor so jitter in place can't accumulate.
            if cursor.distance(self.wait_start) > cancel_distance {
                self.wait_start = cursor;
            }
        }

        now.saturating_duration_since(self.last_move)
    }
}

impl FloatingWindow {
    /// Run one native drag-out session.
    ///
    /// Hit testing is always restored, regardless of the outcome.
    pub(super) fn run_drag_out(&mut self, cx: &mut Context<'_>) -> SessionOutcome {
        // Don't intercept our own drag feedback.
        self.surface.set_hit_test_transparent(true);

        let outcome = self.drag_out_loop(cx);

        self.surface.set_hit_test_transparent(false);

        outcome
    }

    fn drag_out_loop(&mut self, cx: &mut Context<'_>) -> SessionOutcome {
        let payload = match DragPayload::materialize(self.id, self.content.as_mut()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Failed to create drag payload for note {}: {err}", self.id);
                return SessionOutcome::Aborted;
            },
        };

        let start = cx.platform.cursor_position();
        let gesture = &cx.config.gesture;
        let placement = &self.placement;
        let bounds = &mut self.bounds;
        let history = &mut self.history;
        let surface = self.surface.as_mut();
        let mut cancelled = false;

        let result = cx.platform.run_drag_loop(payload, &mut |progress| {
            let (time, cursor) = (progress.time, progress.cursor);
            follow_cursor(placement, gesture, time, cursor, bounds, history, surface);

            if progress.cursor.distance(start) > gesture.cancel_distance {
                cancelled = true;
                DragAction::Cancel
            } else {
                DragAction::Continue
            }
        });

        match result {
            _ if cancelled => SessionOutcome::CancelledByMovement,
            Ok(DropEffect::Move) => SessionOutcome::Consumed,
            Ok(DropEffect::Copy | DropEffect::None) => SessionOutcome::Dropped,
            Err(err) => {
                debug!("Native drag loop of note {} failed: {err}", self.id);
                SessionOutcome::Dropped
            },
        }
    }
}
