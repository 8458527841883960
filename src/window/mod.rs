//! Floating note windows.
//!
//! Every note runs the same gesture state machine, advanced by a shared
//! fixed-rate clock:
//!
//! ```text
//! Idle ──pointer down──▶ Dragging ──hold still──▶ FileDragActive
//!  ▲                       │  ▲                       │
//!  │                       │  └──moved too far────────┤
//!  │                 pointer up                       ├──consumed──▶ Hidden
//!  │                       ▼                          │
//!  └──settled & at rest── Released ◀──dropped─────────┘
//!                          │
//!                          └──over shelf──▶ Hidden
//!
//! Idle/Released ──lifetime expired──▶ FadingOut ──▶ Closed
//! ```

use std::mem;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::config::{Config, Gesture};
use crate::geometry::{Point, Rect};
use crate::note::{NoteContent, NoteId};
use crate::platform::{Platform, Surface};
use crate::shelf::Shelf;
use crate::window::history::VelocityHistory;
use crate::window::inertia::Inertia;
use crate::window::placement::Placement;
use crate::window::session::{HoldTimer, SessionOutcome};

pub mod history;
pub mod inertia;
pub mod placement;
mod session;

/// Gesture state of a note window.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Resting on screen.
    Idle,
    /// Following the pointer, shrinking towards the drag scale.
    Dragging,
    /// Running the native drag-out loop.
    FileDragActive,
    /// Growing back to full scale, optionally thrown by inertia.
    Released,
    /// Lifetime expired, decreasing opacity.
    FadingOut,
    /// Parked on the shelf or consumed by a drop target.
    Hidden,
    /// Native window destroyed.
    Closed,
}

/// Lifecycle notifications for the host application.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NoteEvent {
    Spawned(NoteId),
    DragStarted(NoteId),
    FileDragStarted(NoteId),
    DragEnded(NoteId),
    Shelved(NoteId),
    Consumed(NoteId),
    Expired(NoteId),
    Closed(NoteId),
}

/// Shared state handed to a window for a single operation.
pub struct Context<'a> {
    pub platform: &'a mut dyn Platform,
    pub shelf: &'a mut Shelf,
    pub config: &'a Config,
}

/// On-screen note.
pub struct FloatingWindow {
    id: NoteId,
    phase: Phase,

    placement: Placement,
    inertia: Inertia,
    history: VelocityHistory,
    hold: HoldTimer,
    lifetime: Lifetime,

    bounds: Rect,
    opacity: f64,

    content: Box<dyn NoteContent>,
    surface: Box<dyn Surface>,

    events: Vec<NoteEvent>,
}

impl FloatingWindow {
    /// Show a new note at `bounds`, which also defines its natural size.
    pub fn new(
        id: NoteId,
        mut content: Box<dyn NoteContent>,
        mut surface: Box<dyn Surface>,
        bounds: Rect,
        config: &Config,
        now: Instant,
    ) -> Self {
        let mut placement = Placement::default();
        placement.set_base_size(bounds.size);
        content.layout(bounds.size);

        surface.set_bounds(bounds);
        surface.set_opacity(1.);
        surface.set_visible(true);

        let lifetime_duration = Duration::from_secs(config.lifetime.default_seconds as u64);
        let mut lifetime = Lifetime::new(lifetime_duration);
        lifetime.start(now);

        info!("Spawned {} note {id}", content.kind());

        Self {
            placement,
            lifetime,
            content,
            surface,
            bounds,
            id,
            history: VelocityHistory::new(config.physics.smoothing_window()),
            hold: HoldTimer::new(now, bounds.origin),
            events: vec![NoteEvent::Spawned(id)],
            phase: Phase::Idle,
            inertia: Default::default(),
            opacity: 1.,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Current throw velocity, zero while no physics is active.
    pub fn velocity(&self) -> Point<f64> {
        self.inertia.velocity()
    }

    pub fn is_pinned(&self) -> bool {
        self.lifetime.pinned
    }

    /// Instant at which the note will start fading out.
    pub fn lifetime_deadline(&self) -> Option<Instant> {
        self.lifetime.deadline
    }

    pub fn content_mut(&mut self) -> &mut dyn NoteContent {
        self.content.as_mut()
    }

    /// Check whether the window needs the animation clock.
    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Dragging | Phase::Released | Phase::FadingOut)
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// Take all pending lifecycle events.
    pub fn take_events(&mut self) -> Vec<NoteEvent> {
        mem::take(&mut self.events)
    }

    /// Handle primary button press on the note.
    pub fn pointer_down(&mut self, cx: &mut Context<'_>) {
        match self.phase {
            Phase::Idle | Phase::Released | Phase::FadingOut => (),
            Phase::Dragging | Phase::FileDragActive | Phase::Hidden | Phase::Closed => return,
        }

        // Grabbing a fading note brings it back.
        if self.phase == Phase::FadingOut {
            self.set_opacity(1.);
        }

        self.inertia.stop();
        self.lifetime.stop();

        let now = cx.platform.now();
        let cursor = cx.platform.cursor_position();
        self.begin_drag(cx.config, now, cursor);
    }

    /// Handle pointer motion while the pointer is over the note.
    pub fn pointer_motion(&mut self, time: Instant, position: Point) {
        if self.phase == Phase::Dragging {
            self.history.record(time, position);
        }
    }

    /// Handle primary button release.
    pub fn pointer_up(&mut self, cx: &mut Context<'_>) {
        if self.phase == Phase::Dragging {
            self.release(cx);
        }
    }

    /// Take the note back from the shelf and continue dragging it.
    ///
    /// The window reappears at the shelf item's `item_bounds`, grabbed at
    /// `cursor`.
    pub fn wake_from_shelf(&mut self, cx: &mut Context<'_>, cursor: Point, item_bounds: Rect) {
        if self.phase == Phase::Closed {
            return;
        }

        self.set_opacity(1.);
        self.lifetime.stop();
        self.inertia.stop();

        self.bounds = item_bounds;
        self.surface.set_bounds(item_bounds);
        self.surface.set_visible(true);

        info!("Waking note {} from shelf", self.id);

        let now = cx.platform.now();
        self.begin_drag(cx.config, now, cursor);
    }

    /// Toggle whether the note ignores its lifetime.
    pub fn toggle_pin(&mut self, config: &Config, now: Instant) {
        self.lifetime.pinned = !self.lifetime.pinned;

        if self.lifetime.pinned {
            self.lifetime.stop();
        } else {
            // Unpinned notes only linger briefly.
            self.lifetime.duration = Duration::from_secs(config.lifetime.unpinned_seconds as u64);
            self.lifetime.start(now);
        }

        debug!("Note {} pinned: {}", self.id, self.lifetime.pinned);
    }

    /// Show or hide the window without changing its gesture state.
    pub fn set_visible(&mut self, visible: bool) {
        if self.phase != Phase::Closed {
            self.surface.set_visible(visible);
        }
    }

    /// Hide the window while keeping it alive for a later wake-up.
    pub fn hide(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }

        self.inertia.stop();
        self.lifetime.stop();
        self.surface.set_visible(false);
        self.phase = Phase::Hidden;
    }

    /// Destroy the window.
    pub fn close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }

        self.inertia.stop();
        self.lifetime.stop();
        self.surface.close();
        self.phase = Phase::Closed;

        info!("Closed note {}", self.id);
        self.events.push(NoteEvent::Closed(self.id));
    }

    /// Advance the window by one clock tick.
    pub fn tick(&mut self, cx: &mut Context<'_>) {
        if self.phase == Phase::Closed {
            return;
        }

        // Ticks can race against the destruction of the native window.
        if !self.surface.is_alive() {
            debug!("Surface of note {} vanished, stopping", self.id);
            self.inertia.stop();
            self.lifetime.stop();
            self.phase = Phase::Closed;
            self.events.push(NoteEvent::Closed(self.id));
            return;
        }

        let now = cx.platform.now();
        match self.phase {
            // The native drag loop drives the window through its own callback.
            Phase::FileDragActive | Phase::Hidden | Phase::Closed => (),
            Phase::Dragging => self.drag_tick(cx, now),
            Phase::Released => {
                self.settle_tick(cx.config);
                self.physics_tick(cx);

                if self.placement.is_settled() && !self.inertia.is_moving() {
                    self.phase = Phase::Idle;
                }

                self.check_lifetime(now);
            },
            Phase::Idle => self.check_lifetime(now),
            Phase::FadingOut => self.fade_tick(cx.config),
        }
    }

    /// Enter the dragging state grabbed at `cursor`.
    fn begin_drag(&mut self, config: &Config, now: Instant, cursor: Point) {
        self.placement.grab(self.bounds, cursor);
        self.placement.set_target_scale(config.gesture.shrink_scale);

        self.hold.reset(now, cursor);
        self.history.set_window(config.physics.smoothing_window());
        self.history.clear();
        self.history.record(now, cursor);

        self.surface.set_affordances_visible(false);
        self.phase = Phase::Dragging;

        debug!("Started dragging note {} at {cursor:?}", self.id);
        self.events.push(NoteEvent::DragStarted(self.id));
    }

    /// Dragging clock tick.
    fn drag_tick(&mut self, cx: &mut Context<'_>, now: Instant) {
        // Recover from a pointer release that never reached us.
        if !cx.platform.primary_pressed() {
            debug!("Primary button released outside of note {}", self.id);
            self.release(cx);
            return;
        }

        let gesture = &cx.config.gesture;
        let cursor = cx.platform.cursor_position();
        let idle = self.hold.update(now, cursor, gesture.cancel_distance);
        if idle > gesture.hold_duration() {
            self.start_drag_out(cx);
            return;
        }

        // Scale must be updated before deriving the bounds from it.
        self.placement.ease(&cx.config.animation);
        follow_cursor(
            &self.placement,
            gesture,
            now,
            cursor,
            &mut self.bounds,
            &mut self.history,
            self.surface.as_mut(),
        );
    }

    /// Escalate the window drag into a native drag-out of the note's payload.
    fn start_drag_out(&mut self, cx: &mut Context<'_>) {
        self.phase = Phase::FileDragActive;
        self.events.push(NoteEvent::FileDragStarted(self.id));
        info!("Starting drag-out of note {}", self.id);

        let outcome = self.run_drag_out(cx);
        debug!("Drag-out of note {} ended: {outcome:?}", self.id);

        let now = cx.platform.now();
        let cursor = cx.platform.cursor_position();
        match outcome {
            SessionOutcome::Consumed => {
                self.hide();
                self.events.push(NoteEvent::Consumed(self.id));
            },
            SessionOutcome::CancelledByMovement | SessionOutcome::Aborted => {
                self.phase = Phase::Dragging;
                self.hold.reset(now, cursor);
            },
            SessionOutcome::Dropped => {
                self.phase = Phase::Dragging;
                self.release(cx);
            },
        }
    }

    /// Finish a drag, shared by pointer release and drag-out drops.
    fn release(&mut self, cx: &mut Context<'_>) {
        self.placement.set_target_scale(1.);
        self.phase = Phase::Released;
        self.events.push(NoteEvent::DragEnded(self.id));

        // Test against the live pointer, the window bounds might be stale.
        let cursor = cx.platform.cursor_position();
        if cx.shelf.try_deposit(self.id, cursor, self.content.as_mut()) {
            self.hide();
            self.events.push(NoteEvent::Shelved(self.id));
            return;
        }

        let now = cx.platform.now();
        if !self.lifetime.pinned {
            self.lifetime.start(now);
        }

        let physics = &cx.config.physics;
        let tick_interval = cx.config.animation.tick_interval();
        let velocity = self.history.estimate_velocity(tick_interval, physics.max_velocity);
        if self.inertia.launch(physics, velocity) {
            debug!("Threw note {} with velocity {velocity:?}", self.id);
        }
    }

    /// Grow back to natural size around the grab point.
    fn settle_tick(&mut self, config: &Config) {
        if self.placement.is_settled() {
            return;
        }

        let gesture = &config.gesture;
        let previous_lift = self.placement.lift(gesture);
        let settled = self.placement.ease(&config.animation);
        self.bounds = self.placement.settle_bounds(self.bounds, previous_lift, gesture);
        self.surface.set_bounds(self.bounds);

        if settled {
            self.surface.set_affordances_visible(true);
        }
    }

    /// Move a thrown window.
    fn physics_tick(&mut self, cx: &mut Context<'_>) {
        if !self.inertia.is_moving() {
            return;
        }

        let area = cx.platform.usable_bounds(self.bounds);
        self.inertia.apply(&cx.config.physics, &mut self.bounds, area);
        self.surface.set_bounds(self.bounds);

        trace!("Note {} at {:?}, velocity {:?}", self.id, self.bounds, self.inertia.velocity());
    }

    /// Start fading out once the lifetime expired.
    fn check_lifetime(&mut self, now: Instant) {
        if !self.lifetime.expired(now) {
            return;
        }

        self.inertia.stop();
        self.lifetime.stop();
        self.phase = Phase::FadingOut;

        info!("Lifetime of note {} expired", self.id);
        self.events.push(NoteEvent::Expired(self.id));
    }

    fn fade_tick(&mut self, config: &Config) {
        if self.opacity > 0. {
            self.set_opacity((self.opacity - config.animation.fade_step).max(0.));
        } else {
            self.close();
        }
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
        self.surface.set_opacity(opacity);
    }
}

/// Glue the window to the cursor while dragging.
///
/// This is shared between the animation clock and the native drag loop's
/// feedback, which blocks the clock while it is running.
fn follow_cursor(
    placement: &Placement,
    gesture: &Gesture,
    time: Instant,
    cursor: Point,
    bounds: &mut Rect,
    history: &mut VelocityHistory,
    surface: &mut dyn Surface,
) {
    *bounds = placement.drag_bounds(cursor, gesture);
    surface.set_bounds(*bounds);
    history.record(time, cursor);
}

/// Time until a note starts fading out.
#[derive(Debug)]
struct Lifetime {
    duration: Duration,
    deadline: Option<Instant>,
    pinned: bool,
}

impl Lifetime {
    fn new(duration: Duration) -> Self {
        Self { duration, deadline: None, pinned: false }
    }

    fn start(&mut self, now: Instant) {
        self.deadline = Some(now + self.duration);
    }

    fn stop(&mut self) {
        self.deadline = None;
    }

    fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}
