//! In-memory desktop used by unit tests.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

use resvg::tiny_skia::Pixmap;
use tracing_subscriber::EnvFilter;

use crate::Error;
use crate::geometry::{Point, Rect};
use crate::note::{DragPayload, NoteId};
use crate::platform::{
    DragAction, DragLoopError, DragProgress, DropEffect, Platform, ShelfSurface, Surface,
};

/// Interval between scripted native drag loop callbacks.
const DRAG_STEP: Duration = Duration::from_millis(8);

/// Route log output through the test harness.
pub fn init_logging() {
    let env_filter = EnvFilter::builder().parse_lossy("debug");
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_test_writer().try_init();
}

/// Scripted run of the native drag loop.
pub struct DragScript {
    /// Cursor positions reported to the progress callback.
    pub steps: Vec<Point>,
    pub result: Result<DropEffect, DragLoopError>,
}

impl DragScript {
    pub fn new(steps: Vec<Point>, result: Result<DropEffect, DragLoopError>) -> Self {
        Self { steps, result }
    }
}

/// Fake desktop with a manual clock.
pub struct FakePlatform {
    pub now: Instant,
    pub cursor: Point,
    pub pressed: bool,
    pub screen: Rect,
    pub surfaces: HashMap<NoteId, FakeSurface>,
    pub drag_scripts: VecDeque<DragScript>,
    /// Payloads handed to the native drag loop.
    pub payloads: Vec<DragPayload>,
    /// Hit test transparency of the source note while its drag loop ran.
    pub transparent_during_drag: Vec<bool>,
    pub fail_surfaces: bool,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            now: Instant::now(),
            screen: Rect::new(0, 0, 1920, 1040),
            cursor: Default::default(),
            surfaces: Default::default(),
            drag_scripts: Default::default(),
            payloads: Default::default(),
            transparent_during_drag: Default::default(),
            fail_surfaces: false,
            pressed: false,
        }
    }
}

impl FakePlatform {
    pub fn advance(&mut self, millis: u64) {
        self.now += Duration::from_millis(millis);
    }

    pub fn surface(&self, id: NoteId) -> &FakeSurface {
        &self.surfaces[&id]
    }
}

impl Platform for FakePlatform {
    fn now(&self) -> Instant {
        self.now
    }

    fn cursor_position(&self) -> Point {
        self.cursor
    }

    fn primary_pressed(&self) -> bool {
        self.pressed
    }

    fn usable_bounds(&self, _window: Rect) -> Rect {
        self.screen
    }

    fn primary_usable_bounds(&self) -> Rect {
        self.screen
    }

    fn create_surface(&mut self, id: NoteId) -> Result<Box<dyn Surface>, Error> {
        if self.fail_surfaces {
            return Err(Error::Surface("window creation disabled".into()));
        }

        let surface = FakeSurface::default();
        self.surfaces.insert(id, surface.clone());
        Ok(Box::new(surface))
    }

    fn run_drag_loop(
        &mut self,
        payload: DragPayload,
        progress: &mut dyn FnMut(DragProgress) -> DragAction,
    ) -> Result<DropEffect, DragLoopError> {
        if let Some(surface) = self.surfaces.get(&payload.source) {
            self.transparent_during_drag.push(surface.state().hit_transparent);
        }
        self.payloads.push(payload);

        let script = match self.drag_scripts.pop_front() {
            Some(script) => script,
            None => return Ok(DropEffect::None),
        };

        for cursor in script.steps {
            self.now += DRAG_STEP;
            self.cursor = cursor;

            if progress(DragProgress { cursor, time: self.now }) == DragAction::Cancel {
                return Ok(DropEffect::None);
            }
        }

        script.result
    }
}

/// Observable state of a fake note window.
#[derive(Debug)]
pub struct SurfaceState {
    pub bounds: Rect,
    pub opacity: f64,
    pub visible: bool,
    pub hit_transparent: bool,
    pub affordances: bool,
    pub alive: bool,
    pub closed: bool,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            alive: true,
            affordances: true,
            bounds: Default::default(),
            hit_transparent: false,
            visible: false,
            closed: false,
            opacity: 0.,
        }
    }
}

/// Fake note window sharing its state with the test.
#[derive(Clone, Default)]
pub struct FakeSurface(Rc<RefCell<SurfaceState>>);

impl FakeSurface {
    pub fn state(&self) -> Ref<'_, SurfaceState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, SurfaceState> {
        self.0.borrow_mut()
    }
}

impl Surface for FakeSurface {
    fn set_bounds(&mut self, bounds: Rect) {
        self.state_mut().bounds = bounds;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.state_mut().opacity = opacity;
    }

    fn set_visible(&mut self, visible: bool) {
        self.state_mut().visible = visible;
    }

    fn set_hit_test_transparent(&mut self, transparent: bool) {
        self.state_mut().hit_transparent = transparent;
    }

    fn set_affordances_visible(&mut self, visible: bool) {
        self.state_mut().affordances = visible;
    }

    fn is_alive(&self) -> bool {
        self.state().alive
    }

    fn close(&mut self) {
        let mut state = self.state_mut();
        state.closed = true;
        state.alive = false;
    }
}

/// Observable state of the fake shelf tray.
#[derive(Debug)]
pub struct ShelfState {
    pub bounds: Rect,
    pub visible: bool,
    pub disposed: bool,
    pub items: Vec<NoteId>,
}

/// Fake shelf tray sharing its state with the test.
#[derive(Clone)]
pub struct FakeShelfSurface(Rc<RefCell<ShelfState>>);

impl FakeShelfSurface {
    /// Create a visible tray at `bounds`.
    pub fn new(bounds: Rect) -> Self {
        let state = ShelfState { bounds, visible: true, disposed: false, items: Vec::new() };
        Self(Rc::new(RefCell::new(state)))
    }

    pub fn state(&self) -> Ref<'_, ShelfState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, ShelfState> {
        self.0.borrow_mut()
    }
}

impl ShelfSurface for FakeShelfSurface {
    fn bounds(&self) -> Rect {
        self.state().bounds
    }

    fn is_visible(&self) -> bool {
        self.state().visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.state_mut().visible = visible;
    }

    fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    fn show_item(&mut self, id: NoteId, _thumbnail: &Pixmap) {
        let mut state = self.state_mut();
        if !state.items.contains(&id) {
            state.items.push(id);
        }
    }

    fn remove_item(&mut self, id: NoteId) {
        self.state_mut().items.retain(|item| *item != id);
    }
}
