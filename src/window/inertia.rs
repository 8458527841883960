//! Inertial motion of thrown notes.

use crate::config::Physics;
use crate::geometry::{Point, Rect};

/// Throw velocity state.
#[derive(Default, Debug)]
pub struct Inertia {
    velocity: Point<f64>,
    active: bool,
}

impl Inertia {
    /// Check if there is any velocity active.
    pub fn is_moving(&self) -> bool {
        self.active
    }

    /// Velocity in pixels per tick.
    pub fn velocity(&self) -> Point<f64> {
        self.velocity
    }

    /// Start moving with the release velocity.
    ///
    /// Returns `false` without moving if the speed is below the throw
    /// threshold.
    pub fn launch(&mut self, physics: &Physics, velocity: Point<f64>) -> bool {
        let velocity = velocity.clamp_components(physics.max_velocity);
        if velocity.length() <= physics.throw_threshold {
            self.stop();
            return false;
        }

        self.velocity = velocity;
        self.active = true;
        true
    }

    /// Cancel all motion.
    pub fn stop(&mut self) {
        self.velocity = Point::default();
        self.active = false;
    }

    /// Advance the window by one tick inside the usable screen `area`.
    pub fn apply(&mut self, physics: &Physics, bounds: &mut Rect, area: Rect) {
        // No-op without velocity.
        if !self.active {
            return;
        }

        let width = bounds.size.width as f64;
        let height = bounds.size.height as f64;
        let mut next = Point::<f64>::from(bounds.origin) + self.velocity;

        // Reflect off the screen edges.
        if next.x < area.left() as f64 {
            next.x = area.left() as f64;
            self.velocity.x = -self.velocity.x * physics.bounce;
        } else if next.x + width > area.right() as f64 {
            next.x = area.right() as f64 - width;
            self.velocity.x = -self.velocity.x * physics.bounce;
        }

        if next.y < area.top() as f64 {
            next.y = area.top() as f64;
            self.velocity.y = -self.velocity.y * physics.bounce;
        } else if next.y + height > area.bottom() as f64 {
            next.y = area.bottom() as f64 - height;
            self.velocity.y = -self.velocity.y * physics.bounce;
        }

        bounds.origin = Point::new(next.x as i32, next.y as i32);

        // Bouncy configurations can add energy, so the cap is enforced every tick.
        self.velocity = (self.velocity * physics.friction).clamp_components(physics.max_velocity);

        if self.velocity.x.abs() < physics.min_velocity
            && self.velocity.y.abs() < physics.min_velocity
        {
            self.stop();
        }
    }
}
