//! Scale and anchor math for note windows.
//!
//! While a note is dragged it shrinks towards the cursor, keeping the
//! grabbed pixel glued to the pointer. To keep the shrunken note from
//! covering the cursor it is additionally lifted upwards, proportionally to
//! how far the shrink animation has progressed.
//!
//! After release the note grows back around the same grab point. Since the
//! lift shrinks together with the scale, the settle step has to remove the
//! lift applied on the previous tick before deriving the anchor, then
//! reapply the new smaller lift. Deriving the position directly from the
//! new lift makes the note jump whenever both offsets change together.

use crate::config::{Animation, Gesture};
use crate::geometry::{Point, Rect, Size};

/// Shrink denominators smaller than this disable the lift.
const MIN_SHRINK_RANGE: f64 = 0.001;

/// Scale and grab point of a single note window.
#[derive(Debug)]
pub struct Placement {
    base_size: Option<Size>,
    current_scale: f64,
    target_scale: f64,
    anchor_ratio: Point<f64>,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            anchor_ratio: Point::new(0.5, 0.5),
            current_scale: 1.,
            target_scale: 1.,
            base_size: None,
        }
    }
}

impl Placement {
    /// Natural size of the window at 100% scale.
    pub fn base_size(&self) -> Option<Size> {
        self.base_size
    }

    /// Capture the natural window size.
    ///
    /// The size is only recorded once, later calls are ignored.
    pub fn set_base_size(&mut self, size: Size) {
        if self.base_size.is_none() && !size.is_empty() {
            self.base_size = Some(size);
        }
    }

    pub fn scale(&self) -> f64 {
        self.current_scale
    }

    pub fn target_scale(&self) -> f64 {
        self.target_scale
    }

    pub fn set_target_scale(&mut self, scale: f64) {
        self.target_scale = scale;
    }

    pub fn anchor_ratio(&self) -> Point<f64> {
        self.anchor_ratio
    }

    /// Check if the scale animation reached its target.
    pub fn is_settled(&self) -> bool {
        self.current_scale == self.target_scale
    }

    /// Start a drag at `cursor` for a window currently shown at `bounds`.
    ///
    /// This synchronizes the current scale with the visible window size and
    /// records where inside the window the pointer grabbed it.
    pub fn grab(&mut self, bounds: Rect, cursor: Point) {
        self.set_base_size(bounds.size);

        if let Some(base_size) = self.base_size {
            let scale = bounds.size.width as f64 / base_size.width as f64;
            if scale > 0. {
                self.current_scale = scale;
            }
        }

        let size = Size::<f64>::from(bounds.size);
        let offset = Point::<f64>::from(cursor - bounds.origin);
        let ratio_x = if size.width > 0. { offset.x / size.width } else { 0.5 };
        let ratio_y = if size.height > 0. { offset.y / size.height } else { 0.5 };
        self.anchor_ratio = Point::new(ratio_x, ratio_y);
    }

    /// Advance the scale animation by one tick.
    ///
    /// Returns `true` once the scale has reached its target.
    pub fn ease(&mut self, animation: &Animation) -> bool {
        let factor = animation.ease_factor.clamp(0.01, 1.);
        self.current_scale += (self.target_scale - self.current_scale) * factor;

        if (self.target_scale - self.current_scale).abs() < animation.snap_epsilon {
            self.current_scale = self.target_scale;
        }

        self.is_settled()
    }

    /// Window size at the current scale.
    pub fn scaled_size(&self) -> Size {
        self.base_size.map_or_else(Size::default, |size| size * self.current_scale)
    }

    /// Vertical lift at the current scale.
    pub fn lift(&self, gesture: &Gesture) -> i32 {
        let denominator = 1. - gesture.shrink_scale;
        if denominator.abs() <= MIN_SHRINK_RANGE {
            return 0;
        }
        let progress = ((1. - self.current_scale) / denominator).clamp(0., 1.);

        let base_height = self.base_size.map_or(0., |size| size.height as f64);
        let grabbed_below = base_height * (1. - self.anchor_ratio.y) * gesture.shrink_scale;
        ((grabbed_below + gesture.lift_offset) * progress) as i32
    }

    /// Window bounds glued to the cursor while dragging.
    pub fn drag_bounds(&self, cursor: Point, gesture: &Gesture) -> Rect {
        let size = self.scaled_size();
        let anchor = self.anchor_offset(size);
        let origin = Point::new(cursor.x - anchor.x, cursor.y - anchor.y - self.lift(gesture));
        Rect { origin, size }
    }

    /// Window bounds growing back around the grab point after release.
    ///
    /// The `previous_lift` must be the [`Self::lift`] from before the last
    /// call to [`Self::ease`].
    pub fn settle_bounds(&self, bounds: Rect, previous_lift: i32, gesture: &Gesture) -> Rect {
        // Remove the old lift to recover the true anchor point.
        let true_top = bounds.origin.y + previous_lift;
        let old_anchor = self.anchor_offset(bounds.size);
        let anchor_point = Point::new(bounds.origin.x + old_anchor.x, true_top + old_anchor.y);

        // Resize around the anchor, then reapply the new lift.
        let size = self.scaled_size();
        let anchor = self.anchor_offset(size);
        let origin =
            Point::new(anchor_point.x - anchor.x, anchor_point.y - anchor.y - self.lift(gesture));

        Rect { origin, size }
    }

    /// Pixel offset of the grab point inside a window of `size`.
    fn anchor_offset(&self, size: Size) -> Point {
        let size = Size::<f64>::from(size);
        Point::new(
            (size.width * self.anchor_ratio.x) as i32,
            (size.height * self.anchor_ratio.y) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grabbed(bounds: Rect, cursor: Point) -> Placement {
        let mut placement = Placement::default();
        placement.grab(bounds, cursor);
        placement
    }

    #[test]
    fn base_size_is_immutable() {
        let mut placement = Placement::default();
        placement.set_base_size(Size::new(300, 200));
        placement.set_base_size(Size::new(60, 40));
        assert_eq!(placement.base_size(), Some(Size::new(300, 200)));

        placement.grab(Rect::new(0, 0, 60, 40), Point::new(30, 20));
        assert_eq!(placement.base_size(), Some(Size::new(300, 200)));
        assert!((placement.scale() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn grab_records_anchor_ratio() {
        let placement = grabbed(Rect::new(100, 100, 300, 200), Point::new(250, 200));
        assert_eq!(placement.anchor_ratio(), Point::new(0.5, 0.5));
    }

    #[test]
    fn cursor_stays_on_grab_point() {
        let gesture = Gesture::default();
        let animation = Animation::default();

        for (cursor, target) in [
            (Point::new(130, 110), Point::new(700, -40)),
            (Point::new(399, 299), Point::new(5, 5)),
            (Point::new(100, 100), Point::new(1000, 800)),
        ] {
            let mut placement = grabbed(Rect::new(100, 100, 300, 200), cursor);
            placement.set_target_scale(gesture.shrink_scale);

            let ratio = placement.anchor_ratio();
            for _ in 0..60 {
                placement.ease(&animation);
                let bounds = placement.drag_bounds(target, &gesture);
                let size = Size::<f64>::from(bounds.size);

                let grab_x = bounds.origin.x as f64 + size.width * ratio.x;
                let grab_y = bounds.origin.y as f64 + size.height * ratio.y;
                let lift = placement.lift(&gesture) as f64;

                assert!((grab_x - target.x as f64).abs() <= 1.);
                assert!((grab_y + lift - target.y as f64).abs() <= 1.);
            }
        }
    }

    #[test]
    fn easing_converges_without_overshoot() {
        let animation = Animation::default();

        for start in [0.05, 0.2, 0.5, 0.99, 1.] {
            for target in [0.2, 1.] {
                let mut placement = Placement { current_scale: start, ..Placement::default() };
                placement.set_target_scale(target);
                let rising = target > start;

                let mut ticks = 0;
                while !placement.ease(&animation) {
                    let scale = placement.scale();
                    assert!(if rising { scale <= target } else { scale >= target });
                    ticks += 1;
                    assert!(ticks < 50, "no convergence from {start} to {target}");
                }
                assert_eq!(placement.scale(), target);
            }
        }
    }

    #[test]
    fn lift_grows_with_shrink_progress() {
        let gesture = Gesture::default();
        let mut placement = grabbed(Rect::new(0, 0, 300, 200), Point::new(150, 100));
        assert_eq!(placement.lift(&gesture), 0);

        placement.current_scale = gesture.shrink_scale;
        // 200 * 0.5 * 0.2 + 8.
        assert_eq!(placement.lift(&gesture), 28);

        placement.current_scale = 0.01;
        assert_eq!(placement.lift(&gesture), 28);
    }

    #[test]
    fn degenerate_shrink_scale_disables_lift() {
        let gesture = Gesture { shrink_scale: 1., ..Gesture::default() };
        let mut placement = grabbed(Rect::new(0, 0, 300, 200), Point::new(150, 100));
        placement.current_scale = 0.5;
        assert_eq!(placement.lift(&gesture), 0);
    }

    #[test]
    fn settle_grows_around_released_cursor() {
        let gesture = Gesture::default();
        let animation = Animation::default();
        let cursor = Point::new(640, 480);

        let mut placement = grabbed(Rect::new(500, 400, 300, 200), Point::new(590, 430));
        placement.set_target_scale(gesture.shrink_scale);
        while !placement.ease(&animation) {}
        let mut bounds = placement.drag_bounds(cursor, &gesture);

        placement.set_target_scale(1.);
        loop {
            let previous_lift = placement.lift(&gesture);
            let settled = placement.ease(&animation);
            bounds = placement.settle_bounds(bounds, previous_lift, &gesture);

            // The un-lifted grab point never moves.
            let anchor = placement.anchor_offset(bounds.size);
            let lift = placement.lift(&gesture);
            assert_eq!(bounds.origin.x + anchor.x, cursor.x);
            assert_eq!(bounds.origin.y + anchor.y + lift, cursor.y);

            if settled {
                break;
            }
        }

        assert_eq!(bounds.size, Size::new(300, 200));
        assert_eq!(placement.lift(&gesture), 0);
    }
}
