//! Selection geometry in display pixels.

use serde::{Deserialize, Serialize};

use super::{INITIAL_FRACTION, MIN_SIDE};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Size the image is displayed at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub(super) fn fits_min_side(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.width.min(self.height) >= MIN_SIDE
    }

    fn shorter_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Corner resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    pub fn opposite(&self) -> Handle {
        match self {
            Handle::TopLeft => Handle::BottomRight,
            Handle::TopRight => Handle::BottomLeft,
            Handle::BottomLeft => Handle::TopRight,
            Handle::BottomRight => Handle::TopLeft,
        }
    }

    /// Direction the selection grows in when this handle is dragged outward.
    fn grows_right(&self) -> bool {
        matches!(self, Handle::TopRight | Handle::BottomRight)
    }

    fn grows_down(&self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::BottomRight)
    }
}

/// Crop selection in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Crop region in natural-resolution pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Centered square covering `INITIAL_FRACTION` of the shorter side.
    pub(super) fn initial(display: DisplaySize) -> Self {
        let side = (display.shorter_side() * INITIAL_FRACTION).max(MIN_SIDE);
        Self {
            x: (display.width - side) / 2.0,
            y: (display.height - side) / 2.0,
            width: side,
            height: side,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn corner(&self, handle: Handle) -> Point {
        let x = if handle.grows_right() {
            self.x + self.width
        } else {
            self.x
        };
        let y = if handle.grows_down() {
            self.y + self.height
        } else {
            self.y
        };
        Point::new(x, y)
    }

    /// The handle within `radius` of `point`, if any.
    pub fn handle_at(&self, point: Point, radius: f64) -> Option<Handle> {
        Handle::ALL.into_iter().find(|handle| {
            let corner = self.corner(*handle);
            (point.x - corner.x).abs() <= radius && (point.y - corner.y).abs() <= radius
        })
    }

    /// Translate by a pointer delta, keeping the whole square in bounds.
    pub(super) fn translated(&self, dx: f64, dy: f64, display: DisplaySize) -> Self {
        Self {
            x: (self.x + dx).clamp(0.0, display.width - self.width),
            y: (self.y + dy).clamp(0.0, display.height - self.height),
            ..*self
        }
    }

    /// Resize by dragging `handle` to `pointer` while `anchor`, the opposite
    /// corner, stays put.
    pub(super) fn resized(anchor: Point, handle: Handle, pointer: Point, display: DisplaySize) -> Self {
        let (dx, room_x) = if handle.grows_right() {
            (pointer.x - anchor.x, display.width - anchor.x)
        } else {
            (anchor.x - pointer.x, anchor.x)
        };
        let (dy, room_y) = if handle.grows_down() {
            (pointer.y - anchor.y, display.height - anchor.y)
        } else {
            (anchor.y - pointer.y, anchor.y)
        };

        // room is at least MIN_SIDE since the anchor came from an in-bounds selection
        let side = dx.min(dy).max(MIN_SIDE).min(room_x.min(room_y));

        Self {
            x: if handle.grows_right() { anchor.x } else { anchor.x - side },
            y: if handle.grows_down() { anchor.y } else { anchor.y - side },
            width: side,
            height: side,
        }
    }

    /// Square off and clamp an arbitrary rectangle. `None` when any
    /// coordinate is not finite.
    pub(super) fn clamped(&self, display: DisplaySize) -> Option<Self> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return None;
        }

        let side = self
            .width
            .min(self.height)
            .clamp(MIN_SIDE, display.shorter_side());

        Some(Self {
            x: self.x.clamp(0.0, display.width - side),
            y: self.y.clamp(0.0, display.height - side),
            width: side,
            height: side,
        })
    }

    /// Scale into natural-resolution pixels, each axis by its own ratio.
    pub fn to_source(&self, display: DisplaySize, natural_width: u32, natural_height: u32) -> SourceRect {
        let scale_x = f64::from(natural_width) / display.width;
        let scale_y = f64::from(natural_height) / display.height;

        let x = ((self.x * scale_x).round() as u32).min(natural_width.saturating_sub(1));
        let y = ((self.y * scale_y).round() as u32).min(natural_height.saturating_sub(1));
        let width = ((self.width * scale_x).round() as u32).clamp(1, natural_width.saturating_sub(x).max(1));
        let height = ((self.height * scale_y).round() as u32).clamp(1, natural_height.saturating_sub(y).max(1));

        SourceRect {
            x,
            y,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_corners() {
        for handle in Handle::ALL {
            assert_eq!(handle.opposite().opposite(), handle);
        }
    }

    #[test]
    fn test_source_rect_stays_inside_image() {
        let display = DisplaySize {
            width: 300.0,
            height: 300.0,
        };
        let rect = CropRect {
            x: 250.0,
            y: 250.0,
            width: 50.0,
            height: 50.0,
        };
        let source = rect.to_source(display, 101, 101);
        assert!(source.x + source.width <= 101);
        assert!(source.y + source.height <= 101);
        assert!(source.width >= 1 && source.height >= 1);
    }

    #[test]
    fn test_non_uniform_scaling() {
        let display = DisplaySize {
            width: 200.0,
            height: 100.0,
        };
        let rect = CropRect {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 50.0,
        };
        assert_eq!(
            rect.to_source(display, 400, 400),
            SourceRect {
                x: 20,
                y: 40,
                width: 100,
                height: 200,
            }
        );
    }
}
