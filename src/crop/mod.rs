//! Square profile-picture crop tool.
//!
//! The selection lives in display pixels (the size the image is shown at) and
//! is driven by discrete pointer events through an explicit gesture state
//! machine. On confirm it is mapped to natural-resolution pixels and the
//! region is resampled to a fixed-size JPEG.
//!
//! Selection invariants, after every event:
//! `width == height`, `width >= MIN_SIDE`, and the square lies inside
//! `[0, display.width] x [0, display.height]`.

mod geometry;
mod render;

pub use geometry::{CropRect, DisplaySize, Handle, Point, SourceRect};
pub use render::CroppedImage;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest selection side, in display pixels.
pub const MIN_SIDE: f64 = 50.0;
/// Initial selection side as a fraction of the shorter display side.
pub const INITIAL_FRACTION: f64 = 0.8;
/// Distance from a corner, in display pixels, that grabs its resize handle.
pub const HANDLE_RADIUS: f64 = 10.0;
/// Side of the produced image, in pixels.
pub const OUTPUT_SIZE: u32 = 300;
/// JPEG quality of the produced image.
pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CropError {
    #[error("Could not read image: {0}")]
    Unreadable(String),
    #[error("Image has not finished loading")]
    NotLoaded,
    #[error("Displayed image {width}x{height} is smaller than the minimum crop size")]
    TooSmall { width: f64, height: f64 },
    #[error("Crop selection is not a finite rectangle")]
    InvalidSelection,
    #[error("Could not encode cropped image: {0}")]
    Encode(String),
}

/// Discrete input driving the crop tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
}

/// The gesture in progress. At most one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    Moving { origin: Point, start: CropRect },
    Resizing { handle: Handle, anchor: Point },
}

/// A crop submitted alongside an uploaded picture: the selection and the size
/// the image was displayed at when it was made.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropSpec {
    pub display_width: f64,
    pub display_height: f64,
    pub selection: CropRect,
}

/// Crop state for one image, from file selection to confirm.
#[derive(Debug, Clone)]
pub struct CropTool {
    image: DynamicImage,
    display: Option<DisplaySize>,
    selection: Option<CropRect>,
    gesture: Gesture,
}

impl CropTool {
    /// Decode the source image. Fails before any crop state exists when the
    /// data is not a readable image.
    pub fn open(bytes: &[u8]) -> Result<Self, CropError> {
        Self::from_image(render::decode(bytes)?)
    }

    /// Start from an already decoded image. Fails when it has no pixels.
    pub fn from_image(image: DynamicImage) -> Result<Self, CropError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CropError::Unreadable("image has no pixels".to_string()));
        }
        Ok(Self {
            image,
            display: None,
            selection: None,
            gesture: Gesture::Idle,
        })
    }

    /// Natural resolution of the source image.
    pub fn natural_size(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Record the size the image is displayed at and place the initial
    /// centered selection.
    pub fn layout(&mut self, width: f64, height: f64) -> Result<CropRect, CropError> {
        let display = DisplaySize { width, height };
        if !display.fits_min_side() {
            return Err(CropError::TooSmall { width, height });
        }

        let selection = CropRect::initial(display);
        self.display = Some(display);
        self.selection = Some(selection);
        self.gesture = Gesture::Idle;
        Ok(selection)
    }

    pub fn is_loaded(&self) -> bool {
        self.display.is_some()
    }

    pub fn display(&self) -> Option<DisplaySize> {
        self.display
    }

    pub fn selection(&self) -> Option<CropRect> {
        self.selection
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Feed one pointer event. Events before the image is laid out are ignored.
    pub fn handle(&mut self, event: CropEvent) {
        let (Some(display), Some(selection)) = (self.display, self.selection) else {
            return;
        };
        if let CropEvent::PointerDown(point) | CropEvent::PointerMove(point) = event {
            if !point.is_finite() {
                return;
            }
        }

        match (event, self.gesture) {
            (CropEvent::PointerDown(point), Gesture::Idle) => {
                self.gesture = if let Some(handle) = selection.handle_at(point, HANDLE_RADIUS) {
                    Gesture::Resizing {
                        handle,
                        anchor: selection.corner(handle.opposite()),
                    }
                } else if selection.contains(point) {
                    Gesture::Moving {
                        origin: point,
                        start: selection,
                    }
                } else {
                    Gesture::Idle
                };
            }
            (CropEvent::PointerMove(point), Gesture::Moving { origin, start }) => {
                self.selection = Some(start.translated(point.x - origin.x, point.y - origin.y, display));
            }
            (CropEvent::PointerMove(point), Gesture::Resizing { handle, anchor }) => {
                self.selection = Some(CropRect::resized(anchor, handle, point, display));
            }
            (CropEvent::PointerUp, _) => {
                self.gesture = Gesture::Idle;
            }
            _ => {}
        }
    }

    /// Replace the selection with `rect`, squared and clamped into bounds.
    pub fn select(&mut self, rect: CropRect) -> Result<CropRect, CropError> {
        let display = self.display.ok_or(CropError::NotLoaded)?;
        let selection = rect.clamped(display).ok_or(CropError::InvalidSelection)?;
        self.selection = Some(selection);
        self.gesture = Gesture::Idle;
        Ok(selection)
    }

    /// The selection mapped to natural-resolution pixels.
    pub fn source_rect(&self) -> Result<SourceRect, CropError> {
        let (display, selection) = self
            .display
            .zip(self.selection)
            .ok_or(CropError::NotLoaded)?;
        let (natural_width, natural_height) = self.natural_size();
        Ok(selection.to_source(display, natural_width, natural_height))
    }

    /// Produce the cropped picture. Consumes the crop state.
    pub fn confirm(self) -> Result<CroppedImage, CropError> {
        let source = self.source_rect()?;
        render::render(&self.image, source, OUTPUT_SIZE, JPEG_QUALITY)
    }

    /// Open `bytes`, apply a submitted crop and confirm in one step.
    pub fn apply(bytes: &[u8], spec: &CropSpec) -> Result<CroppedImage, CropError> {
        let mut tool = Self::open(bytes)?;
        tool.layout(spec.display_width, spec.display_height)?;
        tool.select(spec.selection)?;
        tool.confirm()
    }
}
