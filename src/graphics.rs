//! Graphics support for greyscale frames

use embedded_graphics_core::{
    pixelcolor::{Gray8, GrayColor},
    prelude::*,
};

use crate::frame::GreyscaleFrame;
use crate::panel::{HEIGHT, WIDTH};

/// Display rotation, only 90° increments supported
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRotation {
    /// No rotation
    #[default]
    Rotate0,
    /// Rotate by 90 degrees clockwise
    Rotate90,
    /// Rotate by 180 degrees clockwise
    Rotate180,
    /// Rotate 270 degrees clockwise
    Rotate270,
}

/// For use with embedded_grahics, drawing in frame coordinates
impl DrawTarget for GreyscaleFrame {
    type Color = Gray8;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for pixel in pixels {
            set_pixel(self, DisplayRotation::Rotate0, pixel);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.luma());
        Ok(())
    }
}

impl OriginDimensions for GreyscaleFrame {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

/// Frame to draw on with a rotation applied
///
/// The GUI layer may lay out in landscape while the panel stays portrait.
#[derive(Debug, Clone)]
pub struct Canvas {
    frame: GreyscaleFrame,
    rotation: DisplayRotation,
}

impl Default for Canvas {
    /// White canvas of the panel size
    fn default() -> Self {
        Canvas::new(GreyscaleFrame::filled(WIDTH, HEIGHT, 0xFF))
    }
}

impl Canvas {
    pub fn new(frame: GreyscaleFrame) -> Self {
        Canvas {
            frame,
            rotation: DisplayRotation::default(),
        }
    }

    /// Set the display rotation.
    ///
    /// This only concerns future drawing made to it. Anything aready drawn
    /// stays as it is in the frame.
    pub fn set_rotation(&mut self, rotation: DisplayRotation) {
        self.rotation = rotation;
    }

    /// Get current rotation
    pub fn rotation(&self) -> DisplayRotation {
        self.rotation
    }

    /// The frame in panel orientation
    pub fn frame(&self) -> &GreyscaleFrame {
        &self.frame
    }

    pub fn into_frame(self) -> GreyscaleFrame {
        self.frame
    }
}

impl DrawTarget for Canvas {
    type Color = Gray8;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for pixel in pixels {
            set_pixel(&mut self.frame, self.rotation, pixel);
        }
        Ok(())
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        let (width, height) = self.frame.dimensions();
        match self.rotation {
            DisplayRotation::Rotate0 | DisplayRotation::Rotate180 => Size::new(width, height),
            DisplayRotation::Rotate90 | DisplayRotation::Rotate270 => Size::new(height, width),
        }
    }
}

// Shared by the frame and the canvas: maps the point through the rotation
// and writes the luma, points outside the frame are dropped.
fn set_pixel(frame: &mut GreyscaleFrame, rotation: DisplayRotation, pixel: Pixel<Gray8>) {
    let Pixel(point, color) = pixel;
    let (width, height) = (frame.width() as i32, frame.height() as i32);

    // final coordinates
    let (x, y) = match rotation {
        // as i32 = never use more than 2 billion pixel per line or per column
        DisplayRotation::Rotate0 => (point.x, point.y),
        DisplayRotation::Rotate90 => (width - 1 - point.y, point.x),
        DisplayRotation::Rotate180 => (width - 1 - point.x, height - 1 - point.y),
        DisplayRotation::Rotate270 => (point.y, height - 1 - point.x),
    };

    if x < 0 || y < 0 {
        return;
    }
    frame.set_pixel(x as u32, y as u32, color.luma());
}
