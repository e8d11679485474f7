use crate::error::Result;
use crate::frame::GreyscaleFrame;

/// All commands need to have this trait which gives the address of the command
/// which needs to be send via SPI with activated CommandsPin (Data/Command Pin in CommandMode)
pub(crate) trait Command: Copy {
    fn address(self) -> u8;
}

/// Pixel depth used to show a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// One bit per pixel over the differential old/new protocol
    OneBit {
        /// Run error diffusion before thresholding
        dither: bool,
    },
    /// Two bits per pixel with the 4 level waveform, always dithered
    FourGray,
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode::OneBit { dither: true }
    }
}

/// The functions a GUI layer uses to put frames on the panel
///
/// # Example
///
///```rust, no_run
///# use embedded_hal_mock::eh1::{delay::NoopDelay, digital, spi};
///# fn main() -> Result<(), epd_distiller::error::Error> {
///use epd_distiller::prelude::*;
///#
///# let spi = spi::Mock::new(&[]);
///# let busy = digital::Mock::new(&[]);
///# let dc = digital::Mock::new(&[]);
///# let rst = digital::Mock::new(&[]);
///
///let mut epd = EinkDisplay::new(spi, busy, dc, rst, NoopDelay::new(), Config::default())?;
///
///let frame = GreyscaleFrame::filled(WIDTH, HEIGHT, 0x80);
///epd.update(&frame, DisplayMode::OneBit { dither: true })?;
///
///// show it again later without the caller keeping the pixels around
///epd.reflush()?;
///
///epd.clear(true)?;
///# Ok(())
///# }
///```
pub trait RefreshController {
    /// Shows `frame` in the given mode
    ///
    /// The frame is kept as the last shown frame for [`reflush`](RefreshController::reflush).
    fn update(&mut self, frame: &GreyscaleFrame, mode: DisplayMode) -> Result<()>;

    /// Blanks the panel, optionally powering it off afterwards
    fn clear(&mut self, power_off: bool) -> Result<()>;

    /// Shows the last frame again, in the mode it was shown with
    fn reflush(&mut self) -> Result<()>;

    /// The last successfully shown frame and its mode
    fn last_frame(&self) -> Option<(&GreyscaleFrame, DisplayMode)>;
}
