//! A driver for the 240x416 E-Ink panel of the Distiller board via SPI
//!
//! This driver was built using [`embedded-hal`] traits.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/1.0
//!
//! Frames are 8 bit greyscale images. They are shown either as 1-bit images,
//! optionally with Floyd-Steinberg dithering, or with four gray levels.
//!
//! # Requirements
//!
//! ### SPI
//!
//! - MISO is not connected/available
//! - SPI_MODE_0 is used (CPHL = 0, CPOL = 0)
//! - 8 bits per word, MSB first
//! - The board runs the bus at 30Mhz
//!
//! ### Other....
//!
//! - Busy is low while the panel works, DC is high for data, RST is active low
//! - A 1-bit plane is `ceil(width / 8) * height` bytes, 12480 for the full panel
//!
//! # Examples
//!
//! ```ignore
//! use epd_distiller::prelude::*;
//!
//! let mut epd = EinkDisplay::new(spi, busy, dc, rst, delay, Config::default())?;
//!
//! let frame = GreyscaleFrame::open("picture.png")?;
//!
//! // all levels, the panel goes to sleep afterwards
//! epd.update(&frame, DisplayMode::FourGray)?;
//!
//! // quick 1-bit refreshes
//! epd.update(&frame, DisplayMode::OneBit { dither: true })?;
//!
//! epd.clear(true)?;
//! ```
//!
//! With the `linux` feature, [`linux::Board::detect`] and [`linux::open_sysfs`] /
//! [`linux::open_cdev`] wire everything up on the supported boards.

pub mod animation;
pub mod backend;
pub mod config;
pub mod display;
pub mod dither;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod panel;

#[cfg(feature = "graphics")]
pub mod graphics;

mod traits;
pub use traits::{DisplayMode, RefreshController};

/// Interface for the physical connection between display and the controlling device
mod interface;
pub use interface::{ControlLine, PanelHandle};

#[cfg(feature = "linux")]
pub mod linux;

#[cfg(test)]
pub(crate) mod mock;

pub mod prelude {
    pub use crate::animation::SharedDisplay;
    pub use crate::config::{Config, PanelPins, SpiSettings};
    pub use crate::display::EinkDisplay;
    pub use crate::error::{Error, Result};
    pub use crate::frame::GreyscaleFrame;
    pub use crate::panel::{PanelState, HEIGHT, WIDTH};
    pub use crate::traits::{DisplayMode, RefreshController};
    pub use crate::SPI_MODE;

    #[cfg(feature = "graphics")]
    pub use crate::graphics::{Canvas, DisplayRotation};
}

use embedded_hal::spi::{Mode, Phase, Polarity};

/// SPI mode -
/// For more infos see [Requirements: SPI](index.html#spi)
pub const SPI_MODE: Mode = Mode {
    phase: Phase::CaptureOnFirstTransition,
    polarity: Polarity::IdleLow,
};

/// Computes the needed buffer length. Takes care of rounding up in case width
/// is not divisible by 8.
pub(crate) const fn buffer_len(width: usize, height: usize) -> usize {
    (width + 7) / 8 * height
}
