use embedded_hal::{digital, spi};
use thiserror::Error;

use crate::panel::PanelState;

/// Failure of the physical connection: the SPI bus or one of the control lines
#[derive(Debug, Error)]
pub enum TransportError {
    /// Encountered an SPI error
    #[error("spi transfer failed: {0}")]
    Spi(spi::ErrorKind),

    /// Encountered an error on Busy GPIO
    #[error("reading the busy line failed: {0}")]
    Busy(digital::ErrorKind),

    /// Encountered an error on DC GPIO
    #[error("driving the data/command line failed: {0}")]
    Dc(digital::ErrorKind),

    /// Encountered an error on RST GPIO
    #[error("driving the reset line failed: {0}")]
    Rst(digital::ErrorKind),

    /// A GPIO line or the SPI device node could not be acquired
    #[error("could not claim {resource}: {reason}")]
    Claim { resource: String, reason: String },
}

impl TransportError {
    pub(crate) fn claim(resource: impl core::fmt::Display, reason: impl core::fmt::Display) -> Self {
        TransportError::Claim {
            resource: resource.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Epd error type
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The busy line did not release within the configured ceiling
    #[error("panel still busy after {waited_ms}ms")]
    PanelTimeout { waited_ms: u32 },

    /// A sequence was requested that the panel can not accept in its current state
    #[error("{operation} is not allowed while the panel is {state:?}")]
    ProtocolState {
        operation: &'static str,
        state: PanelState,
    },

    /// The frame does not match the panel geometry
    #[error("frame is {}x{}, expected {}x{}", actual.0, actual.1, expected.0, expected.1)]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Reading a file or directory failed
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// An image file could not be decoded
    #[cfg(feature = "image")]
    #[error("could not decode {}: {source}", path.display())]
    Image {
        path: std::path::PathBuf,
        source: image::ImageError,
    },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
