//! Greyscale frames handed over by the GUI layer

use crate::error::{Error, Result};

/// Row-major 8 bit greyscale image, 0 is black and 255 is white
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreyscaleFrame {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl GreyscaleFrame {
    /// Black frame of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    /// Frame where every sample is `value`
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        GreyscaleFrame {
            width,
            height,
            samples: vec![value; width as usize * height as usize],
        }
    }

    /// Takes ownership of `samples`, which must hold exactly `width * height` bytes
    pub fn from_samples(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            let rows = if width == 0 {
                0
            } else {
                samples.len() / width as usize
            };
            return Err(Error::FrameSize {
                expected: (width, height),
                actual: (width, u32::try_from(rows).unwrap_or(u32::MAX)),
            });
        }
        Ok(GreyscaleFrame {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Sample at `(x, y)`, `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        self.index(x, y).map(|i| self.samples[i])
    }

    /// Writes one sample, coordinates outside the frame are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u8) {
        if let Some(i) = self.index(x, y) {
            self.samples[i] = value;
        }
    }

    /// Sets every sample to `value`
    pub fn fill(&mut self, value: u8) {
        self.samples.fill(value);
    }

    /// Same frame with the row order reversed
    ///
    /// The panel scans from the bottom row up, so both encoders work on this.
    pub fn flipped_vertically(&self) -> Self {
        let width = self.width as usize;
        let samples = if width == 0 {
            Vec::new()
        } else {
            self.samples
                .chunks_exact(width)
                .rev()
                .flatten()
                .copied()
                .collect()
        };
        GreyscaleFrame {
            width: self.width,
            height: self.height,
            samples,
        }
    }

    /// Copies `overlay` into the middle of this frame
    ///
    /// An overlay larger than the frame is cropped around its own centre.
    pub fn paste_centered(&mut self, overlay: &GreyscaleFrame) {
        let (dst_x, src_x, cols) = center_span(self.width, overlay.width);
        let (dst_y, src_y, rows) = center_span(self.height, overlay.height);
        if cols == 0 {
            return;
        }

        for row in 0..rows {
            let src = (src_y + row) * overlay.width as usize + src_x;
            let dst = (dst_y + row) * self.width as usize + dst_x;
            self.samples[dst..dst + cols].copy_from_slice(&overlay.samples[src..src + cols]);
        }
    }

    /// Same frame composed over `self`, leaving `self` untouched
    pub fn composed_with(&self, overlay: &GreyscaleFrame) -> Self {
        let mut frame = self.clone();
        frame.paste_centered(overlay);
        frame
    }
}

/// Offsets into destination and source plus the overlapping length along one axis
fn center_span(dst_len: u32, src_len: u32) -> (usize, usize, usize) {
    let (dst_len, src_len) = (dst_len as usize, src_len as usize);
    if src_len <= dst_len {
        ((dst_len - src_len) / 2, 0, src_len)
    } else {
        (0, (src_len - dst_len) / 2, dst_len)
    }
}

#[cfg(feature = "image")]
mod file {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::GreyscaleFrame;
    use crate::error::{Error, Result};

    const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

    impl GreyscaleFrame {
        /// Decodes an image file and converts it to 8 bit luma
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let luma = image::open(path)
                .map_err(|source| Error::Image {
                    path: path.to_path_buf(),
                    source,
                })?
                .into_luma8();
            let (width, height) = luma.dimensions();
            GreyscaleFrame::from_samples(width, height, luma.into_raw())
        }
    }

    /// Loads every png/jpeg file of `dir`, ordered by file name
    pub fn load_frame_dir(dir: impl AsRef<Path>) -> Result<Vec<GreyscaleFrame>> {
        let dir = dir.as_ref();
        let io_error = |source| Error::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
            if is_image && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        log::debug!("loading {} frames from {}", paths.len(), dir.display());
        paths.iter().map(GreyscaleFrame::open).collect()
    }
}

#[cfg(feature = "image")]
pub use self::file::load_frame_dir;
