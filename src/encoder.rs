//! Conversion of greyscale frames into the packed planes the panel expects
//!
//! Samples are first sorted into four buckets with the breakpoints 64, 128 and
//! 192 (a sample equal to a breakpoint falls into the lower bucket). 1-bit
//! planes keep the upper two buckets as white, 4 gray planes store the bucket
//! number as a 2 bit code. Both encoders work on the vertically flipped frame.

use bit_field::BitField;

use crate::dither;
use crate::frame::GreyscaleFrame;

/// Bucket breakpoints
const BREAKPOINTS: [f32; 3] = [64.0, 128.0, 192.0];

/// Sample value each 2 bit code stands for
pub const GRAY_LEVELS: [u8; 4] = [0x00, 0x55, 0xAA, 0xFF];

/// Bits per pixel of a [`Bitplane`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// Monochrome, 8 pixels per byte
    One,
    /// 4 gray, 4 pixels per byte
    Two,
}

impl BitDepth {
    pub fn bits(self) -> usize {
        match self {
            BitDepth::One => 1,
            BitDepth::Two => 2,
        }
    }

    /// Bytes of one row, the last byte is padded
    pub fn stride(self, width: u32) -> usize {
        (width as usize * self.bits() + 7) / 8
    }
}

/// Packed pixels, MSB first, every row starting on a byte boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitplane {
    width: u32,
    height: u32,
    depth: BitDepth,
    data: Vec<u8>,
}

impl Bitplane {
    /// Plane with every bit cleared
    pub fn zeroed(width: u32, height: u32, depth: BitDepth) -> Self {
        Bitplane {
            width,
            height,
            depth,
            data: vec![0; depth.stride(width) * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn stride(&self) -> usize {
        self.depth.stride(self.width)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pixel code at `(x, y)` in panel order, `None` outside the plane
    pub fn code(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bits = self.depth.bits();
        let bit = x as usize * bits;
        let byte = self.data[y as usize * self.stride() + bit / 8];
        let lsb = 8 - bits - bit % 8;
        Some(byte.get_bits(lsb..lsb + bits))
    }

    fn set_code(&mut self, x: usize, y: usize, code: u8) {
        let bits = self.depth.bits();
        let bit = x * bits;
        let idx = y * self.stride() + bit / 8;
        let lsb = 8 - bits - bit % 8;
        self.data[idx].set_bits(lsb..lsb + bits, code);
    }
}

/// The two 1-bit planes a 4 gray frame is transmitted as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FourGrayPlanes {
    /// High bit of every code, sent with the old data command
    pub old: Bitplane,
    /// Low bit of every code, sent with the new data command
    pub new: Bitplane,
}

/// Bucket 0..=3 of a sample
pub fn level(value: f32) -> u8 {
    BREAKPOINTS.iter().filter(|b| value > **b).count() as u8
}

/// Dithered or plain samples of the flipped frame, row-major
fn prepared_samples(frame: &GreyscaleFrame, dither: bool) -> Vec<f32> {
    let flipped = frame.flipped_vertically();
    if dither {
        dither::dither(
            flipped.samples(),
            frame.width() as usize,
            frame.height() as usize,
        )
    } else {
        flipped.samples().iter().map(|s| f32::from(*s)).collect()
    }
}

fn pack(frame: &GreyscaleFrame, dither: bool, depth: BitDepth, code: fn(u8) -> u8) -> Bitplane {
    let mut plane = Bitplane::zeroed(frame.width(), frame.height(), depth);
    let width = frame.width() as usize;
    if width == 0 {
        return plane;
    }

    let samples = prepared_samples(frame, dither);
    for (y, row) in samples.chunks_exact(width).enumerate() {
        for (x, value) in row.iter().enumerate() {
            plane.set_code(x, y, code(level(*value)));
        }
    }
    plane
}

/// 1 bit per pixel, set for white
///
/// Without dithering every sample above 128 becomes white.
pub fn encode_1bit(frame: &GreyscaleFrame, dither: bool) -> Bitplane {
    pack(frame, dither, BitDepth::One, |bucket| u8::from(bucket >= 2))
}

/// 2 bits per pixel, always dithered, the code is the bucket number
pub fn encode_4gray(frame: &GreyscaleFrame) -> Bitplane {
    pack(frame, true, BitDepth::Two, |bucket| bucket)
}

/// Splits a 4 gray plane into the two planes the panel receives
///
/// Works row by row, so both halves keep the 1-bit row stride.
pub fn split_4gray(plane: &Bitplane) -> FourGrayPlanes {
    let mut old = Bitplane::zeroed(plane.width, plane.height, BitDepth::One);
    let mut new = old.clone();
    for y in 0..plane.height {
        for x in 0..plane.width {
            let code = plane.code(x, y).unwrap_or_default();
            old.set_code(x as usize, y as usize, u8::from(code.get_bit(1)));
            new.set_code(x as usize, y as usize, u8::from(code.get_bit(0)));
        }
    }
    FourGrayPlanes { old, new }
}

/// Turns a plane back into a frame in the caller's orientation
///
/// 1-bit pixels become 0 or 255, 4 gray pixels the matching [`GRAY_LEVELS`].
pub fn decode(plane: &Bitplane) -> GreyscaleFrame {
    let mut frame = GreyscaleFrame::new(plane.width, plane.height);
    let bottom = plane.height.saturating_sub(1);
    for y in 0..plane.height {
        for x in 0..plane.width {
            let code = plane.code(x, y).unwrap_or_default();
            let value = match plane.depth {
                BitDepth::One if code == 0 => 0x00,
                BitDepth::One => 0xFF,
                BitDepth::Two => GRAY_LEVELS[usize::from(code)],
            };
            frame.set_pixel(x, bottom - y, value);
        }
    }
    frame
}
