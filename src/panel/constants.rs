//! Waveform table for the 4 gray mode
//!
//! The 1-bit modes run from the OTP waveforms and need no table.

use core::ops::Range;

/// Rows of 7 bytes per transition group, then PLL, power and VCOM_DC scalars
#[rustfmt::skip]
pub(crate) const LUT_4GRAY: [u8; 216] = [
    // VCOM
    0x01, 0x05, 0x20, 0x19, 0x0A, 0x01, 0x01,
    0x05, 0x0A, 0x01, 0x0A, 0x01, 0x01, 0x01,
    0x05, 0x09, 0x02, 0x03, 0x04, 0x01, 0x01,
    0x01, 0x04, 0x04, 0x02, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    // WW
    0x01, 0x05, 0x20, 0x19, 0x0A, 0x01, 0x01,
    0x05, 0x4A, 0x01, 0x8A, 0x01, 0x01, 0x01,
    0x05, 0x49, 0x02, 0x83, 0x84, 0x01, 0x01,
    0x01, 0x84, 0x84, 0x82, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    // R
    0x01, 0x05, 0x20, 0x99, 0x8A, 0x01, 0x01,
    0x05, 0x4A, 0x01, 0x8A, 0x01, 0x01, 0x01,
    0x05, 0x49, 0x82, 0x03, 0x04, 0x01, 0x01,
    0x01, 0x04, 0x04, 0x02, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    // W
    0x01, 0x85, 0x20, 0x99, 0x0A, 0x01, 0x01,
    0x05, 0x4A, 0x01, 0x8A, 0x01, 0x01, 0x01,
    0x05, 0x49, 0x02, 0x83, 0x04, 0x01, 0x01,
    0x01, 0x04, 0x04, 0x02, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    // B
    0x01, 0x85, 0xA0, 0x99, 0x0A, 0x01, 0x01,
    0x05, 0x4A, 0x01, 0x8A, 0x01, 0x01, 0x01,
    0x05, 0x49, 0x02, 0x43, 0x04, 0x01, 0x01,
    0x01, 0x04, 0x04, 0x42, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
    // PLL, VGH/VGL, VSH, VSL, VSHR, VCOM_DC
    0x09, 0x10, 0x3F, 0x3F, 0x00, 0x0B,
];

pub(crate) const LUT_VCOM: Range<usize> = 0..42;
pub(crate) const LUT_WW: Range<usize> = 42..84;
pub(crate) const LUT_R: Range<usize> = 84..126;
pub(crate) const LUT_W: Range<usize> = 126..168;
pub(crate) const LUT_B: Range<usize> = 168..210;
pub(crate) const LUT_PLL: usize = 210;
pub(crate) const LUT_POWER: Range<usize> = 211..215;
pub(crate) const LUT_VCOM_DC: usize = 215;
