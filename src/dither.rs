//! Floyd-Steinberg error diffusion towards the four panel levels

/// Distance between two adjacent output levels (0, 85, 170, 255)
pub const LEVEL_STEP: f32 = 85.0;

/// Nearest of the four panel levels
///
/// The input is clipped to 0..=255 first. Ties round to the even multiple,
/// which keeps 127.5 and friends stable across platforms.
pub fn quantize(value: f32) -> f32 {
    (value.clamp(0.0, 255.0) / LEVEL_STEP).round_ties_even() * LEVEL_STEP
}

/// Diffuses the quantization error of `samples` in place
///
/// `samples` is a row-major `width` x `height` buffer. Pixels are visited row
/// by row for `y` in `0..height - 1` and `x` in `1..width - 1`; the first and
/// last column and the last row only receive error, they are never quantized.
///
/// # Panics
///
/// If `samples` is shorter than `width * height`.
pub fn floyd_steinberg(samples: &mut [f32], width: usize, height: usize) {
    assert!(samples.len() >= width * height, "buffer smaller than frame");
    if width < 3 || height < 2 {
        return;
    }

    for y in 0..height - 1 {
        for x in 1..width - 1 {
            let idx = y * width + x;
            let old = samples[idx];
            let new = quantize(old);
            samples[idx] = new;

            let error = old - new;
            let below = idx + width;
            samples[idx + 1] += error * 7.0 / 16.0;
            samples[below - 1] += error * 3.0 / 16.0;
            samples[below] += error * 5.0 / 16.0;
            samples[below + 1] += error / 16.0;
        }
    }
}

/// Converts 8 bit samples and dithers them
pub fn dither(samples: &[u8], width: usize, height: usize) -> Vec<f32> {
    let mut buffer: Vec<f32> = samples.iter().map(|s| f32::from(*s)).collect();
    floyd_steinberg(&mut buffer, width, height);
    buffer
}
