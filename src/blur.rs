use image::RgbaImage;

use crate::error::{GlowgridError, GlowgridResult};

/// Soft-glow filter for the particle overlay.
///
/// A separable gaussian with q16 fixed-point weights. The kernel is baked
/// at construction, so the per-frame cost is the two convolution passes
/// only. Channels are filtered independently (straight alpha): the overlay
/// is drawn with replacement and composited after the blur.
pub struct GlowPass {
    kernel: Vec<u32>,
}

impl GlowPass {
    pub fn new(radius: u32, sigma: f32) -> GlowgridResult<Self> {
        if radius == 0 {
            return Err(GlowgridError::validation("glow radius must be >= 1"));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(GlowgridError::validation("glow sigma must be > 0"));
        }
        Ok(Self {
            kernel: kernel_q16(radius as usize, f64::from(sigma)),
        })
    }

    /// Blur the overlay into a new buffer of the same size.
    pub fn apply(&self, overlay: &RgbaImage) -> RgbaImage {
        let (w, h) = overlay.dimensions();
        let mut tmp = RgbaImage::new(w, h);
        let mut out = RgbaImage::new(w, h);
        convolve(overlay.as_raw(), &mut tmp, w, h, &self.kernel, Axis::X);
        convolve(tmp.as_raw(), &mut out, w, h, &self.kernel, Axis::Y);
        out
    }
}

/// Symmetric gaussian taps normalized to sum to exactly 1.0 in q16.
fn kernel_q16(radius: usize, sigma: f64) -> Vec<u32> {
    let denom = 2.0 * sigma * sigma;
    let mut taps = vec![0.0f64; 2 * radius + 1];
    for i in 0..=radius {
        let w = (-((i * i) as f64) / denom).exp();
        taps[radius + i] = w;
        taps[radius - i] = w;
    }

    let total: f64 = taps.iter().sum();
    let mut kernel: Vec<u32> = taps
        .iter()
        .map(|w| ((w / total) * 65536.0).round() as u32)
        .collect();

    // Rounding drift lands on the center tap.
    let sum: i64 = kernel.iter().map(|&v| i64::from(v)).sum();
    kernel[radius] = (i64::from(kernel[radius]) + (65536 - sum)).clamp(0, 65536) as u32;
    kernel
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// One clamped-edge convolution pass along `axis`.
fn convolve(src: &[u8], dst: &mut [u8], width: u32, height: u32, kernel: &[u32], axis: Axis) {
    let radius = (kernel.len() / 2) as i64;
    let w = i64::from(width);
    let h = i64::from(height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (tap, &weight) in kernel.iter().enumerate() {
                let offset = tap as i64 - radius;
                let (sx, sy) = match axis {
                    Axis::X => ((x + offset).clamp(0, w - 1), y),
                    Axis::Y => (x, (y + offset).clamp(0, h - 1)),
                };
                let idx = ((sy * w + sx) * 4) as usize;
                for c in 0..4 {
                    acc[c] += u64::from(weight) * u64::from(src[idx + c]);
                }
            }
            let idx = ((y * w + x) * 4) as usize;
            for c in 0..4 {
                dst[idx + c] = ((acc[c] + 32768) >> 16).min(255) as u8;
            }
        }
    }
}
