use image::{Rgba, RgbaImage};

use crate::composite::blend_pixel;
use crate::config::Theme;

/// Build the static background canvas: a vertical gradient with a faint
/// grid. Built once per run and cloned for every frame.
pub fn build_background(width: u32, height: u32, theme: &Theme) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);

    let denom = (height.saturating_sub(1)).max(1) as f64;
    for y in 0..height {
        let t = f64::from(y) / denom;
        let r = lerp_channel(theme.bg_top[0], theme.bg_bottom[0], t);
        let g = lerp_channel(theme.bg_top[1], theme.bg_bottom[1], t);
        let b = lerp_channel(theme.bg_top[2], theme.bg_bottom[2], t);
        for x in 0..width {
            img.put_pixel(x, y, Rgba([r, g, b, 255]));
        }
    }

    let [gr, gg, gb, ga] = theme.grid_rgba;
    let spacing = theme.grid_spacing.max(1);
    for x in (0..=width.saturating_sub(1)).step_by(spacing as usize) {
        for y in 0..height {
            blend_pixel(&mut img, i64::from(x), i64::from(y), [gr, gg, gb], ga);
        }
    }
    for y in (0..=height.saturating_sub(1)).step_by(spacing as usize) {
        for x in 0..width {
            blend_pixel(&mut img, i64::from(x), i64::from(y), [gr, gg, gb], ga);
        }
    }

    img
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(a) * (1.0 - t) + f64::from(b) * t) as u8
}
