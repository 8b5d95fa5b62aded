use image::RgbaImage;

use crate::error::{GlowgridError, GlowgridResult};

pub type Rgba8 = [u8; 4];

/// Straight-alpha `over` for an opaque destination.
///
/// The frame being composited onto is always fully opaque (it starts as the
/// background canvas), which keeps the math division-free.
pub fn over_opaque(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return [src[0], src[1], src[2], 255];
    }

    let inv = 255u16 - sa;
    let mut out = [0u8; 4];
    for i in 0..3 {
        out[i] = mul_div255(u16::from(src[i]), sa).saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out[3] = 255;
    out
}

pub fn over_in_place_opaque(dst: &mut [u8], src: &[u8]) -> GlowgridResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(GlowgridError::render(
            "over_in_place_opaque expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over_opaque([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Blend one coverage-weighted pixel into the frame. Out-of-bounds writes
/// are dropped.
pub fn blend_pixel(img: &mut RgbaImage, x: i64, y: i64, rgb: [u8; 3], alpha: u8) {
    if x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    let out = over_opaque(px.0, [rgb[0], rgb[1], rgb[2], alpha]);
    px.0 = out;
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 255];
        assert_eq!(over_opaque(dst, [255, 255, 255, 0]), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        assert_eq!(over_opaque(dst, [255, 0, 0, 255]), [255, 0, 0, 255]);
    }

    #[test]
    fn over_half_alpha_mixes_evenly() {
        let out = over_opaque([0, 0, 0, 255], [255, 0, 0, 128]);
        assert!((i32::from(out[0]) - 128).abs() <= 1);
        assert_eq!(out[3], 255);
    }

    #[test]
    fn over_in_place_rejects_mismatched_buffers() {
        let mut dst = vec![0u8; 8];
        let src = vec![0u8; 4];
        assert!(over_in_place_opaque(&mut dst, &src).is_err());
    }

    #[test]
    fn blend_pixel_ignores_out_of_bounds() {
        let mut img = RgbaImage::new(4, 4);
        blend_pixel(&mut img, -1, 0, [255, 255, 255], 255);
        blend_pixel(&mut img, 0, 99, [255, 255, 255], 255);
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn blend_pixel_writes_in_bounds() {
        let mut img = RgbaImage::new(4, 4);
        img.get_pixel_mut(1, 1).0 = [0, 0, 0, 255];
        blend_pixel(&mut img, 1, 1, [200, 100, 50], 255);
        assert_eq!(img.get_pixel(1, 1).0, [200, 100, 50, 255]);
    }
}
