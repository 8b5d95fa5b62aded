use std::path::PathBuf;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use image::RgbaImage;

use crate::composite::blend_pixel;
use crate::config::FontConfig;

/// Font used for keyword overlays.
///
/// Resolution walks an ordered candidate list (environment override first,
/// then fixed platform paths). When nothing resolves we fall back to a
/// built-in 5x7 bitmap glyph set scaled to the configured size, so a missing
/// system font degrades the look but never fails the render.
pub enum KeywordFont {
    Outline { font: FontArc, size: f32 },
    Builtin { scale: u32 },
}

impl KeywordFont {
    pub fn resolve(cfg: &FontConfig) -> Self {
        let mut candidates: Vec<PathBuf> = Vec::with_capacity(cfg.candidates.len() + 1);
        if let Ok(path) = std::env::var(&cfg.env_override)
            && !path.is_empty()
        {
            candidates.push(PathBuf::from(path));
        }
        candidates.extend(cfg.candidates.iter().cloned());

        for path in &candidates {
            if !path.exists() {
                continue;
            }
            match std::fs::read(path) {
                Ok(bytes) => match FontArc::try_from_vec(bytes) {
                    Ok(font) => {
                        tracing::debug!(path = %path.display(), "resolved keyword font");
                        return Self::Outline {
                            font,
                            size: cfg.size,
                        };
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), %err, "unusable font candidate");
                    }
                },
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "unreadable font candidate");
                }
            }
        }

        tracing::warn!("no font candidate resolved; using builtin bitmap glyphs");
        let scale = ((cfg.size / 8.0).round() as u32).max(1);
        Self::Builtin { scale }
    }

    fn char_width(&self, ch: char) -> f64 {
        match self {
            Self::Outline { font, size } => {
                let scaled = font.as_scaled(PxScale::from(*size));
                f64::from(scaled.h_advance(font.glyph_id(ch)))
            }
            Self::Builtin { scale } => f64::from(5 * scale),
        }
    }

    fn char_height(&self, ch: char) -> f64 {
        match self {
            Self::Outline { font, size } => {
                let glyph = font
                    .glyph_id(ch)
                    .with_scale_and_position(PxScale::from(*size), point(0.0, 0.0));
                font.outline_glyph(glyph)
                    .map(|o| f64::from(o.px_bounds().height()))
                    .unwrap_or(0.0)
            }
            Self::Builtin { scale } => f64::from(7 * scale),
        }
    }

    /// Measure `text` with manual letter tracking: each glyph's advance plus
    /// `tracking` between consecutive characters, no trailing tracking.
    /// Height is the tallest glyph.
    pub fn measure(&self, text: &str, tracking: f64) -> (f64, f64) {
        let mut total_w = 0.0f64;
        let mut max_h = 0.0f64;
        let mut chars = 0usize;
        for ch in text.chars() {
            total_w += self.char_width(ch) + tracking;
            max_h = max_h.max(self.char_height(ch));
            chars += 1;
        }
        if chars > 0 {
            total_w -= tracking;
        }
        (total_w.max(0.0).ceil(), max_h.ceil())
    }

    /// Draw `text` character by character with a manual horizontal advance.
    pub fn draw_text_tracked(
        &self,
        img: &mut RgbaImage,
        x: f64,
        y: f64,
        text: &str,
        rgb: [u8; 3],
        alpha: u8,
        tracking: f64,
    ) {
        if alpha == 0 {
            return;
        }
        let mut pen_x = x;
        for ch in text.chars() {
            match self {
                Self::Outline { font, size } => {
                    let scale = PxScale::from(*size);
                    let scaled = font.as_scaled(scale);
                    let baseline = y + f64::from(scaled.ascent());
                    let glyph = font
                        .glyph_id(ch)
                        .with_scale_and_position(scale, point(pen_x as f32, baseline as f32));
                    if let Some(outline) = font.outline_glyph(glyph) {
                        let bounds = outline.px_bounds();
                        outline.draw(|gx, gy, cov| {
                            let a = (cov * f32::from(alpha)).round() as i64;
                            if a > 0 {
                                blend_pixel(
                                    img,
                                    i64::from(bounds.min.x as i32) + i64::from(gx),
                                    i64::from(bounds.min.y as i32) + i64::from(gy),
                                    rgb,
                                    a.min(255) as u8,
                                );
                            }
                        });
                    }
                }
                Self::Builtin { scale } => {
                    draw_bitmap_glyph(img, pen_x as i64, y as i64, ch, *scale, rgb, alpha);
                }
            }
            pen_x += self.char_width(ch) + tracking;
        }
    }
}

fn draw_bitmap_glyph(
    img: &mut RgbaImage,
    x: i64,
    y: i64,
    ch: char,
    scale: u32,
    rgb: [u8; 3],
    alpha: u8,
) {
    let code = ch as u32;
    if !(0x20..=0x7E).contains(&code) {
        return;
    }
    let columns = &FONT_5X7[(code - 0x20) as usize];
    let s = i64::from(scale);
    for (col, bits) in columns.iter().enumerate() {
        for row in 0..7u32 {
            if bits & (1 << row) == 0 {
                continue;
            }
            let bx = x + col as i64 * s;
            let by = y + i64::from(row) * s;
            for dy in 0..s {
                for dx in 0..s {
                    blend_pixel(img, bx + dx, by + dy, rgb, alpha);
                }
            }
        }
    }
}

/// Classic 5x7 column-major bitmap glyphs for ASCII 0x20..=0x7F.
/// Bit 0 of each byte is the top row.
const FONT_5X7: [[u8; 5]; 96] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // '!'
    [0x00, 0x07, 0x00, 0x07, 0x00], // '"'
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // '#'
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // '$'
    [0x23, 0x13, 0x08, 0x64, 0x62], // '%'
    [0x36, 0x49, 0x55, 0x22, 0x50], // '&'
    [0x00, 0x05, 0x03, 0x00, 0x00], // '\''
    [0x00, 0x1C, 0x22, 0x41, 0x00], // '('
    [0x00, 0x41, 0x22, 0x1C, 0x00], // ')'
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // '*'
    [0x08, 0x08, 0x3E, 0x08, 0x08], // '+'
    [0x00, 0x50, 0x30, 0x00, 0x00], // ','
    [0x08, 0x08, 0x08, 0x08, 0x08], // '-'
    [0x00, 0x60, 0x60, 0x00, 0x00], // '.'
    [0x20, 0x10, 0x08, 0x04, 0x02], // '/'
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // '0'
    [0x00, 0x42, 0x7F, 0x40, 0x00], // '1'
    [0x42, 0x61, 0x51, 0x49, 0x46], // '2'
    [0x21, 0x41, 0x45, 0x4B, 0x31], // '3'
    [0x18, 0x14, 0x12, 0x7F, 0x10], // '4'
    [0x27, 0x45, 0x45, 0x45, 0x39], // '5'
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // '6'
    [0x01, 0x71, 0x09, 0x05, 0x03], // '7'
    [0x36, 0x49, 0x49, 0x49, 0x36], // '8'
    [0x06, 0x49, 0x49, 0x29, 0x1E], // '9'
    [0x00, 0x36, 0x36, 0x00, 0x00], // ':'
    [0x00, 0x56, 0x36, 0x00, 0x00], // ';'
    [0x00, 0x08, 0x14, 0x22, 0x41], // '<'
    [0x14, 0x14, 0x14, 0x14, 0x14], // '='
    [0x41, 0x22, 0x14, 0x08, 0x00], // '>'
    [0x02, 0x01, 0x51, 0x09, 0x06], // '?'
    [0x32, 0x49, 0x79, 0x41, 0x3E], // '@'
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // 'A'
    [0x7F, 0x49, 0x49, 0x49, 0x36], // 'B'
    [0x3E, 0x41, 0x41, 0x41, 0x22], // 'C'
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // 'D'
    [0x7F, 0x49, 0x49, 0x49, 0x41], // 'E'
    [0x7F, 0x09, 0x09, 0x01, 0x01], // 'F'
    [0x3E, 0x41, 0x41, 0x51, 0x32], // 'G'
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // 'H'
    [0x00, 0x41, 0x7F, 0x41, 0x00], // 'I'
    [0x20, 0x40, 0x41, 0x3F, 0x01], // 'J'
    [0x7F, 0x08, 0x14, 0x22, 0x41], // 'K'
    [0x7F, 0x40, 0x40, 0x40, 0x40], // 'L'
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // 'M'
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // 'N'
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // 'O'
    [0x7F, 0x09, 0x09, 0x09, 0x06], // 'P'
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // 'Q'
    [0x7F, 0x09, 0x19, 0x29, 0x46], // 'R'
    [0x46, 0x49, 0x49, 0x49, 0x31], // 'S'
    [0x01, 0x01, 0x7F, 0x01, 0x01], // 'T'
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // 'U'
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // 'V'
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // 'W'
    [0x63, 0x14, 0x08, 0x14, 0x63], // 'X'
    [0x07, 0x08, 0x70, 0x08, 0x07], // 'Y'
    [0x61, 0x51, 0x49, 0x45, 0x43], // 'Z'
    [0x00, 0x7F, 0x41, 0x41, 0x00], // '['
    [0x02, 0x04, 0x08, 0x10, 0x20], // '\\'
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ']'
    [0x04, 0x02, 0x01, 0x02, 0x04], // '^'
    [0x40, 0x40, 0x40, 0x40, 0x40], // '_'
    [0x00, 0x01, 0x02, 0x04, 0x00], // '`'
    [0x20, 0x54, 0x54, 0x54, 0x78], // 'a'
    [0x7F, 0x48, 0x44, 0x44, 0x38], // 'b'
    [0x38, 0x44, 0x44, 0x44, 0x20], // 'c'
    [0x38, 0x44, 0x44, 0x48, 0x7F], // 'd'
    [0x38, 0x54, 0x54, 0x54, 0x18], // 'e'
    [0x08, 0x7E, 0x09, 0x01, 0x02], // 'f'
    [0x08, 0x14, 0x54, 0x54, 0x3C], // 'g'
    [0x7F, 0x08, 0x04, 0x04, 0x78], // 'h'
    [0x00, 0x44, 0x7D, 0x40, 0x00], // 'i'
    [0x20, 0x40, 0x44, 0x3D, 0x00], // 'j'
    [0x00, 0x7F, 0x10, 0x28, 0x44], // 'k'
    [0x00, 0x41, 0x7F, 0x40, 0x00], // 'l'
    [0x7C, 0x04, 0x18, 0x04, 0x78], // 'm'
    [0x7C, 0x08, 0x04, 0x04, 0x78], // 'n'
    [0x38, 0x44, 0x44, 0x44, 0x38], // 'o'
    [0x7C, 0x14, 0x14, 0x14, 0x08], // 'p'
    [0x08, 0x14, 0x14, 0x18, 0x7C], // 'q'
    [0x7C, 0x08, 0x04, 0x04, 0x08], // 'r'
    [0x48, 0x54, 0x54, 0x54, 0x20], // 's'
    [0x04, 0x3F, 0x44, 0x40, 0x20], // 't'
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // 'u'
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // 'v'
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // 'w'
    [0x44, 0x28, 0x10, 0x28, 0x44], // 'x'
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // 'y'
    [0x44, 0x64, 0x54, 0x4C, 0x44], // 'z'
    [0x00, 0x08, 0x36, 0x41, 0x00], // '{'
    [0x00, 0x00, 0x7F, 0x00, 0x00], // '|'
    [0x00, 0x41, 0x36, 0x08, 0x00], // '}'
    [0x08, 0x08, 0x2A, 0x1C, 0x08], // '~'
    [0x00, 0x00, 0x00, 0x00, 0x00], // DEL
];
