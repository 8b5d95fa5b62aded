use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};

use crate::config::KeywordConfig;
use crate::error::{GlowgridError, GlowgridResult};
use crate::text::KeywordFont;

/// Layout seed derived from the script text: the first four bytes of its
/// SHA-256 digest. Identical scripts reproduce identical layouts.
pub fn script_seed(script: &str) -> u64 {
    let digest = Sha256::digest(script.as_bytes());
    u64::from(u32::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3],
    ]))
}

/// Parse a newline-delimited keyword list. Blank lines and lines starting
/// with `#` are ignored; at most `max` keywords are kept.
pub fn parse_keywords(input: &str, max: usize) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .take(max)
        .map(str::to_string)
        .collect()
}

/// An accepted keyword placement with its measured text box.
#[derive(Clone, Debug)]
pub struct PlacedKeyword {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Axis-aligned box used for overlap rejection.
#[derive(Clone, Copy, Debug)]
struct Aabb {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Aabb {
    fn disjoint(&self, other: &Aabb) -> bool {
        self.x1 <= other.x0 || self.x0 >= other.x1 || self.y1 <= other.y0 || self.y0 >= other.y1
    }
}

pub struct KeywordLayoutEngine<'a> {
    width: u32,
    height: u32,
    cfg: &'a KeywordConfig,
}

impl<'a> KeywordLayoutEngine<'a> {
    /// The engine needs at least one grid cell inside the margins; a config
    /// that leaves none cannot place anything.
    pub fn new(width: u32, height: u32, cfg: &'a KeywordConfig) -> GlowgridResult<Self> {
        if cfg.grid_cols == 0 || cfg.grid_rows == 0 {
            return Err(GlowgridError::layout("placement grid has no cells"));
        }
        if 2 * cfg.margin_x >= width || 2 * cfg.margin_y >= height {
            return Err(GlowgridError::layout(format!(
                "margins {}x{} leave no placement area on a {}x{} canvas",
                cfg.margin_x, cfg.margin_y, width, height
            )));
        }
        Ok(Self { width, height, cfg })
    }

    /// Stratified placement: the canvas inside the margins is split into a
    /// fixed grid, cells are shuffled and handed out one per keyword, and
    /// each keyword gets a bounded number of random candidates inside its
    /// cell. A candidate is accepted when its padded box is disjoint from
    /// every accepted box; a keyword that exhausts its attempts is dropped
    /// and logged, never retried in another cell.
    pub fn assign_positions(
        &self,
        keywords: &[String],
        font: &KeywordFont,
        rng: &mut StdRng,
    ) -> Vec<PlacedKeyword> {
        if keywords.is_empty() {
            return Vec::new();
        }

        let cfg = self.cfg;
        let margin_x = i64::from(cfg.margin_x);
        let margin_y = i64::from(cfg.margin_y);
        let cell_w =
            f64::from(self.width - 2 * cfg.margin_x) / f64::from(cfg.grid_cols);
        let cell_h =
            f64::from(self.height - 2 * cfg.margin_y) / f64::from(cfg.grid_rows);

        let mut cells: Vec<(u32, u32)> = (0..cfg.grid_rows)
            .flat_map(|r| (0..cfg.grid_cols).map(move |c| (c, r)))
            .collect();
        cells.shuffle(rng);

        let mut placed: Vec<PlacedKeyword> = Vec::new();
        let mut boxes: Vec<Aabb> = Vec::new();

        let count = keywords.len().min(cfg.max_keywords).min(cells.len());
        for (text, &(c, r)) in keywords.iter().take(count).zip(&cells) {
            let (text_w, text_h) = font.measure(text, cfg.tracking);
            let cell_x0 = margin_x + (f64::from(c) * cell_w) as i64;
            let cell_y0 = margin_y + (f64::from(r) * cell_h) as i64;
            let cell_x1 = margin_x + (f64::from(c + 1) * cell_w) as i64;
            let cell_y1 = margin_y + (f64::from(r + 1) * cell_h) as i64;

            let mut accepted = false;
            for _ in 0..cfg.placement_attempts {
                let x = rng.random_range(cell_x0..=cell_x0.max(cell_x1 - text_w as i64));
                let y = rng.random_range(cell_y0..=cell_y0.max(cell_y1 - text_h as i64));
                let (x, y) = self.clamp_into_margins(x, y, text_w, text_h);

                let pad = cfg.box_padding;
                let candidate = Aabb {
                    x0: x as f64 - pad,
                    y0: y as f64 - pad,
                    x1: x as f64 + text_w + pad,
                    y1: y as f64 + text_h + pad,
                };
                if boxes.iter().all(|b| candidate.disjoint(b)) {
                    placed.push(PlacedKeyword {
                        text: text.clone(),
                        x: x as f64,
                        y: y as f64,
                        w: text_w,
                        h: text_h,
                    });
                    boxes.push(candidate);
                    accepted = true;
                    break;
                }
            }

            if !accepted {
                tracing::warn!(keyword = %text, "could not place keyword without overlap; dropping");
            }
        }

        placed
    }

    fn clamp_into_margins(&self, x: i64, y: i64, text_w: f64, text_h: f64) -> (i64, i64) {
        let max_x = i64::from(self.width) - i64::from(self.cfg.margin_x) - text_w as i64;
        let max_y = i64::from(self.height) - i64::from(self.cfg.margin_y) - text_h as i64;
        (
            x.clamp(i64::from(self.cfg.margin_x), max_x.max(i64::from(self.cfg.margin_x))),
            y.clamp(i64::from(self.cfg.margin_y), max_y.max(i64::from(self.cfg.margin_y))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_font() -> KeywordFont {
        KeywordFont::Builtin { scale: 4 }
    }

    fn keywords(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn script_seed_is_stable_and_content_sensitive() {
        let a = script_seed("the same script");
        let b = script_seed("the same script");
        let c = script_seed("a different script");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a <= u64::from(u32::MAX));
    }

    #[test]
    fn parse_keywords_skips_blank_and_comment_lines() {
        let parsed = parse_keywords("Alpha\n\n# note\n  Beta  \n#\nGamma\n", 10);
        assert_eq!(parsed, keywords(&["Alpha", "Beta", "Gamma"]));
    }

    #[test]
    fn parse_keywords_caps_the_list() {
        let input = (0..20).map(|i| format!("kw{i}\n")).collect::<String>();
        assert_eq!(parse_keywords(&input, 10).len(), 10);
    }

    #[test]
    fn degenerate_placement_area_is_a_layout_error() {
        let cfg = KeywordConfig {
            grid_cols: 0,
            ..KeywordConfig::default()
        };
        let err = KeywordLayoutEngine::new(1080, 1920, &cfg).err().unwrap();
        assert!(matches!(err, crate::error::GlowgridError::Layout(_)));
        assert!(err.to_string().contains("no cells"));

        let cfg = KeywordConfig {
            margin_x: 600,
            ..KeywordConfig::default()
        };
        let err = KeywordLayoutEngine::new(1080, 1920, &cfg).err().unwrap();
        assert!(matches!(err, crate::error::GlowgridError::Layout(_)));
        assert!(err.to_string().contains("leave no placement area"));
    }

    #[test]
    fn placements_are_pairwise_disjoint() {
        let cfg = KeywordConfig::default();
        let engine = KeywordLayoutEngine::new(1080, 1920, &cfg).unwrap();
        let font = test_font();
        let mut rng = StdRng::seed_from_u64(7);
        let placed = engine.assign_positions(
            &keywords(&["Alpha", "Beta", "Gamma", "Delta"]),
            &font,
            &mut rng,
        );
        assert!(placed.len() <= 10);

        for i in 0..placed.len() {
            for j in (i + 1)..placed.len() {
                let a = &placed[i];
                let b = &placed[j];
                let disjoint = a.x + a.w <= b.x
                    || b.x + b.w <= a.x
                    || a.y + a.h <= b.y
                    || b.y + b.h <= a.y;
                assert!(disjoint, "{} overlaps {}", a.text, b.text);
            }
        }
    }

    #[test]
    fn placements_respect_margins() {
        let cfg = KeywordConfig::default();
        let engine = KeywordLayoutEngine::new(1080, 1920, &cfg).unwrap();
        let font = test_font();
        let mut rng = StdRng::seed_from_u64(11);
        let placed = engine.assign_positions(
            &keywords(&["One", "Two", "Three", "Four", "Five", "Six"]),
            &font,
            &mut rng,
        );
        for p in &placed {
            assert!(p.x >= f64::from(cfg.margin_x));
            assert!(p.y >= f64::from(cfg.margin_y));
            assert!(p.x + p.w <= f64::from(1080 - cfg.margin_x) + 1.0);
            assert!(p.y + p.h <= f64::from(1920 - cfg.margin_y) + 1.0);
        }
    }

    #[test]
    fn layout_is_reproducible_for_a_seed() {
        let cfg = KeywordConfig::default();
        let engine = KeywordLayoutEngine::new(1080, 1920, &cfg).unwrap();
        let font = test_font();
        let kws = keywords(&["Alpha", "Beta", "Gamma"]);

        let seed = script_seed("fixed script");
        let a = engine.assign_positions(&kws, &font, &mut StdRng::seed_from_u64(seed));
        let b = engine.assign_positions(&kws, &font, &mut StdRng::seed_from_u64(seed));
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.text, pb.text);
            assert_eq!(pa.x.to_bits(), pb.x.to_bits());
            assert_eq!(pa.y.to_bits(), pb.y.to_bits());
        }
    }

    #[test]
    fn empty_keyword_list_yields_empty_layout() {
        let cfg = KeywordConfig::default();
        let engine = KeywordLayoutEngine::new(1080, 1920, &cfg).unwrap();
        let font = test_font();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(engine.assign_positions(&[], &font, &mut rng).is_empty());
    }
}
