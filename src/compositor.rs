use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::blur::GlowPass;
use crate::composite::{blend_pixel, over_in_place_opaque};
use crate::config::RenderConfig;
use crate::error::GlowgridResult;
use crate::nodes::KeywordNode;
use crate::particles::{Connection, ParticleSystem};
use crate::text::KeywordFont;

/// Layers one frame, back to front: the precomputed background, a blurred
/// overlay with the particle edges and points (the glow), then keyword text
/// and anchor connector lines.
pub struct FrameCompositor<'a> {
    cfg: &'a RenderConfig,
    background: &'a RgbaImage,
    font: &'a KeywordFont,
    glow: GlowPass,
}

impl<'a> FrameCompositor<'a> {
    pub fn new(
        cfg: &'a RenderConfig,
        background: &'a RgbaImage,
        font: &'a KeywordFont,
    ) -> GlowgridResult<Self> {
        // Bake the glow kernel once; it is reused for every frame.
        let glow = GlowPass::new(cfg.theme.glow_radius, cfg.theme.glow_sigma)?;
        Ok(Self {
            cfg,
            background,
            font,
            glow,
        })
    }

    pub fn render(
        &self,
        particles: &ParticleSystem,
        connections: &[Connection],
        nodes: &[KeywordNode],
    ) -> GlowgridResult<RgbaImage> {
        let cfg = self.cfg;
        let mut frame = self.background.clone();

        let mut overlay = RgbaImage::new(cfg.width, cfg.height);
        let [lr, lg, lb] = cfg.theme.line_rgb;
        let field = particles.particles();
        for conn in connections {
            let a = field[conn.i];
            let b = field[conn.j];
            draw_wide_line(
                &mut overlay,
                (a.x as f32, a.y as f32),
                (b.x as f32, b.y as f32),
                Rgba([lr, lg, lb, conn.alpha]),
            );
        }
        for p in field {
            draw_filled_circle_mut(
                &mut overlay,
                (p.x as i32, p.y as i32),
                p.radius.round() as i32,
                Rgba(cfg.theme.point_rgba),
            );
        }

        // Soft glow: blur the overlay before compositing it over the
        // background.
        let blurred = self.glow.apply(&overlay);
        over_in_place_opaque(&mut frame, &blurred)?;

        for node in nodes {
            if node.alpha == 0 {
                continue;
            }
            self.font.draw_text_tracked(
                &mut frame,
                node.x,
                node.y,
                &node.text,
                cfg.theme.keyword_rgb,
                node.alpha,
                cfg.keywords.tracking,
            );

            // Connector to the anchor particle, only while the node is in
            // its visible half of the cycle.
            if node.active
                && let Some(anchor) = node.anchor
            {
                let p = field[anchor];
                let line_alpha =
                    (f64::from(node.alpha) * cfg.keywords.connector_alpha_frac) as i64;
                if line_alpha > 0 {
                    let (cx, cy) = node.center();
                    draw_blended_line(
                        &mut frame,
                        cx,
                        cy,
                        p.x,
                        p.y,
                        cfg.theme.line_rgb,
                        line_alpha.min(255) as u8,
                    );
                }
            }
        }

        Ok(frame)
    }
}

/// 2px-wide line: the segment plus a copy offset one pixel along the minor
/// axis.
fn draw_wide_line(img: &mut RgbaImage, start: (f32, f32), end: (f32, f32), color: Rgba<u8>) {
    draw_line_segment_mut(img, start, end, color);
    let dx = (end.0 - start.0).abs();
    let dy = (end.1 - start.1).abs();
    if dx >= dy {
        draw_line_segment_mut(
            img,
            (start.0, start.1 + 1.0),
            (end.0, end.1 + 1.0),
            color,
        );
    } else {
        draw_line_segment_mut(
            img,
            (start.0 + 1.0, start.1),
            (end.0 + 1.0, end.1),
            color,
        );
    }
}

/// Thin alpha-blended line, stepped at pixel resolution.
fn draw_blended_line(img: &mut RgbaImage, x0: f64, y0: f64, x1: f64, y1: f64, rgb: [u8; 3], alpha: u8) {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let steps = dx.abs().max(dy.abs()).ceil() as i64;
    if steps == 0 {
        blend_pixel(img, x0.round() as i64, y0.round() as i64, rgb, alpha);
        return;
    }
    let mut last = (i64::MIN, i64::MIN);
    for s in 0..=steps {
        let t = s as f64 / steps as f64;
        let px = (x0 + dx * t).round() as i64;
        let py = (y0 + dy * t).round() as i64;
        if (px, py) != last {
            blend_pixel(img, px, py, rgb, alpha);
            last = (px, py);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::build_background;
    use crate::nodes::init_keyword_nodes;

    fn small_cfg() -> RenderConfig {
        let mut cfg = RenderConfig {
            width: 128,
            height: 128,
            ..RenderConfig::default()
        };
        cfg.particles.count = 8;
        cfg.particles.connect_dist = 80.0;
        cfg.keywords.margin_x = 8;
        cfg.keywords.margin_y = 8;
        cfg
    }

    #[test]
    fn rendered_frame_is_opaque_and_sized() {
        let cfg = small_cfg();
        let bg = build_background(cfg.width, cfg.height, &cfg.theme);
        let font = KeywordFont::Builtin { scale: 1 };
        let compositor = FrameCompositor::new(&cfg, &bg, &font).unwrap();

        let particles = ParticleSystem::init(&cfg.particles, cfg.width, cfg.height);
        let conns = particles.connections();
        let frame = compositor.render(&particles, &conns, &[]).unwrap();

        assert_eq!(frame.dimensions(), (cfg.width, cfg.height));
        assert!(frame.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn particles_lift_the_frame_above_the_background() {
        let cfg = small_cfg();
        let bg = build_background(cfg.width, cfg.height, &cfg.theme);
        let font = KeywordFont::Builtin { scale: 1 };
        let compositor = FrameCompositor::new(&cfg, &bg, &font).unwrap();

        let particles = ParticleSystem::init(&cfg.particles, cfg.width, cfg.height);
        let conns = particles.connections();
        let frame = compositor.render(&particles, &conns, &[]).unwrap();

        let brightness = |img: &RgbaImage| -> u64 {
            img.pixels().map(|p| u64::from(p.0[1])).sum()
        };
        assert!(brightness(&frame) > brightness(&bg));
    }

    #[test]
    fn keyword_text_is_drawn_when_visible() {
        let cfg = small_cfg();
        let bg = build_background(cfg.width, cfg.height, &cfg.theme);
        let font = KeywordFont::Builtin { scale: 1 };
        let compositor = FrameCompositor::new(&cfg, &bg, &font).unwrap();

        let particles = ParticleSystem::init(&cfg.particles, cfg.width, cfg.height);
        let kws = vec!["HELLO".to_string()];
        let mut nodes =
            init_keyword_nodes("s", &kws, cfg.width, cfg.height, &cfg.keywords, &font).unwrap();
        assert_eq!(nodes.len(), 1);
        nodes[0].alpha = 255;

        let without = compositor.render(&particles, &[], &[]).unwrap();
        let with = compositor.render(&particles, &[], &nodes).unwrap();
        assert_ne!(without.as_raw(), with.as_raw());
    }
}
