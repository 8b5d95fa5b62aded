use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::KeywordConfig;
use crate::error::GlowgridResult;
use crate::layout::{KeywordLayoutEngine, script_seed};
use crate::particles::ParticleSystem;
use crate::text::KeywordFont;

/// Where a node sits in its opacity cycle.
///
/// The cycle is `fade + hold + fade + gap` seconds long; each local time maps
/// to exactly one phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CyclePhase {
    FadingIn,
    Holding,
    FadingOut,
    Gap,
}

impl CyclePhase {
    /// Classify a cycle-local time and compute the opacity target for it.
    ///
    /// Fades use a cosine S-curve, so the target is continuous at every
    /// phase boundary: 0 progress meets `base`, full progress meets `peak`.
    pub fn evaluate(local: f64, fade: f64, hold: f64, base: f64, peak: f64) -> (Self, f64) {
        if local < fade {
            let x = local / fade;
            (Self::FadingIn, base + (peak - base) * cosine_ease(x))
        } else if local < fade + hold {
            (Self::Holding, peak)
        } else if local < 2.0 * fade + hold {
            let x = 1.0 - (local - fade - hold) / fade;
            (Self::FadingOut, base + (peak - base) * cosine_ease(x))
        } else {
            (Self::Gap, base)
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::FadingIn | Self::Holding)
    }
}

fn cosine_ease(x: f64) -> f64 {
    0.5 - 0.5 * (std::f64::consts::PI * x.clamp(0.0, 1.0)).cos()
}

/// A keyword overlay node. Created once at initialization and mutated every
/// frame by the scheduler; never created or destroyed mid-run.
#[derive(Clone, Debug)]
pub struct KeywordNode {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub w: f64,
    pub h: f64,
    pub base_opacity: f64,
    pub peak_opacity: f64,
    pub alpha: u8,
    pub active: bool,
    pub phase_offset: f64,
    pub hold_secs: f64,
    pub gap_secs: f64,
    pub anchor: Option<usize>,
}

impl KeywordNode {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    fn padded_overlap(&self, other: &Self, pad: f64) -> bool {
        !(self.x + self.w + pad <= other.x - pad
            || self.x - pad >= other.x + other.w + pad
            || self.y + self.h + pad <= other.y - pad
            || self.y - pad >= other.y + other.h + pad)
    }
}

/// Build the keyword node set for a script.
///
/// The layout seed is derived from the script text, and the same RNG stream
/// then supplies per-node drift, opacity, and timing, so the whole node set
/// is reproducible for a given script and configuration.
pub fn init_keyword_nodes(
    script: &str,
    keywords: &[String],
    width: u32,
    height: u32,
    cfg: &KeywordConfig,
    font: &KeywordFont,
) -> GlowgridResult<Vec<KeywordNode>> {
    let engine = KeywordLayoutEngine::new(width, height, cfg)?;
    if keywords.is_empty() {
        return Ok(Vec::new());
    }

    let mut rng = StdRng::seed_from_u64(script_seed(script));
    let placed = engine.assign_positions(keywords, font, &mut rng);

    let nodes = placed
        .into_iter()
        .map(|p| {
            let base = rng.random_range(cfg.min_base_opacity..cfg.max_base_opacity);
            let peak = rng.random_range(cfg.min_peak_opacity..cfg.max_peak_opacity);
            KeywordNode {
                text: p.text,
                x: p.x,
                y: p.y,
                vx: rng.random_range(-cfg.max_drift_x..cfg.max_drift_x),
                vy: rng.random_range(-cfg.max_drift_y..cfg.max_drift_y),
                w: p.w,
                h: p.h,
                base_opacity: base,
                peak_opacity: peak,
                alpha: (base.clamp(0.0, 1.0) * 255.0) as u8,
                active: false,
                phase_offset: rng.random_range(0.0..cfg.max_phase_secs),
                hold_secs: rng.random_range(cfg.min_hold_secs..cfg.max_hold_secs),
                gap_secs: rng.random_range(cfg.min_gap_secs..cfg.max_gap_secs),
                anchor: None,
            }
        })
        .collect();
    Ok(nodes)
}

/// Per-frame node update: opacity cycle, drift with wrap-around bounds,
/// periodic pairwise separation, and anchor rebinding.
pub struct KeywordNodeScheduler<'a> {
    cfg: &'a KeywordConfig,
    width: f64,
    height: f64,
}

impl<'a> KeywordNodeScheduler<'a> {
    pub fn new(width: u32, height: u32, cfg: &'a KeywordConfig) -> Self {
        Self {
            cfg,
            width: f64::from(width),
            height: f64::from(height),
        }
    }

    pub fn step(
        &self,
        nodes: &mut [KeywordNode],
        elapsed: f64,
        frame_index: u64,
        particles: &ParticleSystem,
    ) {
        let cfg = self.cfg;
        for node in nodes.iter_mut() {
            let cycle = cfg.cycle_secs(node.hold_secs, node.gap_secs);
            let local = (elapsed + node.phase_offset) % cycle;
            let (phase, target) = CyclePhase::evaluate(
                local,
                cfg.fade_secs,
                node.hold_secs,
                node.base_opacity,
                node.peak_opacity,
            );
            // Opacity never drops below the node's base.
            let target = target.max(node.base_opacity);
            node.alpha = (target.clamp(0.0, 1.0) * 255.0) as u8;
            node.active = phase.is_active();

            node.x += node.vx;
            node.y += node.vy;

            // Sign-preserving floor so a node never stalls.
            if node.vx.abs() < cfg.drift_floor_x {
                node.vx = cfg
                    .drift_floor_x
                    .copysign(if node.vx != 0.0 { node.vx } else { 1.0 });
            }
            if node.vy.abs() < cfg.drift_floor_y {
                node.vy = cfg
                    .drift_floor_y
                    .copysign(if node.vy != 0.0 { node.vy } else { 1.0 });
            }

            // Wrap, not bounce: crossing a margin teleports to the opposite
            // bound.
            let min_x = f64::from(cfg.margin_x);
            let max_x = self.width - f64::from(cfg.margin_x) - node.w;
            let min_y = f64::from(cfg.margin_y);
            let max_y = self.height - f64::from(cfg.margin_y) - node.h;
            if node.x < min_x {
                node.x = max_x;
            } else if node.x > max_x {
                node.x = min_x;
            }
            if node.y < min_y {
                node.y = max_y;
            } else if node.y > max_y {
                node.y = min_y;
            }

            let (cx, cy) = node.center();
            node.anchor = particles.nearest_index(cx, cy);
        }

        if frame_index.is_multiple_of(cfg.separation_period) {
            self.separate(nodes);
        }
    }

    /// Push overlapping pairs apart along the line joining their centers by
    /// a fixed capped step. Best-effort: deep overlaps may take several
    /// passes to resolve.
    fn separate(&self, nodes: &mut [KeywordNode]) {
        let cfg = self.cfg;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let (head, tail) = nodes.split_at_mut(j);
                let a = &mut head[i];
                let b = &mut tail[0];
                if !a.padded_overlap(b, cfg.separation_pad) {
                    continue;
                }
                let (acx, acy) = a.center();
                let (bcx, bcy) = b.center();
                let dx = acx - bcx;
                let dy = acy - bcy;
                let dist = dx.hypot(dy);
                let dist = if dist == 0.0 { 1.0 } else { dist };
                let push_x =
                    ((dx / dist) * cfg.separation_push).clamp(-cfg.separation_cap, cfg.separation_cap);
                let push_y =
                    ((dy / dist) * cfg.separation_push).clamp(-cfg.separation_cap, cfg.separation_cap);
                a.x += push_x;
                a.y += push_y;
                b.x -= push_x;
                b.y -= push_y;
            }
        }
    }
}
