use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ParticleConfig;

#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
}

/// A rendered edge between particles `i` and `j`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub i: usize,
    pub j: usize,
    pub alpha: u8,
}

/// Fixed-size particle field with elastic wall reflection.
///
/// Initialization is driven by a fixed seed from the configuration, so the
/// field is reproducible across runs independent of the script content.
pub struct ParticleSystem {
    particles: Vec<Particle>,
    width: f64,
    height: f64,
    connect_dist: f64,
    line_max_alpha: u8,
}

impl ParticleSystem {
    pub fn init(cfg: &ParticleConfig, width: u32, height: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let w = f64::from(width);
        let h = f64::from(height);

        let mut particles = Vec::with_capacity(cfg.count);
        for _ in 0..cfg.count {
            let x = rng.random_range(0.0..w);
            let y = rng.random_range(0.0..h);
            let speed = rng.random_range(cfg.min_speed..cfg.max_speed);
            let angle = rng.random_range(0.0..std::f64::consts::TAU);
            let radius = rng.random_range(cfg.min_radius..cfg.max_radius);
            particles.push(Particle {
                x,
                y,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                radius,
            });
        }

        Self {
            particles,
            width: w,
            height: h,
            connect_dist: cfg.connect_dist,
            line_max_alpha: cfg.line_max_alpha,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Advance every particle by one frame.
    ///
    /// A component that would land outside the canvas is reflected: the
    /// velocity on the violated axis is negated and the position recomputed
    /// with the negated value. Axes are handled independently; a corner hit
    /// is just two single-axis reflections.
    pub fn step(&mut self) {
        for p in &mut self.particles {
            let mut nx = p.x + p.vx;
            let mut ny = p.y + p.vy;
            if nx < 0.0 || nx > self.width {
                p.vx = -p.vx;
                nx = p.x + p.vx;
            }
            if ny < 0.0 || ny > self.height {
                p.vy = -p.vy;
                ny = p.y + p.vy;
            }
            p.x = nx;
            p.y = ny;
        }
    }

    /// Pairwise connection graph for the current positions.
    ///
    /// O(n²) over unordered pairs; alpha falls off linearly with distance
    /// and is exactly zero at or beyond `connect_dist`.
    pub fn connections(&self) -> Vec<Connection> {
        let mut out = Vec::new();
        for i in 0..self.particles.len() {
            let a = self.particles[i];
            for j in (i + 1)..self.particles.len() {
                let b = self.particles[j];
                let dist = (b.x - a.x).hypot(b.y - a.y);
                if dist < self.connect_dist {
                    let alpha =
                        ((1.0 - dist / self.connect_dist) * f64::from(self.line_max_alpha)) as u8;
                    if alpha > 0 {
                        out.push(Connection { i, j, alpha });
                    }
                }
            }
        }
        out
    }

    /// Index of the particle nearest to `(x, y)` by squared distance, or
    /// `None` when the field is empty.
    pub fn nearest_index(&self, x: f64, y: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.particles.iter().enumerate() {
            let dx = p.x - x;
            let dy = p.y - y;
            let d2 = dx * dx + dy * dy;
            match best {
                Some((_, bd)) if bd <= d2 => {}
                _ => best = Some((i, d2)),
            }
        }
        best.map(|(i, _)| i)
    }
}
