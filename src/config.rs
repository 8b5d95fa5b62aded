use std::path::PathBuf;

use crate::error::{GlowgridError, GlowgridResult};

/// Full renderer configuration, passed in at construction.
///
/// Every tuning knob lives here rather than in module-level constants so a
/// caller (or a test) can rebuild the whole look from one value.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub particles: ParticleConfig,
    pub keywords: KeywordConfig,
    pub theme: Theme,
    pub font: FontConfig,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ParticleConfig {
    pub count: usize,
    pub min_speed: f64,
    pub max_speed: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Pairs closer than this are joined by a line.
    pub connect_dist: f64,
    pub line_max_alpha: u8,
    /// Fixed seed; the particle field is configuration-reproducible,
    /// not content-derived.
    pub seed: u64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct KeywordConfig {
    /// Hard cap on overlay nodes regardless of input size.
    pub max_keywords: usize,
    pub margin_x: u32,
    pub margin_y: u32,
    /// Stratified placement grid.
    pub grid_cols: u32,
    pub grid_rows: u32,
    pub placement_attempts: u32,
    /// Padding around each text box for overlap tests.
    pub box_padding: f64,
    /// Extra per-character spacing in pixels.
    pub tracking: f64,
    pub fade_secs: f64,
    pub min_hold_secs: f64,
    pub max_hold_secs: f64,
    pub min_gap_secs: f64,
    pub max_gap_secs: f64,
    pub max_phase_secs: f64,
    pub min_base_opacity: f64,
    pub max_base_opacity: f64,
    pub min_peak_opacity: f64,
    pub max_peak_opacity: f64,
    pub max_drift_x: f64,
    pub max_drift_y: f64,
    /// Sign-preserving lower bounds on drift so nodes never stall.
    pub drift_floor_x: f64,
    pub drift_floor_y: f64,
    /// Pairwise separation runs every this many frames.
    pub separation_period: u64,
    pub separation_pad: f64,
    pub separation_push: f64,
    pub separation_cap: f64,
    /// Anchor connector line alpha as a fraction of the text alpha.
    pub connector_alpha_frac: f64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Theme {
    pub bg_top: [u8; 3],
    pub bg_bottom: [u8; 3],
    pub grid_rgba: [u8; 4],
    pub grid_spacing: u32,
    pub point_rgba: [u8; 4],
    pub line_rgb: [u8; 3],
    pub keyword_rgb: [u8; 3],
    pub glow_radius: u32,
    pub glow_sigma: f32,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FontConfig {
    /// Environment variable consulted first for a font file override.
    pub env_override: String,
    /// Fixed candidate paths tried in order after the override.
    pub candidates: Vec<PathBuf>,
    pub size: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            particles: ParticleConfig::default(),
            keywords: KeywordConfig::default(),
            theme: Theme::default(),
            font: FontConfig::default(),
        }
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 64,
            min_speed: 0.12,
            max_speed: 0.35,
            min_radius: 2.1,
            max_radius: 3.1,
            connect_dist: 205.0,
            line_max_alpha: 170,
            seed: 42,
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            max_keywords: 10,
            margin_x: 60,
            margin_y: 80,
            grid_cols: 4,
            grid_rows: 6,
            placement_attempts: 30,
            box_padding: 18.0,
            tracking: 2.0,
            fade_secs: 0.6,
            min_hold_secs: 2.5,
            max_hold_secs: 4.0,
            min_gap_secs: 0.8,
            max_gap_secs: 1.6,
            max_phase_secs: 2.0,
            min_base_opacity: 0.13,
            max_base_opacity: 0.15,
            min_peak_opacity: 0.70,
            max_peak_opacity: 0.74,
            max_drift_x: 0.6,
            max_drift_y: 0.3,
            drift_floor_x: 0.15,
            drift_floor_y: 0.08,
            separation_period: 10,
            separation_pad: 6.0,
            separation_push: 0.15,
            separation_cap: 1.0,
            connector_alpha_frac: 0.15,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg_top: [9, 24, 58],
            bg_bottom: [6, 36, 88],
            grid_rgba: [45, 70, 110, 11],
            grid_spacing: 120,
            point_rgba: [120, 200, 220, 255],
            line_rgb: [90, 200, 210],
            keyword_rgb: [220, 240, 255],
            glow_radius: 2,
            glow_sigma: 1.2,
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            env_override: "GLOWGRID_FONT".to_string(),
            candidates: vec![
                PathBuf::from("/System/Library/Fonts/SFNSDisplay-Medium.otf"),
                PathBuf::from("/System/Library/Fonts/SFNSDisplay.ttf"),
                PathBuf::from("/System/Library/Fonts/HelveticaNeue.ttc"),
                PathBuf::from("/Library/Fonts/Helvetica Neue Medium.ttf"),
                PathBuf::from("/Library/Fonts/HelveticaNeue.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
            ],
            size: 34.0,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> GlowgridResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GlowgridError::validation("canvas width/height must be > 0"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p output needs even dimensions.
            return Err(GlowgridError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.fps == 0 {
            return Err(GlowgridError::validation("fps must be > 0"));
        }
        self.particles.validate()?;
        self.keywords.validate(self.width, self.height)?;
        if self.theme.glow_radius == 0 {
            return Err(GlowgridError::validation("glow radius must be >= 1"));
        }
        if !self.theme.glow_sigma.is_finite() || self.theme.glow_sigma <= 0.0 {
            return Err(GlowgridError::validation("glow sigma must be > 0"));
        }
        if !self.font.size.is_finite() || self.font.size <= 0.0 {
            return Err(GlowgridError::validation("font size must be > 0"));
        }
        Ok(())
    }
}

impl ParticleConfig {
    pub fn validate(&self) -> GlowgridResult<()> {
        if self.count == 0 {
            return Err(GlowgridError::validation("particle count must be > 0"));
        }
        if self.min_speed <= 0.0 || self.max_speed <= self.min_speed {
            return Err(GlowgridError::validation(
                "particle speed range must satisfy 0 < min < max",
            ));
        }
        if self.min_radius <= 0.0 || self.max_radius <= self.min_radius {
            return Err(GlowgridError::validation(
                "particle radius range must satisfy 0 < min < max",
            ));
        }
        if self.connect_dist <= 0.0 {
            return Err(GlowgridError::validation("connect_dist must be > 0"));
        }
        Ok(())
    }
}

impl KeywordConfig {
    pub fn validate(&self, width: u32, height: u32) -> GlowgridResult<()> {
        if self.grid_cols == 0 || self.grid_rows == 0 {
            return Err(GlowgridError::validation(
                "placement grid must have cols > 0 and rows > 0",
            ));
        }
        if 2 * self.margin_x >= width || 2 * self.margin_y >= height {
            return Err(GlowgridError::validation(
                "margins leave no usable placement area",
            ));
        }
        if self.fade_secs <= 0.0 {
            return Err(GlowgridError::validation("fade duration must be > 0"));
        }
        // Node parameters are drawn uniformly from these ranges, so every
        // range must be non-empty.
        if self.min_hold_secs >= self.max_hold_secs || self.min_gap_secs >= self.max_gap_secs {
            return Err(GlowgridError::validation(
                "hold/gap ranges must satisfy min < max",
            ));
        }
        if self.min_base_opacity >= self.max_base_opacity
            || self.min_peak_opacity >= self.max_peak_opacity
        {
            return Err(GlowgridError::validation(
                "opacity ranges must satisfy min < max",
            ));
        }
        if self.max_drift_x <= 0.0 || self.max_drift_y <= 0.0 || self.max_phase_secs <= 0.0 {
            return Err(GlowgridError::validation(
                "drift and phase ranges must be > 0",
            ));
        }
        if self.separation_period == 0 {
            return Err(GlowgridError::validation("separation period must be > 0"));
        }
        Ok(())
    }

    /// Full opacity cycle length for a node with the given hold and gap.
    pub fn cycle_secs(&self, hold: f64, gap: f64) -> f64 {
        2.0 * self.fade_secs + hold + gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn odd_dimensions_are_rejected() {
        let cfg = RenderConfig {
            width: 1081,
            ..RenderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_fps_is_rejected() {
        let cfg = RenderConfig {
            fps: 0,
            ..RenderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_speed_range_is_rejected() {
        let mut cfg = RenderConfig::default();
        cfg.particles.min_speed = 1.0;
        cfg.particles.max_speed = 0.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_glow_radius_is_rejected() {
        let mut cfg = RenderConfig::default();
        cfg.theme.glow_radius = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_roundtrip() {
        let cfg = RenderConfig::default();
        let s = serde_json::to_string_pretty(&cfg).unwrap();
        let de: RenderConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(de.width, 1080);
        assert_eq!(de.particles.count, 64);
        assert_eq!(de.theme.grid_spacing, 120);
    }
}
