use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::background::build_background;
use crate::compositor::FrameCompositor;
use crate::config::RenderConfig;
use crate::encode::{
    DurationProbe, Encoder, FfmpegEncoder, FfprobeDurationProbe, frame_file_name,
};
use crate::error::{GlowgridError, GlowgridResult};
use crate::nodes::{KeywordNodeScheduler, init_keyword_nodes};
use crate::particles::ParticleSystem;
use crate::text::KeywordFont;

/// Frame count for a probed duration: `ceil(duration * fps)`, floored at one
/// frame, computed once and never exceeded.
pub fn total_frames(duration_secs: f64, fps: u32) -> u64 {
    ((duration_secs * f64::from(fps)).ceil() as u64).max(1)
}

/// The whole render: probe the audio, simulate and composite every frame
/// into a scoped temp directory, encode a silent video, mux in the audio,
/// and verify the result.
///
/// Fully sequential; frame `k+1` depends on frame `k`'s simulation state.
pub struct VideoRenderer {
    cfg: RenderConfig,
    probe: Box<dyn DurationProbe>,
    encoder: Box<dyn Encoder>,
}

impl VideoRenderer {
    /// Renderer wired to the system `ffprobe`/`ffmpeg` binaries
    /// (overridable via `FFPROBE_BIN` / `FFMPEG_BIN`).
    pub fn new(cfg: RenderConfig) -> GlowgridResult<Self> {
        Self::with_collaborators(
            cfg,
            Box::new(FfprobeDurationProbe::from_env()),
            Box::new(FfmpegEncoder::from_env()),
        )
    }

    /// Renderer with explicit collaborators; tests substitute deterministic
    /// fakes for the external tools here.
    pub fn with_collaborators(
        cfg: RenderConfig,
        probe: Box<dyn DurationProbe>,
        encoder: Box<dyn Encoder>,
    ) -> GlowgridResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            probe,
            encoder,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.cfg
    }

    /// Render the animation for `script` over the audio at `audio_path`,
    /// writing the final container to `out_path`.
    ///
    /// Keywords that cannot be placed are dropped; everything else that goes
    /// wrong is terminal on first occurrence.
    #[tracing::instrument(skip_all, fields(out = %out_path.display()))]
    pub fn render(
        &self,
        script: &str,
        keywords: &[String],
        audio_path: &Path,
        out_path: &Path,
    ) -> GlowgridResult<PathBuf> {
        let cfg = &self.cfg;

        let duration = self.probe.probe(audio_path)?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(GlowgridError::validation(format!(
                "invalid audio duration from probe: {duration}"
            )));
        }
        let frames = total_frames(duration, cfg.fps);
        tracing::info!(duration, frames, "probed audio duration");

        let font = KeywordFont::resolve(&cfg.font);
        let background = build_background(cfg.width, cfg.height, &cfg.theme);
        let mut particles = ParticleSystem::init(&cfg.particles, cfg.width, cfg.height);
        let mut nodes = init_keyword_nodes(
            script,
            keywords,
            cfg.width,
            cfg.height,
            &cfg.keywords,
            &font,
        )?;
        tracing::info!(
            particles = particles.len(),
            nodes = nodes.len(),
            "initialized simulation state"
        );

        let scheduler = KeywordNodeScheduler::new(cfg.width, cfg.height, &cfg.keywords);
        let compositor = FrameCompositor::new(cfg, &background, &font)?;

        // Scoped frame directory; removed on every exit path when the guard
        // drops.
        let frames_dir = tempfile::Builder::new()
            .prefix("glowgrid_frames_")
            .tempdir()
            .map_err(|e| GlowgridError::render(format!("failed to create frame dir: {e}")))?;

        for idx in 0..frames {
            particles.step();
            let elapsed = idx as f64 / f64::from(cfg.fps);
            scheduler.step(&mut nodes, elapsed, idx, &particles);

            let connections = particles.connections();
            let frame = compositor.render(&particles, &connections, &nodes)?;
            let frame_path = frames_dir.path().join(frame_file_name(idx));
            frame
                .save(&frame_path)
                .map_err(|e| GlowgridError::render(format!("failed to write frame {idx}: {e}")))?;
        }
        tracing::info!(frames, "frame sequence written");

        ensure_parent_dir(out_path)?;
        let silent = frames_dir.path().join("silent.mp4");
        self.encoder.encode_frames(frames_dir.path(), cfg.fps, &silent)?;
        verify_nonempty(&silent, "encode")?;
        tracing::info!("silent video encoded");

        self.encoder.mux(&silent, audio_path, out_path)?;
        verify_nonempty(out_path, "mux")?;
        tracing::info!("final video muxed");

        Ok(out_path.to_path_buf())
    }
}

fn ensure_parent_dir(path: &Path) -> GlowgridResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

fn verify_nonempty(path: &Path, stage: &str) -> GlowgridResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(GlowgridError::encode(format!(
            "{stage} produced an empty output file '{}'",
            path.display()
        ))),
        Err(_) => Err(GlowgridError::encode(format!(
            "{stage} did not produce an output file at '{}'",
            path.display()
        ))),
    }
}
