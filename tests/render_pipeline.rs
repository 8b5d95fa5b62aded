use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use glowgrid::{
    DurationProbe, Encoder, GlowgridError, GlowgridResult, RenderConfig, VideoRenderer,
};

fn small_config() -> RenderConfig {
    let mut cfg = RenderConfig {
        width: 64,
        height: 64,
        ..RenderConfig::default()
    };
    cfg.particles.count = 6;
    cfg.particles.connect_dist = 40.0;
    cfg.keywords.margin_x = 6;
    cfg.keywords.margin_y = 6;
    cfg.theme.glow_radius = 1;
    cfg
}

struct FixedProbe(f64);

impl DurationProbe for FixedProbe {
    fn probe(&self, _audio: &Path) -> GlowgridResult<f64> {
        Ok(self.0)
    }
}

#[derive(Clone, Default)]
struct Recorded {
    frames_seen: Option<usize>,
    frames_digest: Option<u64>,
    frames_dir: Option<PathBuf>,
    mux_called: bool,
}

fn fnv1a(state: u64, bytes: &[u8]) -> u64 {
    let mut h = state;
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x100_0000_01b3);
    }
    h
}

/// Fake encoder that counts the frame files it was handed and writes (or
/// deliberately fails to write) its outputs.
#[derive(Clone)]
struct FakeEncoder {
    recorded: Arc<Mutex<Recorded>>,
    write_silent: bool,
    write_final: bool,
}

impl FakeEncoder {
    fn new(write_silent: bool, write_final: bool) -> Self {
        Self {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            write_silent,
            write_final,
        }
    }
}

impl Encoder for FakeEncoder {
    fn encode_frames(&self, frames_dir: &Path, _fps: u32, out: &Path) -> GlowgridResult<()> {
        let mut names: Vec<PathBuf> = std::fs::read_dir(frames_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with("frame_")
            })
            .collect();
        names.sort();
        let mut digest = 0xcbf2_9ce4_8422_2325u64;
        for path in &names {
            digest = fnv1a(digest, &std::fs::read(path).unwrap());
        }
        let mut rec = self.recorded.lock().unwrap();
        rec.frames_seen = Some(names.len());
        rec.frames_digest = Some(digest);
        rec.frames_dir = Some(frames_dir.to_path_buf());
        if self.write_silent {
            std::fs::write(out, b"silent-video").unwrap();
        }
        Ok(())
    }

    fn mux(&self, video: &Path, _audio: &Path, out: &Path) -> GlowgridResult<()> {
        assert!(video.exists(), "mux must receive the encoded silent video");
        self.recorded.lock().unwrap().mux_called = true;
        if self.write_final {
            std::fs::write(out, b"final-video").unwrap();
        } else {
            std::fs::write(out, b"").unwrap();
        }
        Ok(())
    }
}

fn run(
    duration: f64,
    encoder: FakeEncoder,
) -> (GlowgridResult<PathBuf>, Arc<Mutex<Recorded>>, tempfile::TempDir) {
    let recorded = encoder.recorded.clone();
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio.mp3");
    std::fs::write(&audio, b"not really audio").unwrap();
    let out = dir.path().join("video.mp4");

    let renderer = VideoRenderer::with_collaborators(
        small_config(),
        Box::new(FixedProbe(duration)),
        Box::new(encoder),
    )
    .unwrap();

    let keywords = vec!["Alpha".to_string(), "Beta".to_string()];
    let result = renderer.render("a fixed script", &keywords, &audio, &out);
    (result, recorded, dir)
}

#[test]
fn pipeline_renders_ceil_duration_times_fps_frames() {
    let (result, recorded, dir) = run(2.33, FakeEncoder::new(true, true));
    let out = result.unwrap();
    assert_eq!(out, dir.path().join("video.mp4"));
    assert!(std::fs::metadata(&out).unwrap().len() > 0);

    let rec = recorded.lock().unwrap();
    // ceil(2.33 * 30) = 70
    assert_eq!(rec.frames_seen, Some(70));
    assert!(rec.mux_called);
}

#[test]
fn frame_directory_is_removed_after_the_run() {
    let (result, recorded, _dir) = run(0.5, FakeEncoder::new(true, true));
    result.unwrap();
    let rec = recorded.lock().unwrap();
    let frames_dir = rec.frames_dir.clone().unwrap();
    assert!(!frames_dir.exists(), "scoped frame dir must be cleaned up");
}

#[test]
fn zero_duration_aborts_before_any_frame() {
    let (result, recorded, _dir) = run(0.0, FakeEncoder::new(true, true));
    let err = result.unwrap_err();
    assert!(matches!(err, GlowgridError::Validation(_)));
    assert!(err.to_string().contains("duration"));
    assert_eq!(recorded.lock().unwrap().frames_seen, None);
}

#[test]
fn negative_duration_aborts_before_any_frame() {
    let (result, recorded, _dir) = run(-3.0, FakeEncoder::new(true, true));
    assert!(result.is_err());
    assert_eq!(recorded.lock().unwrap().frames_seen, None);
}

#[test]
fn missing_encode_output_is_terminal() {
    let (result, recorded, _dir) = run(0.2, FakeEncoder::new(false, true));
    let err = result.unwrap_err();
    assert!(err.to_string().contains("did not produce"));
    // Mux must not run when the encode stage failed verification.
    assert!(!recorded.lock().unwrap().mux_called);
}

#[test]
fn empty_mux_output_is_terminal() {
    let (result, recorded, _dir) = run(0.2, FakeEncoder::new(true, false));
    let err = result.unwrap_err();
    assert!(err.to_string().contains("empty output"));
    assert!(recorded.lock().unwrap().mux_called);
}

#[test]
fn pipeline_output_is_reproducible_for_fixed_inputs() {
    let (a, rec_a, _dir_a) = run(0.3, FakeEncoder::new(true, true));
    let (b, rec_b, _dir_b) = run(0.3, FakeEncoder::new(true, true));
    a.unwrap();
    b.unwrap();
    let da = rec_a.lock().unwrap().frames_digest.unwrap();
    let db = rec_b.lock().unwrap().frames_digest.unwrap();
    assert_eq!(da, db, "same script, seed, and config must reproduce frames");
}

struct FailingProbe;

impl DurationProbe for FailingProbe {
    fn probe(&self, _audio: &Path) -> GlowgridResult<f64> {
        Err(GlowgridError::encode("ffprobe exited with status 1: boom"))
    }
}

#[test]
fn probe_failure_surfaces_tool_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio.mp3");
    std::fs::write(&audio, b"x").unwrap();

    let encoder = FakeEncoder::new(true, true);
    let recorded = encoder.recorded.clone();
    let renderer = VideoRenderer::with_collaborators(
        small_config(),
        Box::new(FailingProbe),
        Box::new(encoder),
    )
    .unwrap();

    let err = renderer
        .render("s", &[], &audio, &dir.path().join("out.mp4"))
        .unwrap_err();
    assert!(err.to_string().contains("boom"));
    assert_eq!(recorded.lock().unwrap().frames_seen, None);
}
