use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use glowgrid::{RenderConfig, VideoRenderer, layout};

#[derive(Parser, Debug)]
#[command(name = "glowgrid", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the particle-network video for a script and audio track
    /// (requires `ffmpeg` and `ffprobe` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Script text file (used for layout seeding).
    #[arg(long)]
    script: PathBuf,

    /// Pre-rendered audio track.
    #[arg(long)]
    audio: PathBuf,

    /// Newline-delimited keyword list; blank lines and `#` comments are
    /// ignored, at most 10 keywords are used.
    #[arg(long)]
    keywords: Option<PathBuf>,

    /// Output MP4 path.
    #[arg(long, default_value = "artifacts/video.mp4")]
    out: PathBuf,

    /// Optional renderer configuration JSON; defaults are used otherwise.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<RenderConfig> {
    let Some(path) = path else {
        return Ok(RenderConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    let cfg: RenderConfig = serde_json::from_str(&text).with_context(|| "parse config JSON")?;
    Ok(cfg)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = read_config(args.config.as_deref())?;

    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read script '{}'", args.script.display()))?;

    let keywords = match &args.keywords {
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read keywords '{}'", path.display()))?;
            layout::parse_keywords(&text, cfg.keywords.max_keywords)
        }
        _ => Vec::new(),
    };

    let renderer = VideoRenderer::new(cfg)?;
    let out = renderer.render(&script, &keywords, &args.audio, &args.out)?;
    println!("{}", out.display());
    Ok(())
}
