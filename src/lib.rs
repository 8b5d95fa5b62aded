#![forbid(unsafe_code)]

pub mod background;
pub mod blur;
pub mod composite;
pub mod compositor;
pub mod config;
pub mod encode;
pub mod error;
pub mod layout;
pub mod nodes;
pub mod particles;
pub mod renderer;
pub mod text;

pub use blur::GlowPass;
pub use compositor::FrameCompositor;
pub use config::{FontConfig, KeywordConfig, ParticleConfig, RenderConfig, Theme};
pub use encode::{DurationProbe, Encoder, FfmpegEncoder, FfprobeDurationProbe};
pub use error::{GlowgridError, GlowgridResult};
pub use nodes::{CyclePhase, KeywordNode, KeywordNodeScheduler};
pub use particles::{Connection, Particle, ParticleSystem};
pub use renderer::{VideoRenderer, total_frames};
pub use text::KeywordFont;
