pub type GlowgridResult<T> = Result<T, GlowgridError>;

#[derive(thiserror::Error, Debug)]
pub enum GlowgridError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlowgridError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_pick_the_matching_variant() {
        assert!(matches!(
            GlowgridError::validation("fps must be > 0"),
            GlowgridError::Validation(_)
        ));
        assert!(matches!(
            GlowgridError::layout("placement grid has no cells"),
            GlowgridError::Layout(_)
        ));
        assert!(matches!(
            GlowgridError::render("failed to write frame 12"),
            GlowgridError::Render(_)
        ));
        assert!(matches!(
            GlowgridError::encode("ffmpeg mux exited with status 1"),
            GlowgridError::Encode(_)
        ));
    }

    #[test]
    fn encode_errors_carry_the_captured_diagnostics() {
        let err = GlowgridError::encode(
            "ffmpeg encode exited with status 1: unknown encoder 'libx264'",
        );
        let msg = err.to_string();
        assert!(msg.starts_with("encode error:"));
        assert!(msg.contains("unknown encoder 'libx264'"));
    }

    #[test]
    fn io_failures_flow_through_the_anyhow_variant() {
        let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err: GlowgridError = anyhow::Error::new(io)
            .context("failed to create output directory 'artifacts'")
            .into();
        assert!(matches!(err, GlowgridError::Other(_)));
        assert!(err.to_string().contains("artifacts"));
    }
}
