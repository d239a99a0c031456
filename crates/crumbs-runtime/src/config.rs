use std::fmt;

use crate::render::append_context;
use crate::store::ContextSnapshot;
use crate::value::ValueFormatter;

pub const SEPARATOR_ENV: &str = "CRUMBS_SEPARATOR";
pub const TOP_FRAMES_ENV: &str = "CRUMBS_TOP_FRAMES";
pub const BOTTOM_FRAMES_ENV: &str = "CRUMBS_BOTTOM_FRAMES";
pub const DEFAULT_SEPARATOR: &str = " > ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidFrameCount { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFrameCount { var, value } => write!(
                f,
                "invalid {var}={value:?}: expected a non-negative frame count or -1"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// How a context stack is rendered into log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub top_frames: Option<usize>,
    pub bottom_frames: Option<usize>,
    pub separator: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            top_frames: None,
            bottom_frames: None,
            separator: DEFAULT_SEPARATOR.to_owned(),
        }
    }
}

impl RenderOptions {
    /// Reads `CRUMBS_SEPARATOR`, `CRUMBS_TOP_FRAMES` and `CRUMBS_BOTTOM_FRAMES`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        if let Some(separator) = lookup(SEPARATOR_ENV) {
            options.separator = separator;
        }
        if let Some(value) = lookup(TOP_FRAMES_ENV) {
            options.top_frames = parse_frame_count(TOP_FRAMES_ENV, &value)?;
        }
        if let Some(value) = lookup(BOTTOM_FRAMES_ENV) {
            options.bottom_frames = parse_frame_count(BOTTOM_FRAMES_ENV, &value)?;
        }
        Ok(options)
    }

    /// Appends the current flow's context using these options.
    pub fn append_current<W: fmt::Write>(
        &self,
        formatter: Option<&dyn ValueFormatter>,
        buffer: &mut W,
    ) -> fmt::Result {
        append_context(
            formatter,
            self.top_frames,
            self.bottom_frames,
            &self.separator,
            buffer,
        )
    }

    pub fn append_snapshot<W: fmt::Write>(
        &self,
        snapshot: &ContextSnapshot,
        formatter: Option<&dyn ValueFormatter>,
        buffer: &mut W,
    ) -> fmt::Result {
        snapshot.append_to(
            formatter,
            self.top_frames,
            self.bottom_frames,
            &self.separator,
            buffer,
        )
    }
}

/// Renders the current flow's context with `options` and the default formatter.
pub fn render_context(options: &RenderOptions) -> String {
    let mut text = String::new();
    // String's fmt::Write never fails and the default formatter doesn't either.
    let _ = options.append_current(None, &mut text);
    text
}

/// Parses a frame count where an empty string or `-1` means "no limit".
///
/// `var` names the setting in the error, e.g. an env var or a CLI flag.
pub fn parse_frame_count(var: &'static str, value: &str) -> Result<Option<usize>, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "-1" {
        return Ok(None);
    }
    trimmed
        .parse::<usize>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidFrameCount {
            var,
            value: value.to_owned(),
        })
}
