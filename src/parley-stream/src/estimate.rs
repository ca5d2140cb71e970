//! Layout height estimation for in-progress content.
//!
//! The engine asks for the height of `content + pending` every time a chunk
//! arrives and keeps the largest answer, so the presentation layer can
//! reserve space before the typing effect reaches it. Estimates are
//! advisory: a bad estimate causes a small layout shift, never a data error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_width::UnicodeWidthStr;

/// Errors produced by a [`HeightEstimator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    /// The off-screen measurement surface cannot be used.
    #[error("Measurement surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

/// Predicts the rendered height of a piece of text.
pub trait HeightEstimator: Send {
    /// Returns the height `text` will occupy once displayed.
    fn estimate(&self, text: &str) -> Result<u32, EstimateError>;
}

impl<F> HeightEstimator for F
where
    F: Fn(&str) -> Result<u32, EstimateError> + Send,
{
    fn estimate(&self, text: &str) -> Result<u32, EstimateError> {
        self(text)
    }
}

/// Typography of the real presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    /// Usable width in display columns.
    pub columns: u16,
    /// Height of one rendered line.
    pub line_height: u32,
    /// Fixed vertical padding around the text block.
    pub padding: u32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            columns: 80,
            line_height: 20,
            padding: 0,
        }
    }
}

/// Estimator that word-wraps text on an off-screen surface.
///
/// Wrapping is width-aware (CJK and emoji take two columns) and breaks
/// words longer than a line, matching how the chat view wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapEstimator {
    typography: Typography,
}

impl WrapEstimator {
    pub fn new(typography: Typography) -> Self {
        Self { typography }
    }

    pub fn typography(&self) -> Typography {
        self.typography
    }

    /// Number of display lines `text` wraps to.
    pub fn line_count(&self, text: &str) -> Result<usize, EstimateError> {
        let columns = usize::from(self.typography.columns);
        if columns == 0 {
            return Err(EstimateError::SurfaceUnavailable(
                "surface has zero columns".to_string(),
            ));
        }

        let options = textwrap::Options::new(columns).break_words(true);
        let lines = text
            .split('\n')
            .map(|line| {
                if UnicodeWidthStr::width(line) <= columns {
                    1
                } else {
                    textwrap::wrap(line, &options).len().max(1)
                }
            })
            .sum();
        Ok(lines)
    }
}

impl Default for WrapEstimator {
    fn default() -> Self {
        Self::new(Typography::default())
    }
}

impl HeightEstimator for WrapEstimator {
    fn estimate(&self, text: &str) -> Result<u32, EstimateError> {
        if text.is_empty() {
            return Ok(0);
        }
        let lines = u32::try_from(self.line_count(text)?).unwrap_or(u32::MAX);
        Ok(lines
            .saturating_mul(self.typography.line_height)
            .saturating_add(self.typography.padding))
    }
}
