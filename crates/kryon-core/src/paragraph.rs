//! Paragraph-level attributes shared by every fragment of an attributed string

use serde::{Deserialize, Serialize};

use crate::{KryonError, Result};

/// Where the ellipsis goes when text is truncated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EllipsizeMode {
    /// Cut at the container edge without an ellipsis
    Clip,
    Head,
    Middle,
    #[default]
    Tail,
}

/// Line breaking strategy requested from the shaping engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextBreakStrategy {
    Simple,
    #[default]
    HighQuality,
    Balanced,
}

/// Horizontal alignment of lines inside the paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextAlignment {
    #[default]
    Start,
    Center,
    End,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WritingDirection {
    /// Follow the layout direction of the constraints
    #[default]
    Natural,
    LeftToRight,
    RightToLeft,
}

/// Settings that apply to the paragraph as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphAttributes {
    /// Maximum number of lines; `None` and `Some(0)` both mean unlimited
    pub maximum_number_of_lines: Option<u32>,

    pub ellipsize_mode: EllipsizeMode,

    pub text_break_strategy: TextBreakStrategy,

    pub alignment: TextAlignment,

    pub base_writing_direction: WritingDirection,

    /// Shrink the font until the text fits the constraints
    pub adjusts_font_size_to_fit: bool,

    /// Lower bound for the shrink factor when `adjusts_font_size_to_fit` is set
    pub minimum_font_scale: f32,

    /// Android-style extra top/bottom padding for ascenders and descenders
    pub include_font_padding: bool,
}

impl Default for ParagraphAttributes {
    fn default() -> Self {
        Self {
            maximum_number_of_lines: None,
            ellipsize_mode: EllipsizeMode::default(),
            text_break_strategy: TextBreakStrategy::default(),
            alignment: TextAlignment::default(),
            base_writing_direction: WritingDirection::default(),
            adjusts_font_size_to_fit: false,
            minimum_font_scale: 1.0,
            include_font_padding: true,
        }
    }
}

impl ParagraphAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_maximum_number_of_lines(mut self, lines: u32) -> Self {
        self.maximum_number_of_lines = Some(lines);
        self
    }

    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_base_writing_direction(mut self, direction: WritingDirection) -> Self {
        self.base_writing_direction = direction;
        self
    }

    /// Enable font shrinking down to `minimum_font_scale`
    pub fn with_adjusts_font_size_to_fit(mut self, minimum_font_scale: f32) -> Self {
        self.adjusts_font_size_to_fit = true;
        self.minimum_font_scale = minimum_font_scale;
        self
    }

    /// Effective line limit, with zero folded into "unlimited"
    pub fn line_limit(&self) -> Option<u32> {
        self.maximum_number_of_lines.filter(|&lines| lines > 0)
    }

    pub fn validate(&self) -> Result<()> {
        let scale = self.minimum_font_scale;
        if !(scale.is_finite() && scale > 0.0 && scale <= 1.0) {
            return Err(KryonError::InvalidParagraphAttribute {
                name: "minimum_font_scale",
                value: scale,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_limit_treats_zero_as_unlimited() {
        assert_eq!(ParagraphAttributes::new().line_limit(), None);
        assert_eq!(ParagraphAttributes::new().with_maximum_number_of_lines(0).line_limit(), None);
        assert_eq!(ParagraphAttributes::new().with_maximum_number_of_lines(3).line_limit(), Some(3));
    }

    #[test]
    fn test_minimum_font_scale_validation() {
        assert!(ParagraphAttributes::new().validate().is_ok());
        assert!(ParagraphAttributes::new().with_adjusts_font_size_to_fit(0.5).validate().is_ok());
        assert!(ParagraphAttributes::new().with_adjusts_font_size_to_fit(0.0).validate().is_err());
        assert!(ParagraphAttributes::new().with_adjusts_font_size_to_fit(1.5).validate().is_err());
        assert!(ParagraphAttributes::new().with_adjusts_font_size_to_fit(f32::NAN).validate().is_err());
    }
}
