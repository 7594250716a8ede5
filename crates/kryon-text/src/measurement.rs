//! Values produced by a text measurement

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::primitives::Rect;

/// Byte range within the plain text of an attributed string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub location: usize,
    pub length: usize,
}

impl TextRange {
    pub fn new(location: usize, length: usize) -> Self {
        Self { location, length }
    }

    pub fn end(&self) -> usize {
        self.location + self.length
    }
}

/// Metrics of one laid-out line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMeasurement {
    /// Line box relative to the paragraph origin
    pub frame: Rect,

    /// Distance from the top of `frame` to the baseline
    pub baseline: f32,

    pub ascender: f32,

    pub descender: f32,

    /// Text covered by the line, trailing whitespace and line break included
    pub range: TextRange,
}

/// Where an inline attachment ended up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentMeasurement {
    pub frame: Rect,

    /// The attachment fell into truncated text and is not displayed
    pub is_clipped: bool,
}

/// Result of measuring an attributed string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextMeasurement {
    pub size: Vec2,

    /// One entry per attachment fragment, in content order
    pub attachments: Vec<AttachmentMeasurement>,

    /// Per-line breakdown, present only for line queries
    pub lines: Option<Vec<LineMeasurement>>,
}

impl TextMeasurement {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<AttachmentMeasurement>) -> Self {
        self.attachments = attachments;
        self
    }

    /// A measurement carrying a line breakdown for a box of `size`
    pub fn from_lines(size: Vec2, lines: Vec<LineMeasurement>) -> Self {
        Self {
            size,
            attachments: Vec::new(),
            lines: Some(lines),
        }
    }
}
