// crates/kryon-layout/src/constraints.rs

use glam::Vec2;
use kryon_core::{KryonError, Result};
use serde::{Deserialize, Serialize};
use taffy::{AvailableSpace, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayoutDirection {
    #[default]
    Undefined,
    LeftToRight,
    RightToLeft,
}

/// Size envelope a measurement has to fit in.
///
/// Maximum bounds may be `f32::INFINITY` to leave an axis unbounded; minimum
/// bounds are always finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConstraints {
    pub minimum_size: Vec2,
    pub maximum_size: Vec2,
    pub layout_direction: LayoutDirection,
}

impl Default for LayoutConstraints {
    fn default() -> Self {
        Self {
            minimum_size: Vec2::ZERO,
            maximum_size: Vec2::INFINITY,
            layout_direction: LayoutDirection::Undefined,
        }
    }
}

impl LayoutConstraints {
    /// Unbounded constraints
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(width: f32, height: f32) -> Self {
        Self {
            maximum_size: Vec2::new(width, height),
            ..Self::default()
        }
    }

    /// Bound the width only, the usual shape of a text measurement request
    pub fn with_max_width(width: f32) -> Self {
        Self::with_max_size(width, f32::INFINITY)
    }

    pub fn with_fixed_size(width: f32, height: f32) -> Self {
        let size = Vec2::new(width, height);
        Self {
            minimum_size: size,
            maximum_size: size,
            ..Self::default()
        }
    }

    pub fn with_layout_direction(mut self, direction: LayoutDirection) -> Self {
        self.layout_direction = direction;
        self
    }

    /// Build constraints from the arguments taffy hands a leaf measure function.
    ///
    /// A known dimension fixes that axis; definite available space bounds it;
    /// min-content collapses it to zero so the text wraps at every opportunity;
    /// max-content leaves it unbounded.
    pub fn from_taffy(
        known_dimensions: Size<Option<f32>>,
        available_space: Size<AvailableSpace>,
        layout_direction: LayoutDirection,
    ) -> Self {
        fn axis(known: Option<f32>, available: AvailableSpace) -> (f32, f32) {
            match (known, available) {
                (Some(value), _) => (value, value),
                (None, AvailableSpace::Definite(value)) => (0.0, value),
                (None, AvailableSpace::MinContent) => (0.0, 0.0),
                (None, AvailableSpace::MaxContent) => (0.0, f32::INFINITY),
            }
        }

        let (min_width, max_width) = axis(known_dimensions.width, available_space.width);
        let (min_height, max_height) = axis(known_dimensions.height, available_space.height);
        Self {
            minimum_size: Vec2::new(min_width, min_height),
            maximum_size: Vec2::new(max_width, max_height),
            layout_direction,
        }
    }

    pub fn constrain_width(&self, width: f32) -> f32 {
        width.clamp(self.minimum_size.x, self.maximum_size.x)
    }

    pub fn constrain_height(&self, height: f32) -> f32 {
        height.clamp(self.minimum_size.y, self.maximum_size.y)
    }

    /// Clamp `size` into the envelope
    pub fn clamp(&self, size: Vec2) -> Vec2 {
        Vec2::new(self.constrain_width(size.x), self.constrain_height(size.y))
    }

    /// Reject envelopes `clamp` cannot honor
    pub fn validate(&self) -> Result<()> {
        if !self.minimum_size.is_finite() || self.minimum_size.cmplt(Vec2::ZERO).any() {
            return Err(KryonError::InvalidConstraints(format!(
                "minimum size {:?} must be finite and non-negative",
                self.minimum_size
            )));
        }
        if self.maximum_size.is_nan() || self.maximum_size.cmplt(Vec2::ZERO).any() {
            return Err(KryonError::InvalidConstraints(format!(
                "maximum size {:?} must be non-negative",
                self.maximum_size
            )));
        }
        if self.minimum_size.cmpgt(self.maximum_size).any() {
            return Err(KryonError::InvalidConstraints(format!(
                "minimum size {:?} exceeds maximum size {:?}",
                self.minimum_size, self.maximum_size
            )));
        }
        Ok(())
    }
}
