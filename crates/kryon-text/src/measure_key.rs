//! Cache key for text measurements.
//!
//! The key is a projection of the measurement inputs onto the fields that can
//! change the result. Colors, opacity and decorations are dropped so that
//! restyling text does not miss the cache; everything that reaches the shaper
//! or the line breaker is kept.

use glam::Vec2;
use kryon_core::{
    AttributedString, EllipsizeMode, FontStyle, FontWeight, Fragment, ParagraphAttributes,
    TextAlignment, TextAttributes, TextBreakStrategy, TextTransform, WritingDirection,
};
use kryon_layout::{LayoutConstraints, LayoutDirection};

/// `f32` compared and hashed by bit pattern, with `-0.0` folded into `0.0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatBits(u32);

impl FloatBits {
    pub fn new(value: f32) -> Self {
        if value == 0.0 {
            Self(0.0f32.to_bits())
        } else {
            Self(value.to_bits())
        }
    }
}

impl From<f32> for FloatBits {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

fn size_bits(size: Vec2) -> (FloatBits, FloatBits) {
    (size.x.into(), size.y.into())
}

/// Shaping-relevant subset of [`TextAttributes`], with the font size folded
/// into the size the shaper actually uses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TextAttributesKey {
    font_family: Option<String>,
    font_size: FloatBits,
    font_weight: Option<FontWeight>,
    font_style: Option<FontStyle>,
    letter_spacing: Option<FloatBits>,
    line_height: Option<FloatBits>,
    text_transform: Option<TextTransform>,
}

impl From<&TextAttributes> for TextAttributesKey {
    fn from(attributes: &TextAttributes) -> Self {
        Self {
            font_family: attributes.font_family.clone(),
            font_size: FloatBits::new(attributes.effective_font_size()),
            font_weight: attributes.font_weight,
            font_style: attributes.font_style,
            letter_spacing: attributes.letter_spacing.map(FloatBits::new),
            line_height: attributes.line_height.map(FloatBits::new),
            text_transform: attributes.text_transform,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FragmentKey {
    text: String,
    attributes: TextAttributesKey,
    attachment_size: Option<(FloatBits, FloatBits)>,
}

impl FragmentKey {
    /// `resolved` are the fragment's attributes after the base attributes were applied
    fn new(fragment: &Fragment, resolved: &TextAttributes) -> Self {
        Self {
            text: fragment.text.clone(),
            attributes: resolved.into(),
            attachment_size: fragment.attachment_size.map(size_bits),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ParagraphKey {
    line_limit: Option<u32>,
    ellipsize_mode: EllipsizeMode,
    text_break_strategy: TextBreakStrategy,
    alignment: TextAlignment,
    base_writing_direction: WritingDirection,
    /// Minimum font scale, only when font shrinking is enabled
    font_size_adjustment: Option<FloatBits>,
    include_font_padding: bool,
}

impl From<&ParagraphAttributes> for ParagraphKey {
    fn from(attributes: &ParagraphAttributes) -> Self {
        Self {
            line_limit: attributes.line_limit(),
            ellipsize_mode: attributes.ellipsize_mode,
            text_break_strategy: attributes.text_break_strategy,
            alignment: attributes.alignment,
            base_writing_direction: attributes.base_writing_direction,
            font_size_adjustment: attributes
                .adjusts_font_size_to_fit
                .then(|| FloatBits::new(attributes.minimum_font_scale)),
            include_font_padding: attributes.include_font_padding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConstraintsKey {
    minimum_size: (FloatBits, FloatBits),
    maximum_size: (FloatBits, FloatBits),
    layout_direction: LayoutDirection,
}

impl From<&LayoutConstraints> for ConstraintsKey {
    fn from(constraints: &LayoutConstraints) -> Self {
        Self {
            minimum_size: size_bits(constraints.minimum_size),
            maximum_size: size_bits(constraints.maximum_size),
            layout_direction: constraints.layout_direction,
        }
    }
}

/// What a cached measurement answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureQuery {
    /// Overall size and attachment frames
    Size,
    /// Line breakdown inside an exact box
    Lines,
}

/// Identity of a measurement request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeasurementKey {
    fragments: Vec<FragmentKey>,
    base_attributes: TextAttributesKey,
    paragraph: ParagraphKey,
    constraints: ConstraintsKey,
    query: MeasureQuery,
}

impl MeasurementKey {
    /// Key of a size measurement under `constraints`
    pub fn new(
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        layout_constraints: &LayoutConstraints,
    ) -> Self {
        Self::build(
            attributed_string,
            paragraph_attributes,
            layout_constraints,
            MeasureQuery::Size,
        )
    }

    /// Key of a line breakdown for a box of exactly `size`
    pub fn for_lines(
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        size: Vec2,
    ) -> Self {
        Self::build(
            attributed_string,
            paragraph_attributes,
            &LayoutConstraints::with_fixed_size(size.x, size.y),
            MeasureQuery::Lines,
        )
    }

    fn build(
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        layout_constraints: &LayoutConstraints,
        query: MeasureQuery,
    ) -> Self {
        Self {
            fragments: attributed_string
                .fragments
                .iter()
                .enumerate()
                .map(|(index, fragment)| {
                    FragmentKey::new(fragment, &attributed_string.resolved_attributes(index))
                })
                .collect(),
            base_attributes: (&attributed_string.base_attributes).into(),
            paragraph: paragraph_attributes.into(),
            constraints: layout_constraints.into(),
            query,
        }
    }

    pub fn query(&self) -> MeasureQuery {
        self.query
    }
}
