//! Attributed string types consumed by text measurement

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::{KryonError, Result};

/// Font size used when neither a fragment nor the base attributes set one
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

/// Placeholder character that stands in for an inline attachment
pub const OBJECT_REPLACEMENT_CHARACTER: char = '\u{FFFC}';

/// Font weight values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontWeight {
    Thin = 100,
    ExtraLight = 200,
    Light = 300,
    #[default]
    Normal = 400,
    Medium = 500,
    SemiBold = 600,
    Bold = 700,
    ExtraBold = 800,
    Black = 900,
}

/// Font style values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Text decoration line type. Drawn over the glyphs, never changes their metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    Overline,
    LineThrough,
}

/// Case transform applied to the text before shaping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

impl TextTransform {
    /// Apply the transform to `text`
    pub fn apply(&self, text: &str) -> String {
        self.apply_with_offsets(text).0
    }

    /// Apply the transform and map every output byte back to the byte offset
    /// of the source character it came from. The map has one extra trailing
    /// entry equal to `text.len()`.
    pub fn apply_with_offsets(&self, text: &str) -> (String, Vec<usize>) {
        let mut output = String::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        let mut at_word_start = true;
        for (offset, ch) in text.char_indices() {
            match self {
                TextTransform::None => output.push(ch),
                TextTransform::Uppercase => output.extend(ch.to_uppercase()),
                TextTransform::Lowercase => output.extend(ch.to_lowercase()),
                TextTransform::Capitalize if at_word_start && ch.is_alphabetic() => {
                    output.extend(ch.to_uppercase())
                }
                TextTransform::Capitalize => output.push(ch),
            }
            at_word_start = ch.is_whitespace();
            offsets.resize(output.len(), offset);
        }
        offsets.push(text.len());
        (output, offsets)
    }
}

/// Style attributes of a run of text.
///
/// Every field is optional so fragment attributes can be layered over the
/// base attributes of their string with [`TextAttributes::apply`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextAttributes {
    /// Text color (RGBA)
    pub foreground_color: Option<Vec4>,

    /// Background color behind the glyphs
    pub background_color: Option<Vec4>,

    pub opacity: Option<f32>,

    /// Font family name
    pub font_family: Option<String>,

    /// Font size in points
    pub font_size: Option<f32>,

    /// Accessibility scale applied to the font size
    pub font_size_multiplier: Option<f32>,

    /// Whether `font_size_multiplier` is honored
    pub allow_font_scaling: Option<bool>,

    pub font_weight: Option<FontWeight>,

    pub font_style: Option<FontStyle>,

    /// Extra space added after every character
    pub letter_spacing: Option<f32>,

    /// Explicit line height; derived from the font size when unset
    pub line_height: Option<f32>,

    pub text_transform: Option<TextTransform>,

    pub text_decoration: Option<TextDecoration>,

    pub text_decoration_color: Option<Vec4>,
}

impl TextAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay every field set in `other` on top of `self`
    pub fn apply(&mut self, other: &TextAttributes) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )*
            };
        }
        overlay!(
            foreground_color,
            background_color,
            opacity,
            font_family,
            font_size,
            font_size_multiplier,
            allow_font_scaling,
            font_weight,
            font_style,
            letter_spacing,
            line_height,
            text_transform,
            text_decoration,
            text_decoration_color
        );
    }

    /// Font size after the accessibility multiplier has been applied
    pub fn effective_font_size(&self) -> f32 {
        let size = self.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        if self.allow_font_scaling.unwrap_or(true) {
            size * self.font_size_multiplier.unwrap_or(1.0)
        } else {
            size
        }
    }

    pub fn with_foreground_color(mut self, color: Vec4) -> Self {
        self.foreground_color = Some(color);
        self
    }

    pub fn with_background_color(mut self, color: Vec4) -> Self {
        self.background_color = Some(color);
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_font_size_multiplier(mut self, multiplier: f32) -> Self {
        self.font_size_multiplier = Some(multiplier);
        self
    }

    pub fn with_font_weight(mut self, weight: FontWeight) -> Self {
        self.font_weight = Some(weight);
        self
    }

    pub fn with_font_style(mut self, style: FontStyle) -> Self {
        self.font_style = Some(style);
        self
    }

    pub fn with_letter_spacing(mut self, spacing: f32) -> Self {
        self.letter_spacing = Some(spacing);
        self
    }

    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = Some(line_height);
        self
    }

    pub fn with_text_transform(mut self, transform: TextTransform) -> Self {
        self.text_transform = Some(transform);
        self
    }

    pub fn with_text_decoration(mut self, decoration: TextDecoration) -> Self {
        self.text_decoration = Some(decoration);
        self
    }

    fn validate(&self, fragment: Option<usize>) -> Result<()> {
        if let Some(size) = self.font_size {
            if !size.is_finite() || size <= 0.0 {
                return Err(KryonError::InvalidFontSize { fragment, size });
            }
        }
        let checks: [(&'static str, Option<f32>, fn(f32) -> bool); 3] = [
            ("font_size_multiplier", self.font_size_multiplier, |v: f32| v.is_finite() && v > 0.0),
            ("letter_spacing", self.letter_spacing, |v: f32| v.is_finite()),
            ("line_height", self.line_height, |v: f32| v.is_finite() && v >= 0.0),
        ];
        for (name, value, is_valid) in checks {
            if let Some(value) = value {
                if !is_valid(value) {
                    return Err(KryonError::InvalidTextAttribute { fragment, name, value });
                }
            }
        }
        Ok(())
    }
}

/// A run of text sharing one set of attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fragment {
    pub text: String,

    pub attributes: TextAttributes,

    /// Size of an inline attachment; `text` holds the placeholder character
    pub attachment_size: Option<Vec2>,
}

impl Fragment {
    /// Create a plain text fragment
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Create an inline attachment of the given size
    pub fn attachment(size: Vec2) -> Self {
        Self {
            text: OBJECT_REPLACEMENT_CHARACTER.to_string(),
            attachment_size: Some(size),
            ..Default::default()
        }
    }

    pub fn with_attributes(mut self, attributes: TextAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn is_attachment(&self) -> bool {
        self.attachment_size.is_some()
    }
}

/// Text with per-fragment styling, measured as one unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributedString {
    pub fragments: Vec<Fragment>,

    /// Attributes every fragment inherits unless it overrides them
    pub base_attributes: TextAttributes,
}

impl AttributedString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fragment(fragment: Fragment) -> Self {
        Self {
            fragments: vec![fragment],
            ..Default::default()
        }
    }

    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        Self {
            fragments,
            ..Default::default()
        }
    }

    /// Append a fragment
    pub fn add_fragment(mut self, fragment: Fragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    pub fn with_base_attributes(mut self, attributes: TextAttributes) -> Self {
        self.base_attributes = attributes;
        self
    }

    /// Attributes of fragment `index` after layering them over the base attributes
    pub fn resolved_attributes(&self, index: usize) -> TextAttributes {
        let mut attributes = self.base_attributes.clone();
        if let Some(fragment) = self.fragments.get(index) {
            attributes.apply(&fragment.attributes);
        }
        attributes
    }

    /// All fragment texts concatenated. Text ranges in measurements index into this.
    pub fn to_plain_text(&self) -> String {
        self.fragments.iter().map(|fragment| fragment.text.as_str()).collect()
    }

    /// Total length in bytes
    pub fn len(&self) -> usize {
        self.fragments.iter().map(|fragment| fragment.text.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|fragment| fragment.text.is_empty())
    }

    /// Reject attribute values no backend can measure
    pub fn validate(&self) -> Result<()> {
        self.base_attributes.validate(None)?;
        for (index, fragment) in self.fragments.iter().enumerate() {
            fragment.attributes.validate(Some(index))?;
            if let Some(size) = fragment.attachment_size {
                if !size.is_finite() || size.x < 0.0 || size.y < 0.0 {
                    return Err(KryonError::InvalidAttachmentSize {
                        fragment: index,
                        width: size.x,
                        height: size.y,
                    });
                }
            }
        }
        Ok(())
    }
}

impl From<String> for AttributedString {
    fn from(text: String) -> Self {
        Self::from_fragment(Fragment::new(text))
    }
}

impl From<&str> for AttributedString {
    fn from(text: &str) -> Self {
        Self::from_fragment(Fragment::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_layering() {
        let string = AttributedString::new()
            .with_base_attributes(TextAttributes::new().with_font_size(16.0).with_font_family("Inter"))
            .add_fragment(Fragment::new("Regular "))
            .add_fragment(
                Fragment::new("Bold").with_attributes(
                    TextAttributes::new()
                        .with_font_weight(FontWeight::Bold)
                        .with_font_size(20.0),
                ),
            );

        let regular = string.resolved_attributes(0);
        assert_eq!(regular.font_size, Some(16.0));
        assert_eq!(regular.font_weight, None);

        let bold = string.resolved_attributes(1);
        assert_eq!(bold.font_size, Some(20.0));
        assert_eq!(bold.font_weight, Some(FontWeight::Bold));
        assert_eq!(bold.font_family.as_deref(), Some("Inter"));
    }

    #[test]
    fn test_plain_text_and_length() {
        let string = AttributedString::from("Hello, ")
            .add_fragment(Fragment::new("world"))
            .add_fragment(Fragment::attachment(Vec2::new(10.0, 10.0)));

        assert_eq!(string.to_plain_text(), "Hello, world\u{FFFC}");
        assert_eq!(string.len(), "Hello, world\u{FFFC}".len());
        assert!(!string.is_empty());
        assert!(AttributedString::from("").is_empty());
        assert!(AttributedString::new().is_empty());
    }

    #[test]
    fn test_effective_font_size() {
        let scaled = TextAttributes::new().with_font_size(10.0).with_font_size_multiplier(2.0);
        assert_eq!(scaled.effective_font_size(), 20.0);

        let mut fixed = scaled.clone();
        fixed.allow_font_scaling = Some(false);
        assert_eq!(fixed.effective_font_size(), 10.0);

        assert_eq!(TextAttributes::new().effective_font_size(), DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_text_transform() {
        assert_eq!(TextTransform::Uppercase.apply("straße"), "STRASSE");
        assert_eq!(TextTransform::Capitalize.apply("hello big world"), "Hello Big World");
        assert_eq!(TextTransform::Lowercase.apply("MiXeD"), "mixed");

        let (upper, offsets) = TextTransform::Uppercase.apply_with_offsets("aß!");
        assert_eq!(upper, "ASS!");
        assert_eq!(offsets, vec![0, 1, 1, 3, 4]);
    }

    #[test]
    fn test_validation_rejects_bad_attributes() {
        let negative_size = AttributedString::from_fragment(
            Fragment::new("x").with_attributes(TextAttributes::new().with_font_size(-1.0)),
        );
        assert_eq!(
            negative_size.validate(),
            Err(KryonError::InvalidFontSize { fragment: Some(0), size: -1.0 })
        );

        let nan_spacing = AttributedString::from("x")
            .with_base_attributes(TextAttributes::new().with_letter_spacing(f32::NAN));
        assert!(matches!(
            nan_spacing.validate(),
            Err(KryonError::InvalidTextAttribute { fragment: None, name: "letter_spacing", .. })
        ));

        let bad_attachment = AttributedString::from_fragment(Fragment::attachment(Vec2::new(-4.0, 2.0)));
        assert!(matches!(
            bad_attachment.validate(),
            Err(KryonError::InvalidAttachmentSize { fragment: 0, .. })
        ));

        assert!(AttributedString::from("fine").validate().is_ok());
    }
}
