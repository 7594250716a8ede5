// crates/kryon-text/src/text.rs
use glam::Vec2;
use kryon_core::{AttributedString, ParagraphAttributes, TextAlignment, WritingDirection};
use kryon_layout::{LayoutConstraints, LayoutDirection};

use crate::measurement::{AttachmentMeasurement, LineMeasurement, TextMeasurement, TextRange};
use crate::primitives::Rect;
use crate::BackendError;

/// Platform text measurement capability.
///
/// Implementations must be deterministic: identical inputs produce identical
/// results for as long as the backend's own state (fonts, display scale) is
/// unchanged.
pub trait TextMeasurer: Send + Sync {
    /// Measure the size of `attributed_string` laid out under `layout_constraints`
    fn measure(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        layout_constraints: &LayoutConstraints,
    ) -> Result<TextMeasurement, BackendError>;

    /// Break `attributed_string` into lines inside a box of `size`
    fn measure_lines(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        size: Vec2,
    ) -> Result<Vec<LineMeasurement>, BackendError>;
}

/// Whether lines run right to left
pub(crate) fn is_right_to_left(direction: WritingDirection, layout_direction: LayoutDirection) -> bool {
    match direction {
        WritingDirection::LeftToRight => false,
        WritingDirection::RightToLeft => true,
        WritingDirection::Natural => layout_direction == LayoutDirection::RightToLeft,
    }
}

/// Horizontal offset of a line of `line_width` inside `container_width`
pub(crate) fn align_line(
    alignment: TextAlignment,
    right_to_left: bool,
    container_width: f32,
    line_width: f32,
) -> f32 {
    let free = (container_width - line_width).max(0.0);
    match (alignment, right_to_left) {
        (TextAlignment::Center, _) => free * 0.5,
        (TextAlignment::Start | TextAlignment::Justify, false) | (TextAlignment::End, true) => 0.0,
        (TextAlignment::Start | TextAlignment::Justify, true) | (TextAlignment::End, false) => free,
    }
}

const ASCENT_RATIO: f32 = 0.8;
const DESCENT_RATIO: f32 = 0.2;
const FONT_SCALE_STEP: f32 = 0.05;
const FIT_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
enum GlyphKind {
    Visible,
    Space,
    LineBreak,
    Attachment(usize),
}

#[derive(Debug, Clone, Copy)]
struct Glyph {
    kind: GlyphKind,
    /// Byte offset of the source character in the plain text
    source: usize,
    advance: f32,
    ascender: f32,
    descender: f32,
    line_height: f32,
}

#[derive(Debug, Clone)]
struct LaidOutLine {
    /// Glyph index range
    start: usize,
    end: usize,
    /// Width without hanging whitespace
    width: f32,
    ascender: f32,
    descender: f32,
    height: f32,
}

impl LaidOutLine {
    fn baseline(&self) -> f32 {
        (self.height - (self.ascender + self.descender)) * 0.5 + self.ascender
    }
}

struct Paragraph {
    glyphs: Vec<Glyph>,
    lines: Vec<LaidOutLine>,
    truncated: bool,
}

impl Paragraph {
    fn width(&self) -> f32 {
        self.lines.iter().map(|line| line.width).fold(0.0, f32::max)
    }

    fn height(&self) -> f32 {
        self.lines.iter().map(|line| line.height).sum()
    }

    fn fits(&self, available: Vec2) -> bool {
        !self.truncated
            && self.width() <= available.x + FIT_EPSILON
            && self.height() <= available.y + FIT_EPSILON
    }

    fn source_offset(&self, glyph_index: usize, text_length: usize) -> usize {
        self.glyphs
            .get(glyph_index)
            .map(|glyph| glyph.source)
            .unwrap_or(text_length)
    }
}

/// Deterministic measurement backend built on average glyph metrics.
///
/// Every character advances by a fixed fraction of its font size, which makes
/// results reproducible on any machine. Used where no font stack is available
/// and as the reference backend in tests.
#[derive(Debug, Clone)]
pub struct SimpleTextShaper {
    average_char_width: f32,
    line_height_multiplier: f32,
}

impl SimpleTextShaper {
    pub fn new() -> Self {
        Self {
            average_char_width: 0.6, // Approximate ratio of char width to font size
            line_height_multiplier: 1.2,
        }
    }

    fn shape(&self, attributed_string: &AttributedString, scale: f32) -> Vec<Glyph> {
        let mut glyphs = Vec::with_capacity(attributed_string.len());
        let mut fragment_start = 0;
        let mut attachment_index = 0;

        for (index, fragment) in attributed_string.fragments.iter().enumerate() {
            let attributes = attributed_string.resolved_attributes(index);

            if let Some(size) = fragment.attachment_size {
                glyphs.push(Glyph {
                    kind: GlyphKind::Attachment(attachment_index),
                    source: fragment_start,
                    advance: size.x,
                    ascender: size.y,
                    descender: 0.0,
                    line_height: size.y,
                });
                attachment_index += 1;
                fragment_start += fragment.text.len();
                continue;
            }

            let font_size = attributes.effective_font_size() * scale;
            let advance = font_size * self.average_char_width + attributes.letter_spacing.unwrap_or(0.0);
            let line_height = attributes
                .line_height
                .map(|height| height * scale)
                .unwrap_or(font_size * self.line_height_multiplier);

            let transform = attributes.text_transform.unwrap_or_default();
            let (shaped, offsets) = transform.apply_with_offsets(&fragment.text);
            for (byte, ch) in shaped.char_indices() {
                let (kind, advance) = match ch {
                    '\n' => (GlyphKind::LineBreak, 0.0),
                    '\r' => (GlyphKind::Space, 0.0),
                    c if c.is_whitespace() => (GlyphKind::Space, advance),
                    _ => (GlyphKind::Visible, advance),
                };
                glyphs.push(Glyph {
                    kind,
                    source: fragment_start + offsets[byte],
                    advance,
                    ascender: font_size * ASCENT_RATIO,
                    descender: font_size * DESCENT_RATIO,
                    line_height,
                });
            }
            fragment_start += fragment.text.len();
        }

        glyphs
    }

    /// Greedy line breaking: break after whitespace when possible, between
    /// characters when a single word overflows, and always after `\n`.
    fn break_lines(&self, glyphs: &[Glyph], max_width: f32) -> Vec<(usize, usize)> {
        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut width = 0.0_f32;
        let mut last_break: Option<usize> = None;
        let mut i = 0;

        while i < glyphs.len() {
            let glyph = &glyphs[i];
            match glyph.kind {
                GlyphKind::LineBreak => {
                    lines.push((line_start, i + 1));
                    line_start = i + 1;
                    width = 0.0;
                    last_break = None;
                    i += 1;
                }
                GlyphKind::Space => {
                    // Whitespace hangs past the edge instead of forcing a break
                    width += glyph.advance;
                    last_break = Some(i + 1);
                    i += 1;
                }
                GlyphKind::Visible | GlyphKind::Attachment(_) => {
                    if width + glyph.advance > max_width + FIT_EPSILON && i > line_start {
                        let break_at = last_break.filter(|&at| at > line_start).unwrap_or(i);
                        lines.push((line_start, break_at));
                        line_start = break_at;
                        width = glyphs[line_start..i].iter().map(|g| g.advance).sum();
                        last_break = None;
                        continue;
                    }
                    width += glyph.advance;
                    i += 1;
                }
            }
        }

        let ends_with_break = glyphs.last().map_or(false, |g| g.kind == GlyphKind::LineBreak);
        if line_start < glyphs.len() || ends_with_break {
            lines.push((line_start, glyphs.len()));
        }
        lines
    }

    fn lay_out(
        &self,
        attributed_string: &AttributedString,
        max_width: f32,
        line_limit: Option<u32>,
        scale: f32,
    ) -> Paragraph {
        let glyphs = self.shape(attributed_string, scale);
        let mut lines: Vec<LaidOutLine> = self
            .break_lines(&glyphs, max_width)
            .into_iter()
            .map(|(start, end)| line_metrics(&glyphs, start, end))
            .collect();

        let mut truncated = false;
        if let Some(limit) = line_limit {
            if lines.len() > limit as usize {
                lines.truncate(limit as usize);
                truncated = true;
            }
        }

        Paragraph {
            glyphs,
            lines,
            truncated,
        }
    }

    /// Lay out at full size, shrinking the font when the paragraph asks for it
    fn lay_out_fitting(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        available: Vec2,
    ) -> Paragraph {
        let line_limit = paragraph_attributes.line_limit();
        let minimum_scale = paragraph_attributes.minimum_font_scale;
        let mut scale = 1.0_f32;
        loop {
            let paragraph = self.lay_out(attributed_string, available.x, line_limit, scale);
            if !paragraph_attributes.adjusts_font_size_to_fit
                || paragraph.fits(available)
                || scale <= minimum_scale
            {
                return paragraph;
            }
            scale = (scale - FONT_SCALE_STEP).max(minimum_scale);
        }
    }

    /// Line frames positioned inside `container_width`
    fn line_frames(
        &self,
        paragraph: &Paragraph,
        paragraph_attributes: &ParagraphAttributes,
        right_to_left: bool,
        container_width: f32,
    ) -> Vec<Rect> {
        let mut y = 0.0;
        paragraph
            .lines
            .iter()
            .map(|line| {
                let x = align_line(paragraph_attributes.alignment, right_to_left, container_width, line.width);
                let frame = Rect::new(x, y, line.width, line.height);
                y += line.height;
                frame
            })
            .collect()
    }

    fn attachments(
        &self,
        attributed_string: &AttributedString,
        paragraph: &Paragraph,
        frames: &[Rect],
    ) -> Vec<AttachmentMeasurement> {
        let count = attributed_string.fragments.iter().filter(|f| f.is_attachment()).count();
        let mut attachments = vec![
            AttachmentMeasurement {
                frame: Rect::ZERO,
                is_clipped: true,
            };
            count
        ];

        for (line, frame) in paragraph.lines.iter().zip(frames) {
            let mut x = frame.position.x;
            for glyph in &paragraph.glyphs[line.start..line.end] {
                if let GlyphKind::Attachment(index) = glyph.kind {
                    attachments[index] = AttachmentMeasurement {
                        frame: Rect::new(
                            x,
                            frame.position.y + line.baseline() - glyph.ascender,
                            glyph.advance,
                            glyph.ascender,
                        ),
                        is_clipped: false,
                    };
                }
                x += glyph.advance;
            }
        }
        attachments
    }
}

fn line_metrics(glyphs: &[Glyph], start: usize, end: usize) -> LaidOutLine {
    let line = &glyphs[start..end];
    let visible_end = line
        .iter()
        .rposition(|g| !matches!(g.kind, GlyphKind::Space | GlyphKind::LineBreak))
        .map_or(0, |last| last + 1);
    let width = line[..visible_end].iter().map(|g| g.advance).sum();

    // An empty trailing line takes the metrics of the break that produced it
    let metric_source: &[Glyph] = if line.is_empty() {
        &glyphs[start.saturating_sub(1)..start]
    } else {
        line
    };
    let ascender = metric_source.iter().map(|g| g.ascender).fold(0.0, f32::max);
    let descender = metric_source.iter().map(|g| g.descender).fold(0.0, f32::max);
    let height = metric_source
        .iter()
        .map(|g| g.line_height)
        .fold(ascender + descender, f32::max);

    LaidOutLine {
        start,
        end,
        width,
        ascender,
        descender,
        height,
    }
}

impl Default for SimpleTextShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasurer for SimpleTextShaper {
    fn measure(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        layout_constraints: &LayoutConstraints,
    ) -> Result<TextMeasurement, BackendError> {
        let paragraph =
            self.lay_out_fitting(attributed_string, paragraph_attributes, layout_constraints.maximum_size);
        let right_to_left = is_right_to_left(
            paragraph_attributes.base_writing_direction,
            layout_constraints.layout_direction,
        );
        let frames = self.line_frames(&paragraph, paragraph_attributes, right_to_left, paragraph.width());
        let size = frames
            .iter()
            .copied()
            .reduce(|bounds, frame| bounds.union(&frame))
            .map_or(Vec2::ZERO, |bounds| bounds.max());

        Ok(TextMeasurement::new(size)
            .with_attachments(self.attachments(attributed_string, &paragraph, &frames)))
    }

    fn measure_lines(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        size: Vec2,
    ) -> Result<Vec<LineMeasurement>, BackendError> {
        let paragraph = self.lay_out_fitting(attributed_string, paragraph_attributes, size);
        let right_to_left = is_right_to_left(
            paragraph_attributes.base_writing_direction,
            LayoutDirection::Undefined,
        );
        let container_width = if size.x.is_finite() { size.x } else { paragraph.width() };
        let frames = self.line_frames(&paragraph, paragraph_attributes, right_to_left, container_width);
        let text_length = attributed_string.len();

        Ok(paragraph
            .lines
            .iter()
            .zip(frames)
            .take_while(|(_, frame)| frame.max().y <= size.y + FIT_EPSILON)
            .map(|(line, frame)| {
                let location = paragraph.source_offset(line.start, text_length);
                let end = paragraph.source_offset(line.end, text_length);
                LineMeasurement {
                    frame,
                    baseline: line.baseline(),
                    ascender: line.ascender,
                    descender: line.descender,
                    range: TextRange::new(location, end - location),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kryon_core::{Fragment, TextAttributes, TextTransform};

    fn text(content: &str, font_size: f32) -> AttributedString {
        AttributedString::from(content)
            .with_base_attributes(TextAttributes::new().with_font_size(font_size))
    }

    #[test]
    fn test_single_line_measurement() {
        let shaper = SimpleTextShaper::new();
        let measurement = shaper
            .measure(&text("Hello", 10.0), &ParagraphAttributes::new(), &LayoutConstraints::new())
            .unwrap();

        // 5 chars * 6.0 advance, one 12.0 line
        assert_eq!(measurement.size, Vec2::new(30.0, 12.0));
        assert!(measurement.attachments.is_empty());
        assert!(measurement.lines.is_none());
    }

    #[test]
    fn test_word_wrapping() {
        let shaper = SimpleTextShaper::new();
        let constraints = LayoutConstraints::with_max_width(40.0);
        let measurement = shaper
            .measure(&text("aaa bbb ccc", 10.0), &ParagraphAttributes::new(), &constraints)
            .unwrap();

        // "aaa " fits (hanging space), "bbb" would need 42 -> three lines of 18 wide
        assert_eq!(measurement.size, Vec2::new(18.0, 36.0));
    }

    #[test]
    fn test_long_word_breaks_between_characters() {
        let shaper = SimpleTextShaper::new();
        let lines = shaper
            .measure_lines(&text("abcdefgh", 10.0), &ParagraphAttributes::new(), Vec2::new(30.0, 100.0))
            .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].range, TextRange::new(0, 5));
        assert_eq!(lines[1].range, TextRange::new(5, 3));
        assert_eq!(lines[1].frame, Rect::new(0.0, 12.0, 18.0, 12.0));
    }

    #[test]
    fn test_hard_breaks_and_trailing_newline() {
        let shaper = SimpleTextShaper::new();
        let lines = shaper
            .measure_lines(&text("ab\ncd\n", 10.0), &ParagraphAttributes::new(), Vec2::new(100.0, 100.0))
            .unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].range, TextRange::new(0, 3));
        assert_eq!(lines[1].range, TextRange::new(3, 3));
        assert_eq!(lines[2].range, TextRange::new(6, 0));
        assert_eq!(lines[2].frame.size.y, 12.0);
    }

    #[test]
    fn test_line_limit_truncates() {
        let shaper = SimpleTextShaper::new();
        let paragraph = ParagraphAttributes::new().with_maximum_number_of_lines(2);
        let measurement = shaper
            .measure(&text("a\nb\nc\nd", 10.0), &paragraph, &LayoutConstraints::new())
            .unwrap();
        assert_eq!(measurement.size.y, 24.0);
    }

    #[test]
    fn test_lines_limited_by_box_height() {
        let shaper = SimpleTextShaper::new();
        let lines = shaper
            .measure_lines(&text("a\nb\nc", 10.0), &ParagraphAttributes::new(), Vec2::new(50.0, 30.0))
            .unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_alignment_in_line_boxes() {
        let shaper = SimpleTextShaper::new();
        let centered = ParagraphAttributes::new().with_alignment(TextAlignment::Center);
        let lines = shaper
            .measure_lines(&text("ab", 10.0), &centered, Vec2::new(100.0, 20.0))
            .unwrap();
        assert_eq!(lines[0].frame.position.x, 44.0);

        let rtl_start = ParagraphAttributes::new().with_base_writing_direction(WritingDirection::RightToLeft);
        let lines = shaper
            .measure_lines(&text("ab", 10.0), &rtl_start, Vec2::new(100.0, 20.0))
            .unwrap();
        assert_eq!(lines[0].frame.position.x, 88.0);
    }

    #[test]
    fn test_baseline_metrics() {
        let shaper = SimpleTextShaper::new();
        let lines = shaper
            .measure_lines(&text("x", 10.0), &ParagraphAttributes::new(), Vec2::new(50.0, 50.0))
            .unwrap();
        // 2.0 of leading split evenly above and below the 10.0 em box
        assert_eq!(lines[0].ascender, 8.0);
        assert_eq!(lines[0].descender, 2.0);
        assert_eq!(lines[0].baseline, 9.0);
    }

    #[test]
    fn test_text_transform_changes_width() {
        let shaper = SimpleTextShaper::new();
        let plain = text("ß", 10.0);
        let upper = plain.clone().with_base_attributes(
            TextAttributes::new()
                .with_font_size(10.0)
                .with_text_transform(TextTransform::Uppercase),
        );
        let constraints = LayoutConstraints::new();
        let paragraph = ParagraphAttributes::new();
        assert_eq!(shaper.measure(&plain, &paragraph, &constraints).unwrap().size.x, 6.0);
        assert_eq!(shaper.measure(&upper, &paragraph, &constraints).unwrap().size.x, 12.0);
    }

    #[test]
    fn test_attachments_are_positioned_and_clipped() {
        let shaper = SimpleTextShaper::new();
        let string = text("ab", 10.0)
            .add_fragment(Fragment::attachment(Vec2::new(20.0, 20.0)))
            .add_fragment(Fragment::new("\nc"))
            .add_fragment(Fragment::attachment(Vec2::new(5.0, 5.0)));
        let paragraph = ParagraphAttributes::new().with_maximum_number_of_lines(1);
        let measurement = shaper.measure(&string, &paragraph, &LayoutConstraints::new()).unwrap();

        // The 20.0 attachment sits on the baseline above the text descender
        assert_eq!(measurement.size, Vec2::new(32.0, 22.0));
        assert_eq!(measurement.attachments.len(), 2);
        assert_eq!(measurement.attachments[0].frame, Rect::new(12.0, 0.0, 20.0, 20.0));
        assert!(!measurement.attachments[0].is_clipped);
        assert!(measurement.attachments[1].is_clipped);
    }

    #[test]
    fn test_adjusts_font_size_to_fit() {
        let shaper = SimpleTextShaper::new();
        let string = text("abcdefghij", 10.0);
        let paragraph = ParagraphAttributes::new()
            .with_maximum_number_of_lines(1)
            .with_adjusts_font_size_to_fit(0.5);
        let measurement = shaper
            .measure(&string, &paragraph, &LayoutConstraints::with_max_width(45.0))
            .unwrap();

        // Full size needs 60.0; the font shrinks until the line fits
        assert!(measurement.size.x <= 45.01);
        assert!(measurement.size.x >= 30.0);
    }

    #[test]
    fn test_empty_string_has_no_lines() {
        let shaper = SimpleTextShaper::new();
        let lines = shaper
            .measure_lines(&AttributedString::new(), &ParagraphAttributes::new(), Vec2::new(10.0, 10.0))
            .unwrap();
        assert!(lines.is_empty());
        let measurement = shaper
            .measure(&AttributedString::new(), &ParagraphAttributes::new(), &LayoutConstraints::new())
            .unwrap();
        assert_eq!(measurement.size, Vec2::ZERO);
    }
}
