//! cosmic-text measurement backend

use cosmic_text::{
    Align, Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style as CosmicStyle, Weight,
};
use glam::Vec2;
use kryon_core::{AttributedString, FontStyle, ParagraphAttributes, TextAlignment, TextAttributes};
use kryon_layout::{LayoutConstraints, LayoutDirection};
use parking_lot::Mutex;
use tracing::debug;

use crate::measurement::{AttachmentMeasurement, LineMeasurement, TextMeasurement, TextRange};
use crate::primitives::Rect;
use crate::text::{is_right_to_left, TextMeasurer};
use crate::BackendError;

const FONT_SCALE_STEP: f32 = 0.05;
const FIT_EPSILON: f32 = 0.001;

/// Shaped in place of an attachment. An em dash allows a line break on either
/// side and has a non-zero advance in practically every font; its font size is
/// chosen so the advance equals the attachment width.
const ATTACHMENT_PLACEHOLDER: &str = "\u{2014}";
/// Shaped in place of an attachment that has no width
const ZERO_WIDTH_PLACEHOLDER: &str = "\u{200B}";
const REFERENCE_FONT_SIZE: f32 = 100.0;

/// Measures text by shaping it with cosmic-text.
///
/// `FontSystem` needs exclusive access while shaping, so concurrent
/// measurements through one measurer are serialized on its lock.
pub struct CosmicTextMeasurer {
    font_system: Mutex<FontSystem>,
    line_height_multiplier: f32,
}

/// A shaped buffer plus what is needed to map it back to the source string
struct ShapedText {
    buffer: Buffer,
    /// Source byte offset for every byte of the shaped text, plus one past the end
    source_offsets: Vec<usize>,
    /// Shaped byte offset where each buffer line starts
    line_starts: Vec<usize>,
    text_len: usize,
    /// Shaped byte offset and size of every attachment
    attachments: Vec<(usize, Vec2)>,
}

/// One visual line pulled out of the buffer
struct RunSummary {
    line_index: usize,
    top: f32,
    height: f32,
    left: f32,
    width: f32,
    baseline: f32,
    /// Shaped byte range, including trailing whitespace and the line ending
    start: usize,
    end: usize,
    /// (shaped byte offset, x) of every glyph
    glyphs: Vec<(usize, f32)>,
}

struct Layout {
    runs: Vec<RunSummary>,
    truncated: bool,
}

impl Layout {
    fn width(&self) -> f32 {
        self.runs.iter().map(|run| run.width).fold(0.0, f32::max)
    }

    fn height(&self) -> f32 {
        self.runs.last().map_or(0.0, |run| run.top + run.height)
    }

    fn fits(&self, available: Vec2) -> bool {
        !self.truncated
            && self.width() <= available.x + FIT_EPSILON
            && self.height() <= available.y + FIT_EPSILON
    }

    /// Frame of the attachment shaped at `offset`, inside its line box
    fn attachment_frame(&self, offset: usize, size: Vec2) -> Option<Rect> {
        self.runs.iter().find_map(|run| {
            run.glyphs
                .iter()
                .find(|(start, _)| *start == offset)
                .map(|&(_, x)| {
                    let top = (run.top + run.baseline - size.y)
                        .min(run.top + run.height - size.y)
                        .max(run.top);
                    Rect::new(x, top, size.x, size.y)
                })
        })
    }
}

impl CosmicTextMeasurer {
    /// Create a measurer backed by the system font collection
    pub fn new() -> Self {
        Self::with_font_system(FontSystem::new())
    }

    pub fn with_font_system(font_system: FontSystem) -> Self {
        Self {
            font_system: Mutex::new(font_system),
            line_height_multiplier: 1.2,
        }
    }

    /// Register an additional font file
    pub fn load_font_data(&self, data: Vec<u8>) {
        self.font_system.lock().db_mut().load_font_data(data);
    }

    /// Number of font faces available for shaping
    pub fn face_count(&self) -> usize {
        self.font_system.lock().db().faces().count()
    }

    fn metrics(&self, attributes: &TextAttributes, scale: f32) -> Metrics {
        let font_size = attributes.effective_font_size() * scale;
        let line_height = attributes
            .line_height
            .map(|height| height * scale)
            .unwrap_or(font_size * self.line_height_multiplier);
        Metrics::new(font_size, line_height.max(1.0))
    }

    /// Convert resolved text attributes to cosmic-text Attrs
    fn attrs<'a>(&self, attributes: &'a TextAttributes, scale: f32) -> Attrs<'a> {
        let mut attrs = Attrs::new().metrics(self.metrics(attributes, scale));

        attrs = match attributes.font_family.as_deref() {
            Some(name) => attrs.family(Family::Name(name)),
            None => attrs.family(Family::SansSerif),
        };

        if let Some(weight) = attributes.font_weight {
            attrs = attrs.weight(Weight(weight as u16));
        }

        if let Some(style) = attributes.font_style {
            attrs = attrs.style(match style {
                FontStyle::Normal => CosmicStyle::Normal,
                FontStyle::Italic => CosmicStyle::Italic,
                FontStyle::Oblique => CosmicStyle::Oblique,
            });
        }

        attrs
    }

    /// Advance of the attachment placeholder at the reference font size
    fn placeholder_advance(&self, font_system: &mut FontSystem, attributes: &TextAttributes) -> Option<f32> {
        let metrics = Metrics::new(REFERENCE_FONT_SIZE, REFERENCE_FONT_SIZE);
        let mut buffer = Buffer::new(font_system, metrics);
        buffer.set_size(font_system, None, None);
        buffer.set_rich_text(
            font_system,
            [(ATTACHMENT_PLACEHOLDER, self.attrs(attributes, 1.0).metrics(metrics))],
            self.attrs(attributes, 1.0).metrics(metrics),
            Shaping::Advanced,
            None,
        );
        buffer.shape_until_scroll(font_system, false);

        let advance: f32 = buffer
            .layout_runs()
            .map(|run| run.glyphs.iter().map(|glyph| glyph.w).sum::<f32>())
            .sum();
        (advance > 0.0).then_some(advance)
    }

    /// Placeholder text and metrics that make an attachment occupy `size`
    fn attachment_span(
        &self,
        font_system: &mut FontSystem,
        attributes: &TextAttributes,
        size: Vec2,
    ) -> (&'static str, Metrics) {
        let line_height = size.y.max(1.0);
        if size.x <= 0.0 {
            return (ZERO_WIDTH_PLACEHOLDER, Metrics::new(line_height, line_height));
        }
        let font_size = match self.placeholder_advance(font_system, attributes) {
            Some(advance) => REFERENCE_FONT_SIZE * size.x / advance,
            None => {
                debug!("Attachment placeholder has no advance, width is not reserved");
                line_height
            }
        };
        (ATTACHMENT_PLACEHOLDER, Metrics::new(font_size, line_height))
    }

    fn shape(
        &self,
        font_system: &mut FontSystem,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        max_width: Option<f32>,
        right_to_left: bool,
        scale: f32,
    ) -> ShapedText {
        let resolved: Vec<TextAttributes> = (0..attributed_string.fragments.len())
            .map(|index| attributed_string.resolved_attributes(index))
            .collect();

        let mut text = String::with_capacity(attributed_string.len());
        let mut source_offsets = Vec::with_capacity(attributed_string.len() + 1);
        let mut ranges = Vec::with_capacity(resolved.len());
        let mut attachment_metrics = Vec::with_capacity(resolved.len());
        let mut attachments = Vec::new();
        let mut fragment_start = 0;

        for (fragment, attributes) in attributed_string.fragments.iter().zip(&resolved) {
            let start = text.len();
            if let Some(size) = fragment.attachment_size {
                let (placeholder, metrics) = self.attachment_span(font_system, attributes, size);
                attachments.push((start, size));
                attachment_metrics.push(Some(metrics));
                text.push_str(placeholder);
                source_offsets.extend(std::iter::repeat(fragment_start).take(placeholder.len()));
            } else {
                let transform = attributes.text_transform.unwrap_or_default();
                let (shaped, offsets) = transform.apply_with_offsets(&fragment.text);
                attachment_metrics.push(None);
                text.push_str(&shaped);
                source_offsets.extend(offsets[..shaped.len()].iter().map(|offset| fragment_start + offset));
            }
            ranges.push(start..text.len());
            fragment_start += fragment.text.len();
        }
        source_offsets.push(fragment_start);

        let align = match (paragraph_attributes.alignment, right_to_left) {
            (TextAlignment::Start, false) | (TextAlignment::End, true) => Align::Left,
            (TextAlignment::Start, true) | (TextAlignment::End, false) => Align::Right,
            (TextAlignment::Center, _) => Align::Center,
            (TextAlignment::Justify, _) => Align::Justified,
        };

        let mut buffer = Buffer::new(font_system, self.metrics(&attributed_string.base_attributes, scale));
        buffer.set_size(font_system, max_width, None);

        let spans = resolved
            .iter()
            .zip(&attachment_metrics)
            .zip(&ranges)
            .map(|((attributes, metrics), range)| {
                let attrs = self.attrs(attributes, scale);
                let attrs = match metrics {
                    Some(metrics) => attrs.metrics(*metrics),
                    None => attrs,
                };
                (&text[range.clone()], attrs)
            });
        buffer.set_rich_text(
            font_system,
            spans,
            self.attrs(&attributed_string.base_attributes, scale),
            Shaping::Advanced,
            Some(align),
        );

        // cosmic-text splits lines at \n, \r and \r\n
        let mut line_starts = Vec::with_capacity(buffer.lines.len());
        let mut line_start = 0;
        for line in &buffer.lines {
            line_starts.push(line_start);
            line_start += line.text().len() + line.ending().as_str().len();
        }

        buffer.shape_until_scroll(font_system, false);

        ShapedText {
            buffer,
            source_offsets,
            line_starts,
            text_len: text.len(),
            attachments,
        }
    }

    fn summarize(shaped: &ShapedText, line_limit: Option<u32>) -> Layout {
        let mut runs: Vec<RunSummary> = Vec::new();
        for run in shaped.buffer.layout_runs() {
            let line_start = shaped
                .line_starts
                .get(run.line_i)
                .copied()
                .unwrap_or(shaped.text_len);
            let first_in_line = runs.last().map_or(true, |previous| previous.line_index != run.line_i);
            let start = if first_in_line {
                line_start
            } else {
                line_start + run.glyphs.iter().map(|g| g.start).min().unwrap_or(0)
            };
            let left = run.glyphs.iter().map(|g| g.x).fold(f32::INFINITY, f32::min);
            runs.push(RunSummary {
                line_index: run.line_i,
                top: run.line_top,
                height: run.line_height,
                left: if left.is_finite() { left } else { 0.0 },
                width: run.line_w,
                baseline: run.line_y - run.line_top,
                start,
                end: shaped.text_len,
                glyphs: run.glyphs.iter().map(|g| (line_start + g.start, g.x)).collect(),
            });
        }

        // A line runs up to where the next one starts
        for index in 1..runs.len() {
            let next_start = runs[index].start;
            runs[index - 1].end = next_start.max(runs[index - 1].start);
        }

        let mut truncated = false;
        if let Some(limit) = line_limit {
            if runs.len() > limit as usize {
                runs.truncate(limit as usize);
                truncated = true;
            }
        }
        Layout { runs, truncated }
    }

    /// Shape at full size, shrinking the font when the paragraph asks for it
    fn lay_out_fitting(
        &self,
        font_system: &mut FontSystem,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        available: Vec2,
        right_to_left: bool,
    ) -> (ShapedText, Layout) {
        let max_width = available.x.is_finite().then_some(available.x);
        let minimum_scale = paragraph_attributes.minimum_font_scale;
        let mut scale = 1.0_f32;
        loop {
            let shaped = self.shape(
                font_system,
                attributed_string,
                paragraph_attributes,
                max_width,
                right_to_left,
                scale,
            );
            let layout = Self::summarize(&shaped, paragraph_attributes.line_limit());
            if !paragraph_attributes.adjusts_font_size_to_fit
                || layout.fits(available)
                || scale <= minimum_scale
            {
                if scale < 1.0 {
                    debug!(scale, "Shrunk text to fit");
                }
                return (shaped, layout);
            }
            scale = (scale - FONT_SCALE_STEP).max(minimum_scale);
        }
    }

    fn ensure_fonts(font_system: &FontSystem) -> Result<(), BackendError> {
        if font_system.db().faces().next().is_none() {
            return Err(BackendError::Unavailable("no fonts loaded".to_string()));
        }
        Ok(())
    }
}

impl Default for CosmicTextMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasurer for CosmicTextMeasurer {
    fn measure(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        layout_constraints: &LayoutConstraints,
    ) -> Result<TextMeasurement, BackendError> {
        let mut font_system = self.font_system.lock();
        Self::ensure_fonts(&font_system)?;

        let right_to_left = is_right_to_left(
            paragraph_attributes.base_writing_direction,
            layout_constraints.layout_direction,
        );
        let (shaped, layout) = self.lay_out_fitting(
            &mut font_system,
            attributed_string,
            paragraph_attributes,
            layout_constraints.maximum_size,
            right_to_left,
        );

        let attachments = shaped
            .attachments
            .iter()
            .map(|&(offset, size)| match layout.attachment_frame(offset, size) {
                Some(frame) => AttachmentMeasurement {
                    frame,
                    is_clipped: false,
                },
                None => AttachmentMeasurement {
                    frame: Rect::ZERO,
                    is_clipped: true,
                },
            })
            .collect();

        Ok(TextMeasurement::new(Vec2::new(layout.width(), layout.height())).with_attachments(attachments))
    }

    fn measure_lines(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        size: Vec2,
    ) -> Result<Vec<LineMeasurement>, BackendError> {
        let mut font_system = self.font_system.lock();
        Self::ensure_fonts(&font_system)?;

        let right_to_left = is_right_to_left(
            paragraph_attributes.base_writing_direction,
            LayoutDirection::Undefined,
        );
        let (shaped, layout) =
            self.lay_out_fitting(&mut font_system, attributed_string, paragraph_attributes, size, right_to_left);
        let source = |offset: usize| {
            shaped
                .source_offsets
                .get(offset)
                .copied()
                .unwrap_or(attributed_string.len())
        };

        Ok(layout
            .runs
            .iter()
            .take_while(|run| run.top + run.height <= size.y + FIT_EPSILON)
            .map(|run| {
                let location = source(run.start);
                let end = source(run.end).max(location);
                // cosmic-text does not expose per-run font metrics; split the line at the baseline
                LineMeasurement {
                    frame: Rect::new(run.left, run.top, run.width, run.height),
                    baseline: run.baseline,
                    ascender: run.baseline,
                    descender: run.height - run.baseline,
                    range: TextRange::new(location, end - location),
                }
            })
            .collect())
    }
}
