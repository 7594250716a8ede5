// crates/kryon-text/src/text_layout_manager.rs
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use kryon_core::{AttributedString, KryonError, ParagraphAttributes};
use kryon_layout::LayoutConstraints;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::measure_key::MeasurementKey;
use crate::measurement::{LineMeasurement, TextMeasurement};
use crate::text::TextMeasurer;
use crate::text_measure_cache::{CacheStats, TextMeasureCache, DEFAULT_CACHE_CAPACITY};
use crate::TextLayoutResult;

/// Construction-time settings for a [`TextLayoutManager`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLayoutConfig {
    /// Maximum number of cached measurements
    pub cache_capacity: usize,
}

impl Default for TextLayoutConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Entry point used by layout to measure text.
///
/// Owns one backend handle and one measurement cache for its whole lifetime.
/// All methods take `&self`, so a manager is shared between threads as a
/// [`SharedTextLayoutManager`].
pub struct TextLayoutManager<M: TextMeasurer> {
    measurer: Arc<M>,
    measure_cache: TextMeasureCache,
}

pub type SharedTextLayoutManager<M> = Arc<TextLayoutManager<M>>;

impl<M: TextMeasurer> TextLayoutManager<M> {
    pub fn new(measurer: M) -> Self {
        Self::with_config(measurer, TextLayoutConfig::default())
    }

    pub fn with_config(measurer: M, config: TextLayoutConfig) -> Self {
        Self::from_shared(Arc::new(measurer), config)
    }

    /// Build a manager around a backend that is also used elsewhere
    pub fn from_shared(measurer: Arc<M>, config: TextLayoutConfig) -> Self {
        Self {
            measurer,
            measure_cache: TextMeasureCache::new(config.cache_capacity),
        }
    }

    /// Measure `attributed_string` under `layout_constraints`.
    ///
    /// The returned size always lies inside the constraints. Repeated calls
    /// with layout-equal inputs are answered from the cache.
    pub fn measure(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        layout_constraints: &LayoutConstraints,
    ) -> TextLayoutResult<Arc<TextMeasurement>> {
        attributed_string.validate()?;
        paragraph_attributes.validate()?;
        layout_constraints.validate()?;

        let key = MeasurementKey::new(attributed_string, paragraph_attributes, layout_constraints);
        if let Some(cached) = self.measure_cache.lookup(&key) {
            trace!("Text measure cache hit");
            return Ok(cached);
        }

        let started = Instant::now();
        let mut measurement = self
            .measurer
            .measure(attributed_string, paragraph_attributes, layout_constraints)
            .map_err(|error| {
                warn!("Text measurement failed: {}", error);
                error
            })?;
        measurement.size = layout_constraints.clamp(measurement.size);
        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            width = measurement.size.x,
            height = measurement.size.y,
            "Measured text"
        );

        let measurement = Arc::new(measurement);
        self.measure_cache.insert(key, Arc::clone(&measurement));
        Ok(measurement)
    }

    /// Line breakdown of `attributed_string` inside a box of exactly `size`
    pub fn measure_lines(
        &self,
        attributed_string: &AttributedString,
        paragraph_attributes: &ParagraphAttributes,
        size: Vec2,
    ) -> TextLayoutResult<Vec<LineMeasurement>> {
        attributed_string.validate()?;
        paragraph_attributes.validate()?;
        if size.is_nan() || size.cmplt(Vec2::ZERO).any() {
            return Err(KryonError::InvalidSize {
                width: size.x,
                height: size.y,
            }
            .into());
        }

        if attributed_string.is_empty() {
            return Ok(Vec::new());
        }

        let key = MeasurementKey::for_lines(attributed_string, paragraph_attributes, size);
        if let Some(cached) = self.measure_cache.lookup(&key) {
            trace!("Line measure cache hit");
            return Ok(cached.lines.clone().unwrap_or_default());
        }

        let started = Instant::now();
        let lines = self
            .measurer
            .measure_lines(attributed_string, paragraph_attributes, size)
            .map_err(|error| {
                warn!("Line measurement failed: {}", error);
                error
            })?;
        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            lines = lines.len(),
            "Measured text lines"
        );

        self.measure_cache
            .insert(key, Arc::new(TextMeasurement::from_lines(size, lines.clone())));
        Ok(lines)
    }

    /// The backend this manager measures with
    pub fn native_handle(&self) -> Arc<M> {
        Arc::clone(&self.measurer)
    }

    /// Forget every cached measurement, e.g. after fonts or display scale changed
    pub fn clear_cache(&self) {
        debug!("Clearing text measure cache");
        self.measure_cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.measure_cache.stats()
    }

    pub fn cached_entries(&self) -> usize {
        self.measure_cache.len()
    }
}
