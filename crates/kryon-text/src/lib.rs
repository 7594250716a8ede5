// crates/kryon-text/src/lib.rs

//! Cached text measurement for layout.
//!
//! [`TextLayoutManager`] sits between a layout engine and a [`TextMeasurer`]
//! backend. It validates requests, answers repeated ones from a bounded LRU
//! cache and forwards the rest to the backend.

use kryon_core::KryonError;

pub mod measure_key;
pub mod measurement;
pub mod primitives;
pub mod text;
pub mod text_layout_manager;
pub mod text_measure_cache;

#[cfg(feature = "cosmic-text")]
pub mod text_manager;

pub use measure_key::*;
pub use measurement::*;
pub use primitives::*;
pub use text::*;
pub use text_layout_manager::*;
pub use text_measure_cache::*;

#[cfg(feature = "cosmic-text")]
pub use text_manager::CosmicTextMeasurer;

/// Failure reported by a measurement backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Text backend unavailable: {0}")]
    Unavailable(String),
    #[error("Text backend in invalid state: {0}")]
    InvalidState(String),
    #[error("Text shaping failed: {0}")]
    ShapingFailed(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextLayoutError {
    #[error("Invalid measurement input: {0}")]
    InvalidInput(#[from] KryonError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type TextLayoutResult<T> = std::result::Result<T, TextLayoutError>;
