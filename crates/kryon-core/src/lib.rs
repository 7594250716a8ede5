// crates/kryon-core/src/lib.rs
pub mod text;
pub mod paragraph;

pub use text::*;
pub use paragraph::*;

/// Input rejected before any measurement is attempted
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KryonError {
    #[error("Invalid font size {size} (fragment {fragment:?})")]
    InvalidFontSize { fragment: Option<usize>, size: f32 },

    #[error("Invalid text attribute '{name}' = {value} (fragment {fragment:?})")]
    InvalidTextAttribute {
        fragment: Option<usize>,
        name: &'static str,
        value: f32,
    },

    #[error("Invalid attachment size {width}x{height} in fragment {fragment}")]
    InvalidAttachmentSize { fragment: usize, width: f32, height: f32 },

    #[error("Invalid paragraph attribute '{name}' = {value}")]
    InvalidParagraphAttribute { name: &'static str, value: f32 },

    #[error("Invalid layout constraints: {0}")]
    InvalidConstraints(String),

    #[error("Invalid target size {width}x{height}")]
    InvalidSize { width: f32, height: f32 },
}

pub type Result<T> = std::result::Result<T, KryonError>;
