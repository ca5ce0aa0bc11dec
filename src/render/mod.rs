//! Rendering-side data
//! Contains the viewport rectangle and the painter's-order draw list.

pub mod order;
pub mod viewport;

// Re-export commonly used types
pub use order::{DrawEntry, DrawSource, RenderOrder};
pub use viewport::Rect;
