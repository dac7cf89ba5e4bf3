//! Thumbnail rendering for relayed media.
//!
//! Takes the transport-provided preview image and produces a small JPEG
//! suitable for attaching to the forwarded copy. Strictly best-effort: the
//! pipeline delivers without a thumbnail when anything here fails.

pub mod thumbnail;

pub use thumbnail::{JPEG_QUALITY, THUMBNAIL_MAX_DIMENSION, render_thumbnail};
