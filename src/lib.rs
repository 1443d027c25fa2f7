//! ntfsresc - forensic NTFS reader for partial disk images
//!
//! Decodes the MFT and `$I30` directory indexes of an NTFS volume backed by
//! a partial disk image plus a ddrescue-style map file, recovering missing
//! clusters directly from the source device into a crash-safe overlay.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::*;
pub use domain::entities::*;
pub use domain::repositories::*;
