//! Catalog, swipe deck and adaptive asset gating for a luxury real-estate
//! showcase.
//!
//! The crate holds no rendering code. A host feeds it filter edits, pointer
//! gestures, visibility signals and a session clock, and renders what the
//! engines report back.

pub mod config;
pub mod device;
pub mod error;
pub mod media;
pub mod state;
pub mod telemetry;
pub mod timer;
pub mod ui;

pub use config::ShowcaseConfig;
pub use error::{Result, ShowcaseError};
