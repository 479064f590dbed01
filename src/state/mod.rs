//! Annotation state for a review session.
//!
//! This module contains:
//! - Annotation, id and origin types
//! - The annotation store keyed by stable id

mod store;
mod types;

pub use store::*;
pub use types::*;
