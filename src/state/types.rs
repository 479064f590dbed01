use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::NormalizedBox;

/// Category assigned to user-drawn annotations.
pub const MANUAL_CATEGORY: &str = "Manual Entry";

/// Opaque annotation identity, stable for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(u64);

impl AnnotationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out fresh annotation ids. Ids are never reused within a session,
/// even after the annotation they named is deleted.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn fresh_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Where an annotation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Detected,
    Manual,
}

/// A labelled box on one page of the drawing set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    /// 1-based page number; fixed once the annotation exists.
    pub page_index: u32,
    pub label: String,
    pub category: String,
    pub bbox: NormalizedBox,
    pub confidence: f32,
    pub origin: Origin,
}

impl Annotation {
    /// A user-drawn annotation. Manual entries are fully trusted.
    pub fn manual(id: AnnotationId, page_index: u32, label: impl Into<String>, bbox: NormalizedBox) -> Self {
        Self {
            id,
            page_index: page_index.max(1),
            label: label.into(),
            category: MANUAL_CATEGORY.to_string(),
            bbox,
            confidence: 1.0,
            origin: Origin::Manual,
        }
    }

    pub fn detected(
        id: AnnotationId,
        page_index: u32,
        label: impl Into<String>,
        category: impl Into<String>,
        bbox: NormalizedBox,
        confidence: f32,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            id,
            page_index: page_index.max(1),
            label: label.into(),
            category: category.into(),
            bbox,
            confidence,
            origin: Origin::Detected,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.origin == Origin::Manual
    }
}
