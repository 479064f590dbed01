//! Annotation and review engine for equipment symbols on construction
//! drawings.
//!
//! Boxes live on a resolution-independent 0-1000 scale; pointer input is
//! converted at the edge. A [`ReviewSession`] owns the store, review state,
//! drawing state machine and viewport, and is driven synchronously by the
//! host's event handlers.

pub mod config;
pub mod crop;
pub mod drawing;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod pages;
pub mod review;
pub mod session;
pub mod state;
pub mod viewport;

pub use config::EngineConfig;
pub use drawing::{DragOutcome, LabelPrompt};
pub use error::{Error, Result, StoreError};
pub use geometry::{NormalizedBox, Point, Size};
pub use ingest::DetectionPayload;
pub use pages::{PageImage, PageImages};
pub use review::{ReviewStatus, ReviewSummary};
pub use session::ReviewSession;
pub use state::{Annotation, AnnotationId, Origin};
