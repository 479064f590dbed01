//! Normalization of detector output into typed annotations.
//!
//! Detections arrive either as an already-parsed JSON value or as an encoded
//! string, possibly wrapped in markdown fences or prose. Ingestion never
//! fails: anything unusable degrades to fewer (or zero) annotations plus a
//! warning that is logged and handed back to the caller.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::IngestConfig;
use crate::geometry::{self, NormalizedBox};
use crate::state::{Annotation, IdAllocator};

const FALLBACK_CATEGORY: &str = "Unknown";

/// Detected annotations as handed over by the detection service.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionPayload {
    /// JSON text, possibly surrounded by code fences or commentary.
    Encoded(String),
    Parsed(Value),
}

impl From<String> for DetectionPayload {
    fn from(s: String) -> Self {
        Self::Encoded(s)
    }
}

impl From<&str> for DetectionPayload {
    fn from(s: &str) -> Self {
        Self::Encoded(s.to_string())
    }
}

impl From<Value> for DetectionPayload {
    fn from(v: Value) -> Self {
        Self::Parsed(v)
    }
}

impl From<Vec<Value>> for DetectionPayload {
    fn from(items: Vec<Value>) -> Self {
        Self::Parsed(Value::Array(items))
    }
}

/// Conditions worth reporting upstream; none of them abort ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestWarning {
    #[error("detections payload is not valid JSON: {reason}")]
    Malformed { reason: String },

    #[error("detections payload is {found}, expected a list")]
    NotAList { found: &'static str },

    #[error("skipped {count} malformed detection(s)")]
    SkippedItems { count: usize },
}

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub annotations: Vec<Annotation>,
    pub warnings: Vec<IngestWarning>,
    /// Detections dropped by the confidence floor.
    pub below_confidence: usize,
    /// Detections folded into an overlapping, more confident one.
    pub merged: usize,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    #[serde(rename = "type", alias = "category", default)]
    kind: Option<String>,
    #[serde(alias = "label", default)]
    tag: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    page: Option<i64>,
    bbox: [f32; 4],
}

/// Turn a detections payload into annotations with freshly allocated ids.
pub fn ingest(payload: impl Into<DetectionPayload>, ids: &mut IdAllocator, config: &IngestConfig) -> Ingested {
    let mut out = Ingested::default();

    let items = match payload_items(payload.into()) {
        Ok(items) => items,
        Err(warning) => {
            log::warn!("{warning}; continuing with no detections");
            out.warnings.push(warning);
            return out;
        }
    };

    let mut detections = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        match to_detection(item) {
            Some(d) => detections.push(d),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        let warning = IngestWarning::SkippedItems { count: skipped };
        log::warn!("{warning}");
        out.warnings.push(warning);
    }

    let before = detections.len();
    detections.retain(|d| d.confidence >= config.min_confidence);
    out.below_confidence = before - detections.len();

    if config.merge_overlaps {
        let before = detections.len();
        detections = merge_overlapping(detections, config);
        out.merged = before - detections.len();
    }

    out.annotations = detections
        .into_iter()
        .map(|d| Annotation::detected(ids.fresh_id(), d.page_index, d.label, d.category, d.bbox, d.confidence))
        .collect();

    log::info!(
        "Ingested {} detection(s) ({} below confidence, {} merged, {} skipped)",
        out.annotations.len(),
        out.below_confidence,
        out.merged,
        skipped
    );
    out
}

fn payload_items(payload: DetectionPayload) -> Result<Vec<Value>, IngestWarning> {
    let value = match payload {
        DetectionPayload::Encoded(text) => decode(&text)?,
        // A list that was JSON-encoded twice arrives as a string value.
        DetectionPayload::Parsed(Value::String(text)) => decode(&text)?,
        DetectionPayload::Parsed(value) => value,
    };

    match value {
        Value::Array(items) => Ok(items),
        other => Err(IngestWarning::NotAList {
            found: value_kind(&other),
        }),
    }
}

fn decode(text: &str) -> Result<Value, IngestWarning> {
    match serde_json::from_str(text.trim()) {
        Ok(value) => Ok(value),
        Err(first) => {
            let Some(span) = array_span(text) else {
                return Err(IngestWarning::Malformed {
                    reason: first.to_string(),
                });
            };
            serde_json::from_str(span).map_err(|e| IngestWarning::Malformed { reason: e.to_string() })
        }
    }
}

/// The outermost `[...]` span of `text`, if any.
fn array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone)]
struct Detection {
    page_index: u32,
    label: String,
    category: String,
    bbox: NormalizedBox,
    confidence: f32,
}

fn to_detection(item: Value) -> Option<Detection> {
    let raw: RawDetection = match serde_json::from_value(item) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("Skipping detection: {e}");
            return None;
        }
    };

    // Missing or zero page means the first page.
    let page_index = match raw.page.unwrap_or(1) {
        0 => 1,
        p => u32::try_from(p).ok()?,
    };

    if raw.bbox.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let bbox = NormalizedBox::from(raw.bbox);
    if bbox.area() <= 0.0 {
        log::debug!("Skipping zero-area detection on page {page_index}");
        return None;
    }

    let category = raw
        .kind
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());
    let label = raw
        .tag
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| category.clone());
    let confidence = raw.confidence.filter(|c| c.is_finite()).unwrap_or(0.0).clamp(0.0, 1.0);

    Some(Detection {
        page_index,
        label,
        category,
        bbox,
        confidence,
    })
}

/// Fold overlapping detections into the most confident one.
///
/// Candidates are visited by descending confidence. One is dropped when it
/// overlaps a kept detection on the same page by more than `overlap_iou` with
/// the same tag, or by more than `strong_overlap_iou` with any tag. Survivors
/// keep their original order.
fn merge_overlapping(detections: Vec<Detection>, config: &IngestConfig) -> Vec<Detection> {
    let mut by_confidence: Vec<usize> = (0..detections.len()).collect();
    by_confidence.sort_by(|&a, &b| detections[b].confidence.total_cmp(&detections[a].confidence));

    let mut kept: Vec<usize> = Vec::new();
    for idx in by_confidence {
        let candidate = &detections[idx];
        let duplicate = kept.iter().any(|&k| {
            let other = &detections[k];
            if other.page_index != candidate.page_index {
                return false;
            }
            let overlap = geometry::iou(&candidate.bbox, &other.bbox);
            (overlap > config.overlap_iou && candidate.label == other.label) || overlap > config.strong_overlap_iou
        });
        if !duplicate {
            kept.push(idx);
        }
    }

    let kept: HashSet<usize> = kept.into_iter().collect();
    detections
        .into_iter()
        .enumerate()
        .filter_map(|(i, d)| kept.contains(&i).then_some(d))
        .collect()
}
