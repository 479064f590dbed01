//! The review session: one place that owns all engine state and routes
//! pointer, keyboard and navigation events through it.
//!
//! Everything runs synchronously inside the caller's event handler. Each
//! public method is one complete transition; no method leaves the store,
//! review map and selection out of step with each other.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::crop::{self, CropWindow};
use crate::drawing::{CommitTarget, DragOutcome, DrawingStateMachine, LabelPrompt};
use crate::error::StoreError;
use crate::geometry::{self, NormalizedBox, PixelRect, Point, Size};
use crate::ingest::{self, DetectionPayload, IngestWarning};
use crate::pages::{PageImage, PageImages};
use crate::review::{ReviewStatus, ReviewSummary, ReviewWorkflow};
use crate::state::{Annotation, AnnotationId, AnnotationStore, IdAllocator};
use crate::viewport::{self, Viewport};

/// Summary of loading one batch of detections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub added: usize,
    pub below_confidence: usize,
    pub merged: usize,
    #[serde(serialize_with = "serialize_warnings")]
    pub warnings: Vec<IngestWarning>,
}

fn serialize_warnings<S: serde::Serializer>(warnings: &[IngestWarning], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(warnings.iter().map(ToString::to_string))
}

/// Render parameters for one annotation overlay on the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub id: AnnotationId,
    pub rect: PixelRect,
    /// Counter-scale for the label and handles so they keep a fixed size.
    pub affordance_scale: f32,
    pub selected: bool,
    pub status: ReviewStatus,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    config: EngineConfig,
    store: AnnotationStore,
    review: ReviewWorkflow,
    drawing: DrawingStateMachine,
    viewport: Viewport,
    ids: IdAllocator,
    pages: PageImages,
}

impl ReviewSession {
    pub fn new(config: EngineConfig, pages: PageImages) -> Self {
        let config = config.validated();
        Self {
            store: AnnotationStore::new(),
            review: ReviewWorkflow::new(),
            drawing: DrawingStateMachine::new(&config.drawing),
            viewport: Viewport::with_limits(pages.page_count(), config.viewport.clone()),
            ids: IdAllocator::new(),
            pages,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn review(&self) -> &ReviewWorkflow {
        &self.review
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn drawing(&self) -> &DrawingStateMachine {
        &self.drawing
    }

    pub fn selection(&self) -> Option<AnnotationId> {
        self.review.selection()
    }

    pub fn current_page(&self) -> u32 {
        self.viewport.page_index()
    }

    pub fn current_image(&self) -> PageImage<'_> {
        self.pages.image(self.viewport.page_index())
    }

    /// Replace the page images, e.g. after the host rendered a new document.
    pub fn set_pages(&mut self, pages: PageImages) {
        self.pages = pages;
        let before = self.viewport.page_index();
        self.viewport.set_page_count(self.pages.page_count());
        if self.viewport.page_index() != before {
            self.drawing.cancel_drag();
        }
    }

    // ----- ingestion -----

    /// Append detector output to the store. Malformed input is reported in
    /// the returned warnings and never aborts the session.
    pub fn load_detections(&mut self, payload: impl Into<DetectionPayload>) -> Result<LoadReport, StoreError> {
        let ingested = ingest::ingest(payload, &mut self.ids, &self.config.ingest);
        let mut report = LoadReport {
            added: 0,
            below_confidence: ingested.below_confidence,
            merged: ingested.merged,
            warnings: ingested.warnings,
        };
        for annotation in ingested.annotations {
            self.store.insert(annotation)?;
            report.added += 1;
        }
        Ok(report)
    }

    // ----- drawing -----

    pub fn set_manual_mode(&mut self, enabled: bool) {
        self.drawing.set_manual_mode(enabled);
    }

    pub fn toggle_manual_mode(&mut self) -> bool {
        self.drawing.toggle_manual_mode()
    }

    /// Pointer pressed at `point` on the page displayed at `surface` pixels.
    pub fn pointer_down(&mut self, point: Point, surface: Size) -> bool {
        self.drawing.begin_drag(point, surface)
    }

    pub fn pointer_move(&mut self, point: Point) -> Option<NormalizedBox> {
        self.drawing.update_drag(point)
    }

    pub fn pointer_up(&mut self, prompt: &mut dyn LabelPrompt) -> Result<DragOutcome, StoreError> {
        let target = CommitTarget {
            store: &mut self.store,
            review: &mut self.review,
            ids: &mut self.ids,
            page_index: self.viewport.page_index(),
        };
        self.drawing.end_drag(target, prompt)
    }

    /// The pointer left the image. An active drag ends at its last point.
    pub fn pointer_leave(&mut self, prompt: &mut dyn LabelPrompt) -> Result<DragOutcome, StoreError> {
        self.pointer_up(prompt)
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drawing.cancel_drag()
    }

    /// Live outline of the drag in surface pixels.
    pub fn drag_preview(&self) -> Option<PixelRect> {
        self.drawing.session().map(|s| s.preview_rect())
    }

    // ----- navigation -----

    pub fn set_page(&mut self, page: u32) -> bool {
        let changed = self.viewport.set_page(page);
        if changed {
            self.drawing.cancel_drag();
        }
        changed
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.viewport.page_index().saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.viewport.page_index().saturating_sub(1))
    }

    // A drag's pixel coordinates are tied to the surface size it started on,
    // so any zoom change ends it.
    pub fn zoom_in(&mut self) -> f32 {
        self.drawing.cancel_drag();
        self.viewport.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.drawing.cancel_drag();
        self.viewport.zoom_out()
    }

    pub fn reset_zoom(&mut self) {
        self.drawing.cancel_drag();
        self.viewport.reset_zoom();
    }

    pub fn visible_annotations(&self) -> impl Iterator<Item = &Annotation> + '_ {
        viewport::annotations_for_page(&self.store, self.viewport.page_index())
    }

    /// Overlay geometry for the current page drawn at `base` (unzoomed) size.
    pub fn overlays(&self, base: Size) -> Vec<Overlay> {
        let displayed = self.viewport.displayed_size(base);
        let selected = self.review.selection();
        self.visible_annotations()
            .map(|a| Overlay {
                id: a.id,
                rect: geometry::normalized_to_pixel(&a.bbox, displayed),
                affordance_scale: self.viewport.overlay_scale(),
                selected: selected == Some(a.id),
                status: self.review.status(a.id),
            })
            .collect()
    }

    /// Thumbnail window for one annotation.
    pub fn crop_for(&self, id: AnnotationId) -> Option<CropWindow> {
        let ann = self.store.get(id)?;
        Some(crop::crop_window(&ann.bbox, self.config.crop.context_ratio))
    }

    // ----- review -----

    pub fn select(&mut self, id: AnnotationId) -> bool {
        self.review.select(&self.store, id)
    }

    pub fn clear_selection(&mut self) {
        self.review.clear_selection();
    }

    pub fn set_status(&mut self, id: AnnotationId, status: ReviewStatus) -> bool {
        self.review.set_status(&self.store, id, status)
    }

    pub fn select_next(&mut self) -> Option<AnnotationId> {
        self.review.select_next(&self.store, self.viewport.page_index())
    }

    /// Adjudicate the selected annotation and advance to the next one on the
    /// viewed page.
    pub fn adjudicate(&mut self, status: ReviewStatus) -> Option<AnnotationId> {
        self.review.adjudicate(&self.store, self.viewport.page_index(), status)
    }

    /// Delete an annotation together with its review entry and selection.
    pub fn delete(&mut self, id: AnnotationId) -> Option<Annotation> {
        let removed = self.store.remove(id)?;
        self.review.forget(id);
        log::info!("Deleted annotation {id}");
        Some(removed)
    }

    pub fn rename(&mut self, id: AnnotationId, label: impl Into<String>) -> Result<(), StoreError> {
        self.store.rename(id, label)
    }

    pub fn progress(&self) -> f32 {
        self.review.progress(&self.store)
    }

    pub fn summary(&self) -> ReviewSummary {
        self.review.summary(&self.store)
    }

    pub fn page_summary(&self, page: u32) -> ReviewSummary {
        self.review.page_summary(&self.store, page)
    }

    /// Hard reset: drop all annotations and review state, back to zoom 1 on
    /// page 1. Ids keep counting up so none is ever reused.
    pub fn reset(&mut self) {
        self.drawing.set_manual_mode(false);
        self.store.clear();
        self.review.clear();
        self.viewport.reset();
        log::info!("Review session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> ReviewSession {
        let mut s = ReviewSession::new(EngineConfig::default(), PageImages::new(["p1.png", "p2.png"]));
        let report = s
            .load_detections(json!([
                {"type": "Fan", "tag": "EF-1", "page": 1, "bbox": [100, 100, 200, 200], "confidence": 0.9},
                {"type": "Fan", "tag": "EF-2", "page": 2, "bbox": [300, 300, 400, 400], "confidence": 0.8},
                {"type": "Fan", "tag": "EF-3", "page": 1, "bbox": [500, 500, 600, 600], "confidence": 0.7}
            ]))
            .unwrap();
        assert_eq!(report.added, 3);
        s
    }

    #[test]
    fn page_change_cancels_drag_but_keeps_review_state() {
        let mut s = session();
        let first = s.store().ids_on_page(1)[0];
        s.select(first);
        s.set_status(first, ReviewStatus::Incorrect);

        s.set_manual_mode(true);
        assert!(s.pointer_down(Point::new(10.0, 10.0), Size::new(500.0, 500.0)));
        assert!(s.next_page());
        assert!(!s.drawing().is_dragging());
        assert_eq!(s.selection(), Some(first));
        assert_eq!(s.review().status(first), ReviewStatus::Incorrect);
        assert_eq!(s.visible_annotations().count(), 1);
    }

    #[test]
    fn adjudicating_off_page_selection_does_not_advance_into_hidden_page() {
        let mut s = ReviewSession::new(EngineConfig::default(), PageImages::blank(2));
        s.load_detections(json!([
            {"tag": "A", "page": 1, "bbox": [100, 100, 200, 200]},
            {"tag": "B", "page": 1, "bbox": [300, 100, 400, 200]},
            {"tag": "C", "page": 2, "bbox": [100, 100, 200, 200]}
        ]))
        .unwrap();
        let page_one = s.store().ids_on_page(1);
        s.select(page_one[0]);
        s.set_page(2);
        assert_eq!(s.selection(), Some(page_one[0]));

        assert_eq!(s.adjudicate(ReviewStatus::Correct), None);
        assert_eq!(s.selection(), None);
        assert_eq!(s.review().status(page_one[0]), ReviewStatus::Correct);
        assert_eq!(s.review().status(page_one[1]), ReviewStatus::Unreviewed);
    }

    #[test]
    fn manual_annotation_lands_on_current_page() {
        let mut s = session();
        s.set_page(2);
        s.set_manual_mode(true);
        let surface = Size::new(1000.0, 1000.0);
        s.pointer_down(Point::new(100.0, 100.0), surface);
        s.pointer_move(Point::new(150.0, 150.0));
        let mut prompt = |_: &NormalizedBox| Some("CU-1".to_string());
        let DragOutcome::Committed(id) = s.pointer_up(&mut prompt).unwrap() else {
            panic!("expected commit");
        };
        assert_eq!(s.store().get(id).unwrap().page_index, 2);
        assert_eq!(s.store().list(None).last().map(|a| a.id), Some(id));
        assert_eq!(s.selection(), Some(id));
    }

    #[test]
    fn pointer_leave_commits_at_last_point() {
        let mut s = session();
        s.toggle_manual_mode();
        s.pointer_down(Point::new(0.0, 0.0), Size::new(100.0, 100.0));
        s.pointer_move(Point::new(40.0, 20.0));
        let mut prompt = |_: &NormalizedBox| Some("P-7".to_string());
        let outcome = s.pointer_leave(&mut prompt).unwrap();
        let DragOutcome::Committed(id) = outcome else {
            panic!("expected commit, got {outcome:?}");
        };
        let bbox = s.store().get(id).unwrap().bbox;
        assert!((bbox.x_max - 400.0).abs() < 1e-3);
        assert!((bbox.y_max - 200.0).abs() < 1e-3);
        assert_eq!(s.pointer_up(&mut prompt).unwrap(), DragOutcome::Ignored);
    }

    #[test]
    fn overlays_follow_zoom_and_selection() {
        let mut s = session();
        let first = s.store().ids_on_page(1)[0];
        s.select(first);
        s.zoom_in();
        s.zoom_in();
        s.zoom_in();
        s.zoom_in();

        let overlays = s.overlays(Size::new(1000.0, 500.0));
        assert_eq!(overlays.len(), 2);
        let o = &overlays[0];
        assert!(o.selected);
        assert_eq!(o.affordance_scale, 0.5);
        assert!((o.rect.x - 200.0).abs() < 1e-3);
        assert!((o.rect.y - 100.0).abs() < 1e-3);
        assert!((o.rect.width - 200.0).abs() < 1e-3);
        assert!(!overlays[1].selected);
        assert_eq!(s.store().get(first).unwrap().bbox, NormalizedBox::from_corners(100.0, 100.0, 200.0, 200.0));
    }

    #[test]
    fn missing_image_keeps_session_usable() {
        let mut s = ReviewSession::new(EngineConfig::default(), PageImages::blank(1));
        s.load_detections(json!([{"tag": "X-1", "bbox": [0, 0, 100, 100], "confidence": 1.0}]))
            .unwrap();
        assert_eq!(s.current_image(), PageImage::Placeholder);
        let id = s.store().ids_on_page(1)[0];
        assert!(s.select(id));
        assert_eq!(s.adjudicate(ReviewStatus::Correct), None);
        assert_eq!(s.progress(), 1.0);
    }

    #[test]
    fn crop_uses_configured_ratio() {
        let mut config = EngineConfig::default();
        config.crop.context_ratio = 2.0;
        let mut s = ReviewSession::new(config, PageImages::blank(1));
        s.load_detections(json!([{"tag": "X-1", "bbox": [100, 100, 200, 300], "confidence": 1.0}]))
            .unwrap();
        let id = s.store().ids_on_page(1)[0];
        let window = s.crop_for(id).unwrap();
        assert!((window.width - 400.0).abs() < 1e-3);
        assert!((window.height - 200.0).abs() < 1e-3);
        assert!(s.crop_for(AnnotationId::new(999)).is_none());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = session();
        s.next_page();
        s.zoom_in();
        s.set_manual_mode(true);
        let before = s.store().list(None).map(|a| a.id).max().unwrap();
        s.reset();
        assert!(s.store().is_empty());
        assert_eq!(s.viewport().zoom(), 1.0);
        assert_eq!(s.current_page(), 1);
        assert!(!s.drawing().manual_mode());

        s.load_detections(json!([{"tag": "X", "bbox": [0, 0, 50, 50]}])).unwrap();
        assert!(s.store().list(None).all(|a| a.id > before));
    }

    #[test]
    fn load_report_serializes_warnings_as_text() {
        let mut s = ReviewSession::new(EngineConfig::default(), PageImages::blank(1));
        let report = s.load_detections("no json here").unwrap();
        assert_eq!(report.added, 0);
        let value = serde_json::to_value(&report).unwrap();
        let text = value["warnings"][0].as_str().unwrap();
        assert!(text.starts_with("detections payload is not valid JSON"));
    }
}
