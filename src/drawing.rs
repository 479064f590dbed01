//! Pointer-driven creation of manual annotations.
//!
//! A drag only starts while manual-add mode is on. The machine is either
//! `Idle` or `Dragging`; committing is a single synchronous step that inserts
//! the annotation, certifies it, selects it and leaves manual mode.
//!
//! Handles: begin_drag, update_drag, end_drag, cancel_drag

use crate::config::DrawingConfig;
use crate::error::StoreError;
use crate::geometry::{self, NormalizedBox, PixelRect, Point, Size};
use crate::review::{ReviewStatus, ReviewWorkflow};
use crate::state::{Annotation, AnnotationId, AnnotationStore, IdAllocator};

/// Asks the reviewer for a label when a drawn box is about to be committed.
///
/// Returning `None` (or a blank string) abandons the draft.
pub trait LabelPrompt {
    fn request_label(&mut self, preview: &NormalizedBox) -> Option<String>;
}

impl<F> LabelPrompt for F
where
    F: FnMut(&NormalizedBox) -> Option<String>,
{
    fn request_label(&mut self, preview: &NormalizedBox) -> Option<String> {
        self(preview)
    }
}

/// An in-progress drag, in pixels relative to the displayed image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawSession {
    pub anchor: Point,
    pub current: Point,
    /// Displayed image size captured when the drag began.
    pub surface: Size,
}

impl DrawSession {
    pub fn preview_box(&self) -> NormalizedBox {
        geometry::box_from_points(
            geometry::pixel_to_normalized(self.anchor, self.surface),
            geometry::pixel_to_normalized(self.current, self.surface),
        )
    }

    /// Preview rectangle in surface pixels, for the live outline.
    pub fn preview_rect(&self) -> PixelRect {
        PixelRect {
            x: self.anchor.x.min(self.current.x),
            y: self.anchor.y.min(self.current.y),
            width: (self.current.x - self.anchor.x).abs(),
            height: (self.current.y - self.anchor.y).abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum DrawState {
    #[default]
    Idle,
    Dragging(DrawSession),
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// No drag was active (e.g. a stray pointer-up).
    Ignored,
    /// The box was below the minimum size and was dropped.
    Discarded,
    /// No label was supplied, so nothing was created.
    Abandoned,
    Committed(AnnotationId),
}

/// Everything a commit writes to, borrowed from the session for one call.
pub struct CommitTarget<'a> {
    pub store: &'a mut AnnotationStore,
    pub review: &'a mut ReviewWorkflow,
    pub ids: &'a mut IdAllocator,
    pub page_index: u32,
}

#[derive(Debug, Clone)]
pub struct DrawingStateMachine {
    state: DrawState,
    manual_mode: bool,
    min_box_size: f32,
    category: String,
}

impl DrawingStateMachine {
    pub fn new(config: &DrawingConfig) -> Self {
        Self {
            state: DrawState::Idle,
            manual_mode: false,
            min_box_size: config.min_box_size,
            category: config.manual_category.clone(),
        }
    }

    pub fn manual_mode(&self) -> bool {
        self.manual_mode
    }

    /// Enter or leave manual-add mode. Any drag in progress is cancelled.
    pub fn set_manual_mode(&mut self, enabled: bool) {
        self.cancel_drag();
        self.manual_mode = enabled;
    }

    pub fn toggle_manual_mode(&mut self) -> bool {
        self.set_manual_mode(!self.manual_mode);
        self.manual_mode
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DrawState::Dragging(_))
    }

    pub fn session(&self) -> Option<&DrawSession> {
        match &self.state {
            DrawState::Dragging(session) => Some(session),
            DrawState::Idle => None,
        }
    }

    pub fn preview_box(&self) -> Option<NormalizedBox> {
        self.session().map(DrawSession::preview_box)
    }

    /// Start a drag at `point` on an image displayed at `surface`.
    pub fn begin_drag(&mut self, point: Point, surface: Size) -> bool {
        if !self.manual_mode || self.is_dragging() {
            return false;
        }
        let anchor = surface.clamp_point(point);
        self.state = DrawState::Dragging(DrawSession {
            anchor,
            current: anchor,
            surface,
        });
        log::debug!("Drag started at ({:.1}, {:.1})", anchor.x, anchor.y);
        true
    }

    /// Move the free corner of the drag; returns the new preview box.
    pub fn update_drag(&mut self, point: Point) -> Option<NormalizedBox> {
        let DrawState::Dragging(session) = &mut self.state else {
            return None;
        };
        session.current = session.surface.clamp_point(point);
        Some(session.preview_box())
    }

    /// Finish the drag and, if the box is usable and labelled, commit it.
    ///
    /// The only error is a duplicate id from the store, which means the id
    /// allocator was bypassed.
    pub fn end_drag(
        &mut self,
        target: CommitTarget<'_>,
        prompt: &mut dyn LabelPrompt,
    ) -> Result<DragOutcome, StoreError> {
        let DrawState::Dragging(session) = std::mem::take(&mut self.state) else {
            return Ok(DragOutcome::Ignored);
        };

        let bbox = session.preview_box();
        if bbox.is_degenerate(self.min_box_size) || !bbox.is_well_formed() {
            log::debug!("Discarding {:.1}x{:.1} box below minimum size", bbox.width(), bbox.height());
            return Ok(DragOutcome::Discarded);
        }

        let label = prompt
            .request_label(&bbox)
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let Some(label) = label else {
            log::debug!("No label supplied; draft abandoned");
            return Ok(DragOutcome::Abandoned);
        };

        let mut annotation = Annotation::manual(target.ids.fresh_id(), target.page_index, label, bbox);
        annotation.category = self.category.clone();

        let id = target.store.insert(annotation)?;
        target.review.record(id, ReviewStatus::Correct);
        target.review.select(target.store, id);
        self.manual_mode = false;

        log::info!("Added manual annotation {id} on page {}", target.page_index);
        Ok(DragOutcome::Committed(id))
    }

    /// Drop the draft, if any. Returns true when a drag was cancelled.
    pub fn cancel_drag(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.state = DrawState::Idle;
        if was_dragging {
            log::debug!("Drag cancelled");
        }
        was_dragging
    }
}
