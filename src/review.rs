//! Per-annotation adjudication and the selection cursor.
//!
//! Review state is keyed by annotation id and owned here, never by the store.
//! Adjudicating the selected annotation advances the cursor to the next one on
//! the same page; reaching the end of the page clears the selection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::{AnnotationId, AnnotationStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Unreviewed,
    Correct,
    Incorrect,
    Duplicate,
}

/// Status counts over the whole store, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub total: usize,
    pub unreviewed: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub duplicate: usize,
    pub progress: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewWorkflow {
    statuses: HashMap<AnnotationId, ReviewStatus>,
    selection: Option<AnnotationId>,
}

impl ReviewWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<AnnotationId> {
        self.selection
    }

    pub fn status(&self, id: AnnotationId) -> ReviewStatus {
        self.statuses.get(&id).copied().unwrap_or_default()
    }

    pub fn statuses(&self) -> &HashMap<AnnotationId, ReviewStatus> {
        &self.statuses
    }

    /// Point the cursor at `id`. Ids that are not stored are ignored.
    pub fn select(&mut self, store: &AnnotationStore, id: AnnotationId) -> bool {
        if !store.contains(id) {
            log::debug!("Ignoring selection of unknown annotation {id}");
            return false;
        }
        self.selection = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Record `status` for `id`.
    ///
    /// Only the selected, stored annotation can be adjudicated; anything else
    /// is a no-op and returns false. Setting `Unreviewed` drops the entry.
    pub fn set_status(&mut self, store: &AnnotationStore, id: AnnotationId, status: ReviewStatus) -> bool {
        if self.selection != Some(id) || !store.contains(id) {
            return false;
        }
        self.record(id, status);
        true
    }

    /// Record a status without the selection check. Used when the engine
    /// itself certifies an annotation, e.g. a freshly drawn manual entry.
    pub(crate) fn record(&mut self, id: AnnotationId, status: ReviewStatus) {
        match status {
            ReviewStatus::Unreviewed => {
                self.statuses.remove(&id);
            }
            _ => {
                self.statuses.insert(id, status);
            }
        }
        log::debug!("Annotation {id} marked {status:?}");
    }

    /// Move the cursor to the annotation after the selected one in `page`'s
    /// order, or clear it when the selected one is last or not on `page`.
    /// Never wraps to another page.
    pub fn select_next(&mut self, store: &AnnotationStore, page: u32) -> Option<AnnotationId> {
        let current = self.selection?;
        let mut on_page = store.list(Some(page)).map(|a| a.id);
        let next = if on_page.any(|id| id == current) {
            on_page.next()
        } else {
            None
        };
        self.selection = next;
        next
    }

    /// Adjudicate the selected annotation and auto-advance.
    pub fn adjudicate(&mut self, store: &AnnotationStore, page: u32, status: ReviewStatus) -> Option<AnnotationId> {
        let current = self.selection?;
        if !self.set_status(store, current, status) {
            return None;
        }
        self.select_next(store, page)
    }

    /// Drop everything known about a deleted annotation. Does not advance.
    pub fn forget(&mut self, id: AnnotationId) {
        self.statuses.remove(&id);
        if self.selection == Some(id) {
            self.selection = None;
        }
    }

    /// Fraction of stored annotations carrying a review entry, in `[0, 1]`.
    pub fn progress(&self, store: &AnnotationStore) -> f32 {
        let total = store.len();
        if total == 0 {
            return 0.0;
        }
        let reviewed = store.list(None).filter(|a| self.statuses.contains_key(&a.id)).count();
        reviewed as f32 / total as f32
    }

    pub fn summary(&self, store: &AnnotationStore) -> ReviewSummary {
        self.summarize(store, None)
    }

    pub fn page_summary(&self, store: &AnnotationStore, page: u32) -> ReviewSummary {
        self.summarize(store, Some(page))
    }

    fn summarize(&self, store: &AnnotationStore, page: Option<u32>) -> ReviewSummary {
        let mut summary = ReviewSummary::default();
        for ann in store.list(page) {
            summary.total += 1;
            match self.status(ann.id) {
                ReviewStatus::Unreviewed => summary.unreviewed += 1,
                ReviewStatus::Correct => summary.correct += 1,
                ReviewStatus::Incorrect => summary.incorrect += 1,
                ReviewStatus::Duplicate => summary.duplicate += 1,
            }
        }
        if summary.total > 0 {
            summary.progress = (summary.total - summary.unreviewed) as f32 / summary.total as f32;
        }
        summary
    }

    pub fn clear(&mut self) {
        self.statuses.clear();
        self.selection = None;
    }
}
