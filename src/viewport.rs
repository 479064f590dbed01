//! Zoom and page navigation for the review surface.
//!
//! Zoom is a purely visual scale applied to the displayed page; stored
//! annotation boxes never change with it. Zoom is session-scoped: switching
//! pages keeps the current level.

use crate::config::ViewportConfig;
use crate::geometry::Size;
use crate::state::{Annotation, AnnotationStore};

pub const DEFAULT_ZOOM: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    zoom: f32,
    page_index: u32,
    page_count: u32,
    limits: ViewportConfig,
}

impl Viewport {
    pub fn new(page_count: u32) -> Self {
        Self::with_limits(page_count, ViewportConfig::default())
    }

    pub fn with_limits(page_count: u32, limits: ViewportConfig) -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            page_index: 1,
            page_count: page_count.max(1),
            limits,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.zoom = (self.zoom + self.limits.zoom_step).min(self.limits.max_zoom);
        self.zoom
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.zoom = (self.zoom - self.limits.zoom_step).max(self.limits.min_zoom);
        self.zoom
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = DEFAULT_ZOOM;
    }

    /// Jump to page `n`, clamped to the valid range. Returns true when the
    /// current page actually changed.
    pub fn set_page(&mut self, n: u32) -> bool {
        let target = n.clamp(1, self.page_count);
        if target == self.page_index {
            return false;
        }
        log::debug!("Page {} -> {}", self.page_index, target);
        self.page_index = target;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.page_index.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.page_index.saturating_sub(1))
    }

    /// Update the page count (e.g. a new set of page images arrived), keeping
    /// the current page inside the new range.
    pub fn set_page_count(&mut self, page_count: u32) {
        self.page_count = page_count.max(1);
        self.page_index = self.page_index.min(self.page_count);
    }

    /// Scale for fixed-size overlay affordances (labels, handles, markers) so
    /// they keep the same on-screen size at any zoom.
    pub fn overlay_scale(&self) -> f32 {
        1.0 / self.zoom
    }

    /// Size of the rendering surface for a page whose unzoomed size is `base`.
    pub fn displayed_size(&self, base: Size) -> Size {
        base.scaled(self.zoom)
    }

    /// Back to zoom 1 on page 1.
    pub fn reset(&mut self) {
        self.zoom = DEFAULT_ZOOM;
        self.page_index = 1;
    }
}

/// Annotations on `page`, preserving store order.
pub fn annotations_for_page(store: &AnnotationStore, page: u32) -> impl Iterator<Item = &Annotation> + '_ {
    store.list(Some(page))
}
