//! Ordered annotation collection keyed by stable id.

use crate::error::StoreError;
use crate::state::types::{Annotation, AnnotationId};

/// All annotations of a session, in insertion order.
///
/// Order is meaningful: detected annotations are loaded first and manual ones
/// append at the end, and auto-advance walks this order page by page.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    items: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation. Its id must not already be stored and its box
    /// must be well formed.
    pub fn insert(&mut self, annotation: Annotation) -> Result<AnnotationId, StoreError> {
        let id = annotation.id;
        if self.contains(id) {
            log::error!("Refusing to insert duplicate annotation id {id}");
            return Err(StoreError::DuplicateId(id));
        }
        if !annotation.bbox.is_well_formed() {
            log::error!("Refusing to insert annotation {id} with malformed box {:?}", annotation.bbox);
            return Err(StoreError::InvalidBox(id));
        }
        self.items.push(annotation);
        Ok(id)
    }

    /// Remove an annotation, returning it if it existed.
    ///
    /// Selection and review state live elsewhere; callers holding them must
    /// forget the id as well.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let pos = self.position(id)?;
        Some(self.items.remove(pos))
    }

    pub fn rename(&mut self, id: AnnotationId, label: impl Into<String>) -> Result<(), StoreError> {
        let ann = self.get_mut(id).ok_or(StoreError::NotFound(id))?;
        ann.label = label.into();
        Ok(())
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.items.iter_mut().find(|a| a.id == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: AnnotationId) -> Option<usize> {
        self.items.iter().position(|a| a.id == id)
    }

    /// Annotations in insertion order, optionally restricted to one page.
    pub fn list(&self, page: Option<u32>) -> impl Iterator<Item = &Annotation> + '_ {
        self.items
            .iter()
            .filter(move |a| page.is_none_or(|p| a.page_index == p))
    }

    /// Ids on `page`, in order.
    pub fn ids_on_page(&self, page: u32) -> Vec<AnnotationId> {
        self.list(Some(page)).map(|a| a.id).collect()
    }

    /// Distinct page numbers that carry at least one annotation, ascending.
    pub fn pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.items.iter().map(|a| a.page_index).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
