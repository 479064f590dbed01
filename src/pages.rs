//! Page image references supplied by the host.

/// What to draw underneath the overlays for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageImage<'a> {
    /// Opaque handle or URI understood by the renderer.
    Available(&'a str),
    /// The page has no image; draw a placeholder and keep everything else
    /// interactive.
    Placeholder,
}

/// Per-page raster image references, addressed by 1-based page number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageImages {
    refs: Vec<Option<String>>,
}

impl PageImages {
    pub fn new<I, S>(refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            refs: refs.into_iter().map(|r| Some(r.into())).collect(),
        }
    }

    /// `count` pages with no images yet.
    pub fn blank(count: usize) -> Self {
        Self {
            refs: vec![None; count],
        }
    }

    /// Number of pages; a document with no images still has one page.
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.refs.len()).unwrap_or(u32::MAX).max(1)
    }

    pub fn set(&mut self, page: u32, image: Option<String>) {
        let Some(idx) = (page as usize).checked_sub(1) else {
            return;
        };
        if idx >= self.refs.len() {
            self.refs.resize(idx + 1, None);
        }
        self.refs[idx] = image;
    }

    pub fn image(&self, page: u32) -> PageImage<'_> {
        (page as usize)
            .checked_sub(1)
            .and_then(|idx| self.refs.get(idx))
            .and_then(|r| r.as_deref())
            .filter(|r| !r.is_empty())
            .map_or(PageImage::Placeholder, PageImage::Available)
    }
}
