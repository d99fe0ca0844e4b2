//! Image references for logical pages.
//!
//! Extracting and uploading page images is the publishing backend's job;
//! the segmenter only carries the resulting identifier and markup through
//! to the article. Hosts plug in their own [`ImageResolver`]; without one,
//! every page gets the configured fallback id.

use crate::model::PageImage;
use crate::pipeline::extract::LogicalPage;
use std::collections::HashMap;

/// Supplies the image reference of a logical page.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, page: &LogicalPage) -> PageImage;
}

/// Gives every page the same placeholder image id (or none).
#[derive(Debug, Clone, Default)]
pub struct FallbackImageResolver {
    fallback: Option<String>,
}

impl FallbackImageResolver {
    pub fn new(fallback: Option<String>) -> Self {
        Self { fallback }
    }
}

impl ImageResolver for FallbackImageResolver {
    fn resolve(&self, _page: &LogicalPage) -> PageImage {
        PageImage {
            image_id: self.fallback.clone(),
            image_html: String::new(),
        }
    }
}

/// Images uploaded ahead of time, keyed by logical page number.
#[derive(Debug, Clone, Default)]
pub struct PrefetchedImages {
    by_page: HashMap<usize, PageImage>,
    fallback: FallbackImageResolver,
}

impl PrefetchedImages {
    pub fn new(fallback: Option<String>) -> Self {
        Self {
            by_page: HashMap::new(),
            fallback: FallbackImageResolver::new(fallback),
        }
    }

    pub fn insert(&mut self, page_num: usize, image: PageImage) {
        self.by_page.insert(page_num, image);
    }
}

impl ImageResolver for PrefetchedImages {
    fn resolve(&self, page: &LogicalPage) -> PageImage {
        match self.by_page.get(&page.page_num) {
            Some(image) if image.image_id.is_some() => image.clone(),
            Some(image) => PageImage {
                image_html: image.image_html.clone(),
                ..self.fallback.resolve(page)
            },
            None => self.fallback.resolve(page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize) -> LogicalPage {
        LogicalPage {
            page_num: n,
            physical_page: n,
            width: 595.0,
            height: 842.0,
            chars: Vec::new(),
            malformed: None,
        }
    }

    #[test]
    fn fallback_resolver() {
        let r = FallbackImageResolver::new(Some("sample-42".into()));
        assert_eq!(r.resolve(&page(3)).image_id.as_deref(), Some("sample-42"));
        assert!(FallbackImageResolver::default().resolve(&page(3)).image_id.is_none());
    }

    #[test]
    fn prefetched_images_fall_back_per_page() {
        let mut images = PrefetchedImages::new(Some("sample".into()));
        images.insert(1, PageImage::with_id("img-1"));
        images.insert(
            2,
            PageImage {
                image_id: None,
                image_html: "<figure/>".into(),
            },
        );

        assert_eq!(images.resolve(&page(1)).image_id.as_deref(), Some("img-1"));
        let second = images.resolve(&page(2));
        assert_eq!(second.image_id.as_deref(), Some("sample"));
        assert_eq!(second.image_html, "<figure/>");
        assert_eq!(images.resolve(&page(5)).image_id.as_deref(), Some("sample"));
    }
}
