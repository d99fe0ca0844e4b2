//! Category identification from the running header of each page.
//!
//! The magazine prints the section name in a fixed strip at the top of
//! each page, on the outer side. Left-hand (odd) logical pages use
//! [`CategoryRegions::top_odd`], right-hand (even) ones
//! [`CategoryRegions::top_even`]; a page whose top strip is empty is tried
//! again on its side strip. The text found is lowercased, anything
//! mentioning the editorial category collapses to that category, and a page
//! with no label at all gets the profile's fallback category.

use crate::config::{CategoryRegions, LayoutProfile};
use crate::model::{BBox, Span};
use tracing::debug;

/// Labels a logical page with its topical category.
pub trait CategoryIdentifier: Send + Sync {
    fn identify(&self, page_num: usize, spans: &[Span]) -> String;
}

/// Reads the category from fixed header regions.
#[derive(Debug, Clone)]
pub struct RegionCategoryIdentifier {
    regions: CategoryRegions,
    fallback: String,
    editorial: String,
}

impl RegionCategoryIdentifier {
    pub fn new(profile: &LayoutProfile) -> Self {
        Self {
            regions: profile.category_regions.clone(),
            fallback: profile.fallback_category.to_lowercase(),
            editorial: profile.editorial_category.to_lowercase(),
        }
    }

    fn regions_for(&self, page_num: usize) -> (&BBox, &BBox) {
        if page_num % 2 == 0 {
            (&self.regions.top_even, &self.regions.side_even)
        } else {
            (&self.regions.top_odd, &self.regions.side_odd)
        }
    }
}

impl CategoryIdentifier for RegionCategoryIdentifier {
    fn identify(&self, page_num: usize, spans: &[Span]) -> String {
        let (top, side) = self.regions_for(page_num);
        let mut label = text_in_region(spans, top);
        if label.is_empty() {
            label = text_in_region(spans, side);
        }

        let label = label.to_lowercase();
        let category = if label.is_empty() {
            self.fallback.clone()
        } else if label.contains(&self.editorial) {
            self.editorial.clone()
        } else {
            label
        };
        debug!("Page {}: category {:?}", page_num, category);
        category
    }
}

/// Every category is the same string; for single-section publications.
#[derive(Debug, Clone)]
pub struct FixedCategory(pub String);

impl CategoryIdentifier for FixedCategory {
    fn identify(&self, _page_num: usize, _spans: &[Span]) -> String {
        self.0.clone()
    }
}

/// Words of the spans lying entirely inside `region`, space separated.
pub fn text_in_region(spans: &[Span], region: &BBox) -> String {
    spans
        .iter()
        .filter(|s| region.contains(&s.bbox))
        .flat_map(|s| s.text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
