//! The query facade.
//!
//! [`Inspector`] ties the pieces together: it normalizes raw dumps,
//! caches them per device serial, and answers element-info, coordinate
//! and XPath queries against the cached hierarchy without reprocessing
//! the dump each time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use serde::Serialize;

use crate::cache::{CacheEntry, HierarchyCache};
use crate::error::{InspectorError, Result};
use crate::hierarchy::{self, Bounds, Node, Platform};
use crate::hittest;
use crate::selector::{self, SelectorBundle};
use crate::xpath::{self, Arena};

/// A processed dump, ready for querying
#[derive(Debug, Clone, Serialize)]
pub struct DumpResult {
    pub platform: Platform,
    pub total_nodes: usize,
    pub hierarchy: Node,
}

/// Everything known about one element
#[derive(Debug, Clone, Serialize)]
pub struct ElementInfo {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds_computed: Option<Bounds>,
    pub node_path: Vec<usize>,
    pub selectors: SelectorBundle,
}

/// Result of a coordinate lookup
#[derive(Debug, Clone, Serialize)]
pub struct CoordinateHit {
    pub element: ElementInfo,
    pub total_matches: usize,
    pub clickable_matches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct XPathMatch {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds_computed: Option<Bounds>,
}

#[derive(Debug, Clone, Serialize)]
pub struct XPathQueryResult {
    pub count: usize,
    pub matches: Vec<XPathMatch>,
}

/// Stateful hierarchy inspector with a per-serial cache
#[derive(Debug, Default)]
pub struct Inspector {
    cache: HierarchyCache,
    // last successfully derived iOS pixel scale per serial
    scales: Mutex<HashMap<String, f64>>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a raw hierarchy dump and cache it for `serial`.
    ///
    /// For iOS the coordinate scale is derived from the screenshot's
    /// pixel width when one is supplied; otherwise it falls back to the
    /// last known scale for the serial, then to 1.0.
    pub fn dump(
        &self,
        serial: &str,
        raw_source: &str,
        platform: Platform,
        screenshot_png: Option<&[u8]>,
    ) -> Result<DumpResult> {
        log::info!("processing hierarchy dump for {serial} ({platform:?})");
        let raw = hierarchy::parse_raw(raw_source)?;

        let scale = match platform {
            Platform::Android => 1.0,
            Platform::Ios => self.ios_scale(serial, &raw, screenshot_png),
        };

        let tree = hierarchy::normalize_tree(&raw, platform, scale);
        let result = DumpResult {
            platform,
            total_nodes: tree.total_nodes,
            hierarchy: tree.root.clone(),
        };
        self.cache.put(serial, raw_source.to_string(), tree, platform);
        Ok(result)
    }

    fn ios_scale(
        &self,
        serial: &str,
        raw: &hierarchy::RawElement,
        screenshot_png: Option<&[u8]>,
    ) -> f64 {
        let derived = screenshot_png
            .and_then(hierarchy::png_pixel_width)
            .and_then(|px| hierarchy::derive_scale(raw, px));
        let mut scales = self
            .scales
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match derived {
            Some(scale) => {
                scales.insert(serial.to_string(), scale);
                scale
            }
            None => {
                let fallback = scales.get(serial).copied().unwrap_or(1.0);
                log::warn!("no scale derivable for {serial}, using {fallback}");
                fallback
            }
        }
    }

    fn cached(&self, serial: &str) -> Result<Arc<CacheEntry>> {
        self.cache.get(serial).ok_or_else(|| {
            InspectorError::NotFound(format!(
                "no cached hierarchy for {serial}, dump the device first"
            ))
        })
    }

    /// Detailed info for the element at a hierarchy path
    pub fn element_info(&self, serial: &str, node_path: &[usize]) -> Result<ElementInfo> {
        let entry = self.cached(serial)?;
        let arena = Arena::build(&entry.tree.root);
        let idx = arena.index_by_path(node_path).ok_or_else(|| {
            InspectorError::NotFound(format!("no element at path {node_path:?}"))
        })?;
        element_info_at(&arena, idx, entry.platform).ok_or_else(|| {
            InspectorError::NotFound(format!("no element at path {node_path:?}"))
        })
    }

    /// Best element at a screen coordinate
    pub fn find_by_coordinate(&self, serial: &str, x: i64, y: i64) -> Result<CoordinateHit> {
        let entry = self.cached(serial)?;
        let hit = hittest::find_at(&entry.tree.root, x, y).ok_or_else(|| {
            InspectorError::NotFound(format!("no element at coordinate ({x}, {y})"))
        })?;
        let arena = Arena::build(&entry.tree.root);
        let idx = arena.index_by_path(&hit.node.path).ok_or_else(|| {
            InspectorError::NotFound(format!("no element at coordinate ({x}, {y})"))
        })?;
        let element = element_info_at(&arena, idx, entry.platform).ok_or_else(|| {
            InspectorError::NotFound(format!("no element at coordinate ({x}, {y})"))
        })?;
        Ok(CoordinateHit {
            element,
            total_matches: hit.total_matches,
            clickable_matches: hit.clickable_matches,
        })
    }

    /// Run an arbitrary XPath expression against the cached hierarchy
    pub fn xpath_query(&self, serial: &str, expr: &str) -> Result<XPathQueryResult> {
        let entry = self.cached(serial)?;
        let matches = xpath::query(&entry.tree.root, expr)?;
        log::info!("xpath query {expr:?} found {} match(es)", matches.len());
        Ok(XPathQueryResult {
            count: matches.len(),
            matches: matches
                .into_iter()
                .map(|node| XPathMatch {
                    tag: node.tag.clone(),
                    attributes: node.attributes.clone(),
                    bounds_computed: node.bounds,
                })
                .collect(),
        })
    }

    /// Raw source of the cached dump for a serial
    pub fn cached_source(&self, serial: &str) -> Result<String> {
        Ok(self.cached(serial)?.raw_source.clone())
    }

    pub fn has_cached(&self, serial: &str) -> bool {
        self.cache.has(serial)
    }

    /// Forget the cached hierarchy for a serial
    pub fn invalidate(&self, serial: &str) -> bool {
        self.cache.invalidate(serial)
    }
}

fn element_info_at(arena: &Arena, idx: usize, platform: Platform) -> Option<ElementInfo> {
    let node = arena.node(idx)?;
    let selectors = selector::synthesize(arena, idx, platform)?;
    Some(ElementInfo {
        tag: node.tag.clone(),
        attributes: node.attributes.clone(),
        bounds_computed: node.bounds,
        node_path: node.path.clone(),
        selectors,
    })
}
