//! Locator synthesis for normalized hierarchy elements.
//!
//! [`SelectorBundle`] collects every way a driver could address an
//! element: plain identifiers, a verified-unique absolute XPath, and
//! platform-native expressions.

pub mod native;
pub mod unique;

pub use native::{ios_class_chains, ios_predicates, relative_xpaths, uiautomator};
pub use unique::{unique_xpath, xpath_escape};

use serde::Serialize;

use crate::hierarchy::Platform;
use crate::xpath::Arena;

/// All selectors for one element, most reliable first
#[derive(Debug, Clone, Serialize)]
pub struct SelectorBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility_id: Option<String>,
    pub class_name: String,
    pub xpath_absolute: String,
    pub xpath_relative: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uiautomator: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub predicate: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub class_chain: Vec<String>,
}

/// Build the full selector bundle for the element at arena index
/// `target`
pub fn synthesize(arena: &Arena, target: usize, platform: Platform) -> Option<SelectorBundle> {
    let node = arena.node(target)?;
    let non_empty = |name: &str| {
        node.attribute(name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let (id, accessibility_id) = match platform {
        Platform::Ios => (non_empty("name"), non_empty("label")),
        Platform::Android => (non_empty("resource-id"), non_empty("content-desc")),
    };

    let mut bundle = SelectorBundle {
        id,
        accessibility_id,
        class_name: node.tag.clone(),
        xpath_absolute: unique_xpath(arena, target, platform),
        xpath_relative: relative_xpaths(&node.attributes, &node.tag, platform),
        uiautomator: Vec::new(),
        predicate: Vec::new(),
        class_chain: Vec::new(),
    };
    match platform {
        Platform::Android => {
            bundle.uiautomator = uiautomator(&node.attributes, &node.tag);
        }
        Platform::Ios => {
            bundle.predicate = ios_predicates(&node.attributes, &node.tag);
            bundle.class_chain = ios_class_chains(&node.attributes, &node.tag);
        }
    }
    Some(bundle)
}
