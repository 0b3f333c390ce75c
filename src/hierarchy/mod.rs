//! Hierarchy normalization module
//!
//! Turns raw platform-specific accessibility dumps (Android UIAutomator XML
//! or iOS WebDriverAgent XML) into one canonical, addressable tree shape:
//! - [`Node`]: one UI element with ordered attributes, computed bounds and
//!   a per-tree path
//! - [`UiTree`]: the normalized tree plus node count and path lookup
//! - [`normalize`]: raw dump text in, canonical tree out

pub mod node;
pub mod normalize;
pub mod tree;

pub use node::{Bounds, Node, Platform};
pub use normalize::{
    RawElement, derive_scale, logical_screen_width, normalize_tree, parse_raw, png_pixel_width,
};
pub use tree::UiTree;

use crate::error::Result;

/// Normalize a raw dump into a canonical tree.
///
/// `scale` is the iOS pixel-per-point factor; it is ignored for Android.
pub fn normalize(raw_source: &str, platform: Platform, scale: f64) -> Result<UiTree> {
    let raw = parse_raw(raw_source)?;
    Ok(normalize::normalize_tree(&raw, platform, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_convenience() {
        let tree = normalize(
            r#"<hierarchy><node class="X" bounds="[0,0][10,10]"/></hierarchy>"#,
            Platform::Android,
            1.0,
        )
        .unwrap();
        assert_eq!(tree.root.children[0].tag, "X");
        assert_eq!(tree.total_nodes, 2);
    }
}
