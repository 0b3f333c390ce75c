//! # ui-inspector
//!
//! A Rust library for inspecting mobile UI accessibility trees, designed
//! for automation backends that drive Android and iOS devices.
//!
//! ## Features
//!
//! - **Hierarchy Normalization**: Parse UIAutomator and WebDriverAgent
//!   XML dumps into one canonical tree shape with computed bounds and
//!   stable node paths
//! - **Locator Synthesis**: Generate the shortest verified-unique XPath
//!   for any element, plus relative XPaths, UiAutomator, NSPredicate and
//!   class chain selectors
//! - **Coordinate Hit-Testing**: Resolve a screen tap to the most
//!   specific clickable element under the point
//! - **XPath Queries**: Run XPath 1.0 expressions against the
//!   normalized tree
//! - **Per-Device Caching**: Keep the last dump per serial so repeated
//!   queries never reprocess the hierarchy
//!
//! ## Basic Usage
//!
//! ```rust
//! use ui_inspector::{Inspector, Platform};
//!
//! # fn main() -> ui_inspector::Result<()> {
//! let inspector = Inspector::new();
//!
//! let xml = r#"<hierarchy rotation="0">
//!   <node class="android.widget.Button" text="OK" clickable="true"
//!         bounds="[100,100][300,200]"/>
//! </hierarchy>"#;
//!
//! // Process and cache a dump for a device
//! let dump = inspector.dump("emulator-5554", xml, Platform::Android, None)?;
//! println!("normalized {} nodes", dump.total_nodes);
//!
//! // Resolve a tap to an element, selectors included
//! let hit = inspector.find_by_coordinate("emulator-5554", 150, 150)?;
//! println!("tapped {}", hit.element.selectors.xpath_absolute);
//! # Ok(())
//! # }
//! ```
//!
//! ## Direct Tree Access
//!
//! The lower-level modules work without the cache:
//!
//! ```rust
//! use ui_inspector::hierarchy::{self, Platform};
//!
//! # fn main() -> ui_inspector::Result<()> {
//! let tree = hierarchy::normalize(
//!     r#"<hierarchy><node class="android.view.View" bounds="[0,0][10,10]"/></hierarchy>"#,
//!     Platform::Android,
//!     1.0,
//! )?;
//! let matches = ui_inspector::xpath::query(&tree.root, "//android.view.View")?;
//! assert_eq!(matches.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod hierarchy;
pub mod hittest;
pub mod inspector;
pub mod selector;
pub mod xpath;

pub use cache::{CacheEntry, HierarchyCache};
pub use error::{InspectorError, Result};
pub use hierarchy::{Bounds, Node, Platform, UiTree};
pub use hittest::HitResult;
pub use inspector::{
    CoordinateHit, DumpResult, ElementInfo, Inspector, XPathMatch, XPathQueryResult,
};
pub use selector::SelectorBundle;
