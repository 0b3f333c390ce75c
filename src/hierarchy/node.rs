use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Source dialect of a hierarchy dump.
///
/// Carries the two fixed per-platform tables: the identifying-attribute
/// priority list used by selector synthesis, and the type-name substrings
/// that mark an element interactive or scrollable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

/// iOS element types considered tappable by their type name
const IOS_INTERACTIVE_TYPES: &[&str] = &[
    "Button",
    "Cell",
    "Link",
    "TabBar",
    "Switch",
    "TextField",
    "SecureTextField",
    "SearchField",
    "Slider",
];

const IOS_SCROLLABLE_TYPES: &[&str] = &["ScrollView", "Table"];

impl Platform {
    /// Attribute names that can identify an element, in priority order
    pub fn identifying_attributes(&self) -> &'static [&'static str] {
        match self {
            Platform::Android => &["resource-id", "content-desc", "text"],
            Platform::Ios => &["name", "label", "value"],
        }
    }

    /// Whether an iOS type name denotes an interactive element
    pub fn is_interactive_type(&self, tag: &str) -> bool {
        matches!(self, Platform::Ios) && IOS_INTERACTIVE_TYPES.iter().any(|t| tag.contains(t))
    }

    /// Whether an iOS type name denotes a scrollable container
    pub fn is_scrollable_type(&self, tag: &str) -> bool {
        matches!(self, Platform::Ios) && IOS_SCROLLABLE_TYPES.iter().any(|t| tag.contains(t))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

/// One element in the normalized accessibility tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Element type name (Android class string or iOS element type)
    pub tag: String,

    /// All attributes from the source dump plus derived entries,
    /// in document order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Pixel-space rectangle parsed from the bounds attribute;
    /// absent when the bounds string was missing or unparsable
    #[serde(rename = "bounds_computed", skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,

    /// Child indices from the tree root to this node; unique within one
    /// tree instance, stable only within one dump
    #[serde(rename = "node_path")]
    pub path: Vec<usize>,

    /// Child elements in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a new Node with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            bounds: None,
            path: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder method: set an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Add a single attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Get attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Whether the dump marked this element clickable
    pub fn is_clickable(&self) -> bool {
        self.attribute("clickable") == Some("true")
    }

    /// Whether the dump marked this element invisible.
    /// Only an explicit `visible="false"` counts; a missing attribute
    /// is treated as visible.
    pub fn is_invisible(&self) -> bool {
        self.attribute("visible") == Some("false")
    }
}

/// A node's on-screen rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bounds {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Bounds {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Parse a bounds string in either supported encoding.
    ///
    /// Android corner-pair: `[x1,y1][x2,y2]` (top-left, bottom-right).
    /// iOS origin-size: `{{x,y},{w,h}}`.
    ///
    /// Returns `None` for any other shape. Negative widths/heights are
    /// not rejected; well-formed dumps never produce them.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.starts_with('[') {
            let pairs = extract_pairs(s, '[', ']')?;
            let [(x1, y1), (x2, y2)] = pairs;
            Some(Self::new(x1, y1, x2 - x1, y2 - y1))
        } else if s.starts_with('{') {
            let pairs = extract_pairs(s, '{', '}')?;
            let [(x, y), (w, h)] = pairs;
            Some(Self::new(x, y, w, h))
        } else {
            None
        }
    }

    /// Format as the Android corner-pair encoding
    pub fn to_bracket_string(&self) -> String {
        format!(
            "[{},{}][{},{}]",
            self.x,
            self.y,
            self.x + self.w,
            self.y + self.h
        )
    }

    /// Format as the iOS origin-size encoding
    pub fn to_brace_string(&self) -> String {
        format!("{{{{{},{}}},{{{},{}}}}}", self.x, self.y, self.w, self.h)
    }

    /// Whether the point lies inside this rectangle (edges inclusive)
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && x <= self.x + self.w && y >= self.y && y <= self.y + self.h
    }

    pub fn area(&self) -> i64 {
        self.w * self.h
    }
}

/// Extract exactly two `(int,int)` pairs delimited by the given characters.
/// Any malformed pair, or a pair count other than two, yields `None`.
fn extract_pairs(s: &str, open: char, close: char) -> Option<[(i64, i64); 2]> {
    let mut pairs = Vec::with_capacity(2);
    let mut rest = s;
    while let Some(start) = rest.find(open) {
        let end = rest[start..].find(close)? + start;
        let inner = &rest[start + 1..end];
        // Nested braces in the iOS encoding produce an empty "pair"
        // between the outer and inner delimiter; skip those.
        if inner.contains(open) {
            rest = &rest[start + 1..];
            continue;
        }
        let (a, b) = inner.split_once(',')?;
        let a: i64 = a.trim().parse().ok()?;
        let b: i64 = b.trim().parse().ok()?;
        pairs.push((a, b));
        rest = &rest[end + 1..];
    }
    if pairs.len() == 2 {
        Some([pairs[0], pairs[1]])
    } else {
        None
    }
}
