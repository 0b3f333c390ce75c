use crate::error::{InspectorError, Result};
use crate::hierarchy::node::{Bounds, Node, Platform};
use crate::hierarchy::tree::UiTree;
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Minimum logical extent of the iOS screen container used for scale
/// derivation. The root application element always covers the full screen
/// starting at (0,0); anything smaller is an overlay, not the screen.
const MIN_SCREEN_LOGICAL_W: i64 = 200;
const MIN_SCREEN_LOGICAL_H: i64 = 400;

/// Byte offset of the big-endian width field in a PNG header
/// (8-byte signature + IHDR length/type).
const PNG_WIDTH_OFFSET: usize = 16;
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// A raw element as it appears in the source dump, before any
/// dialect-specific rewriting
#[derive(Debug, Clone)]
pub struct RawElement {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<RawElement>,
}

impl RawElement {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn attr_f64(&self, key: &str) -> f64 {
        self.attribute(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

/// Parse a raw dump string into a [`RawElement`] tree.
///
/// Fails with `EmptyInput` for blank input and `MalformedInput` when the
/// text does not begin with `<` or is not well-formed XML. Never returns
/// a partial tree.
pub fn parse_raw(xml: &str) -> Result<RawElement> {
    let trimmed = xml.trim();
    if trimmed.is_empty() {
        return Err(InspectorError::EmptyInput);
    }
    if !trimmed.starts_with('<') {
        return Err(InspectorError::MalformedInput(
            "dump does not start with '<'".to_string(),
        ));
    }

    let mut reader = Reader::from_str(trimmed);
    let mut stack: Vec<RawElement> = Vec::new();
    let mut root: Option<RawElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element_from(&e)?),
            Ok(Event::Empty(e)) => {
                let elem = element_from(&e)?;
                attach(&mut stack, &mut root, elem);
            }
            Ok(Event::End(_)) => {
                let elem = stack.pop().ok_or_else(|| {
                    InspectorError::MalformedInput("unexpected closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, elem);
            }
            Ok(Event::Eof) => break,
            // Text, comments, declarations and PIs carry no hierarchy data
            Ok(_) => {}
            Err(e) => return Err(InspectorError::MalformedInput(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(InspectorError::MalformedInput(
            "unclosed element at end of input".to_string(),
        ));
    }
    root.ok_or_else(|| InspectorError::MalformedInput("no root element".to_string()))
}

fn element_from(start: &BytesStart) -> Result<RawElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = IndexMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| InspectorError::MalformedInput(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| InspectorError::MalformedInput(e.to_string()))?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(RawElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut Vec<RawElement>, root: &mut Option<RawElement>, elem: RawElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(elem);
    } else if root.is_none() {
        *root = Some(elem);
    }
}

/// Normalize a raw element tree into the canonical [`UiTree`] shape.
///
/// `scale` only matters for iOS (pixel-per-logical-point factor); pass
/// `1.0` for Android.
pub fn normalize_tree(raw: &RawElement, platform: Platform, scale: f64) -> UiTree {
    let mut root = if raw.name == "hierarchy" {
        // Raw root already carries the synthetic-root role; reuse it.
        let mut node = Node::new("hierarchy");
        node.attributes = raw.attributes.clone();
        for (index, child) in raw.children.iter().enumerate() {
            node.add_child(normalize_element(child, index, platform, scale));
        }
        node
    } else {
        // Wrap top-level raw elements under a synthesized root.
        let mut node = Node::new("hierarchy")
            .with_attribute("rotation", "0")
            .with_attribute("platform", platform.as_str());
        node.add_child(normalize_element(raw, 0, platform, scale));
        node
    };

    assign_paths(&mut root, vec![0]);
    UiTree::new(root)
}

fn normalize_element(raw: &RawElement, index: usize, platform: Platform, scale: f64) -> Node {
    match platform {
        Platform::Android => normalize_android(raw),
        Platform::Ios => normalize_ios(raw, index, scale),
    }
}

/// Android dialect: every element is a generic `<node>` whose real type
/// lives in the `class` attribute. Rename the element to that class,
/// keeping all attributes. Elements without a class keep their name.
fn normalize_android(raw: &RawElement) -> Node {
    let tag = match raw.attribute("class") {
        Some(class) if raw.name == "node" && !class.is_empty() => class.to_string(),
        _ => raw.name.clone(),
    };

    let mut node = Node::new(tag);
    node.attributes = raw.attributes.clone();
    node.bounds = raw.attribute("bounds").and_then(Bounds::parse);
    for child in &raw.children {
        node.add_child(normalize_android(child));
    }
    node
}

/// iOS dialect: element names are already semantic. Scale the geometry to
/// pixel space, derive a bracket-pair bounds string so the same bounds
/// parser works for both platforms, and add the index/clickable/scrollable
/// attributes the Android dump carries natively.
fn normalize_ios(raw: &RawElement, index: usize, scale: f64) -> Node {
    let mut node = Node::new(raw.name.clone());
    node.attributes = raw.attributes.clone();

    let x = raw.attr_f64("x");
    let y = raw.attr_f64("y");
    let w = raw.attr_f64("width");
    let h = raw.attr_f64("height");

    let px = |v: f64| (v * scale).round() as i64;
    node.set_attribute("x", px(x).to_string());
    node.set_attribute("y", px(y).to_string());
    node.set_attribute("width", px(w).to_string());
    node.set_attribute("height", px(h).to_string());

    let bounds_str = ios_bounds_string(raw, x, y, w, h, scale);
    node.set_attribute("bounds", bounds_str.clone());
    node.bounds = Bounds::parse(&bounds_str);

    node.set_attribute("index", index.to_string());
    node.set_attribute(
        "clickable",
        bool_str(ios_clickable(&raw.name, &raw.attributes)),
    );
    node.set_attribute(
        "scrollable",
        bool_str(Platform::Ios.is_scrollable_type(&raw.name)),
    );

    for (child_index, child) in raw.children.iter().enumerate() {
        node.add_child(normalize_ios(child, child_index, scale));
    }
    node
}

fn bool_str(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

/// Derive the bracket-pair bounds string from WDA geometry, scaled to
/// pixel space. When x/y/width/height are unusable, fall back to numeric
/// extraction from a rect/frame/bounds attribute.
fn ios_bounds_string(raw: &RawElement, x: f64, y: f64, w: f64, h: f64, scale: f64) -> String {
    let corners = |x: f64, y: f64, w: f64, h: f64| {
        format!(
            "[{},{}][{},{}]",
            (x * scale).round() as i64,
            (y * scale).round() as i64,
            ((x + w) * scale).round() as i64,
            ((y + h) * scale).round() as i64,
        )
    };

    if w > 0.0 || h > 0.0 {
        return corners(x, y, w, h);
    }
    for key in ["rect", "frame", "bounds"] {
        if let Some(value) = raw.attribute(key) {
            let nums = extract_numbers(value);
            if nums.len() >= 4 {
                return corners(nums[0], nums[1], nums[2], nums[3]);
            }
        }
    }
    "[0,0][0,0]".to_string()
}

/// iOS clickability rule: interactive type name or an accessibility flag,
/// gated on the element being enabled.
fn ios_clickable(tag: &str, attributes: &IndexMap<String, String>) -> bool {
    let enabled = attributes
        .get("enabled")
        .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
        .unwrap_or(true);
    if !enabled {
        return false;
    }
    if Platform::Ios.is_interactive_type(tag) {
        return true;
    }
    attributes
        .get("accessible")
        .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
        .unwrap_or(false)
}

/// Pull all signed decimal numbers out of a string like `{{0, 0}, {375, 812}}`
fn extract_numbers(s: &str) -> Vec<f64> {
    let mut nums = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_digit() || (c == '-' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit()))
        {
            let start = i;
            i += 1;
            while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                i += 1;
            }
            if let Ok(n) = s[start..i].parse::<f64>() {
                nums.push(n);
            }
        } else {
            i += 1;
        }
    }
    nums
}

fn assign_paths(node: &mut Node, path: Vec<usize>) {
    node.path = path.clone();
    for (index, child) in node.children.iter_mut().enumerate() {
        let mut child_path = path.clone();
        child_path.push(index);
        assign_paths(child, child_path);
    }
}

/// Locate the screen's logical width inside a raw WDA dump.
///
/// The screen container is the outermost element at origin (0,0) whose
/// extent exceeds the minimum thresholds; the dump itself is the most
/// reliable source since it shares the coordinate origin with every
/// element. Checks the root and its immediate children.
pub fn logical_screen_width(raw: &RawElement) -> Option<i64> {
    let candidates = std::iter::once(raw).chain(raw.children.iter());
    for elem in candidates {
        let x = elem.attr_f64("x") as i64;
        let y = elem.attr_f64("y") as i64;
        let w = elem.attr_f64("width") as i64;
        let h = elem.attr_f64("height") as i64;
        if x == 0 && y == 0 && w > MIN_SCREEN_LOGICAL_W && h > MIN_SCREEN_LOGICAL_H {
            log::debug!("logical screen size from dump: {}x{}", w, h);
            return Some(w);
        }
    }
    None
}

/// Compute the pixel-per-point scale from a raw dump and the physical
/// pixel width of a matching screenshot. Returns `None` when the dump
/// has no recognizable screen container.
pub fn derive_scale(raw: &RawElement, pixel_width: u32) -> Option<f64> {
    let logical_w = logical_screen_width(raw)?;
    if logical_w <= 0 || pixel_width == 0 {
        return None;
    }
    let scale = (pixel_width as f64 / logical_w as f64 * 10_000.0).round() / 10_000.0;
    log::info!(
        "derived pixel scale {} (logical {} px {})",
        scale,
        logical_w,
        pixel_width
    );
    Some(scale)
}

/// Read the pixel width from a PNG byte stream without decoding the
/// image: a 4-byte big-endian field at a fixed header offset.
pub fn png_pixel_width(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < PNG_WIDTH_OFFSET + 4 || bytes[..8] != PNG_SIGNATURE {
        return None;
    }
    let field: [u8; 4] = bytes[PNG_WIDTH_OFFSET..PNG_WIDTH_OFFSET + 4]
        .try_into()
        .ok()?;
    let width = u32::from_be_bytes(field);
    if width > 0 { Some(width) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANDROID_DUMP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<hierarchy rotation="0">
  <node class="android.widget.FrameLayout" bounds="[0,0][1080,2400]">
    <node class="android.widget.Button" resource-id="com.app:id/ok" text="OK" clickable="true" bounds="[100,200][300,280]"/>
    <node class="android.widget.TextView" text="Hello" bounds="[0,300][1080,360]"/>
  </node>
</hierarchy>"#;

    const IOS_DUMP: &str = r#"<XCUIElementTypeApplication name="App" x="0" y="0" width="375" height="812">
  <XCUIElementTypeButton name="Done" label="Done" x="10" y="40" width="60" height="30" enabled="true"/>
  <XCUIElementTypeOther x="0" y="100" width="375" height="700"/>
</XCUIElementTypeApplication>"#;

    #[test]
    fn test_parse_raw_rejects_bad_input() {
        assert!(matches!(parse_raw(""), Err(InspectorError::EmptyInput)));
        assert!(matches!(
            parse_raw("   \n "),
            Err(InspectorError::EmptyInput)
        ));
        assert!(matches!(
            parse_raw("ERROR: device offline"),
            Err(InspectorError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_raw("<hierarchy><node></hierarchy>"),
            Err(InspectorError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_android_class_renaming() {
        let raw = parse_raw(ANDROID_DUMP).unwrap();
        let tree = normalize_tree(&raw, Platform::Android, 1.0);

        assert_eq!(tree.root.tag, "hierarchy");
        assert_eq!(tree.root.children.len(), 1);
        let frame = &tree.root.children[0];
        assert_eq!(frame.tag, "android.widget.FrameLayout");
        assert_eq!(frame.children[0].tag, "android.widget.Button");
        // Original attributes survive the rename
        assert_eq!(
            frame.children[0].attribute("resource-id"),
            Some("com.app:id/ok")
        );
        assert_eq!(
            frame.children[0].bounds,
            Some(Bounds::new(100, 200, 200, 80))
        );
    }

    #[test]
    fn test_android_paths() {
        let raw = parse_raw(ANDROID_DUMP).unwrap();
        let tree = normalize_tree(&raw, Platform::Android, 1.0);

        assert_eq!(tree.root.path, vec![0]);
        assert_eq!(tree.root.children[0].path, vec![0, 0]);
        assert_eq!(tree.root.children[0].children[1].path, vec![0, 0, 1]);
        assert_eq!(tree.total_nodes, 4);
    }

    #[test]
    fn test_normalization_idempotent() {
        let raw = parse_raw(ANDROID_DUMP).unwrap();
        let a = normalize_tree(&raw, Platform::Android, 1.0);
        let b = normalize_tree(&parse_raw(ANDROID_DUMP).unwrap(), Platform::Android, 1.0);
        assert_eq!(a.root, b.root);
        assert_eq!(a.total_nodes, b.total_nodes);
    }

    #[test]
    fn test_ios_wrapped_under_synthetic_root() {
        let raw = parse_raw(IOS_DUMP).unwrap();
        let tree = normalize_tree(&raw, Platform::Ios, 1.0);

        assert_eq!(tree.root.tag, "hierarchy");
        assert_eq!(tree.root.attribute("platform"), Some("ios"));
        assert_eq!(tree.root.children.len(), 1);
        assert_eq!(tree.root.children[0].tag, "XCUIElementTypeApplication");
    }

    #[test]
    fn test_ios_scaling_and_derived_attributes() {
        let raw = parse_raw(IOS_DUMP).unwrap();
        let tree = normalize_tree(&raw, Platform::Ios, 3.0);

        let app = &tree.root.children[0];
        assert_eq!(app.attribute("width"), Some("1125"));
        assert_eq!(app.attribute("bounds"), Some("[0,0][1125,2436]"));

        let button = &app.children[0];
        assert_eq!(button.attribute("x"), Some("30"));
        assert_eq!(button.attribute("index"), Some("0"));
        assert_eq!(button.attribute("clickable"), Some("true"));
        assert_eq!(button.attribute("scrollable"), Some("false"));
        assert_eq!(button.bounds, Some(Bounds::new(30, 120, 180, 90)));

        let other = &app.children[1];
        assert_eq!(other.attribute("clickable"), Some("false"));
        assert_eq!(other.attribute("index"), Some("1"));
    }

    #[test]
    fn test_ios_disabled_is_not_clickable() {
        let xml = r#"<XCUIElementTypeButton name="x" x="0" y="0" width="10" height="10" enabled="false"/>"#;
        let raw = parse_raw(xml).unwrap();
        let tree = normalize_tree(&raw, Platform::Ios, 1.0);
        assert_eq!(tree.root.children[0].attribute("clickable"), Some("false"));
    }

    #[test]
    fn test_ios_rect_fallback_bounds() {
        let xml = r#"<XCUIElementTypeOther rect="{{5, 10}, {20, 40}}"/>"#;
        let raw = parse_raw(xml).unwrap();
        let tree = normalize_tree(&raw, Platform::Ios, 2.0);
        assert_eq!(
            tree.root.children[0].attribute("bounds"),
            Some("[10,20][50,100]")
        );
    }

    #[test]
    fn test_scale_derivation() {
        let raw = parse_raw(IOS_DUMP).unwrap();
        assert_eq!(derive_scale(&raw, 1125), Some(3.0));
        // Too-small container is not mistaken for the screen
        let small = parse_raw(r#"<a x="0" y="0" width="50" height="50"/>"#).unwrap();
        assert_eq!(derive_scale(&small, 1125), None);
    }

    #[test]
    fn test_scale_scenario_child_coordinates() {
        // logical width 375, pixel width 1125 => scale 3.0, so a child
        // at logical x=10 lands at pixel x=30
        let raw = parse_raw(IOS_DUMP).unwrap();
        let scale = derive_scale(&raw, 1125).unwrap();
        let tree = normalize_tree(&raw, Platform::Ios, scale);
        assert_eq!(tree.root.children[0].children[0].attribute("x"), Some("30"));
    }

    #[test]
    fn test_png_pixel_width() {
        let mut png = Vec::new();
        png.extend_from_slice(&PNG_SIGNATURE);
        png.extend_from_slice(&13u32.to_be_bytes()); // IHDR length
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&1125u32.to_be_bytes()); // width
        png.extend_from_slice(&2436u32.to_be_bytes()); // height
        assert_eq!(png_pixel_width(&png), Some(1125));

        assert_eq!(png_pixel_width(b"not a png"), None);
        assert_eq!(png_pixel_width(&[]), None);
    }

    #[test]
    fn test_extract_numbers() {
        assert_eq!(
            extract_numbers("{{0, 0}, {375, 812}}"),
            vec![0.0, 0.0, 375.0, 812.0]
        );
        assert_eq!(extract_numbers("{{-5.5, 1}, {2, 3}}")[0], -5.5);
    }
}
