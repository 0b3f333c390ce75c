//! Shortest-unique-XPath synthesis.
//!
//! Searches outward from the element for the shortest expression that
//! matches it and nothing else: own attributes first, then descendant /
//! sibling / parent / uncle / cousin anchors, widening one ancestor
//! level per pass, with a structural `/hierarchy/Type[n]/...` path as
//! the last resort. Every candidate is verified against the tree before
//! it is returned.

use crate::hierarchy::Platform;
use crate::xpath::{self, Arena, select_elements};

/// Quote a string literal for use inside an XPath expression.
/// Falls back to `concat()` when the value mixes both quote kinds.
pub fn xpath_escape(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let joined = value
        .split('\'')
        .map(|p| format!("'{p}'"))
        .collect::<Vec<_>>()
        .join(", \"'\", ");
    format!("concat({joined})")
}

/// Identifying attributes of an element, in platform priority order,
/// skipping blank values
fn id_attrs(arena: &Arena, idx: usize, platform: Platform) -> Vec<(String, String)> {
    let Some(node) = arena.node(idx) else {
        return Vec::new();
    };
    platform
        .identifying_attributes()
        .iter()
        .filter_map(|&key| {
            node.attribute(key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key.to_string(), v.to_string()))
        })
        .collect()
}

struct Search<'x, 'a> {
    arena: &'x Arena<'a>,
    node: usize,
    tag: String,
    node_id: Vec<(String, String)>,
    platform: Platform,
}

impl Search<'_, '_> {
    /// True when `expr` matches exactly our element and nothing else
    fn unique_for_node(&self, expr: &str) -> bool {
        self.matches_exactly(expr, self.node)
    }

    fn matches_exactly(&self, expr: &str, target: usize) -> bool {
        let parsed = match xpath::parse(expr) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("candidate locator rejected: {e}");
                return false;
            }
        };
        match select_elements(self.arena, &parsed) {
            Ok(m) => m.len() == 1 && m[0] == target,
            Err(e) => {
                log::debug!("candidate locator rejected: {e}");
                false
            }
        }
    }

    /// `//tag[@attr=val]` for `idx`, only if it is unique in the tree
    fn unique_ref(&self, idx: usize) -> Option<String> {
        let elem = self.arena.node(idx)?;
        for (k, v) in id_attrs(self.arena, idx, self.platform) {
            let expr = format!("//{}[@{k}={}]", elem.tag, xpath_escape(&v));
            if self.matches_exactly(&expr, idx) {
                return Some(expr);
            }
        }
        None
    }

    /// Axis and 1-based position to navigate from `anchor` to its
    /// sibling `target`, counting only siblings with the target's tag
    fn sibling_axis(&self, target: usize, anchor: usize) -> Option<(&'static str, usize)> {
        let parent = self.arena.parent(anchor)?;
        let sibs = self.arena.children(parent);
        let a_pos = sibs.iter().position(|&s| s == anchor)?;
        let t_pos = sibs.iter().position(|&s| s == target)?;
        let t_tag = &self.arena.node(target)?.tag;
        let same_tag = |&&s: &&usize| {
            self.arena.node(s).map(|n| &n.tag == t_tag).unwrap_or(false)
        };
        if a_pos < t_pos {
            let count = sibs[a_pos + 1..=t_pos].iter().filter(same_tag).count();
            Some(("following-sibling", count))
        } else {
            let count = sibs[t_pos..a_pos].iter().filter(same_tag).count();
            Some(("preceding-sibling", count))
        }
    }

    /// Navigate from a uniquely-identified anchor expression down to
    /// our element: attribute qualifier, then tag-only, then positional
    fn qualify_under(&self, anchor_expr: &str, anchor: usize) -> Option<String> {
        for (k, v) in &self.node_id {
            let expr = format!("{anchor_expr}//{}[@{k}={}]", self.tag, xpath_escape(v));
            if self.unique_for_node(&expr) {
                return Some(expr);
            }
        }
        let expr = format!("{anchor_expr}//{}", self.tag);
        if self.unique_for_node(&expr) {
            return Some(expr);
        }
        let desc: Vec<usize> = self
            .arena
            .descendants(anchor)
            .into_iter()
            .filter(|&d| {
                self.arena
                    .node(d)
                    .map(|n| n.tag == self.tag)
                    .unwrap_or(false)
            })
            .collect();
        if let Some(pos) = desc.iter().position(|&d| d == self.node) {
            let expr = format!("({anchor_expr}//{})[{}]", self.tag, pos + 1);
            if self.unique_for_node(&expr) {
                return Some(expr);
            }
        }
        None
    }
}

/// Shortest XPath uniquely identifying the element at arena index
/// `node` (index 1 is the hierarchy root)
pub fn unique_xpath(arena: &Arena, node: usize, platform: Platform) -> String {
    let Some(elem) = arena.node(node) else {
        return String::new();
    };
    let search = Search {
        arena,
        node,
        tag: elem.tag.clone(),
        node_id: id_attrs(arena, node, platform),
        platform,
    };

    // Strategy 1a: //tag[@attr=val]
    for (k, v) in &search.node_id {
        let expr = format!("//{}[@{k}={}]", search.tag, xpath_escape(v));
        if search.unique_for_node(&expr) {
            return expr;
        }
    }
    // Strategy 1b: //*[@attr=val]
    for (k, v) in &search.node_id {
        let expr = format!("//*[@{k}={}]", xpath_escape(v));
        if search.unique_for_node(&expr) {
            return expr;
        }
    }
    // Strategy 1c: //tag[@a1=v1][@a2=v2]
    for i in 0..search.node_id.len() {
        for j in i + 1..search.node_id.len() {
            let (k1, v1) = &search.node_id[i];
            let (k2, v2) = &search.node_id[j];
            let expr = format!(
                "//{}[@{k1}={}][@{k2}={}]",
                search.tag,
                xpath_escape(v1),
                xpath_escape(v2)
            );
            if search.unique_for_node(&expr) {
                return expr;
            }
        }
    }

    // Strategies 2-6: anchor on a nearby element with unique attributes,
    // widening the context one ancestor per pass
    let mut target = node;
    for _ in 0..8 {
        let Some(parent) = arena.parent(target) else {
            break;
        };
        // stop once the context reaches the hierarchy root
        if parent <= 1 {
            break;
        }
        let target_tag = arena.node(target).map(|n| n.tag.clone()).unwrap_or_default();
        let siblings: Vec<usize> = arena.children(parent).to_vec();

        // Strategy 2: a descendant of target has unique attributes
        for desc in arena.descendants(target) {
            let desc_tag = match arena.node(desc) {
                Some(n) => n.tag.clone(),
                None => continue,
            };
            for (k, v) in id_attrs(arena, desc, platform) {
                let esc = xpath_escape(&v);
                let expr = format!("//{target_tag}[.//{desc_tag}[@{k}={esc}]]");
                if search.unique_for_node(&expr) {
                    return expr;
                }
                if target != node {
                    if let Some(result) = search.qualify_under(&expr, target) {
                        return result;
                    }
                }
                let expr_w = format!("//{target_tag}[.//*[@{k}={esc}]]");
                if search.unique_for_node(&expr_w) {
                    return expr_w;
                }
                if target != node {
                    if let Some(result) = search.qualify_under(&expr_w, target) {
                        return result;
                    }
                }
            }
        }

        // Strategy 3: a sibling of target has unique attributes
        for &sib in &siblings {
            if sib == target {
                continue;
            }
            let Some(sib_ref) = search.unique_ref(sib) else {
                continue;
            };
            if let Some((axis, count)) = search.sibling_axis(target, sib) {
                if count > 0 {
                    let expr = format!("{sib_ref}/{axis}::{target_tag}[{count}]");
                    if search.unique_for_node(&expr) {
                        return expr;
                    }
                    if target != node {
                        if let Some(result) = search.qualify_under(&expr, target) {
                            return result;
                        }
                    }
                }
            }
        }

        // Strategy 4: the parent has unique attributes
        if let Some(parent_ref) = search.unique_ref(parent) {
            if let Some(result) = search.qualify_under(&parent_ref, parent) {
                return result;
            }
        }

        // Strategy 5: an uncle (parent's sibling) has unique attributes
        if let Some(grandparent) = arena.parent(parent) {
            if grandparent > 1 {
                let parent_tag = arena
                    .node(parent)
                    .map(|n| n.tag.clone())
                    .unwrap_or_default();
                for &uncle in arena.children(grandparent) {
                    if uncle == parent {
                        continue;
                    }
                    let Some(uncle_ref) = search.unique_ref(uncle) else {
                        continue;
                    };
                    let Some((axis, count)) = search.sibling_axis(parent, uncle) else {
                        continue;
                    };
                    if count == 0 {
                        continue;
                    }
                    let parent_nav = format!("{uncle_ref}/{axis}::{parent_tag}[{count}]");
                    if let Some(result) = search.qualify_under(&parent_nav, parent) {
                        return result;
                    }
                }
            }
        }

        // Strategy 6: a cousin (sibling's child) has unique attributes
        for &sib in &siblings {
            if sib == target {
                continue;
            }
            let sib_tag = match arena.node(sib) {
                Some(n) => n.tag.clone(),
                None => continue,
            };
            for &cousin in arena.children(sib) {
                let Some(cousin_ref) = search.unique_ref(cousin) else {
                    continue;
                };
                let Some((axis, count)) = search.sibling_axis(target, sib) else {
                    continue;
                };
                if count == 0 {
                    continue;
                }
                let expr =
                    format!("{cousin_ref}/parent::{sib_tag}/{axis}::{target_tag}[{count}]");
                if search.unique_for_node(&expr) {
                    return expr;
                }
                if target != node {
                    if let Some(result) = search.qualify_under(&expr, target) {
                        return result;
                    }
                }
            }
        }

        target = parent;
    }

    // Strategy 7: structural fallback /hierarchy/Type[1]/Type[2]/...
    let mut path_parts: Vec<String> = Vec::new();
    let mut current = node;
    while current > 1 {
        let Some(par) = arena.parent(current) else {
            break;
        };
        let resolved_type = |idx: usize| -> String {
            let n = arena.node(idx);
            n.and_then(|n| n.attribute("class"))
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .or_else(|| n.map(|n| n.tag.clone()))
                .unwrap_or_default()
        };
        let t = resolved_type(current);
        let same: Vec<usize> = arena
            .children(par)
            .iter()
            .copied()
            .filter(|&c| resolved_type(c) == t)
            .collect();
        let idx = same.iter().position(|&c| c == current).map(|p| p + 1).unwrap_or(1);
        path_parts.insert(0, format!("{t}[{idx}]"));
        current = par;
    }
    if !path_parts.is_empty() {
        return format!("/hierarchy/{}", path_parts.join("/"));
    }
    format!("//{}", search.tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Node;
    use crate::xpath::Arena;

    fn button(text: &str) -> Node {
        let mut n = Node::new("android.widget.Button");
        n.set_attribute("text", text);
        n
    }

    fn arena_for(root: &Node) -> Arena<'_> {
        Arena::build(root)
    }

    #[test]
    fn test_escape_plain_and_quoted() {
        assert_eq!(xpath_escape("hello"), "'hello'");
        assert_eq!(xpath_escape("it's"), "\"it's\"");
        assert_eq!(
            xpath_escape("it's a \"test\""),
            "concat('it', \"'\", 's a \"test\"')"
        );
    }

    #[test]
    fn test_own_attribute_wins() {
        let mut root = Node::new("hierarchy");
        let mut layout = Node::new("android.widget.FrameLayout");
        layout.add_child(button("OK"));
        layout.add_child(button("Cancel"));
        root.add_child(layout);

        let arena = arena_for(&root);
        let target = arena.index_by_path(&[0, 0, 0]).unwrap();
        let expr = unique_xpath(&arena, target, Platform::Android);
        assert_eq!(expr, "//android.widget.Button[@text='OK']");
    }

    #[test]
    fn test_ambiguous_text_skipped_for_unique_id() {
        // two buttons share the text, but resource-id is unique
        let mut root = Node::new("hierarchy");
        let mut layout = Node::new("android.widget.FrameLayout");
        let mut a = Node::new("android.widget.Button");
        a.set_attribute("text", "Go");
        a.set_attribute("resource-id", "com.app:id/go");
        let mut b = Node::new("android.widget.Button");
        b.set_attribute("text", "Go");
        layout.add_child(a);
        layout.add_child(b);
        root.add_child(layout);

        let arena = arena_for(&root);
        let target = arena.index_by_path(&[0, 0, 0]).unwrap();
        let expr = unique_xpath(&arena, target, Platform::Android);
        assert_eq!(
            expr,
            "//android.widget.Button[@resource-id='com.app:id/go']"
        );
    }

    #[test]
    fn test_descendant_anchor() {
        // bare container is only identifiable through a labeled child
        let mut root = Node::new("hierarchy");
        let mut list = Node::new("android.widget.ListView");
        let mut row_a = Node::new("android.widget.LinearLayout");
        let mut inner_a = Node::new("android.widget.TextView");
        inner_a.set_attribute("text", "Settings");
        row_a.add_child(inner_a);
        let mut row_b = Node::new("android.widget.LinearLayout");
        let mut inner_b = Node::new("android.widget.TextView");
        inner_b.set_attribute("text", "About");
        row_b.add_child(inner_b);
        list.add_child(row_a);
        list.add_child(row_b);
        root.add_child(list);

        let arena = arena_for(&root);
        let target = arena.index_by_path(&[0, 0, 0]).unwrap();
        let expr = unique_xpath(&arena, target, Platform::Android);
        assert_eq!(
            expr,
            "//android.widget.LinearLayout[.//android.widget.TextView[@text='Settings']]"
        );
        // verify the expression actually resolves back to the element
        let parsed = crate::xpath::parse(&expr).unwrap();
        let matches = crate::xpath::select_elements(&arena, &parsed).unwrap();
        assert_eq!(matches, vec![target]);
    }

    #[test]
    fn test_sibling_anchor() {
        let mut root = Node::new("hierarchy");
        let mut layout = Node::new("android.widget.LinearLayout");
        let mut label = Node::new("android.widget.TextView");
        label.set_attribute("text", "Username");
        layout.add_child(label);
        layout.add_child(Node::new("android.widget.EditText"));
        root.add_child(layout);

        // a second EditText elsewhere keeps the bare tag ambiguous
        let mut other = Node::new("android.widget.LinearLayout");
        other.add_child(Node::new("android.widget.EditText"));
        root.add_child(other);

        let arena = arena_for(&root);
        let target = arena.index_by_path(&[0, 0, 1]).unwrap();
        let expr = unique_xpath(&arena, target, Platform::Android);
        assert_eq!(
            expr,
            "//android.widget.TextView[@text='Username']/following-sibling::android.widget.EditText[1]"
        );
        let parsed = crate::xpath::parse(&expr).unwrap();
        let matches = crate::xpath::select_elements(&arena, &parsed).unwrap();
        assert_eq!(matches, vec![target]);
    }

    #[test]
    fn test_structural_fallback() {
        // nothing anywhere has identifying attributes
        let mut root = Node::new("hierarchy");
        let mut layout = Node::new("android.widget.FrameLayout");
        layout.add_child(Node::new("android.view.View"));
        layout.add_child(Node::new("android.view.View"));
        root.add_child(layout);

        let arena = arena_for(&root);
        let target = arena.index_by_path(&[0, 0, 1]).unwrap();
        let expr = unique_xpath(&arena, target, Platform::Android);
        assert_eq!(
            expr,
            "/hierarchy/android.widget.FrameLayout[1]/android.view.View[2]"
        );
        let parsed = crate::xpath::parse(&expr).unwrap();
        let matches = crate::xpath::select_elements(&arena, &parsed).unwrap();
        assert_eq!(matches, vec![target]);
    }

    #[test]
    fn test_root_element_falls_back_to_tag() {
        let root = Node::new("hierarchy");
        let arena = arena_for(&root);
        let expr = unique_xpath(&arena, 1, Platform::Android);
        assert_eq!(expr, "//hierarchy");
    }

    #[test]
    fn test_ios_attribute_priority() {
        let mut root = Node::new("hierarchy");
        let mut app = Node::new("XCUIElementTypeApplication");
        let mut btn = Node::new("XCUIElementTypeButton");
        btn.set_attribute("name", "login");
        btn.set_attribute("label", "Log in");
        app.add_child(btn);
        root.add_child(app);

        let arena = arena_for(&root);
        let target = arena.index_by_path(&[0, 0, 0]).unwrap();
        let expr = unique_xpath(&arena, target, Platform::Ios);
        assert_eq!(expr, "//XCUIElementTypeButton[@name='login']");
    }
}
