//! Coordinate hit-testing over a normalized hierarchy.
//!
//! Collects every element whose computed bounds contain the point, then
//! picks the best candidate: invisible elements lose to visible ones
//! when both kinds match, clickable elements win over plain containers,
//! and ties break to the deepest element with the smallest area.

use crate::hierarchy::Node;

/// Outcome of a hit test. Counts reflect the candidate set after the
/// visibility filter.
#[derive(Debug)]
pub struct HitResult<'a> {
    pub node: &'a Node,
    pub total_matches: usize,
    pub clickable_matches: usize,
}

struct Candidate<'a> {
    node: &'a Node,
    depth: usize,
    area: i64,
    clickable: bool,
}

/// Find the best element at `(x, y)`, or `None` when nothing contains
/// the point
pub fn find_at(root: &Node, x: i64, y: i64) -> Option<HitResult<'_>> {
    let mut all: Vec<Candidate<'_>> = Vec::new();
    collect(root, x, y, 0, &mut all);
    if all.is_empty() {
        return None;
    }

    // Invisible elements are dropped only when visible ones also match;
    // a uniformly invisible stack is kept as-is.
    let any_visible = all.iter().any(|c| !c.node.is_invisible());
    let any_invisible = all.iter().any(|c| c.node.is_invisible());
    if any_visible && any_invisible {
        all.retain(|c| !c.node.is_invisible());
    }

    let total_matches = all.len();
    let clickable_matches = all.iter().filter(|c| c.clickable).count();

    let sort_key = |c: &Candidate<'_>| (std::cmp::Reverse(c.depth), c.area);
    let best = if clickable_matches > 0 {
        all.iter()
            .filter(|c| c.clickable)
            .min_by_key(|c| sort_key(c))?
    } else {
        all.iter().min_by_key(|c| sort_key(c))?
    };
    log::debug!(
        "hit ({x}, {y}): {} at depth {} of {} matches",
        best.node.tag,
        best.depth,
        total_matches
    );

    Some(HitResult {
        node: best.node,
        total_matches,
        clickable_matches,
    })
}

fn collect<'a>(node: &'a Node, x: i64, y: i64, depth: usize, out: &mut Vec<Candidate<'a>>) {
    // Elements without computed bounds are transparent to the hit test
    // but their subtree still participates.
    let Some(bounds) = node.bounds else {
        for child in &node.children {
            collect(child, x, y, depth + 1, out);
        }
        return;
    };
    if !bounds.contains(x, y) {
        return;
    }
    out.push(Candidate {
        node,
        depth,
        area: bounds.area(),
        clickable: node.is_clickable(),
    });
    for child in &node.children {
        collect(child, x, y, depth + 1, out);
    }
}
