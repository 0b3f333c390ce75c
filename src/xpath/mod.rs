//! A small XPath 1.0 engine for querying normalized UI hierarchies.
//!
//! Covers the subset the locator strategies emit: absolute and relative
//! location paths, the child / descendant / parent / ancestor / sibling /
//! attribute axes, positional and boolean predicates, parenthesized
//! node sets with trailing predicates, and the core function library
//! (`position`, `last`, `count`, `not`, `contains`, `starts-with`,
//! `normalize-space`, `concat`, ...).

pub mod eval;
pub mod lexer;
pub mod parser;

pub use eval::{Arena, XNode, XValue, evaluate, select_elements};
pub use parser::{Axis, Expr, NodeTest, Step};

use crate::error::{InspectorError, Result};
use crate::hierarchy::Node;

/// Parse an XPath expression, mapping syntax errors to
/// [`InspectorError::InvalidExpression`]
pub fn parse(expr: &str) -> Result<Expr> {
    parser::parse(expr).map_err(|e| InspectorError::InvalidExpression(format!("{expr}: {e}")))
}

/// Run an XPath expression against a hierarchy and return the matching
/// elements in document order
pub fn query<'a>(root: &'a Node, expr: &str) -> Result<Vec<&'a Node>> {
    let parsed = parse(expr)?;
    let arena = Arena::build(root);
    let indices = select_elements(&arena, &parsed)
        .map_err(|e| InspectorError::InvalidExpression(format!("{expr}: {e}")))?;
    Ok(indices
        .into_iter()
        .filter_map(|i| arena.node(i))
        .collect())
}
