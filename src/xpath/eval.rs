use crate::hierarchy::Node;
use crate::xpath::parser::{Axis, Expr, NodeTest, Op, Step};

/// Flat index over a hierarchy tree. Index 0 is a virtual document root
/// whose only child is the real root element at index 1, so that absolute
/// paths like `/hierarchy/...` resolve the same way a full XPath
/// implementation would resolve them.
pub struct Arena<'a> {
    nodes: Vec<ArenaNode<'a>>,
}

struct ArenaNode<'a> {
    node: Option<&'a Node>,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl<'a> Arena<'a> {
    pub fn build(root: &'a Node) -> Arena<'a> {
        let mut arena = Arena {
            nodes: vec![ArenaNode {
                node: None,
                parent: None,
                children: Vec::new(),
            }],
        };
        let root_idx = arena.insert(root, 0);
        arena.nodes[0].children.push(root_idx);
        arena
    }

    fn insert(&mut self, node: &'a Node, parent: usize) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(ArenaNode {
            node: Some(node),
            parent: Some(parent),
            children: Vec::new(),
        });
        for child in &node.children {
            let child_idx = self.insert(child, idx);
            self.nodes[idx].children.push(child_idx);
        }
        idx
    }

    /// The element behind an arena index. Index 0 has no element.
    pub fn node(&self, idx: usize) -> Option<&'a Node> {
        self.nodes[idx].node
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.nodes[idx].parent
    }

    pub fn children(&self, idx: usize) -> &[usize] {
        &self.nodes[idx].children
    }

    /// Arena index of the element at a hierarchy path ([0], [0, 2], ...)
    pub fn index_by_path(&self, path: &[usize]) -> Option<usize> {
        if path.is_empty() {
            return None;
        }
        let mut cur = 1;
        for &child_pos in &path[1..] {
            cur = *self.nodes[cur].children.get(child_pos)?;
        }
        Some(cur)
    }

    /// Pre-order descendants of `idx`, not including `idx` itself
    pub fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[idx].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(i);
            for &c in self.nodes[i].children.iter().rev() {
                stack.push(c);
            }
        }
        out
    }

    fn tag(&self, idx: usize) -> &str {
        self.nodes[idx].node.map(|n| n.tag.as_str()).unwrap_or("")
    }

    fn attribute(&self, idx: usize, name: &str) -> Option<&str> {
        self.nodes[idx].node.and_then(|n| n.attribute(name))
    }
}

/// A node in evaluation: an element, or an attribute of one
#[derive(Debug, Clone, PartialEq)]
pub enum XNode {
    Elem(usize),
    Attr(usize, String),
}

/// An XPath value
#[derive(Debug, Clone)]
pub enum XValue {
    Nodes(Vec<XNode>),
    Str(String),
    Num(f64),
    Bool(bool),
}

impl XValue {
    fn boolean(&self) -> bool {
        match self {
            XValue::Nodes(ns) => !ns.is_empty(),
            XValue::Str(s) => !s.is_empty(),
            XValue::Num(n) => *n != 0.0 && !n.is_nan(),
            XValue::Bool(b) => *b,
        }
    }

    fn number(&self, arena: &Arena) -> f64 {
        match self {
            XValue::Num(n) => *n,
            XValue::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            XValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XValue::Nodes(ns) => match ns.first() {
                Some(n) => string_value(arena, n).trim().parse().unwrap_or(f64::NAN),
                None => f64::NAN,
            },
        }
    }

    fn string(&self, arena: &Arena) -> String {
        match self {
            XValue::Str(s) => s.clone(),
            XValue::Num(n) => format_number(*n),
            XValue::Bool(b) => b.to_string(),
            XValue::Nodes(ns) => ns
                .first()
                .map(|n| string_value(arena, n))
                .unwrap_or_default(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// String-value of a node. Elements have no text content in a UI
/// hierarchy dump, so only attribute nodes carry a value.
fn string_value(arena: &Arena, node: &XNode) -> String {
    match node {
        XNode::Elem(_) => String::new(),
        XNode::Attr(idx, name) => arena.attribute(*idx, name).unwrap_or_default().to_string(),
    }
}

/// Evaluate an expression with the virtual document root as context
pub fn evaluate(arena: &Arena, expr: &Expr) -> Result<XValue, String> {
    eval_expr(arena, expr, &XNode::Elem(0), 1, 1)
}

/// Evaluate and keep only element results, as arena indices in
/// document order
pub fn select_elements(arena: &Arena, expr: &Expr) -> Result<Vec<usize>, String> {
    match evaluate(arena, expr)? {
        XValue::Nodes(ns) => {
            let mut out: Vec<usize> = ns
                .into_iter()
                .filter_map(|n| match n {
                    XNode::Elem(i) if i != 0 => Some(i),
                    _ => None,
                })
                .collect();
            out.sort_unstable();
            out.dedup();
            Ok(out)
        }
        _ => Err("expression does not select nodes".to_string()),
    }
}

fn eval_expr(
    arena: &Arena,
    expr: &Expr,
    ctx: &XNode,
    pos: usize,
    size: usize,
) -> Result<XValue, String> {
    match expr {
        Expr::Lit(s) => Ok(XValue::Str(s.clone())),
        Expr::Num(n) => Ok(XValue::Num(*n)),
        Expr::Path { absolute, steps } => {
            let start = if *absolute { XNode::Elem(0) } else { ctx.clone() };
            let nodes = eval_steps(arena, &[start], steps)?;
            Ok(XValue::Nodes(nodes))
        }
        Expr::Filter { primary, preds } => {
            let value = eval_expr(arena, primary, ctx, pos, size)?;
            let XValue::Nodes(mut nodes) = value else {
                return Err("predicate applied to a non-node-set".to_string());
            };
            for pred in preds {
                nodes = apply_predicate(arena, nodes, pred)?;
            }
            Ok(XValue::Nodes(nodes))
        }
        Expr::BinOp { op, left, right } => {
            eval_binop(arena, *op, left, right, ctx, pos, size)
        }
        Expr::FnCall { name, args } => eval_function(arena, name, args, ctx, pos, size),
    }
}

fn eval_steps(arena: &Arena, start: &[XNode], steps: &[Step]) -> Result<Vec<XNode>, String> {
    let mut current: Vec<XNode> = start.to_vec();
    for step in steps {
        let mut next: Vec<XNode> = Vec::new();
        for ctx in &current {
            let mut candidates = collect_axis(arena, ctx, step.axis);
            candidates.retain(|c| matches_test(arena, c, &step.test));
            for pred in &step.preds {
                candidates = apply_predicate(arena, candidates, pred)?;
            }
            for c in candidates {
                if !next.contains(&c) {
                    next.push(c);
                }
            }
        }
        current = next;
    }
    Ok(current)
}

fn apply_predicate(
    arena: &Arena,
    nodes: Vec<XNode>,
    pred: &Expr,
) -> Result<Vec<XNode>, String> {
    let size = nodes.len();
    let mut kept = Vec::new();
    for (i, node) in nodes.into_iter().enumerate() {
        let pos = i + 1;
        let value = eval_expr(arena, pred, &node, pos, size)?;
        let keep = match value {
            // bare numeric predicate selects by position
            XValue::Num(n) => n == pos as f64,
            other => other.boolean(),
        };
        if keep {
            kept.push(node);
        }
    }
    Ok(kept)
}

fn collect_axis(arena: &Arena, ctx: &XNode, axis: Axis) -> Vec<XNode> {
    let XNode::Elem(idx) = ctx else {
        // attribute nodes only support the self axis
        return match axis {
            Axis::SelfAxis => vec![ctx.clone()],
            _ => Vec::new(),
        };
    };
    let idx = *idx;
    match axis {
        Axis::Child => arena.children(idx).iter().map(|&c| XNode::Elem(c)).collect(),
        Axis::Descendant => arena
            .descendants(idx)
            .into_iter()
            .map(XNode::Elem)
            .collect(),
        Axis::DescendantOrSelf => {
            let mut out = vec![XNode::Elem(idx)];
            out.extend(arena.descendants(idx).into_iter().map(XNode::Elem));
            out
        }
        Axis::Parent => arena.parent(idx).map(XNode::Elem).into_iter().collect(),
        Axis::Ancestor => {
            let mut out = Vec::new();
            let mut cur = arena.parent(idx);
            while let Some(p) = cur {
                out.push(XNode::Elem(p));
                cur = arena.parent(p);
            }
            out
        }
        Axis::AncestorOrSelf => {
            let mut out = vec![XNode::Elem(idx)];
            let mut cur = arena.parent(idx);
            while let Some(p) = cur {
                out.push(XNode::Elem(p));
                cur = arena.parent(p);
            }
            out
        }
        Axis::FollowingSibling => siblings_after(arena, idx, true),
        Axis::PrecedingSibling => siblings_after(arena, idx, false),
        Axis::SelfAxis => vec![XNode::Elem(idx)],
        Axis::Attribute => match arena.node(idx) {
            Some(node) => node
                .attributes
                .keys()
                .map(|k| XNode::Attr(idx, k.clone()))
                .collect(),
            None => Vec::new(),
        },
    }
}

fn siblings_after(arena: &Arena, idx: usize, following: bool) -> Vec<XNode> {
    let Some(parent) = arena.parent(idx) else {
        return Vec::new();
    };
    let siblings = arena.children(parent);
    let Some(my_pos) = siblings.iter().position(|&s| s == idx) else {
        return Vec::new();
    };
    if following {
        siblings[my_pos + 1..].iter().map(|&s| XNode::Elem(s)).collect()
    } else {
        // preceding-sibling is a reverse axis: nearest sibling first
        siblings[..my_pos]
            .iter()
            .rev()
            .map(|&s| XNode::Elem(s))
            .collect()
    }
}

fn matches_test(arena: &Arena, node: &XNode, test: &NodeTest) -> bool {
    match node {
        XNode::Elem(0) => matches!(test, NodeTest::AnyNode),
        XNode::Elem(idx) => match test {
            NodeTest::AnyNode => true,
            NodeTest::Wildcard => true,
            NodeTest::Name(name) => arena.tag(*idx) == name,
        },
        XNode::Attr(_, attr_name) => match test {
            NodeTest::AnyNode => true,
            NodeTest::Wildcard => true,
            NodeTest::Name(name) => attr_name == name,
        },
    }
}

fn eval_binop(
    arena: &Arena,
    op: Op,
    left: &Expr,
    right: &Expr,
    ctx: &XNode,
    pos: usize,
    size: usize,
) -> Result<XValue, String> {
    if op == Op::And {
        let l = eval_expr(arena, left, ctx, pos, size)?;
        if !l.boolean() {
            return Ok(XValue::Bool(false));
        }
        let r = eval_expr(arena, right, ctx, pos, size)?;
        return Ok(XValue::Bool(r.boolean()));
    }
    if op == Op::Or {
        let l = eval_expr(arena, left, ctx, pos, size)?;
        if l.boolean() {
            return Ok(XValue::Bool(true));
        }
        let r = eval_expr(arena, right, ctx, pos, size)?;
        return Ok(XValue::Bool(r.boolean()));
    }

    let l = eval_expr(arena, left, ctx, pos, size)?;
    let r = eval_expr(arena, right, ctx, pos, size)?;
    Ok(XValue::Bool(compare(arena, op, &l, &r)))
}

/// XPath comparison: a node set compares true when any member does
fn compare(arena: &Arena, op: Op, l: &XValue, r: &XValue) -> bool {
    match (l, r) {
        (XValue::Nodes(ls), XValue::Nodes(rs)) => ls.iter().any(|ln| {
            let lv = string_value(arena, ln);
            rs.iter()
                .any(|rn| compare_strings(op, &lv, &string_value(arena, rn)))
        }),
        (XValue::Nodes(ls), _) => ls.iter().any(|ln| {
            compare_scalar(arena, op, &XValue::Str(string_value(arena, ln)), r)
        }),
        (_, XValue::Nodes(rs)) => rs.iter().any(|rn| {
            compare_scalar(arena, op, l, &XValue::Str(string_value(arena, rn)))
        }),
        _ => compare_scalar(arena, op, l, r),
    }
}

fn compare_scalar(arena: &Arena, op: Op, l: &XValue, r: &XValue) -> bool {
    match op {
        Op::Eq | Op::Ne => {
            let eq = match (l, r) {
                (XValue::Bool(_), _) | (_, XValue::Bool(_)) => l.boolean() == r.boolean(),
                (XValue::Num(_), _) | (_, XValue::Num(_)) => l.number(arena) == r.number(arena),
                _ => l.string(arena) == r.string(arena),
            };
            if op == Op::Eq { eq } else { !eq }
        }
        Op::Lt => l.number(arena) < r.number(arena),
        Op::Gt => l.number(arena) > r.number(arena),
        Op::Le => l.number(arena) <= r.number(arena),
        Op::Ge => l.number(arena) >= r.number(arena),
        Op::And | Op::Or => false,
    }
}

fn compare_strings(op: Op, l: &str, r: &str) -> bool {
    match op {
        Op::Eq => l == r,
        Op::Ne => l != r,
        Op::Lt => num_of(l) < num_of(r),
        Op::Gt => num_of(l) > num_of(r),
        Op::Le => num_of(l) <= num_of(r),
        Op::Ge => num_of(l) >= num_of(r),
        Op::And | Op::Or => false,
    }
}

fn num_of(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

fn eval_function(
    arena: &Arena,
    name: &str,
    args: &[Expr],
    ctx: &XNode,
    pos: usize,
    size: usize,
) -> Result<XValue, String> {
    let arg = |i: usize| -> Result<XValue, String> {
        let expr = args
            .get(i)
            .ok_or_else(|| format!("{name}() missing argument {}", i + 1))?;
        eval_expr(arena, expr, ctx, pos, size)
    };
    match name {
        "position" => Ok(XValue::Num(pos as f64)),
        "last" => Ok(XValue::Num(size as f64)),
        "count" => match arg(0)? {
            XValue::Nodes(ns) => Ok(XValue::Num(ns.len() as f64)),
            _ => Err("count() requires a node set".to_string()),
        },
        "not" => Ok(XValue::Bool(!arg(0)?.boolean())),
        "boolean" => Ok(XValue::Bool(arg(0)?.boolean())),
        "true" => Ok(XValue::Bool(true)),
        "false" => Ok(XValue::Bool(false)),
        "number" => {
            let v = if args.is_empty() {
                XValue::Nodes(vec![ctx.clone()])
            } else {
                arg(0)?
            };
            Ok(XValue::Num(v.number(arena)))
        }
        "string" => {
            let v = if args.is_empty() {
                XValue::Nodes(vec![ctx.clone()])
            } else {
                arg(0)?
            };
            Ok(XValue::Str(v.string(arena)))
        }
        "contains" => {
            let haystack = arg(0)?.string(arena);
            let needle = arg(1)?.string(arena);
            Ok(XValue::Bool(haystack.contains(&needle)))
        }
        "starts-with" => {
            let s = arg(0)?.string(arena);
            let prefix = arg(1)?.string(arena);
            Ok(XValue::Bool(s.starts_with(&prefix)))
        }
        "string-length" => {
            let s = if args.is_empty() {
                string_value(arena, ctx)
            } else {
                arg(0)?.string(arena)
            };
            Ok(XValue::Num(s.chars().count() as f64))
        }
        "normalize-space" => {
            let s = if args.is_empty() {
                string_value(arena, ctx)
            } else {
                arg(0)?.string(arena)
            };
            Ok(XValue::Str(
                s.split_whitespace().collect::<Vec<_>>().join(" "),
            ))
        }
        "concat" => {
            let mut out = String::new();
            for i in 0..args.len() {
                out.push_str(&arg(i)?.string(arena));
            }
            Ok(XValue::Str(out))
        }
        _ => Err(format!("unsupported function: {name}()")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Node;
    use crate::xpath::parser::parse;

    fn sample_tree() -> Node {
        let mut root = Node::new("hierarchy");
        let mut frame = Node::new("android.widget.FrameLayout");
        frame.set_attribute("resource-id", "root");
        let mut btn1 = Node::new("android.widget.Button");
        btn1.set_attribute("text", "OK");
        btn1.set_attribute("resource-id", "com.app:id/ok");
        let mut btn2 = Node::new("android.widget.Button");
        btn2.set_attribute("text", "Cancel");
        let mut label = Node::new("android.widget.TextView");
        label.set_attribute("text", "Title");
        frame.add_child(label);
        frame.add_child(btn1);
        frame.add_child(btn2);
        root.add_child(frame);
        root
    }

    fn select(root: &Node, expr: &str) -> Vec<String> {
        let arena = Arena::build(root);
        let parsed = parse(expr).unwrap();
        select_elements(&arena, &parsed)
            .unwrap()
            .into_iter()
            .map(|i| arena.node(i).unwrap().tag.clone())
            .collect()
    }

    #[test]
    fn test_descendant_by_attribute() {
        let root = sample_tree();
        let tags = select(&root, "//android.widget.Button[@text='OK']");
        assert_eq!(tags, vec!["android.widget.Button"]);
    }

    #[test]
    fn test_wildcard_by_attribute() {
        let root = sample_tree();
        let tags = select(&root, "//*[@resource-id='com.app:id/ok']");
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_structural_path_with_position() {
        let root = sample_tree();
        let arena = Arena::build(&root);
        let parsed =
            parse("/hierarchy/android.widget.FrameLayout[1]/android.widget.Button[2]").unwrap();
        let matches = select_elements(&arena, &parsed).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(
            arena.node(matches[0]).unwrap().attribute("text"),
            Some("Cancel")
        );
    }

    #[test]
    fn test_descendant_anchor_predicate() {
        let root = sample_tree();
        let tags = select(
            &root,
            "//android.widget.FrameLayout[.//android.widget.Button[@text='OK']]",
        );
        assert_eq!(tags, vec!["android.widget.FrameLayout"]);
    }

    #[test]
    fn test_following_sibling() {
        let root = sample_tree();
        let arena = Arena::build(&root);
        let parsed =
            parse("//android.widget.TextView[@text='Title']/following-sibling::android.widget.Button[1]")
                .unwrap();
        let matches = select_elements(&arena, &parsed).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(arena.node(matches[0]).unwrap().attribute("text"), Some("OK"));
    }

    #[test]
    fn test_preceding_sibling_nearest_first() {
        let root = sample_tree();
        let arena = Arena::build(&root);
        let parsed = parse(
            "//android.widget.Button[@text='Cancel']/preceding-sibling::android.widget.Button[1]",
        )
        .unwrap();
        let matches = select_elements(&arena, &parsed).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(arena.node(matches[0]).unwrap().attribute("text"), Some("OK"));
    }

    #[test]
    fn test_filter_positional() {
        let root = sample_tree();
        let arena = Arena::build(&root);
        let parsed = parse("(//android.widget.FrameLayout//android.widget.Button)[2]").unwrap();
        let matches = select_elements(&arena, &parsed).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(
            arena.node(matches[0]).unwrap().attribute("text"),
            Some("Cancel")
        );
    }

    #[test]
    fn test_contains_function() {
        let root = sample_tree();
        let tags = select(&root, "//*[contains(@text, 'anc')]");
        assert_eq!(tags, vec!["android.widget.Button"]);
    }

    #[test]
    fn test_count_and_not() {
        let root = sample_tree();
        let arena = Arena::build(&root);
        let parsed = parse("count(//android.widget.Button)").unwrap();
        let XValue::Num(n) = evaluate(&arena, &parsed).unwrap() else {
            panic!("expected number");
        };
        assert_eq!(n, 2.0);

        let tags = select(&root, "//android.widget.Button[not(@resource-id)]");
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_parent_axis() {
        let root = sample_tree();
        let tags = select(&root, "//android.widget.Button[@text='OK']/parent::*");
        assert_eq!(tags, vec!["android.widget.FrameLayout"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let root = sample_tree();
        let tags = select(&root, "//android.widget.Switch");
        assert!(tags.is_empty());
    }

    #[test]
    fn test_index_by_path() {
        let root = sample_tree();
        let arena = Arena::build(&root);
        let idx = arena.index_by_path(&[0, 0, 1]).unwrap();
        assert_eq!(arena.node(idx).unwrap().attribute("text"), Some("OK"));
        assert!(arena.index_by_path(&[0, 0, 9]).is_none());
        assert!(arena.index_by_path(&[]).is_none());
    }
}
