use crate::hierarchy::node::Node;

/// A normalized accessibility tree together with its node count
#[derive(Debug, Clone, PartialEq)]
pub struct UiTree {
    /// Synthetic `hierarchy` root
    pub root: Node,

    /// Total number of nodes, root included
    pub total_nodes: usize,
}

impl UiTree {
    pub fn new(root: Node) -> Self {
        let total_nodes = count_nodes(&root);
        Self { root, total_nodes }
    }

    /// Walk a `node_path` from the root. The leading index addresses the
    /// root itself; the rest select children at each level.
    pub fn node_by_path(&self, path: &[usize]) -> Option<&Node> {
        if path.is_empty() {
            return None;
        }
        let mut current = &self.root;
        for &index in &path[1..] {
            current = current.children.get(index)?;
        }
        Some(current)
    }

    /// Serialize the tree root to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.root)
    }
}

fn count_nodes(node: &Node) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}
