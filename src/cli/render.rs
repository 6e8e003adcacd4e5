//! Human-readable tree rendering

use termtree::Tree;

use crate::domain::Node;

/// Build a termtree from nodes in preorder (`left` ascending).
///
/// A node closes once a later node starts past its right bound, so a single
/// stack of open nodes is enough.
pub fn to_tree(nodes: &[Node]) -> Tree<String> {
    let mut open: Vec<(i64, Tree<String>)> = Vec::new();
    for node in nodes {
        close_until(&mut open, node.left);
        open.push((node.right, Tree::new(node.to_string())));
    }
    close_until(&mut open, i64::MAX);
    open.pop()
        .map(|(_, tree)| tree)
        .unwrap_or_else(|| Tree::new("empty tree".to_string()))
}

fn close_until(open: &mut Vec<(i64, Tree<String>)>, left: i64) {
    while open.len() > 1 && open.last().is_some_and(|(right, _)| *right < left) {
        if let Some((_, child)) = open.pop() {
            if let Some((_, parent)) = open.last_mut() {
                parent.push(child);
            }
        }
    }
}

/// One indented row per node: `name l:<left> r:<right> d:<depth> p:<parent>`.
pub fn flat_rows(nodes: &[Node]) -> Vec<String> {
    nodes
        .iter()
        .map(|n| {
            format!(
                "{}{} l:{} r:{} d:{} p:{}",
                "  ".repeat(n.depth.max(0) as usize),
                n.name,
                n.left,
                n.right,
                n.depth,
                n.parent.as_deref().unwrap_or("-")
            )
        })
        .collect()
}
