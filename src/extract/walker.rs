//! Lazy pre-order traversal of a content tree.

use std::slice;

use crate::page::ContentNode;

/// Pre-order iterator over the element nodes of a content tree.
///
/// The walker keeps one slice cursor per open nesting level. Each call to
/// `next` advances exactly one node; a subtree is only entered when its root
/// has been yielded, so dropping the walker early leaves every unvisited
/// sibling and descendant untouched. Text leaves are stepped over and never
/// yielded.
#[derive(Debug, Clone)]
pub struct ContentWalker<'a> {
    stack: Vec<slice::Iter<'a, ContentNode>>,
    visited: usize,
}

impl<'a> ContentWalker<'a> {
    /// Creates a walker over a root node sequence.
    #[must_use]
    pub fn new(roots: &'a [ContentNode]) -> Self {
        Self {
            stack: vec![roots.iter()],
            visited: 0,
        }
    }

    /// Number of nodes stepped over so far, text leaves included.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited
    }
}

impl<'a> Iterator for ContentWalker<'a> {
    type Item = &'a ContentNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.stack.last_mut()?;
            let Some(node) = cursor.next() else {
                self.stack.pop();
                continue;
            };
            self.visited += 1;

            if node.is_text() {
                continue;
            }
            if !node.children.is_empty() {
                self.stack.push(node.children.iter());
            }
            return Some(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, children: Vec<ContentNode>) -> ContentNode {
        ContentNode::element(tag).with_children(children)
    }

    #[test]
    fn test_walker_visits_in_pre_order() {
        let tree = vec![
            el("a", vec![el("a1", vec![el("a1x", vec![])]), el("a2", vec![])]),
            el("b", vec![]),
            el("c", vec![el("c1", vec![])]),
        ];

        let tags: Vec<&str> = ContentWalker::new(&tree).map(|n| n.tag.as_str()).collect();

        assert_eq!(tags, ["a", "a1", "a1x", "a2", "b", "c", "c1"]);
    }

    #[test]
    fn test_walker_skips_text_leaves() {
        let tree = vec![
            ContentNode::text(),
            el("p", vec![ContentNode::text(), el("img", vec![])]),
            ContentNode::text(),
        ];

        let mut walker = ContentWalker::new(&tree);
        let tags: Vec<&str> = walker.by_ref().map(|n| n.tag.as_str()).collect();

        assert_eq!(tags, ["p", "img"]);
        assert_eq!(walker.visited(), 5);
    }

    #[test]
    fn test_walker_empty_tree() {
        let tree: Vec<ContentNode> = Vec::new();
        let mut walker = ContentWalker::new(&tree);
        assert!(walker.next().is_none());
        assert!(walker.next().is_none(), "exhausted walker stays exhausted");
    }

    #[test]
    fn test_walker_stops_without_entering_unvisited_subtrees() {
        let big_subtree: Vec<ContentNode> = (0..1000).map(|_| el("span", vec![])).collect();
        let tree = vec![el("first", vec![]), el("second", big_subtree)];

        let mut walker = ContentWalker::new(&tree);
        assert_eq!(walker.next().map(|n| n.tag.as_str()), Some("first"));
        assert_eq!(walker.visited(), 1);

        assert_eq!(walker.next().map(|n| n.tag.as_str()), Some("second"));
        assert_eq!(walker.visited(), 2, "children are not touched until requested");
    }

    #[test]
    fn test_walker_handles_deep_nesting() {
        let mut node = el("leaf", vec![]);
        for _ in 0..2_000 {
            node = el("div", vec![node]);
        }
        let tree = vec![node];

        let last = ContentWalker::new(&tree).last().map(|n| n.tag.clone());

        assert_eq!(last.as_deref(), Some("leaf"));
    }
}
