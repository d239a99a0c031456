use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::value::FrameValue;

/// One frame of a context stack.
///
/// Nodes are immutable once built. Pushing conses a new node onto the current top;
/// popping only changes which node the store treats as current, so older snapshots
/// keep seeing the frames they captured.
pub struct ContextNode {
    value: FrameValue,
    parent: Option<Arc<ContextNode>>,
    depth: usize,
}

impl ContextNode {
    pub fn new(parent: Option<Arc<ContextNode>>, value: FrameValue) -> Arc<Self> {
        let depth = parent.as_ref().map_or(1, |parent| parent.depth + 1);
        Arc::new(Self {
            value,
            parent,
            depth,
        })
    }

    pub fn value(&self) -> &FrameValue {
        &self.value
    }

    pub fn parent(&self) -> Option<&Arc<ContextNode>> {
        self.parent.as_ref()
    }

    /// Number of frames from this node to the bottom, inclusive.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Walks from this node down to the bottom frame.
    pub fn frames(&self) -> Frames<'_> {
        Frames { next: Some(self) }
    }
}

impl Drop for ContextNode {
    // Unlink iteratively so dropping a deep chain doesn't recurse once per frame.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(node) = next {
            match Arc::into_inner(node) {
                Some(mut node) => next = node.parent.take(),
                None => break,
            }
        }
    }
}

impl fmt::Debug for ContextNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextNode")
            .field("value", &self.value)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

/// Iterator over a chain of nodes, most recent first.
#[derive(Clone, Default)]
pub struct Frames<'a> {
    next: Option<&'a ContextNode>,
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a ContextNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.parent.as_deref();
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.next.map_or(0, ContextNode::depth);
        (len, Some(len))
    }
}

impl ExactSizeIterator for Frames<'_> {}
impl FusedIterator for Frames<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(values: &[&'static str]) -> Option<Arc<ContextNode>> {
        values.iter().fold(None, |parent, value| {
            Some(ContextNode::new(parent, FrameValue::new(*value)))
        })
    }

    #[test]
    fn depth_grows_by_one_per_level() {
        let top = chain(&["a", "b", "c"]).expect("chain is non-empty");
        let depths: Vec<usize> = top.frames().map(ContextNode::depth).collect();
        assert_eq!(depths, vec![3, 2, 1]);
    }

    #[test]
    fn frames_walk_most_recent_first() {
        let top = chain(&["a", "b", "c"]).expect("chain is non-empty");
        let frames = top.frames();
        assert_eq!(frames.len(), 3);
        let values: Vec<String> = frames.map(|node| node.value().to_string()).collect();
        assert_eq!(values, vec!["c", "b", "a"]);
    }

    #[test]
    fn consing_shares_the_parent() {
        let base = chain(&["a", "b"]).expect("chain is non-empty");
        let left = ContextNode::new(Some(Arc::clone(&base)), FrameValue::new("left"));
        let right = ContextNode::new(Some(Arc::clone(&base)), FrameValue::new("right"));
        assert!(Arc::ptr_eq(
            left.parent().expect("left has a parent"),
            right.parent().expect("right has a parent"),
        ));
        assert_eq!(left.depth(), 3);
        assert_eq!(right.depth(), 3);
        assert_eq!(Arc::strong_count(&base), 3);
    }

    #[test]
    fn dropping_a_deep_chain_does_not_overflow() {
        let mut top = None;
        for i in 0..200_000u32 {
            top = Some(ContextNode::new(top, FrameValue::new(i)));
        }
        assert_eq!(top.as_ref().map(|node| node.depth()), Some(200_000));
        drop(top);
    }

    #[test]
    fn dropping_a_branch_keeps_the_shared_trunk() {
        let trunk = chain(&["a", "b"]).expect("chain is non-empty");
        let branch = ContextNode::new(Some(Arc::clone(&trunk)), FrameValue::new("c"));
        drop(branch);
        assert_eq!(Arc::strong_count(&trunk), 1);
        let values: Vec<String> = trunk.frames().map(|node| node.value().to_string()).collect();
        assert_eq!(values, vec!["b", "a"]);
    }
}
