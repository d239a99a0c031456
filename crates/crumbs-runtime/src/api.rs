use std::fmt;

use tracing::{debug, trace};

use crate::node::ContextNode;
use crate::store::{current_top, replace_top};
use crate::value::{FrameValue, ValueFormatter, convert_to_string};

/// Pops the frame pushed by [`push`] when dropped.
///
/// The guard does not remember which frame it pushed: dropping it pops whatever is
/// on top of the current flow's stack. Releasing guards out of order, or after a
/// [`clear`], pops other frames or nothing at all.
#[must_use = "dropping the guard immediately pops the frame again"]
pub struct ContextGuard {
    _priv: (),
}

impl ContextGuard {
    /// Pops now instead of at the end of the scope.
    pub fn release(self) {}
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if pop_object().is_none() {
            debug!("context guard released against an empty stack");
        }
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContextGuard")
    }
}

/// Pushes `value` onto the current flow's context stack.
pub fn push<T>(value: T) -> ContextGuard
where
    T: fmt::Display + Send + Sync + 'static,
{
    push_value(FrameValue::new(value))
}

/// Pushes the null value, rendered as `null` by the default formatter.
pub fn push_null() -> ContextGuard {
    push_value(FrameValue::null())
}

pub fn push_value(value: FrameValue) -> ContextGuard {
    let node = ContextNode::new(current_top(), value);
    let depth = node.depth();
    replace_top(Some(node));
    trace!(depth, "pushed context frame");
    ContextGuard { _priv: () }
}

/// Pops the top frame and converts it to text. Returns `""` on an empty stack.
pub fn pop(formatter: Option<&dyn ValueFormatter>) -> String {
    match pop_object() {
        Some(value) => convert_to_string(&value, formatter),
        None => String::new(),
    }
}

/// Pops the top frame. Returns `None` on an empty stack, leaving it empty.
pub fn pop_object() -> Option<FrameValue> {
    let Some(top) = current_top() else {
        debug!("pop on an empty context stack");
        return None;
    };
    replace_top(top.parent().cloned());
    trace!(depth = top.depth() - 1, "popped context frame");
    Some(top.value().clone())
}

/// Returns the top frame without popping it.
pub fn peek() -> Option<FrameValue> {
    current_top().map(|top| top.value().clone())
}

/// Discards every frame of the current flow.
pub fn clear() {
    if let Some(previous) = replace_top(None) {
        trace!(discarded = previous.depth(), "cleared context stack");
    }
}

pub fn depth() -> usize {
    current_top().map_or(0, |top| top.depth())
}

pub fn is_empty() -> bool {
    current_top().is_none()
}

/// All frames of the current flow, most recent first.
pub fn get_all_objects() -> Vec<FrameValue> {
    match current_top() {
        Some(top) => top.frames().map(|node| node.value().clone()).collect(),
        None => Vec::new(),
    }
}

/// All frames of the current flow as text, most recent first.
pub fn get_all_messages(formatter: Option<&dyn ValueFormatter>) -> Vec<String> {
    match current_top() {
        Some(top) => top
            .frames()
            .map(|node| convert_to_string(node.value(), formatter))
            .collect(),
        None => Vec::new(),
    }
}
