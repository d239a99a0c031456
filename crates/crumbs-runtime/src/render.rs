use std::fmt;

use crate::node::ContextNode;
use crate::store::{ContextSnapshot, current_top};
use crate::value::{FrameValue, ValueFormatter, write_value};

/// Stacks up to this depth are rendered by walking the nodes directly; deeper
/// stacks are collected into a `Vec` first so the walk can't recurse deeply.
pub const RECURSIVE_RENDER_MAX_DEPTH: usize = 10;

/// Appends the current flow's context to `buffer`, most recent frame first.
///
/// `top_frames` keeps only the most recent frames, `bottom_frames` only the oldest
/// ones; `top_frames` wins if both are given. Counts past the stack depth are
/// clamped. Nothing is written for an empty stack.
pub fn append_context<W: fmt::Write>(
    formatter: Option<&dyn ValueFormatter>,
    top_frames: Option<usize>,
    bottom_frames: Option<usize>,
    separator: &str,
    buffer: &mut W,
) -> fmt::Result {
    let top = current_top();
    append_frames(
        top.as_deref(),
        formatter,
        top_frames,
        bottom_frames,
        separator,
        buffer,
    )
}

impl ContextSnapshot {
    /// Like [`append_context`], over this snapshot instead of the current flow.
    pub fn append_to<W: fmt::Write>(
        &self,
        formatter: Option<&dyn ValueFormatter>,
        top_frames: Option<usize>,
        bottom_frames: Option<usize>,
        separator: &str,
        buffer: &mut W,
    ) -> fmt::Result {
        append_frames(
            self.top().map(|top| &**top),
            formatter,
            top_frames,
            bottom_frames,
            separator,
            buffer,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    Recursive,
    Collected,
}

fn append_frames<W: fmt::Write>(
    top: Option<&ContextNode>,
    formatter: Option<&dyn ValueFormatter>,
    top_frames: Option<usize>,
    bottom_frames: Option<usize>,
    separator: &str,
    buffer: &mut W,
) -> fmt::Result {
    let Some(top) = top else {
        return Ok(());
    };
    let strategy = if top.depth() <= RECURSIVE_RENDER_MAX_DEPTH {
        Strategy::Recursive
    } else {
        Strategy::Collected
    };
    let range = frame_range(top.depth(), top_frames, bottom_frames);
    let mut out = Joiner::new(formatter, separator, buffer);
    append_with(strategy, top, range, &mut out)
}

fn append_with(
    strategy: Strategy,
    top: &ContextNode,
    (start, end): (usize, usize),
    out: &mut Joiner<'_>,
) -> fmt::Result {
    match strategy {
        Strategy::Recursive => append_recursive(top, 0, start, end, out),
        Strategy::Collected => {
            let values: Vec<&FrameValue> = top.frames().map(ContextNode::value).collect();
            values[start..end]
                .iter()
                .try_for_each(|value| out.append(value))
        }
    }
}

/// Positions `[start, end)` to render, counted from the top of the stack.
fn frame_range(
    depth: usize,
    top_frames: Option<usize>,
    bottom_frames: Option<usize>,
) -> (usize, usize) {
    match (top_frames, bottom_frames) {
        (Some(top), _) => (0, top.min(depth)),
        (None, Some(bottom)) => (depth - bottom.min(depth), depth),
        (None, None) => (0, depth),
    }
}

fn append_recursive(
    node: &ContextNode,
    pos: usize,
    start: usize,
    end: usize,
    out: &mut Joiner<'_>,
) -> fmt::Result {
    if pos >= end {
        return Ok(());
    }
    if pos >= start {
        out.append(node.value())?;
    }
    match node.parent() {
        Some(parent) => append_recursive(parent, pos + 1, start, end, out),
        None => Ok(()),
    }
}

struct Joiner<'a> {
    formatter: Option<&'a dyn ValueFormatter>,
    separator: &'a str,
    buffer: &'a mut dyn fmt::Write,
    wrote_any: bool,
}

impl<'a> Joiner<'a> {
    fn new(
        formatter: Option<&'a dyn ValueFormatter>,
        separator: &'a str,
        buffer: &'a mut dyn fmt::Write,
    ) -> Self {
        Self {
            formatter,
            separator,
            buffer,
            wrote_any: false,
        }
    }

    fn append(&mut self, value: &FrameValue) -> fmt::Result {
        if self.wrote_any {
            self.buffer.write_str(self.separator)?;
        }
        self.wrote_any = true;
        write_value(self.formatter, value, self.buffer)
    }
}
