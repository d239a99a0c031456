//! Nested diagnostic context that follows the logical call flow.
//!
//! Code pushes a value when it enters a unit of work and the returned guard pops it
//! on exit. Log formatters read the stack to prefix lines with breadcrumbs such as
//! `RequestId=42 > validate`.
//!
//! ```
//! let _request = crumbs_runtime::push("RequestId=42");
//! let _step = crumbs_runtime::push("validate");
//! assert_eq!(
//!     crumbs_runtime::render_context(&Default::default()),
//!     "validate > RequestId=42"
//! );
//! ```
//!
//! The stack is a persistent linked list: a push allocates one node, and snapshots
//! share nodes with the flow they came from. See [`store`] for how the current top
//! is propagated across `.await` points and into spawned tasks.

pub(crate) mod api;
pub(crate) mod config;
pub(crate) mod node;
pub(crate) mod render;
pub mod store;
pub(crate) mod value;

pub use self::api::*;
pub use self::config::*;
pub use self::node::{ContextNode, Frames};
pub use self::render::{RECURSIVE_RENDER_MAX_DEPTH, append_context};
pub use self::store::{
    ContextFuture, ContextSnapshot, SnapshotGuard, current_top, in_current_context,
    in_flow_scope,
};
pub use self::value::{DisplayFormatter, FrameValue, ValueFormatter, convert_to_string};
