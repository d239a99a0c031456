//! Nested diagnostic context for Tokio-based Rust systems.
//!
//! A context stack records what the current logical flow is working on. Code
//! pushes a frame when it enters a unit of work and the returned guard pops it on
//! exit. Log lines rendered through [`fmt::with_context`] get the stack as a
//! prefix:
//!
//! ```text
//! INFO [RequestId=42 > validate] rejected payload
//! ```
//!
//! Unlike a thread-local, the stack follows the flow across `.await` points, even
//! when a multi-thread runtime resumes a task on another worker, and every spawned
//! task gets its own fork of the parent's stack.
//!
//! # Using this crate
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt()
//!         .event_format(crumbs::fmt::with_context(tracing_subscriber::fmt::format()))
//!         .init();
//!
//!     crumbs::in_current_context(async {
//!         let _request = crumbs::push("RequestId=42");
//!         crumbs::spawn(async {
//!             let _step = crumbs::push("validate");
//!             tracing::info!("rejected payload");
//!         })
//!         .await
//!         .unwrap();
//!     })
//!     .await;
//! }
//! ```
//!
//! # Propagation rules
//!
//! - Inside a future wrapped by [`in_current_context`], [`spawn`], [`JoinSet`] or
//!   [`FutureExt`], the stack lives in a task-local and follows the future.
//! - Elsewhere each thread has its own stack. [`spawn_blocking`] and
//!   [`ContextSnapshot::enter`] carry a capture onto a plain thread.
//! - A bare `tokio::spawn` does not fork: the task starts with an empty stack of
//!   its own, keyed by its task id, and never sees frames of other tasks.
//!
//! # Configuration
//!
//! [`RenderOptions::from_env`] reads `CRUMBS_SEPARATOR`, `CRUMBS_TOP_FRAMES` and
//! `CRUMBS_BOTTOM_FRAMES`.

pub mod fmt;

pub use crumbs_runtime::*;
pub use crumbs_tokio::*;
