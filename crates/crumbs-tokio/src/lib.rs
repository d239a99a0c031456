//! Tokio spawn helpers that fork the crumbs context into child tasks.

pub mod task;

pub use self::task::{FutureExt, JoinHandle, JoinSet, spawn, spawn_blocking};
