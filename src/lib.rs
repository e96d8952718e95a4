//! A concurrent, in-memory hierarchical directory tree.
//!
//! [`Tree`] exposes `list`, `create`, `remove` and `move_dir`: a small set
//! of operations on a `/`-rooted namespace of named directories, safe to
//! call from many threads at once. Each node owns its own reader/writer
//! lock, so operations on disjoint subtrees never block one another;
//! `move_dir` additionally waits for the source subtree to go quiescent
//! before detaching it, so a move never races an operation already in
//! flight underneath it.

mod error;
mod lock;
mod logger;
mod map;
mod node;
mod path;
mod traversal;
mod tree;

pub use crate::error::TreeError;
pub use crate::logger::{Log, NoopLogger, TracingLogger};
pub use crate::path::{MAX_COMPONENT_LENGTH, MAX_PATH_LENGTH};
pub use crate::tree::Tree;
