use thiserror::Error;

/// The five domain error kinds a [`crate::Tree`] operation can return.
///
/// These are the only failure values the public surface produces; a
/// violated internal invariant (lock counters out of range, a poisoned
/// primitive) is never folded into this type, it aborts the process
/// instead, per the crate's error handling design.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The path is malformed, or a `move_dir` would relocate an ancestor
    /// into one of its own descendants.
    #[error("invalid argument")]
    InvalidArgument,
    /// The addressed entry, or an ancestor of it, does not exist.
    #[error("no such entry")]
    NoSuchEntry,
    /// `create` found the name already taken, or `move_dir`'s target did.
    #[error("already exists")]
    AlreadyExists,
    /// `remove` was attempted on a non-empty directory.
    #[error("not empty")]
    NotEmpty,
    /// `remove` or `move_dir` was attempted on the root.
    #[error("busy")]
    Busy,
}
