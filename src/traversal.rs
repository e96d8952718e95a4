//! Hand-over-hand (lock coupling) descent from the root, and the matching
//! unwind that releases subtree references on the way back up.
//!
//! Every node visited during a descent has its subtree-reference count
//! incremented and keeps it incremented for the lifetime of the operation,
//! not just while the hop's own rwlock is held: [`crate::lock::NodeLock::wait_quiescent`]
//! needs to see "an operation's path currently passes through here" for
//! every ancestor of whatever the operation ends up touching, not just for
//! its final target. The increments are undone together, root-to-target or
//! target-to-root, by [`unwind_path`] once the caller is finished.

use crate::error::TreeError;
use crate::map::Map;
use crate::node::{Locked, NodeData};
use crate::path;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Reader,
    Writer,
}

/// Descends from `root` along `path`, locking each node in turn before
/// releasing its parent's lock, and returns the target node together with
/// the lock it ends up holding on it.
///
/// Every node visited along the way (including the target, excluding
/// nothing) has its subtree-reference count incremented; the caller must
/// call [`unwind_path`] with the same target once it is done with the
/// result.
pub(crate) fn get_node(
    root: &Arc<NodeData>,
    path: &str,
    mode: Mode,
) -> Result<(Arc<NodeData>, Locked), TreeError> {
    if !path::valid(path) {
        return Err(TreeError::InvalidArgument);
    }

    let components = path::component_list(path);
    root.enter_subtree();

    let mut current = Arc::clone(root);
    let mut current_locked = lock_node(&current, if components.is_empty() { mode } else { Mode::Reader });

    for (i, component) in components.iter().enumerate() {
        let is_last = i == components.len() - 1;
        let step_mode = if is_last { mode } else { Mode::Reader };

        let next = match current_locked.children().get(*component) {
            Some(child) => Arc::clone(child),
            None => {
                drop(current_locked);
                unwind_path(&current, None);
                return Err(TreeError::NoSuchEntry);
            }
        };

        next.enter_subtree();
        let next_locked = lock_node(&next, step_mode);
        // `current`'s lock is released only once its child is locked.
        drop(current_locked);
        current = next;
        current_locked = next_locked;
    }

    Ok((current, current_locked))
}

/// Like [`get_node`], but starting partway down the tree, from a node whose
/// children are already visible through `start_children` (typically an
/// already-held write lock on an LCA). Returns `Ok(None)` when `subpath` is
/// empty, meaning `start` itself is the target and the caller's own guard
/// on it should be used instead of creating a new one.
///
/// `start` itself is not touched (its subtree reference is the caller's
/// responsibility); every node strictly below it along `subpath` gets one.
pub(crate) fn get_node_relative(
    start: &Arc<NodeData>,
    start_children: &Map<Box<str>, Arc<NodeData>>,
    subpath: &[&str],
    mode: Mode,
) -> Result<Option<(Arc<NodeData>, Locked)>, TreeError> {
    if subpath.is_empty() {
        return Ok(None);
    }

    let mut current = match start_children.get(subpath[0]) {
        Some(child) => Arc::clone(child),
        None => return Err(TreeError::NoSuchEntry),
    };
    current.enter_subtree();

    for component in subpath.iter().skip(1) {
        let guard = current.read();
        let next = match guard.get(*component) {
            Some(child) => Arc::clone(child),
            None => {
                drop(guard);
                unwind_path(&current, Some(start));
                return Err(TreeError::NoSuchEntry);
            }
        };
        drop(guard);
        next.enter_subtree();
        current = next;
    }

    let locked = lock_node(&current, mode);
    Ok(Some((current, locked)))
}

fn lock_node(node: &Arc<NodeData>, mode: Mode) -> Locked {
    match mode {
        Mode::Reader => Locked::Read(node.read()),
        Mode::Writer => Locked::Write(node.write()),
    }
}

/// Walks parent pointers from `from` up to (but not including)
/// `stop_at_exclusive`, or to the root if `stop_at_exclusive` is `None`,
/// decrementing each node's subtree-reference count.
///
/// `from` itself is included.
pub(crate) fn unwind_path(from: &Arc<NodeData>, stop_at_exclusive: Option<&Arc<NodeData>>) {
    let mut current = Arc::clone(from);
    loop {
        if let Some(stop) = stop_at_exclusive {
            if Arc::ptr_eq(&current, stop) {
                return;
            }
        }
        current.leave_subtree();
        match current.parent() {
            Some(parent) => current = parent,
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_node_finds_nested_child_and_unwinds_cleanly() {
        let root = NodeData::new_root();
        {
            let mut guard = root.write();
            guard.insert(Box::from("a"), NodeData::new_child(&root));
        }
        let a = root.read().get("a").map(Arc::clone).unwrap();
        {
            let mut guard = a.write();
            guard.insert(Box::from("b"), NodeData::new_child(&a));
        }

        let (node, locked) = get_node(&root, "/a/b/", Mode::Reader).unwrap();
        assert!(locked.children().is_empty());
        drop(locked);
        unwind_path(&node, None);

        assert_eq!(root.read().keys().count(), 1);
    }

    #[test]
    fn get_node_reports_missing_component() {
        let root = NodeData::new_root();
        let err = get_node(&root, "/missing/", Mode::Reader).unwrap_err();
        assert_eq!(err, TreeError::NoSuchEntry);
    }

    #[test]
    fn get_node_rejects_invalid_path() {
        let root = NodeData::new_root();
        let err = get_node(&root, "no-leading-slash", Mode::Reader).unwrap_err();
        assert_eq!(err, TreeError::InvalidArgument);
    }
}
