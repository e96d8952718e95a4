use crate::error::TreeError;
use crate::logger::{Log, NoopLogger};
use crate::node::{Locked, NodeData, WriteGuard};
use crate::path;
use crate::traversal::{get_node, get_node_relative, unwind_path, Mode};
use std::ffi::c_void;
use std::marker::PhantomData;
use std::sync::Arc;

/// A concurrent, in-memory hierarchical directory tree.
///
/// Every node carries its own bounded-waiting reader/writer lock; `list`
/// takes a read lock on its target only, while `create`, `remove` and
/// `move_dir` take write locks along the path they need to mutate.
/// Concurrent operations on unrelated subtrees never contend.
///
/// `Logger` is a zero-sized marker selecting which [`Log`] implementation
/// observes node creation and removal; it defaults to [`NoopLogger`].
pub struct Tree<Logger: Log = NoopLogger> {
    root: Arc<NodeData>,
    _logger: PhantomData<Logger>,
}

impl Tree<NoopLogger> {
    /// Creates a new tree containing only the root, `"/"`.
    pub fn new() -> Self {
        Tree {
            root: NodeData::new_root(),
            _logger: PhantomData,
        }
    }
}

impl Default for Tree<NoopLogger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Logger: Log> Tree<Logger> {
    /// Creates a new tree using the given [`Log`] implementation.
    pub fn with_logger() -> Self {
        Tree {
            root: NodeData::new_root(),
            _logger: PhantomData,
        }
    }

    /// Returns `path`'s immediate children as a comma-separated list in
    /// ascending lexicographic order, with no trailing separator. An empty
    /// directory yields the empty string.
    pub fn list(&self, path: &str) -> Result<String, TreeError> {
        let (node, locked) = get_node(&self.root, path, Mode::Reader)?;
        let mut names: Vec<&str> = locked.children().keys().map(|k| &**k).collect();
        names.sort_unstable();
        let out = names.join(",");
        drop(locked);
        unwind_path(&node, None);
        Ok(out)
    }

    /// Creates an empty directory at `path`. The parent must already exist.
    pub fn create(&self, path: &str) -> Result<(), TreeError> {
        if !path::valid(path) {
            return Err(TreeError::InvalidArgument);
        }
        if path == "/" {
            return Err(TreeError::AlreadyExists);
        }
        let (parent_path, name) = path::split_parent(path).expect("path != \"/\"");

        let (parent_node, mut parent_locked) = get_node(&self.root, parent_path, Mode::Writer)?;
        let parent_guard = as_write(&mut parent_locked);

        if parent_guard.contains(name) {
            drop(parent_locked);
            unwind_path(&parent_node, None);
            return Err(TreeError::AlreadyExists);
        }

        let child = NodeData::new_child(&parent_node);
        Logger::log_new(Arc::as_ptr(&child) as *const c_void);
        parent_guard.insert(Box::from(name), child);

        drop(parent_locked);
        unwind_path(&parent_node, None);
        Ok(())
    }

    /// Removes the empty directory at `path`.
    pub fn remove(&self, path: &str) -> Result<(), TreeError> {
        if !path::valid(path) {
            return Err(TreeError::InvalidArgument);
        }
        if path == "/" {
            return Err(TreeError::Busy);
        }
        let (parent_path, name) = path::split_parent(path).expect("path != \"/\"");

        let (parent_node, mut parent_locked) = get_node(&self.root, parent_path, Mode::Writer)?;
        let parent_guard = as_write(&mut parent_locked);

        let target = match parent_guard.get(name) {
            Some(child) => Arc::clone(child),
            None => {
                drop(parent_locked);
                unwind_path(&parent_node, None);
                return Err(TreeError::NoSuchEntry);
            }
        };

        {
            let target_guard = target.write();
            if !target_guard.is_empty() {
                drop(target_guard);
                drop(parent_locked);
                unwind_path(&parent_node, None);
                return Err(TreeError::NotEmpty);
            }
        }

        let removed = parent_guard
            .remove(name)
            .expect("looked up under the same write lock");
        Logger::log_drop(Arc::as_ptr(&removed) as *const c_void);

        drop(parent_locked);
        unwind_path(&parent_node, None);
        Ok(())
    }

    /// Moves the directory at `source` to `target`, which must not yet
    /// exist (except when it names `source` itself, in which case this is
    /// a no-op) and must not lie within `source`'s own subtree.
    pub fn move_dir(&self, source: &str, target: &str) -> Result<(), TreeError> {
        if !path::valid(source) || !path::valid(target) {
            return Err(TreeError::InvalidArgument);
        }
        if source == "/" {
            return Err(TreeError::Busy);
        }
        if target == "/" {
            return Err(TreeError::AlreadyExists);
        }
        if source == target {
            // A no-op, but only if the entry is actually there.
            let (parent_path, name) = path::split_parent(source).expect("source != \"/\"");
            let (parent_node, parent_locked) = get_node(&self.root, parent_path, Mode::Reader)?;
            let exists = parent_locked.children().contains(name);
            drop(parent_locked);
            unwind_path(&parent_node, None);
            return if exists {
                Ok(())
            } else {
                Err(TreeError::NoSuchEntry)
            };
        }
        if path::is_ancestor(source, target) {
            return Err(TreeError::InvalidArgument);
        }

        let (s_parent_path, s_name) = path::split_parent(source).expect("source != \"/\"");
        let (t_parent_path, t_name) = path::split_parent(target).expect("target != \"/\"");

        let lca_path = path::lca(s_parent_path, t_parent_path);
        let (lca_node, lca_locked) = get_node(&self.root, &lca_path, Mode::Writer)?;
        let mut lca_guard = match lca_locked {
            Locked::Write(g) => g,
            Locked::Read(_) => unreachable!("get_node(.., Mode::Writer) returns a write lock"),
        };

        let result = if s_parent_path == t_parent_path {
            self.move_within_same_parent(
                &lca_node,
                &mut lca_guard,
                &lca_path,
                s_parent_path,
                s_name,
                t_name,
            )
        } else {
            self.move_across_parents(
                &lca_node,
                &mut lca_guard,
                &lca_path,
                s_parent_path,
                s_name,
                t_parent_path,
                t_name,
            )
        };

        drop(lca_guard);
        unwind_path(&lca_node, None);
        result
    }

    fn move_within_same_parent(
        &self,
        lca_node: &Arc<NodeData>,
        lca_guard: &mut WriteGuard,
        lca_path: &str,
        parent_path: &str,
        s_name: &str,
        t_name: &str,
    ) -> Result<(), TreeError> {
        let subpath = path::suffix_after(lca_path, parent_path);
        let owned = get_node_relative(lca_node, &*lca_guard, &subpath, Mode::Writer)?;
        let mut owned_guard = owned.map(|(node, locked)| {
            (
                node,
                match locked {
                    Locked::Write(g) => g,
                    Locked::Read(_) => unreachable!(),
                },
            )
        });

        let result = (|| {
            let children = match &mut owned_guard {
                Some((_, g)) => &mut **g,
                None => &mut **lca_guard,
            };
            let s_dir = match children.get(s_name) {
                Some(node) => Arc::clone(node),
                None => return Err(TreeError::NoSuchEntry),
            };
            if children.contains(t_name) {
                return Err(TreeError::AlreadyExists);
            }
            s_dir.wait_quiescent();
            let removed = children.remove(s_name).expect("checked above");
            children.insert(Box::from(t_name), removed);
            Ok(())
        })();

        if let Some((node, guard)) = owned_guard {
            drop(guard);
            unwind_path(&node, Some(lca_node));
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn move_across_parents(
        &self,
        lca_node: &Arc<NodeData>,
        lca_guard: &mut WriteGuard,
        lca_path: &str,
        s_parent_path: &str,
        s_name: &str,
        t_parent_path: &str,
        t_name: &str,
    ) -> Result<(), TreeError> {
        let s_subpath = path::suffix_after(lca_path, s_parent_path);
        let s_owned = get_node_relative(lca_node, &*lca_guard, &s_subpath, Mode::Writer);
        let mut s_guard = match s_owned {
            Ok(Some((node, Locked::Write(g)))) => Some((node, g)),
            Ok(Some((_, Locked::Read(_)))) => unreachable!(),
            Ok(None) => None,
            Err(e) => return Err(e),
        };

        let t_subpath = path::suffix_after(lca_path, t_parent_path);
        let t_owned = get_node_relative(lca_node, &*lca_guard, &t_subpath, Mode::Writer);
        let mut t_guard = match t_owned {
            Ok(Some((node, Locked::Write(g)))) => Some((node, g)),
            Ok(Some((_, Locked::Read(_)))) => unreachable!(),
            Ok(None) => None,
            Err(e) => {
                release(s_guard.take(), lca_node);
                return Err(e);
            }
        };

        let result = (|| {
            let t_parent_node = match &t_guard {
                Some((node, _)) => Arc::clone(node),
                None => Arc::clone(lca_node),
            };

            let s_dir = {
                let s_children = match &s_guard {
                    Some((_, g)) => &**g,
                    None => &**lca_guard,
                };
                match s_children.get(s_name) {
                    Some(node) => Arc::clone(node),
                    None => return Err(TreeError::NoSuchEntry),
                }
            };

            {
                let t_children = match &t_guard {
                    Some((_, g)) => &**g,
                    None => &**lca_guard,
                };
                if t_children.contains(t_name) {
                    return Err(TreeError::AlreadyExists);
                }
            }

            s_dir.wait_quiescent();

            {
                let s_children = match &mut s_guard {
                    Some((_, g)) => &mut **g,
                    None => &mut **lca_guard,
                };
                s_children.remove(s_name).expect("checked above");
            }
            s_dir.set_parent(&t_parent_node);
            {
                let t_children = match &mut t_guard {
                    Some((_, g)) => &mut **g,
                    None => &mut **lca_guard,
                };
                t_children.insert(Box::from(t_name), s_dir);
            }

            Ok(())
        })();

        release(t_guard, lca_node);
        release(s_guard, lca_node);
        result
    }
}

fn as_write(locked: &mut Locked) -> &mut WriteGuard {
    match locked {
        Locked::Write(g) => g,
        Locked::Read(_) => unreachable!("get_node(.., Mode::Writer) returns a write lock"),
    }
}

fn release(guard: Option<(Arc<NodeData>, WriteGuard)>, lca_node: &Arc<NodeData>) {
    if let Some((node, guard)) = guard {
        drop(guard);
        unwind_path(&node, Some(lca_node));
    }
}

#[cfg(test)]
mod tests {
    use super::Tree;
    use crate::error::TreeError;

    #[test]
    fn create_list_remove_round_trip() {
        let tree = Tree::new();
        tree.create("/a/").unwrap();
        tree.create("/a/b/").unwrap();
        assert_eq!(tree.list("/a/").unwrap(), "b");
        assert_eq!(tree.remove("/a/b/"), Ok(()));
        assert_eq!(tree.list("/a/").unwrap(), "");
        assert_eq!(tree.remove("/a/"), Ok(()));
    }

    #[test]
    fn create_rejects_duplicate_and_missing_parent() {
        let tree = Tree::new();
        tree.create("/a/").unwrap();
        assert_eq!(tree.create("/a/"), Err(TreeError::AlreadyExists));
        assert_eq!(tree.create("/missing/x/"), Err(TreeError::NoSuchEntry));
    }

    #[test]
    fn create_and_remove_reject_malformed_paths() {
        let tree = Tree::new();
        assert_eq!(tree.create(""), Err(TreeError::InvalidArgument));
        assert_eq!(tree.create("abc"), Err(TreeError::InvalidArgument));
        assert_eq!(tree.create("/a1/"), Err(TreeError::InvalidArgument));
        assert_eq!(tree.create("/A/"), Err(TreeError::InvalidArgument));
        assert_eq!(tree.list("/").unwrap(), "");

        assert_eq!(tree.remove(""), Err(TreeError::InvalidArgument));
        assert_eq!(tree.remove("abc"), Err(TreeError::InvalidArgument));
        assert_eq!(tree.remove("/a1/"), Err(TreeError::InvalidArgument));
    }

    #[test]
    fn remove_rejects_root_and_nonempty() {
        let tree = Tree::new();
        assert_eq!(tree.remove("/"), Err(TreeError::Busy));
        tree.create("/a/").unwrap();
        tree.create("/a/b/").unwrap();
        assert_eq!(tree.remove("/a/"), Err(TreeError::NotEmpty));
    }

    #[test]
    fn create_and_remove_on_root_are_rejected() {
        let tree = Tree::new();
        assert_eq!(tree.create("/"), Err(TreeError::AlreadyExists));
        assert_eq!(tree.remove("/"), Err(TreeError::Busy));
        assert_eq!(tree.move_dir("/", "/x/"), Err(TreeError::Busy));
    }

    #[test]
    fn move_dir_renames_within_same_parent() {
        let tree = Tree::new();
        tree.create("/a/").unwrap();
        tree.move_dir("/a/", "/b/").unwrap();
        assert_eq!(tree.list("/").unwrap(), "b");
    }

    #[test]
    fn move_dir_relocates_across_parents_with_subtree() {
        let tree = Tree::new();
        tree.create("/a/").unwrap();
        tree.create("/a/child/").unwrap();
        tree.create("/dest/").unwrap();
        tree.move_dir("/a/", "/dest/a/").unwrap();
        assert_eq!(tree.list("/dest/").unwrap(), "a");
        assert_eq!(tree.list("/dest/a/").unwrap(), "child");
        assert_eq!(tree.list("/a/"), Err(TreeError::NoSuchEntry));
    }

    #[test]
    fn move_dir_rejects_move_into_own_descendant() {
        let tree = Tree::new();
        tree.create("/a/").unwrap();
        tree.create("/a/b/").unwrap();
        assert_eq!(
            tree.move_dir("/a/", "/a/b/c/"),
            Err(TreeError::InvalidArgument)
        );
    }

    #[test]
    fn move_dir_onto_self_is_a_no_op() {
        let tree = Tree::new();
        tree.create("/a/").unwrap();
        assert_eq!(tree.move_dir("/a/", "/a/"), Ok(()));
        assert_eq!(tree.list("/").unwrap(), "a");
    }

    #[test]
    fn move_dir_onto_self_fails_if_source_is_missing() {
        let tree = Tree::new();
        assert_eq!(tree.move_dir("/a/", "/a/"), Err(TreeError::NoSuchEntry));
    }

    #[test]
    fn lock_state_is_fully_quiescent_between_operations() {
        let tree = Tree::new();
        tree.create("/a/").unwrap();
        tree.create("/a/b/").unwrap();
        tree.list("/a/").unwrap();
        tree.move_dir("/a/b/", "/a/c/").unwrap();
        assert_eq!(tree.remove("/a/c/"), Ok(()));
        assert_eq!(tree.remove("/a/"), Ok(()));

        let counters = tree.root.lock_counters();
        assert_eq!(counters.r_count, 0);
        assert_eq!(counters.w_count, 0);
        assert_eq!(counters.r_wait, 0);
        assert_eq!(counters.w_wait, 0);
        assert_eq!(counters.subtree_refs, 0);
    }

    #[test]
    fn move_dir_rejects_existing_target() {
        let tree = Tree::new();
        tree.create("/a/").unwrap();
        tree.create("/b/").unwrap();
        assert_eq!(tree.move_dir("/a/", "/b/"), Err(TreeError::AlreadyExists));
    }
}
