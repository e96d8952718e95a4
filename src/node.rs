use crate::lock::NodeLock;
use crate::map::Map;
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

/// A single directory in the tree.
///
/// `children` lives behind an `UnsafeCell` rather than a `RwLock` because
/// the locking discipline (bounded-waiting reader/writer access, with a
/// separate subtree-quiescence counter) is implemented by hand in
/// [`NodeLock`]; [`ReadGuard`] and [`WriteGuard`] are the only code that may
/// dereference it.
pub(crate) struct NodeData {
    parent: Mutex<Option<Weak<NodeData>>>,
    lock: NodeLock,
    children: UnsafeCell<Map<Box<str>, Arc<NodeData>>>,
}

// `children` is only ever accessed through a `ReadGuard`/`WriteGuard`, which
// enforce the same exclusion `NodeLock` would if it wrapped the cell
// directly.
unsafe impl Send for NodeData {}
unsafe impl Sync for NodeData {}

impl NodeData {
    pub(crate) fn new_root() -> Arc<Self> {
        Arc::new(NodeData {
            parent: Mutex::new(None),
            lock: NodeLock::new(),
            children: UnsafeCell::new(Map::default()),
        })
    }

    /// A node's name is not cached on itself; it only exists as the key
    /// under which its parent's map holds it, so a `move_dir` rename never
    /// has a second copy to keep in sync.
    pub(crate) fn new_child(parent: &Arc<NodeData>) -> Arc<Self> {
        Arc::new(NodeData {
            parent: Mutex::new(Some(Arc::downgrade(parent))),
            lock: NodeLock::new(),
            children: UnsafeCell::new(Map::default()),
        })
    }

    /// The current parent, or `None` if this is the root.
    ///
    /// Reattachment under `move_dir` always happens while this node's own
    /// parent-to-be-old is write-locked by the caller, so the upgrade never
    /// races a concurrent `set_parent`.
    pub(crate) fn parent(&self) -> Option<Arc<NodeData>> {
        self.parent.lock().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_parent(&self, new_parent: &Arc<NodeData>) {
        *self.parent.lock() = Some(Arc::downgrade(new_parent));
    }

    pub(crate) fn read(self: &Arc<Self>) -> ReadGuard {
        self.lock.reader_lock();
        ReadGuard {
            node: Arc::clone(self),
        }
    }

    pub(crate) fn write(self: &Arc<Self>) -> WriteGuard {
        self.lock.writer_lock();
        WriteGuard {
            node: Arc::clone(self),
        }
    }

    pub(crate) fn enter_subtree(&self) {
        self.lock.enter_subtree();
    }

    pub(crate) fn leave_subtree(&self) {
        self.lock.leave_subtree();
    }

    pub(crate) fn wait_quiescent(&self) {
        self.lock.wait_quiescent();
    }

    #[cfg(test)]
    pub(crate) fn lock_counters(&self) -> crate::lock::Counters {
        self.lock.counters()
    }
}

/// A held read lock on a node's children.
pub(crate) struct ReadGuard {
    node: Arc<NodeData>,
}

impl ReadGuard {
    pub(crate) fn node(&self) -> &Arc<NodeData> {
        &self.node
    }
}

impl Deref for ReadGuard {
    type Target = Map<Box<str>, Arc<NodeData>>;

    fn deref(&self) -> &Self::Target {
        // SAFETY: holding a `ReadGuard` implies `reader_lock` succeeded, so
        // no writer can hold a mutable view concurrently.
        unsafe { &*self.node.children.get() }
    }
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        self.node.lock.reader_unlock();
    }
}

/// A held write lock on a node's children.
pub(crate) struct WriteGuard {
    node: Arc<NodeData>,
}

impl WriteGuard {
    pub(crate) fn node(&self) -> &Arc<NodeData> {
        &self.node
    }
}

impl Deref for WriteGuard {
    type Target = Map<Box<str>, Arc<NodeData>>;

    fn deref(&self) -> &Self::Target {
        // SAFETY: see `ReadGuard::deref`; a `WriteGuard` additionally
        // excludes every reader.
        unsafe { &*self.node.children.get() }
    }
}

impl DerefMut for WriteGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.node.children.get() }
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.node.lock.writer_unlock();
    }
}

/// Either kind of guard, used where a traversal step doesn't yet know
/// whether it holds the final read or write lock for a path.
pub(crate) enum Locked {
    Read(ReadGuard),
    Write(WriteGuard),
}

impl Locked {
    pub(crate) fn node(&self) -> &Arc<NodeData> {
        match self {
            Locked::Read(g) => g.node(),
            Locked::Write(g) => g.node(),
        }
    }

    pub(crate) fn children(&self) -> &Map<Box<str>, Arc<NodeData>> {
        match self {
            Locked::Read(g) => g,
            Locked::Write(g) => g,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut Map<Box<str>, Arc<NodeData>> {
        match self {
            Locked::Write(g) => g,
            Locked::Read(_) => panic!("children_mut called on a read-locked node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NodeData;

    #[test]
    fn new_child_links_back_to_parent() {
        let root = NodeData::new_root();
        let child = NodeData::new_child(&root);
        let parent = child.parent().expect("child has a parent");
        assert!(std::sync::Arc::ptr_eq(&parent, &root));
    }

    #[test]
    fn read_then_write_round_trips_children() {
        let root = NodeData::new_root();
        let child = NodeData::new_child(&root);
        {
            let mut guard = root.write();
            guard.insert(Box::from("a"), child);
        }
        {
            let guard = root.read();
            assert!(guard.contains("a"));
        }
    }
}
