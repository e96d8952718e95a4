//! The per-node bounded-waiting reader/writer lock and the subtree-activity
//! counter, both guarded by a single mutex the way the original C
//! implementation pairs `var_protection` with `r_count`/`w_count`/`r_wait`/
//! `w_wait`/`refcount`.

use parking_lot::{Condvar, Mutex, MutexGuard};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub(crate) r_count: usize,
    pub(crate) w_count: usize,
    pub(crate) r_wait: usize,
    pub(crate) w_wait: usize,
    pub(crate) subtree_refs: usize,
}

/// Synchronisation state of a single node: its bounded-waiting
/// reader/writer lock, plus the subtree-quiescence barrier used to wait out
/// in-flight operations before a `move_dir` detaches a subtree.
pub(crate) struct NodeLock {
    state: Mutex<Counters>,
    reader_cond: Condvar,
    writer_cond: Condvar,
    quiescent_cond: Condvar,
}

impl NodeLock {
    pub(crate) fn new() -> Self {
        NodeLock {
            state: Mutex::new(Counters::default()),
            reader_cond: Condvar::new(),
            writer_cond: Condvar::new(),
            quiescent_cond: Condvar::new(),
        }
    }

    /// Blocks until a read-lock is granted, deferring to any writer that is
    /// active or already waiting.
    pub(crate) fn reader_lock(&self) {
        let mut state = self.state.lock();
        if state.w_count + state.w_wait > 0 {
            state.r_wait += 1;
            while state.w_count > 0 {
                wait(&self.reader_cond, &mut state);
            }
            state.r_wait -= 1;
        }
        debug_assert_eq!(state.w_count, 0);
        state.r_count += 1;
    }

    pub(crate) fn reader_unlock(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.r_count > 0, "reader_unlock without a matching reader_lock");
        state.r_count -= 1;
        if state.r_count == 0 {
            self.writer_cond.notify_one();
        }
    }

    /// Blocks until a write-lock is granted. Exclusive of both readers and
    /// any other writer.
    pub(crate) fn writer_lock(&self) {
        let mut state = self.state.lock();
        while state.r_count + state.w_count > 0 {
            state.w_wait += 1;
            wait(&self.writer_cond, &mut state);
            state.w_wait -= 1;
        }
        debug_assert_eq!(state.r_count, 0);
        debug_assert_eq!(state.w_count, 0);
        state.w_count += 1;
    }

    pub(crate) fn writer_unlock(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.w_count, 1, "writer_unlock without a matching writer_lock");
        state.w_count -= 1;
        if state.r_wait > 0 {
            // Unblock the whole reader backlog at once, letting a burst of
            // `list`s proceed together before the next writer gets a turn.
            self.reader_cond.notify_all();
        } else {
            self.writer_cond.notify_one();
        }
    }

    /// Marks this node as traversed by an in-flight operation.
    pub(crate) fn enter_subtree(&self) {
        let mut state = self.state.lock();
        state.subtree_refs += 1;
    }

    /// Marks an in-flight operation as having retreated past this node.
    pub(crate) fn leave_subtree(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.subtree_refs > 0, "leave_subtree without a matching enter_subtree");
        state.subtree_refs -= 1;
        if state.subtree_refs == 0 {
            self.quiescent_cond.notify_one();
        }
    }

    /// Blocks until no operation is traversing this node's subtree.
    ///
    /// Only ever called by `move_dir` on a detached source whose parent is
    /// already write-locked, so `subtree_refs` is monotone non-increasing
    /// while this waits: the wait is bounded.
    pub(crate) fn wait_quiescent(&self) {
        let mut state = self.state.lock();
        while state.subtree_refs > 0 {
            tracing::debug!("waiting for subtree quiescence");
            wait(&self.quiescent_cond, &mut state);
        }
    }

    #[cfg(test)]
    pub(crate) fn counters(&self) -> Counters {
        *self.state.lock()
    }
}

/// Waits on `cond`, treating any reported error from the underlying
/// primitive as a programmer bug rather than a recoverable condition.
fn wait(cond: &Condvar, state: &mut MutexGuard<'_, Counters>) {
    cond.wait(state);
}
