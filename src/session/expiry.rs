//! Session expiry scheduling.
//!
//! One background loop drains a min-heap of (deadline, session id) pairs
//! and invokes the expiry callback for each due entry. Cancelling a
//! session removes it from consideration before its timer fires, so no
//! callback ever runs for storage that was already released.

use parking_lot::{Condvar, Mutex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::debug;

type ExpiryCallback = Box<dyn Fn(&str) + Send + Sync>;

struct SchedulerState {
    heap: BinaryHeap<Reverse<(Instant, String)>>,
    cancelled: HashSet<String>,
    shutdown: bool,
}

struct SchedulerShared {
    state: Mutex<SchedulerState>,
    wakeup: Condvar,
}

/// Min-heap expiry scheduler driven by a single background thread.
pub(crate) struct ExpiryScheduler {
    shared: Arc<SchedulerShared>,
    worker: Option<JoinHandle<()>>,
}

impl ExpiryScheduler {
    /// Start the background loop. The callback runs on the scheduler
    /// thread once per expired session id.
    pub(crate) fn start(callback: ExpiryCallback) -> Self {
        let shared = Arc::new(SchedulerShared {
            state: Mutex::new(SchedulerState {
                heap: BinaryHeap::new(),
                cancelled: HashSet::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("session-expiry".into())
            .spawn(move || run_loop(&worker_shared, &callback))
            .expect("spawn expiry thread");

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Schedule a session to expire at `deadline`.
    pub(crate) fn schedule(&self, id: &str, deadline: Instant) {
        let mut state = self.shared.state.lock();
        // Re-scheduling supersedes a prior cancellation of the same id.
        state.cancelled.remove(id);
        state.heap.push(Reverse((deadline, id.to_string())));
        drop(state);
        self.shared.wakeup.notify_one();
    }

    /// Cancel a pending expiry; the timer entry is discarded when it
    /// surfaces in the heap.
    pub(crate) fn cancel(&self, id: &str) {
        self.shared.state.lock().cancelled.insert(id.to_string());
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
        }
        self.shared.wakeup.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_loop(shared: &SchedulerShared, callback: &ExpiryCallback) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }

        let next_deadline = loop {
            match state.heap.peek() {
                None => break None,
                Some(Reverse((deadline, id))) => {
                    if state.cancelled.contains(id) {
                        let id = id.clone();
                        state.heap.pop();
                        state.cancelled.remove(&id);
                        continue;
                    }
                    break Some(*deadline);
                }
            }
        };

        match next_deadline {
            None => {
                shared.wakeup.wait(&mut state);
            }
            Some(deadline) if deadline <= Instant::now() => {
                let Some(Reverse((_, id))) = state.heap.pop() else {
                    continue;
                };
                // Run the callback unlocked so it may take other locks.
                drop(state);
                debug!(session = %id, "session TTL elapsed");
                callback(&id);
                state = shared.state.lock();
            }
            Some(deadline) => {
                let _ = shared.wakeup.wait_until(&mut state, deadline);
            }
        }
    }
}
