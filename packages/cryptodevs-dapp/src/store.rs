//! Observable session state.
//!
//! A `watch` channel holds the single [`SessionState`]. Each connect opens a
//! new epoch; writers tagged with an older epoch are ignored, so a task that
//! outlives its session cannot touch the next one.

use cryptodevs_types::{ConnectedState, SessionState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
    epoch: Arc<AtomicU64>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Disconnected);
        Self {
            tx: Arc::new(tx),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Open a new epoch in `Connecting` state, invalidating all older writers.
    pub fn begin(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(SessionState::Connecting);
        epoch
    }

    /// Replace the state if `epoch` is still current.
    pub fn set_if_current(&self, epoch: u64, state: SessionState) -> bool {
        self.tx.send_if_modified(|s| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *s = state;
            true
        })
    }

    /// Close `epoch` and return to `Disconnected`. No-op for a stale epoch.
    pub fn end(&self, epoch: u64) -> bool {
        if self
            .epoch
            .compare_exchange(epoch, epoch + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.tx.send_replace(SessionState::Disconnected);
        true
    }

    /// Mutate the connected state of `epoch`. `None` if the session is gone.
    pub fn update<R>(&self, epoch: u64, f: impl FnOnce(&mut ConnectedState) -> R) -> Option<R> {
        let mut out = None;
        self.tx.send_if_modified(|s| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            match s.connected_mut() {
                Some(c) => {
                    out = Some(f(c));
                    true
                }
                None => false,
            }
        });
        out
    }

    /// Read from the connected state of `epoch`.
    pub fn read<R>(&self, epoch: u64, f: impl FnOnce(&ConnectedState) -> R) -> Option<R> {
        if self.current_epoch() != epoch {
            return None;
        }
        self.tx.borrow().connected().map(f)
    }
}
