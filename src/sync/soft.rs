use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::Error;

/// How pending signals on a soft timeline are completed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Retire {
    /// `wait` completes pending signals in order until the target is reached,
    /// as if the gpu caught up instantly. Deterministic on a single thread.
    OnWait,
    /// Signals only complete through `Gpu::retire_one` / `Gpu::retire_all`,
    /// typically called from another thread standing in for the gpu.
    Manual,
}

#[derive(Default)]
struct State {
    completed: u64,
    pending: VecDeque<u64>,
    signalled: Vec<u64>,
    waits: Vec<u64>,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Timeline implemented with a mutex and condvar, signals queue up as pending
/// and complete strictly in submission order.
pub struct Timeline {
    shared: Arc<Shared>,
    retire: Retire,
}

/// Handle which plays the part of the gpu queue for a soft `Timeline`.
#[derive(Clone)]
pub struct Gpu {
    shared: Arc<Shared>,
}

impl Timeline {
    pub fn new(retire: Retire) -> Self {
        Timeline {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                cond: Condvar::new(),
            }),
            retire,
        }
    }

    /// Returns a handle which can complete signals, from any thread.
    pub fn gpu(&self) -> Gpu {
        Gpu {
            shared: self.shared.clone(),
        }
    }

    /// Every value passed to `signal`, in order.
    pub fn signalled(&self) -> Vec<u64> {
        self.shared.lock().signalled.clone()
    }

    /// Every value passed to `wait`, in order.
    pub fn waits(&self) -> Vec<u64> {
        self.shared.lock().waits.clone()
    }

    /// Number of signals the gpu has not completed yet.
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }
}

impl super::Timeline for Timeline {
    fn signal(&mut self, value: u64) -> Result<(), Error> {
        let mut state = self.shared.lock();
        if let Some(last) = state.signalled.last() {
            if value <= *last {
                return Err(Error {
                    msg: format!(
                        "dx12_samples::sync::soft:: signal {} is not greater than the previous signal {}",
                        value, last)
                });
            }
        }
        state.signalled.push(value);
        state.pending.push_back(value);
        self.shared.cond.notify_all();
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.shared.lock().completed
    }

    fn wait(&self, value: u64) -> Result<(), Error> {
        let mut state = self.shared.lock();
        state.waits.push(value);

        let highest = state.signalled.last().copied().unwrap_or(0);
        if value > highest {
            return Err(Error {
                msg: format!(
                    "dx12_samples::sync::soft:: wait for {} which was never signalled (highest {})",
                    value, highest)
            });
        }

        while state.completed < value {
            match self.retire {
                Retire::OnWait => {
                    if let Some(next) = state.pending.pop_front() {
                        state.completed = next;
                    }
                }
                Retire::Manual => {
                    state = self.shared.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        Ok(())
    }
}

impl Gpu {
    /// Completes the oldest pending signal, returning its value.
    pub fn retire_one(&self) -> Option<u64> {
        let mut state = self.shared.lock();
        let value = state.pending.pop_front()?;
        state.completed = value;
        self.shared.cond.notify_all();
        Some(value)
    }

    /// Completes every pending signal, returning how many were completed.
    pub fn retire_all(&self) -> usize {
        let mut state = self.shared.lock();
        let count = state.pending.len();
        if let Some(last) = state.pending.drain(..).last() {
            state.completed = last;
        }
        self.shared.cond.notify_all();
        count
    }

    /// Blocks until a signal is pending then completes it, returns `None` after `timeout`.
    pub fn retire_next(&self, timeout: std::time::Duration) -> Option<u64> {
        let state = self.shared.lock();
        let (mut state, _) = self.shared.cond
            .wait_timeout_while(state, timeout, |s| s.pending.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        let value = state.pending.pop_front()?;
        state.completed = value;
        self.shared.cond.notify_all();
        Some(value)
    }

    pub fn completed_value(&self) -> u64 {
        self.shared.lock().completed
    }
}
