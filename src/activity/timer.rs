use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A timer a state asked for that the registry has not spawned yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TimerRequest {
    pub(crate) name: String,
    pub(crate) delay: Duration,
    pub(crate) generation: u64,
}

struct Armed {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// Named, cancellable timers of one activity.
///
/// Every arming gets a fresh generation number; a firing timer must present the
/// generation it was armed with, so a callback that lost a race against a
/// cancellation or a re-arm is rejected by [`Timers::claim`].
#[derive(Default)]
pub(crate) struct Timers {
    armed: HashMap<String, Armed>,
    pending: Vec<TimerRequest>,
    generation: u64,
}

impl Timers {
    pub(crate) fn schedule(&mut self, name: &str, delay: Duration) {
        self.cancel(name);
        self.generation += 1;
        self.armed.insert(
            name.to_string(),
            Armed {
                generation: self.generation,
                handle: None,
            },
        );
        self.pending.push(TimerRequest {
            name: name.to_string(),
            delay,
            generation: self.generation,
        });
    }

    pub(crate) fn cancel(&mut self, name: &str) -> bool {
        self.pending.retain(|request| request.name != name);
        match self.armed.remove(name) {
            Some(armed) => {
                if let Some(handle) = armed.handle {
                    handle.abort();
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        self.pending.clear();
        for (_, armed) in self.armed.drain() {
            if let Some(handle) = armed.handle {
                handle.abort();
            }
        }
    }

    pub(crate) fn take_pending(&mut self) -> Vec<TimerRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Stores the task running `request`, or aborts it if the timer was cancelled meanwhile.
    pub(crate) fn attach(&mut self, request: &TimerRequest, handle: JoinHandle<()>) {
        match self.armed.get_mut(&request.name) {
            Some(armed) if armed.generation == request.generation => armed.handle = Some(handle),
            _ => handle.abort(),
        }
    }

    /// Disarms the timer if `generation` is still current. The caller is the
    /// firing task itself, so its handle is dropped, not aborted.
    pub(crate) fn claim(&mut self, name: &str, generation: u64) -> bool {
        match self.armed.get(name) {
            Some(armed) if armed.generation == generation => {
                self.armed.remove(name);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_armed(&self, name: &str) -> bool {
        self.armed.contains_key(name)
    }
}
