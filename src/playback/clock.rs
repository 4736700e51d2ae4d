//! One-shot timer scheduling for the playback loop.
//!
//! The player never sleeps. It arms one timer at a time through [`Scheduler`] and is told
//! which timer fired by its host. [`ManualScheduler`] drives time by hand for deterministic
//! tests; [`ThreadScheduler`] delivers fired timers from a background thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

pub trait Scheduler {
    /// Arms a timer that fires once after `delay`.
    fn schedule_once(&mut self, delay: Duration) -> TimerId;

    /// Disarms `id`. Cancelling an unknown or already fired timer is a no-op.
    fn cancel(&mut self, id: TimerId);
}

/// Virtual clock: time only moves when the caller advances it.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: Vec<(Duration, TimerId)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Delay until the earliest armed timer, if any.
    pub fn next_delay(&self) -> Option<Duration> {
        self.pending
            .iter()
            .map(|(due, _)| due.saturating_sub(self.now))
            .min()
    }

    /// Moves time forward by `by`, returning the timers that fired in due order.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        self.now += by;
        let now = self.now;
        let mut fired: Vec<(Duration, TimerId)> = Vec::new();
        self.pending.retain(|entry| {
            if entry.0 <= now {
                fired.push(*entry);
                false
            } else {
                true
            }
        });
        fired.sort();
        fired.into_iter().map(|(_, id)| id).collect()
    }

    /// Jumps straight to the earliest armed timer and fires it.
    pub fn advance_to_next(&mut self) -> Option<TimerId> {
        let (index, &(due, id)) = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| **entry)?;
        self.pending.swap_remove(index);
        self.now = self.now.max(due);
        Some(id)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push((self.now + delay, id));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|(_, pending_id)| *pending_id != id);
    }
}

#[derive(Debug, Default)]
struct TimerQueue {
    pending: Vec<(Instant, TimerId)>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<TimerQueue>,
    wakeup: Condvar,
}

/// Real-time scheduler backed by one worker thread.
///
/// Fired ids arrive on the receiver returned from [`ThreadScheduler::new`]. A timer cancelled
/// before its deadline is never sent; the owner must still ignore ids it no longer waits for,
/// since a send can race a cancel.
pub struct ThreadScheduler {
    shared: Arc<Shared>,
    next_id: u64,
    worker: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    pub fn new() -> (Self, Receiver<TimerId>) {
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("cast-playback-clock".to_string())
            .spawn(move || run_worker(&worker_shared, &sender))
            .ok();
        if worker.is_none() {
            tracing::warn!("failed to spawn playback clock thread; timers will not fire");
        }

        (
            Self {
                shared,
                next_id: 0,
                worker,
            },
            receiver,
        )
    }

    /// Stops the worker. Pending timers are dropped without firing.
    pub fn shutdown(&mut self) {
        {
            let mut queue = lock_unpoisoned(&self.shared.queue);
            queue.shutdown = true;
            queue.pending.clear();
        }
        self.shared.wakeup.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let deadline = Instant::now()
            .checked_add(delay)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400));
        lock_unpoisoned(&self.shared.queue)
            .pending
            .push((deadline, id));
        self.shared.wakeup.notify_all();
        id
    }

    fn cancel(&mut self, id: TimerId) {
        lock_unpoisoned(&self.shared.queue)
            .pending
            .retain(|(_, pending_id)| *pending_id != id);
        self.shared.wakeup.notify_all();
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared, sender: &Sender<TimerId>) {
    let mut queue = lock_unpoisoned(&shared.queue);
    loop {
        if queue.shutdown {
            return;
        }

        let now = Instant::now();
        let mut due: Vec<(Instant, TimerId)> = Vec::new();
        queue.pending.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort();
        for (_, id) in due {
            if sender.send(id).is_err() {
                return;
            }
        }

        let next_deadline = queue.pending.iter().map(|(deadline, _)| *deadline).min();
        queue = match next_deadline {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(now);
                match shared.wakeup.wait_timeout(queue, timeout) {
                    Ok((guard, _)) => guard,
                    Err(poisoned) => poisoned.into_inner().0,
                }
            }
            None => match shared.wakeup.wait(queue) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            },
        };
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
