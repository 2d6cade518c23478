//! FIFO reader/writer admission for cache operations.
//!
//! Readers (lookups) may run concurrently with each other; writers (inserts
//! and deletes, which can trigger eviction) run alone. Admission is strictly
//! first-come-first-served: a late-arriving reader never jumps ahead of a
//! queued writer, which rules out starvation on both sides.
//!
//! ## Admission rules
//!
//! - A read is admitted immediately when no writer is active **and** no one
//!   is queued; otherwise it waits in line.
//! - A write is admitted immediately when nothing is active and no one is
//!   queued; otherwise it waits in line.
//! - On every release the queue head is reconsidered: a writer at the head
//!   is admitted once the active reader count reaches zero; a reader at the
//!   head is admitted together with every contiguous reader behind it.
//!
//! ## Shape
//!
//! One mutex guards the whole state (active counts, waiter queue, granted
//! tickets); one condvar wakes sleepers, which re-check whether their
//! ticket was granted. [`acquire_read`](AccessGate::acquire_read) and
//! [`acquire_write`](AccessGate::acquire_write) return scoped passes that
//! release on drop, so release happens on every exit path.
//!
//! Waiters block until admitted; there is no timeout or cancellation. The
//! gate serializes *operations*, not value lifetimes — a value handle
//! obtained under a read pass stays valid after the pass drops (the entry's
//! own reader count takes over from there).
use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessKind {
    Read,
    Write,
}

#[derive(Debug)]
struct Waiter {
    ticket: u64,
    kind: AccessKind,
}

#[derive(Debug, Default)]
struct GateState {
    readers_active: usize,
    writer_active: bool,
    next_ticket: u64,
    queue: VecDeque<Waiter>,
    granted: FxHashSet<u64>,
}

/// FIFO reader/writer gate over a shared cache.
#[derive(Debug, Default)]
pub struct AccessGate {
    state: Mutex<GateState>,
    wakeup: Condvar,
}

impl AccessGate {
    /// Creates an idle gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for read admission and returns a scoped pass.
    pub fn acquire_read(&self) -> ReadPass<'_> {
        let mut state = self.state.lock();
        if state.queue.is_empty() && !state.writer_active {
            state.readers_active += 1;
        } else {
            let ticket = enqueue(&mut state, AccessKind::Read);
            while !state.granted.remove(&ticket) {
                self.wakeup.wait(&mut state);
            }
        }
        ReadPass { gate: self }
    }

    /// Waits for exclusive write admission and returns a scoped pass.
    pub fn acquire_write(&self) -> WritePass<'_> {
        let mut state = self.state.lock();
        if state.queue.is_empty() && !state.writer_active && state.readers_active == 0 {
            state.writer_active = true;
        } else {
            let ticket = enqueue(&mut state, AccessKind::Write);
            while !state.granted.remove(&ticket) {
                self.wakeup.wait(&mut state);
            }
        }
        WritePass { gate: self }
    }

    /// Number of readers currently admitted.
    pub fn readers_active(&self) -> usize {
        self.state.lock().readers_active
    }

    /// Returns `true` while a writer is admitted.
    pub fn writer_active(&self) -> bool {
        self.state.lock().writer_active
    }

    /// Number of waiters currently queued.
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn release_read(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.readers_active > 0);
        state.readers_active -= 1;
        self.admit(&mut state);
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.writer_active);
        state.writer_active = false;
        self.admit(&mut state);
    }

    /// Admits the longest admissible prefix of the waiter queue.
    ///
    /// Grants are recorded while holding the state mutex; sleepers re-check
    /// their ticket after each wakeup, so a stray wakeup is harmless.
    fn admit(&self, state: &mut GateState) {
        let mut woke = false;
        match state.queue.front().map(|waiter| waiter.kind) {
            Some(AccessKind::Write) => {
                if !state.writer_active && state.readers_active == 0 {
                    if let Some(waiter) = state.queue.pop_front() {
                        state.writer_active = true;
                        state.granted.insert(waiter.ticket);
                        woke = true;
                    }
                }
            }
            Some(AccessKind::Read) => {
                if !state.writer_active {
                    while matches!(state.queue.front(), Some(w) if w.kind == AccessKind::Read) {
                        if let Some(waiter) = state.queue.pop_front() {
                            state.readers_active += 1;
                            state.granted.insert(waiter.ticket);
                            woke = true;
                        }
                    }
                }
            }
            None => {}
        }
        if woke {
            self.wakeup.notify_all();
        }
    }
}

fn enqueue(state: &mut GateState, kind: AccessKind) -> u64 {
    let ticket = state.next_ticket;
    state.next_ticket += 1;
    state.queue.push_back(Waiter { ticket, kind });
    ticket
}

/// Scoped read admission; dropped to release.
#[must_use = "dropping the pass releases read admission immediately"]
#[derive(Debug)]
pub struct ReadPass<'a> {
    gate: &'a AccessGate,
}

impl Drop for ReadPass<'_> {
    fn drop(&mut self) {
        self.gate.release_read();
    }
}

/// Scoped exclusive write admission; dropped to release.
#[must_use = "dropping the pass releases write admission immediately"]
#[derive(Debug)]
pub struct WritePass<'a> {
    gate: &'a AccessGate,
}

impl Drop for WritePass<'_> {
    fn drop(&mut self) {
        self.gate.release_write();
    }
}
