//! Discrete-event scheduler driving all simulated processes.
//!
//! Cooperative suspension is expressed as a pull model: each process is resumed
//! at its scheduled instant and returns a [`Wait`] describing the next event it
//! suspends on. Equal-time entries fire in enqueue order (a strictly increasing
//! sequence number breaks ties), so the relative order of same-instant events is
//! the order in which the processes were registered.

use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::rc::Rc;

use super::clock::{Clock, TickTrain, TockTrain};

/// Identifier of a spawned process, assigned by [`Scheduler::spawn`].
pub type ProcessId = usize;

/// What a process suspends on after one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wait {
    /// Resume at the next primary clock boundary.
    Tick,
    /// Resume at the next secondary clock instant.
    Tock,
    /// Resume after a relative delay in seconds.
    Delay(f64),
    /// Resume at an absolute simulated time.
    At(f64),
    /// The process has terminated; it is never resumed again.
    Done,
}

/// A resumable simulated process.
pub trait Process {
    /// Short name used for clock bookkeeping and log output.
    fn name(&self) -> &str;

    /// Executes one step at simulated time `now` and returns the next suspension.
    fn resume(&mut self, now: f64) -> Wait;
}

/// One pending entry in the event queue.
struct Entry {
    time: f64,
    seq: u64,
    pid: ProcessId,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.time.total_cmp(&other.time) == Ordering::Equal && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Event queue plus the process table it dispatches into.
///
/// The scheduler owns every process; shared circuit state lives in
/// `Rc<RefCell<..>>` cells held by the process adapters. Construction spawns the
/// clock's two event trains, so tick/tock timestamps exist before any component
/// process is added.
pub struct Scheduler {
    now: f64,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Entry>>,
    slots: Vec<Option<Box<dyn Process>>>,
    clock: Rc<RefCell<Clock>>,
}

impl Scheduler {
    /// Creates a scheduler around a shared clock and starts its event trains.
    pub fn new(clock: Rc<RefCell<Clock>>) -> Self {
        let mut scheduler = Self {
            now: 0.0,
            next_seq: 0,
            queue: BinaryHeap::new(),
            slots: Vec::new(),
            clock: clock.clone(),
        };
        scheduler.spawn(Box::new(TickTrain::new(clock.clone())));
        scheduler.spawn(Box::new(TockTrain::new(clock)));
        scheduler
    }

    /// Current simulated time.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Shared handle to the clock driving this scheduler.
    pub fn clock(&self) -> Rc<RefCell<Clock>> {
        self.clock.clone()
    }

    /// Registers a process and schedules its first resume at the current time.
    ///
    /// Spawn order fixes the same-instant execution order at start-up.
    pub fn spawn(&mut self, process: Box<dyn Process>) -> ProcessId {
        let pid = self.slots.len();
        tracing::debug!(process = process.name(), pid, "spawn");
        self.slots.push(Some(process));
        self.enqueue(self.now, pid);
        pid
    }

    fn enqueue(&mut self, time: f64, pid: ProcessId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry { time, seq, pid }));
    }

    /// Runs until the event queue drains.
    ///
    /// A clock whose dependent set never becomes non-empty idles forever; use
    /// [`Scheduler::run_until`] for such setups.
    pub fn run(&mut self) {
        while self.step() {}
    }

    /// Runs events with time strictly less than `t_stop`, then sets the
    /// simulated time to `t_stop`.
    pub fn run_until(&mut self, t_stop: f64) {
        while let Some(Reverse(head)) = self.queue.peek() {
            if head.time >= t_stop {
                break;
            }
            self.step();
        }
        if self.now < t_stop {
            self.now = t_stop;
        }
    }

    /// Pops and dispatches one event. Returns `false` once the queue is empty.
    fn step(&mut self) -> bool {
        let Some(Reverse(entry)) = self.queue.pop() else {
            return false;
        };
        self.now = entry.time;

        // Take the process out of its slot for the duration of the step so the
        // scheduler is not borrowed while the process runs.
        let Some(mut process) = self.slots[entry.pid].take() else {
            return true;
        };
        let wait = process.resume(self.now);
        match wait {
            Wait::Done => {
                tracing::debug!(process = process.name(), time = self.now, "done");
            }
            Wait::Delay(dt) => {
                self.enqueue(self.now + dt, entry.pid);
                self.slots[entry.pid] = Some(process);
            }
            Wait::At(t) => {
                self.enqueue(t, entry.pid);
                self.slots[entry.pid] = Some(process);
            }
            Wait::Tick => {
                let next = {
                    let clock = self.clock.borrow();
                    clock.is_running().then(|| clock.next_tick())
                };
                if let Some(t) = next {
                    self.enqueue(t, entry.pid);
                    self.slots[entry.pid] = Some(process);
                }
            }
            Wait::Tock => {
                let next = {
                    let clock = self.clock.borrow();
                    clock.is_running().then(|| clock.next_tock())
                };
                if let Some(t) = next {
                    self.enqueue(t, entry.pid);
                    self.slots[entry.pid] = Some(process);
                }
            }
        }
        true
    }
}
