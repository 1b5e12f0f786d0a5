//! Scope probes: sample one quantity once per secondary tock.
//!
//! A probe captures its quantity as a closure at construction time, so each
//! probe is statically wired to what it reads instead of looking attributes up
//! by name. Sampling stops permanently as soon as the sampled value becomes
//! undefined or the clock stops running, whichever happens first.

use std::cell::RefCell;
use std::rc::Rc;

use super::clock::Clock;
use super::scheduler::{Process, Wait};

/// Accessor capturing the probed quantity: `(now) -> optional value`.
pub type Sampler = Box<dyn FnMut(f64) -> Option<f64>>;

/// An append-only, time-ordered `(time, value)` record of one quantity.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    name: String,
    times: Vec<f64>,
    values: Vec<f64>,
}

impl Probe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Probe name, used for export file naming.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample instants, one per successful sample.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Sampled values, parallel to [`Probe::times`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    fn record(&mut self, time: f64, value: f64) {
        self.times.push(time);
        self.values.push(value);
    }
}

/// Tock-driven process filling a shared [`Probe`].
pub struct ProbeTask {
    clock: Rc<RefCell<Clock>>,
    probe: Rc<RefCell<Probe>>,
    sampler: Sampler,
    label: String,
    started: bool,
}

impl ProbeTask {
    pub fn new(clock: Rc<RefCell<Clock>>, probe: Rc<RefCell<Probe>>, sampler: Sampler) -> Self {
        let label = format!("probe:{}", probe.borrow().name());
        Self {
            clock,
            probe,
            sampler,
            label,
            started: false,
        }
    }
}

impl Process for ProbeTask {
    fn name(&self) -> &str {
        &self.label
    }

    fn resume(&mut self, now: f64) -> Wait {
        if !self.started {
            // no sample at spawn time; the first one lands on the first tock
            self.started = true;
            return Wait::Tock;
        }

        let Some(value) = (self.sampler)(now) else {
            tracing::debug!(probe = %self.label, time = now, "value undefined, probe stops");
            return Wait::Done;
        };
        self.probe.borrow_mut().record(now, value);

        if self.clock.borrow().is_running() {
            Wait::Tock
        } else {
            // one final sample lands on the tock after the clock stops
            Wait::Done
        }
    }
}
