//! Enable-flag toggler: flips a target on a schedule of delays.

use std::cell::RefCell;
use std::rc::Rc;

use crate::devices::types::Enable;

use super::clock::Clock;
use super::scheduler::{Process, Wait};

/// Sleeps each delay in turn (non-cumulative) and flips the target's enable
/// flag, stopping early if the clock stops running mid-schedule.
pub struct Toggler {
    clock: Rc<RefCell<Clock>>,
    target: Rc<RefCell<dyn Enable>>,
    delays: Vec<f64>,
    index: usize,
    started: bool,
}

impl Toggler {
    pub fn new(
        clock: Rc<RefCell<Clock>>,
        target: Rc<RefCell<dyn Enable>>,
        delays: Vec<f64>,
    ) -> Self {
        Self {
            clock,
            target,
            delays,
            index: 0,
            started: false,
        }
    }
}

impl Process for Toggler {
    fn name(&self) -> &str {
        "switch"
    }

    fn resume(&mut self, now: f64) -> Wait {
        if !self.started {
            self.started = true;
            return match self.delays.first() {
                Some(delay) => Wait::Delay(*delay),
                None => Wait::Done,
            };
        }

        if !self.clock.borrow().is_running() {
            return Wait::Done;
        }

        {
            let mut target = self.target.borrow_mut();
            let enabled = target.is_enabled();
            target.set_enabled(!enabled);
            tracing::debug!(time = now, enabled = !enabled, "switch toggled target");
        }

        self.index += 1;
        match self.delays.get(self.index) {
            Some(delay) => Wait::Delay(*delay),
            None => Wait::Done,
        }
    }
}
