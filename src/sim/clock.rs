//! Master clock: primary "tick" and secondary "tock" event trains.
//!
//! The primary train fires every `period`; the secondary train starts after an
//! initial delay of `period / 10` and then also fires every `period`, so a
//! component sampling on tocks always observes state already updated for the
//! enclosing tick. The primary train keeps re-arming while its dependent set is
//! empty (late registrants still find a live clock) and stops for good once the
//! set drains after having been non-empty.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use super::scheduler::{Process, Wait};

/// Shared virtual-time driver. Owns no energy state.
#[derive(Debug)]
pub struct Clock {
    period: f64,
    tock_offset: f64,
    running: bool,
    engaged: bool,
    boundaries: u64,
    tocks: u64,
    next_tick_at: f64,
    next_tock_at: f64,
    dependents: BTreeSet<String>,
}

impl Clock {
    /// Creates a clock with the given primary period in seconds.
    ///
    /// # Panics
    ///
    /// Panics if `period` is not a positive finite number.
    pub fn new(period: f64) -> Self {
        assert!(period > 0.0 && period.is_finite(), "period must be > 0");
        Self {
            period,
            tock_offset: period / 10.0,
            running: true,
            engaged: false,
            boundaries: 0,
            tocks: 0,
            next_tick_at: period,
            next_tock_at: period / 10.0,
            dependents: BTreeSet::new(),
        }
    }

    /// Primary period in seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Delay of the secondary train behind the primary, `period / 10`.
    pub fn tock_offset(&self) -> f64 {
        self.tock_offset
    }

    /// `false` once the primary train has stopped for good.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Absolute time of the next primary boundary.
    pub fn next_tick(&self) -> f64 {
        self.next_tick_at
    }

    /// Absolute time of the next secondary instant.
    pub fn next_tock(&self) -> f64 {
        self.next_tock_at
    }

    /// Registers `name` as depending on the primary train.
    pub fn attach(&mut self, name: &str) {
        tracing::info!(component = name, "clock dependency added");
        self.dependents.insert(name.to_string());
    }

    /// Removes `name` from the dependent set.
    ///
    /// A component that never detaches leaves the clock running forever; that
    /// is a caller obligation, not a recoverable condition.
    pub fn detach(&mut self, name: &str) {
        tracing::info!(component = name, "clock dependency removed");
        self.dependents.remove(name);
    }

    /// `true` while at least one component depends on the primary train.
    pub fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }
}

/// Primary event train. Spawned by the scheduler at construction.
pub(crate) struct TickTrain {
    clock: Rc<RefCell<Clock>>,
    started: bool,
}

impl TickTrain {
    pub(crate) fn new(clock: Rc<RefCell<Clock>>) -> Self {
        Self {
            clock,
            started: false,
        }
    }
}

impl Process for TickTrain {
    fn name(&self) -> &str {
        "clock-tick"
    }

    fn resume(&mut self, now: f64) -> Wait {
        let mut clock = self.clock.borrow_mut();
        if !self.started {
            self.started = true;
            tracing::info!(time = now, "clock start");
            return Wait::At(clock.next_tick_at);
        }

        // A boundary just fired. Boundary times are multiples of the period,
        // computed from the counter so waiter timestamps match exactly.
        clock.boundaries += 1;
        clock.next_tick_at = (clock.boundaries + 1) as f64 * clock.period;

        if clock.has_dependents() {
            clock.engaged = true;
            Wait::At(clock.next_tick_at)
        } else if clock.engaged {
            clock.running = false;
            tracing::info!(time = now, "clock stop");
            Wait::Done
        } else {
            // idle spin: keep the train alive for late registrants
            Wait::At(clock.next_tick_at)
        }
    }
}

/// Secondary event train, phase-shifted behind the primary.
pub(crate) struct TockTrain {
    clock: Rc<RefCell<Clock>>,
    started: bool,
}

impl TockTrain {
    pub(crate) fn new(clock: Rc<RefCell<Clock>>) -> Self {
        Self {
            clock,
            started: false,
        }
    }
}

impl Process for TockTrain {
    fn name(&self) -> &str {
        "clock-tock"
    }

    fn resume(&mut self, _now: f64) -> Wait {
        let mut clock = self.clock.borrow_mut();
        if !self.started {
            self.started = true;
            return Wait::At(clock.next_tock_at);
        }

        clock.tocks += 1;
        clock.next_tock_at = clock.tock_offset + clock.tocks as f64 * clock.period;

        if clock.running {
            Wait::At(clock.next_tock_at)
        } else {
            tracing::debug!("tock train stopped");
            Wait::Done
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scheduler::Scheduler;

    /// Attaches at spawn time, detaches after a fixed number of ticks.
    struct TickCounter {
        clock: Rc<RefCell<Clock>>,
        ticks_left: usize,
        attached: bool,
        seen: Rc<RefCell<Vec<f64>>>,
    }

    impl Process for TickCounter {
        fn name(&self) -> &str {
            "counter"
        }

        fn resume(&mut self, now: f64) -> Wait {
            if !self.attached {
                self.attached = true;
                self.clock.borrow_mut().attach(self.name());
                return Wait::Tick;
            }
            self.seen.borrow_mut().push(now);
            self.ticks_left -= 1;
            if self.ticks_left == 0 {
                self.clock.borrow_mut().detach(self.name());
                return Wait::Done;
            }
            Wait::Tick
        }
    }

    #[test]
    fn new_clock_phases() {
        let clock = Clock::new(0.5);
        assert_eq!(clock.next_tick(), 0.5);
        assert_eq!(clock.next_tock(), 0.05);
        assert!(clock.is_running());
        assert!(!clock.has_dependents());
    }

    #[test]
    #[should_panic]
    fn zero_period_panics() {
        Clock::new(0.0);
    }

    #[test]
    fn stops_within_one_period_of_last_detach() {
        let clock = Rc::new(RefCell::new(Clock::new(1.0)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut sched = Scheduler::new(clock.clone());
        sched.spawn(Box::new(TickCounter {
            clock: clock.clone(),
            ticks_left: 3,
            attached: false,
            seen: seen.clone(),
        }));
        sched.run();

        // ticks observed at 1, 2, 3; detach at 3; the train notices at 4
        assert_eq!(&*seen.borrow(), &[1.0, 2.0, 3.0]);
        assert!(!clock.borrow().is_running());
        assert!((sched.now() - 4.1).abs() < 1e-12); // final tock instant drains last
    }

    #[test]
    fn idle_clock_keeps_running_with_no_dependents() {
        let clock = Rc::new(RefCell::new(Clock::new(1.0)));
        let mut sched = Scheduler::new(clock.clone());
        sched.run_until(5.5);
        assert!(clock.borrow().is_running());
        assert!(!clock.borrow().has_dependents());
    }

    #[test]
    fn late_registrant_sees_a_live_clock() {
        let clock = Rc::new(RefCell::new(Clock::new(1.0)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut sched = Scheduler::new(clock.clone());
        // let the clock idle for a while before anything attaches
        sched.run_until(2.5);
        sched.spawn(Box::new(TickCounter {
            clock: clock.clone(),
            ticks_left: 2,
            attached: false,
            seen: seen.clone(),
        }));
        sched.run();

        assert_eq!(&*seen.borrow(), &[3.0, 4.0]);
        assert!(!clock.borrow().is_running());
    }
}
