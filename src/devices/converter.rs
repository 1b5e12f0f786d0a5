//! Buck-converter output stage.
//!
//! Every primary tick the converter computes the power its load demands,
//! derates it upward by the fixed loss fraction, and asks the harvester to
//! withdraw the interval's energy from the joint capacitor reservoir. It is
//! "on" only while enabled and the harvester reports battery health; while off
//! it reports zero voltage, current, and power, and withdraws nothing.

use std::cell::RefCell;
use std::rc::Rc;

use crate::devices::harvester::Harvester;
use crate::devices::types::{Enable, OutputLoad};
use crate::sim::clock::Clock;
use crate::sim::scheduler::{Process, Wait};

/// Default fraction of the transferred energy lost in conversion.
pub const DEFAULT_LOSS: f64 = 0.10;

/// The buck-converter half of the power-management circuit.
pub struct Converter {
    clock: Rc<RefCell<Clock>>,
    harvester: Rc<RefCell<Harvester>>,
    load: Rc<RefCell<dyn OutputLoad>>,
    output_voltage: f64,
    loss: f64,
    enabled: bool,
    prev_output_time: f64,
    last_energy_delta: f64,
}

impl Converter {
    /// Creates a converter drawing from `harvester` to satisfy `load`.
    ///
    /// # Panics
    ///
    /// Panics if `loss` is not in `[0, 1)`.
    pub fn new(
        clock: Rc<RefCell<Clock>>,
        harvester: Rc<RefCell<Harvester>>,
        load: Rc<RefCell<dyn OutputLoad>>,
        output_voltage: f64,
        loss: f64,
        enabled: bool,
    ) -> Self {
        assert!((0.0..1.0).contains(&loss), "loss must be in [0, 1)");
        Self {
            clock,
            harvester,
            load,
            output_voltage,
            loss,
            enabled,
            prev_output_time: 0.0,
            last_energy_delta: 0.0,
        }
    }

    /// Fixed loss fraction.
    pub fn loss(&self) -> f64 {
        self.loss
    }

    /// `true` only while enabled and the harvester reports battery health.
    pub fn is_on(&self) -> bool {
        self.enabled && self.harvester.borrow().battery_ok()
    }

    /// Output voltage: the fixed setting while on, zero while off.
    pub fn voltage(&self) -> f64 {
        if self.is_on() { self.output_voltage } else { 0.0 }
    }

    /// Output current: the load's current while on, zero while off.
    pub fn current(&mut self, now: f64) -> Option<f64> {
        if self.is_on() {
            self.load.borrow_mut().current(now)
        } else {
            Some(0.0)
        }
    }

    /// Output power: the load's demand while on, zero while off.
    pub fn power(&mut self, now: f64) -> Option<f64> {
        if self.is_on() {
            self.load.borrow_mut().power(now)
        } else {
            Some(0.0)
        }
    }

    /// Energy delta of the last tick, joules (negative for a withdrawal).
    pub fn last_energy_delta(&self) -> f64 {
        self.last_energy_delta
    }

    /// One primary-tick step: turn the load's demand over the elapsed interval
    /// into a withdrawal request. Returns `false` once the load reports no
    /// value (an exhausted consumption profile).
    fn draw_step(&mut self, now: f64) -> bool {
        let Some(power) = self.power(now) else {
            return false;
        };
        let dt = now - self.prev_output_time;
        self.prev_output_time = now;

        // the store must supply more than the load receives
        let demand = power / (1.0 - self.loss);
        self.buck(-(demand * dt));
        true
    }

    /// Routes an energy delta through the harvester while on.
    fn buck(&mut self, du: f64) {
        if self.is_on() {
            self.harvester.borrow_mut().sink_energy(du);
        }
        self.last_energy_delta = du;
    }
}

impl Enable for Converter {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Primary-tick process: draws load energy until the load reports no value or
/// the clock stops, then unregisters.
pub struct ConverterTask {
    converter: Rc<RefCell<Converter>>,
    started: bool,
}

impl ConverterTask {
    pub fn new(converter: Rc<RefCell<Converter>>) -> Self {
        Self {
            converter,
            started: false,
        }
    }
}

impl Process for ConverterTask {
    fn name(&self) -> &str {
        "converter"
    }

    fn resume(&mut self, now: f64) -> Wait {
        let mut cv = self.converter.borrow_mut();
        if !self.started {
            self.started = true;
            // publish the output voltage into the load so profile-backed
            // loads can derive their current draw
            let volts = cv.output_voltage;
            if let Err(err) = cv.load.borrow_mut().set_voltage(volts) {
                tracing::warn!(%err, "load rejected the converter output voltage");
            }
            cv.clock.borrow_mut().attach(self.name());
        }

        if cv.draw_step(now) && cv.clock.borrow().is_running() {
            Wait::Tick
        } else {
            cv.clock.borrow_mut().detach(self.name());
            Wait::Done
        }
    }
}
