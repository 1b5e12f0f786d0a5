//! Boost-charger stage: operating-state machine plus energy/charge transfer.
//!
//! The harvester owns the update algorithm for both the storage and battery
//! capacitors. On every primary tick it converts the interval's harvested
//! energy into a charge delta against the storage capacitor; on every
//! secondary tock it re-evaluates the operating state and the battery-health
//! flag from the storage voltage. The converter never mutates the capacitors
//! directly: withdrawals go through [`Harvester::sink_energy`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::devices::capacitor::Capacitor;
use crate::devices::source::PowerSource;
use crate::devices::types::Enable;
use crate::sim::clock::Clock;
use crate::sim::scheduler::{Process, Wait};

/// Operating state of the boost charger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvesterState {
    /// Disabled; input power is fully discarded.
    Off,
    /// Below the boost-enable voltage; charging the storage capacitor alone.
    Cold,
    /// Normal boosting; storage is balanced against the battery.
    Warm,
    /// At the overvoltage ceiling; storage and battery only share charge.
    Full,
}

impl HarvesterState {
    /// Lowercase state name as emitted in logs and exports.
    pub fn as_str(self) -> &'static str {
        match self {
            HarvesterState::Off => "off",
            HarvesterState::Cold => "cold",
            HarvesterState::Warm => "warm",
            HarvesterState::Full => "full",
        }
    }
}

impl fmt::Display for HarvesterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// bq25570-style trigger voltages, in volts.
///
/// `coldstart` and `bat_uv` are carried for completeness; the transition rule
/// uses `chgen`, `bat_ov`, and (for battery health) `bat_ok`.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Coldstart trigger.
    pub coldstart: f64,
    /// Main boost trigger; also the battery precharge voltage.
    pub chgen: f64,
    /// Battery undervoltage limit.
    pub bat_uv: f64,
    /// Battery-health threshold gating the converter.
    pub bat_ok: f64,
    /// Battery overvoltage limit; boost stops and charge is clamped here.
    pub bat_ov: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            coldstart: 0.1,
            chgen: 1.73,
            bat_uv: 2.0,
            bat_ok: 2.5,
            bat_ov: 5.5,
        }
    }
}

/// Per-state loss factors. The derate applied to input power is `1 - loss`;
/// the off state is fully lossy (factor 0).
#[derive(Debug, Clone, Copy)]
pub struct LossFactors {
    pub cold: f64,
    pub warm: f64,
}

impl Default for LossFactors {
    fn default() -> Self {
        Self {
            cold: 0.95,
            warm: 0.25,
        }
    }
}

/// Append-only `(time, state)` log, one pair of entries per transition.
///
/// Each transition is recorded twice at the same instant, once under the
/// previous state and once under the new one, bracketing the discontinuity for
/// step-plot rendering.
#[derive(Debug, Clone, Default)]
pub struct StateLog {
    pub times: Vec<f64>,
    pub states: Vec<HarvesterState>,
}

impl StateLog {
    fn push(&mut self, time: f64, state: HarvesterState) {
        self.times.push(time);
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Number of actual state changes recorded.
    pub fn transitions(&self) -> usize {
        self.states.windows(2).filter(|w| w[0] != w[1]).count()
    }
}

/// The boost-charger half of the power-management circuit.
pub struct Harvester {
    clock: Rc<RefCell<Clock>>,
    input: Rc<RefCell<PowerSource>>,
    storage: Rc<RefCell<Capacitor>>,
    battery: Rc<RefCell<Capacitor>>,
    state: HarvesterState,
    log: StateLog,
    enabled: bool,
    input_impedance: f64,
    thresholds: Thresholds,
    losses: LossFactors,
    battery_ok: bool,
    prev_input_time: f64,
    last_energy_delta: f64,
    last_charge_delta: f64,
}

impl Harvester {
    /// Creates a harvester wired to its input source and capacitor pair.
    ///
    /// The state starts `off` and is seeded into the log at time zero; the
    /// battery precharge happens when the tick process starts.
    pub fn new(
        clock: Rc<RefCell<Clock>>,
        input: Rc<RefCell<PowerSource>>,
        storage: Rc<RefCell<Capacitor>>,
        battery: Rc<RefCell<Capacitor>>,
        thresholds: Thresholds,
        losses: LossFactors,
        enabled: bool,
    ) -> Self {
        let input_impedance = input.borrow().impedance();
        let mut log = StateLog::default();
        log.push(0.0, HarvesterState::Off);
        Self {
            clock,
            input,
            storage,
            battery,
            state: HarvesterState::Off,
            log,
            enabled,
            input_impedance,
            thresholds,
            losses,
            battery_ok: false,
            prev_input_time: 0.0,
            last_energy_delta: 0.0,
            last_charge_delta: 0.0,
        }
    }

    /// Current operating state.
    pub fn state(&self) -> HarvesterState {
        self.state
    }

    /// State-change log.
    pub fn log(&self) -> &StateLog {
        &self.log
    }

    /// Battery-health flag, recomputed every tock as
    /// `storage voltage >= bat_ok`.
    pub fn battery_ok(&self) -> bool {
        self.battery_ok
    }

    /// Configured thresholds.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Internal impedance facing the source, mirrored from the input.
    pub fn input_impedance(&self) -> f64 {
        self.input_impedance
    }

    /// Joint energy of the storage and battery capacitors, joules.
    pub fn stored_energy(&self) -> f64 {
        self.storage.borrow().energy() + self.battery.borrow().energy()
    }

    /// Energy delta of the last tick, joules.
    pub fn last_energy_delta(&self) -> f64 {
        self.last_energy_delta
    }

    /// Charge delta applied by the last boost, coulombs.
    pub fn last_charge_delta(&self) -> f64 {
        self.last_charge_delta
    }

    /// Appends a final `(now, current state)` entry so the log renders as a
    /// complete step plot. Call once after the run ends.
    pub fn close_log(&mut self, now: f64) {
        let state = self.state;
        self.log.push(now, state);
    }

    /// Loss factor of the current state.
    fn loss(&self) -> f64 {
        match self.state {
            HarvesterState::Cold => self.losses.cold,
            HarvesterState::Warm | HarvesterState::Full => self.losses.warm,
            HarvesterState::Off => 1.0,
        }
    }

    /// One primary-tick step: query input power, derate it, convert the
    /// interval's energy to a charge delta, and dispatch by state.
    ///
    /// Returns `false` once the input reports no value; the run loop then
    /// terminates.
    fn harvest_step(&mut self, now: f64) -> bool {
        let Some(power) = self.input.borrow_mut().power(now) else {
            return false;
        };
        let dt = now - self.prev_input_time;
        self.prev_input_time = now;

        let derated = power * (1.0 - self.loss());
        let du = derated * dt;

        // Solve U1 = U0 + dU for the new charge instead of assuming a fixed
        // voltage over the interval: Q1 = sqrt(2*C*(U0 + dU)).
        let (q0, u0, c) = {
            let storage = self.storage.borrow();
            (storage.charge(), storage.energy(), storage.capacitance())
        };
        let q1 = ((u0 + du) * 2.0 * c).sqrt();
        let dq = q1 - q0;

        match self.state {
            HarvesterState::Cold | HarvesterState::Warm => self.boost(dq),
            // In full, storage and battery already share as one reservoir;
            // crediting dq here would double-count.
            HarvesterState::Full => self.balance(),
            HarvesterState::Off => {}
        }
        self.last_energy_delta = du;
        true
    }

    /// Adds freshly harvested charge to storage, then balances against the
    /// battery when the state calls for it.
    pub fn boost(&mut self, dq: f64) {
        self.storage.borrow_mut().add_charge(dq);
        if matches!(self.state, HarvesterState::Warm | HarvesterState::Full) {
            self.balance();
        }
        self.last_charge_delta = dq;
    }

    /// Redistributes charge between storage and battery until their voltages
    /// match, conserving total charge; then clamps both to the overvoltage
    /// limit if exceeded (the one energy-discarding step in the model).
    pub fn balance(&mut self) {
        let mut storage = self.storage.borrow_mut();
        let mut battery = self.battery.borrow_mut();
        let dq = (storage.charge() * battery.capacitance()
            - battery.charge() * storage.capacitance())
            / (storage.capacitance() + battery.capacitance());
        storage.add_charge(-dq);
        battery.add_charge(dq);

        if storage.voltage() >= self.thresholds.bat_ov {
            storage.set_voltage(self.thresholds.bat_ov);
            battery.set_voltage(self.thresholds.bat_ov);
        }
    }

    /// Withdraws (or injects, for positive `du`) energy against the joint
    /// storage+battery reservoir. Used by the converter; a withdrawal is
    /// algebraically a negative boost.
    pub fn sink_energy(&mut self, du: f64) {
        let (u0, q0, c) = {
            let storage = self.storage.borrow();
            let battery = self.battery.borrow();
            (
                storage.energy() + battery.energy(),
                storage.charge() + battery.charge(),
                storage.capacitance() + battery.capacitance(),
            )
        };
        let q1 = ((u0 + du) * 2.0 * c).sqrt();
        self.boost(q1 - q0);
    }

    /// One secondary-tock step: recompute battery health and the operating
    /// state from the storage voltage. First matching rule wins; a change is
    /// logged under both the previous and the new state at the same instant.
    fn evaluate_state(&mut self, now: f64) {
        let voltage = self.storage.borrow().voltage();
        self.battery_ok = voltage >= self.thresholds.bat_ok;

        let previous = self.state;
        let next = if !self.enabled {
            Some(HarvesterState::Off)
        } else if voltage < self.thresholds.chgen {
            Some(HarvesterState::Cold)
        } else if voltage < self.thresholds.bat_ov * 0.999 {
            Some(HarvesterState::Warm)
        } else if voltage >= self.thresholds.bat_ov * 0.999 {
            Some(HarvesterState::Full)
        } else {
            None
        };

        match next {
            Some(state) => {
                self.state = state;
                if previous != state {
                    self.log.push(now, previous);
                    self.log.push(now, state);
                    tracing::debug!(time = now, from = %previous, to = %state, "state change");
                }
            }
            None => {
                // unreachable with ordered thresholds; reaching it means a
                // threshold-configuration bug
                tracing::error!(voltage, "state machine matched no rule; keeping previous state");
            }
        }
    }
}

impl Enable for Harvester {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Primary-tick process: harvests until the input series is exhausted, then
/// unregisters from the clock.
pub struct HarvesterTask {
    harvester: Rc<RefCell<Harvester>>,
    started: bool,
}

impl HarvesterTask {
    pub fn new(harvester: Rc<RefCell<Harvester>>) -> Self {
        Self {
            harvester,
            started: false,
        }
    }
}

impl Process for HarvesterTask {
    fn name(&self) -> &str {
        "harvester"
    }

    fn resume(&mut self, now: f64) -> Wait {
        let mut hv = self.harvester.borrow_mut();
        if !self.started {
            self.started = true;
            // precharge the battery to the boost-enable voltage
            let chgen = hv.thresholds.chgen;
            hv.battery.borrow_mut().set_voltage(chgen);
            hv.clock.borrow_mut().attach(self.name());
        } else {
            hv.last_charge_delta = 0.0;
            hv.last_energy_delta = 0.0;
        }

        if hv.harvest_step(now) {
            Wait::Tick
        } else {
            hv.clock.borrow_mut().detach(self.name());
            Wait::Done
        }
    }
}

/// Secondary-tock process: drives [`Harvester::evaluate_state`] while the
/// clock runs. Registers no clock dependency of its own.
pub struct StateWatch {
    harvester: Rc<RefCell<Harvester>>,
}

impl StateWatch {
    pub fn new(harvester: Rc<RefCell<Harvester>>) -> Self {
        Self { harvester }
    }
}

impl Process for StateWatch {
    fn name(&self) -> &str {
        "harvester-state"
    }

    fn resume(&mut self, now: f64) -> Wait {
        let mut hv = self.harvester.borrow_mut();
        if !hv.clock.borrow().is_running() {
            return Wait::Done;
        }
        hv.evaluate_state(now);
        Wait::Tock
    }
}
