//! End-of-run summary assembled from the circuit state.

use std::fmt;

use crate::devices::capacitor::Capacitor;
use crate::devices::harvester::{Harvester, HarvesterState};
use crate::devices::source::PowerSource;

/// Snapshot of the interesting end-of-run quantities.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Simulated duration in seconds.
    pub duration_s: f64,
    /// Harvester state at the end of the run.
    pub final_state: HarvesterState,
    /// Storage-capacitor voltage, volts.
    pub storage_voltage_v: f64,
    /// Battery-capacitor voltage, volts.
    pub battery_voltage_v: f64,
    /// Joint stored energy, joules.
    pub stored_energy_j: f64,
    /// Source utilization accumulator at the end of the run.
    pub source_utilization: f64,
    /// Whether the battery-health flag ended true.
    pub battery_ok: bool,
    /// Whether the converter ended up on (enabled and battery healthy).
    pub converter_on: bool,
    /// Number of state transitions recorded in the log.
    pub state_transitions: usize,
}

impl RunReport {
    /// Collects the report from the live circuit after the scheduler stops.
    pub fn collect(
        duration_s: f64,
        harvester: &Harvester,
        source: &PowerSource,
        storage: &Capacitor,
        battery: &Capacitor,
        converter_on: bool,
    ) -> Self {
        Self {
            duration_s,
            final_state: harvester.state(),
            storage_voltage_v: storage.voltage(),
            battery_voltage_v: battery.voltage(),
            stored_energy_j: harvester.stored_energy(),
            source_utilization: source.utilization(),
            battery_ok: harvester.battery_ok(),
            converter_on,
            state_transitions: harvester.log().transitions(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Report ---")?;
        writeln!(f, "Simulated time:     {:.3} s", self.duration_s)?;
        writeln!(f, "Final state:        {}", self.final_state)?;
        writeln!(f, "Storage voltage:    {:.4} V", self.storage_voltage_v)?;
        writeln!(f, "Battery voltage:    {:.4} V", self.battery_voltage_v)?;
        writeln!(f, "Stored energy:      {:.6e} J", self.stored_energy_j)?;
        writeln!(f, "Source utilization: {:.4}", self.source_utilization)?;
        writeln!(f, "Battery OK:         {}", self.battery_ok)?;
        writeln!(f, "Converter on:       {}", self.converter_on)?;
        write!(f, "State transitions:  {}", self.state_transitions)
    }
}
