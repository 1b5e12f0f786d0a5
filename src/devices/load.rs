//! Algebraic two-of-three load: current, voltage, resistance.

use crate::devices::types::{Enable, OPEN_CIRCUIT_OHMS, OutputLoad};
use crate::error::CircuitError;

/// A fixed DC load holding at most two of {current, voltage, resistance}.
///
/// The third quantity and the power draw are derived on read via Ohm's law.
/// A write that would fix a third quantity when the other two are already set
/// is rejected and leaves the node unchanged. While disabled, derived reads
/// report zero (or an open circuit for resistance) regardless of the fixed
/// quantities.
///
/// # Examples
///
/// ```
/// use harvest_sim::devices::LoadSink;
///
/// let mut sink = LoadSink::constant_current("load", 0.05);
/// sink.set_voltage(2.5).unwrap();
/// assert_eq!(sink.power(), Some(0.125));
/// ```
#[derive(Debug, Clone)]
pub struct LoadSink {
    name: String,
    enabled: bool,
    current: Option<f64>,
    voltage: Option<f64>,
    resistance: Option<f64>,
}

impl LoadSink {
    /// Creates an empty, enabled load with no fixed quantities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            current: None,
            voltage: None,
            resistance: None,
        }
    }

    /// Creates a constant-current load.
    pub fn constant_current(name: impl Into<String>, amps: f64) -> Self {
        let mut sink = Self::new(name);
        sink.current = Some(amps);
        sink
    }

    /// Label used in probe and log output.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn reject(&self, quantity: &'static str) -> CircuitError {
        tracing::warn!(load = %self.name, quantity, "write rejected: already determined");
        CircuitError::OverDeterminedLoad { quantity }
    }

    /// Fixes or updates the load current.
    ///
    /// # Errors
    ///
    /// Rejected when voltage and resistance are both fixed and the current is
    /// not: the triple would become over-determined.
    pub fn set_current(&mut self, amps: f64) -> Result<(), CircuitError> {
        if self.current.is_none() && self.voltage.is_some() && self.resistance.is_some() {
            return Err(self.reject("current"));
        }
        self.current = Some(amps);
        Ok(())
    }

    /// Fixes or updates the load voltage.
    ///
    /// # Errors
    ///
    /// Rejected when current and resistance are both fixed and the voltage is not.
    pub fn set_voltage(&mut self, volts: f64) -> Result<(), CircuitError> {
        if self.voltage.is_none() && self.current.is_some() && self.resistance.is_some() {
            return Err(self.reject("voltage"));
        }
        self.voltage = Some(volts);
        Ok(())
    }

    /// Fixes or updates the load resistance.
    ///
    /// # Errors
    ///
    /// Rejected when current and voltage are both fixed and the resistance is not.
    pub fn set_resistance(&mut self, ohms: f64) -> Result<(), CircuitError> {
        if self.resistance.is_none() && self.current.is_some() && self.voltage.is_some() {
            return Err(self.reject("resistance"));
        }
        self.resistance = Some(ohms);
        Ok(())
    }

    /// Clears the fixed current.
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Clears the fixed voltage.
    pub fn clear_voltage(&mut self) {
        self.voltage = None;
    }

    /// Clears the fixed resistance.
    pub fn clear_resistance(&mut self) {
        self.resistance = None;
    }

    /// Load current in amperes; `None` plus a diagnostic when under-determined.
    pub fn current(&self) -> Option<f64> {
        if !self.enabled {
            return Some(0.0);
        }
        match (self.current, self.voltage, self.resistance) {
            (Some(i), _, _) => Some(i),
            (None, Some(v), Some(r)) => Some(v / r),
            _ => {
                tracing::warn!(load = %self.name, "current read needs voltage and resistance");
                None
            }
        }
    }

    /// Load voltage in volts.
    pub fn voltage(&self) -> Option<f64> {
        if !self.enabled {
            return Some(0.0);
        }
        match (self.voltage, self.current, self.resistance) {
            (Some(v), _, _) => Some(v),
            (None, Some(i), Some(r)) => Some(i * r),
            _ => {
                tracing::warn!(load = %self.name, "voltage read needs current and resistance");
                None
            }
        }
    }

    /// Load resistance in ohms; an open circuit while disabled.
    pub fn resistance(&self) -> Option<f64> {
        if !self.enabled {
            return Some(OPEN_CIRCUIT_OHMS);
        }
        match (self.resistance, self.voltage, self.current) {
            (Some(r), _, _) => Some(r),
            (None, Some(v), Some(i)) => Some(v / i),
            _ => {
                tracing::warn!(load = %self.name, "resistance read needs voltage and current");
                None
            }
        }
    }

    /// Power draw in watts, derived from whichever two quantities are fixed.
    pub fn power(&self) -> Option<f64> {
        if !self.enabled {
            return Some(0.0);
        }
        match (self.voltage, self.current, self.resistance) {
            (Some(v), Some(i), _) => Some(v * i),
            (Some(v), None, Some(r)) => Some(v * v / r),
            (None, Some(i), Some(r)) => Some(i * i * r),
            _ => {
                tracing::warn!(load = %self.name, "power read needs two of current, voltage, resistance");
                None
            }
        }
    }
}

impl Enable for LoadSink {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl OutputLoad for LoadSink {
    fn set_voltage(&mut self, volts: f64) -> Result<(), CircuitError> {
        LoadSink::set_voltage(self, volts)
    }

    fn current(&mut self, _now: f64) -> Option<f64> {
        LoadSink::current(self)
    }

    fn power(&mut self, _now: f64) -> Option<f64> {
        LoadSink::power(self)
    }
}
