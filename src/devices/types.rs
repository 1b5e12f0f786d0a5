//! Common traits and constants for circuit components.

use crate::error::CircuitError;

/// Resistance reported by a disabled node: effectively an open circuit.
pub const OPEN_CIRCUIT_OHMS: f64 = 1e15;

/// A component with a boolean enable flag.
///
/// Implemented by every switchable stage so the toggler can flip any of them
/// through a shared `Rc<RefCell<dyn Enable>>` handle.
pub trait Enable {
    /// Current enable flag.
    fn is_enabled(&self) -> bool;

    /// Overwrites the enable flag.
    fn set_enabled(&mut self, enabled: bool);
}

/// A current-producing load observed by the buck converter.
///
/// Either a fixed algebraic sink or a measured consumption profile can stand on
/// the converter's output; the converter publishes its output voltage into the
/// load once at start-up and then reads current and power per tick. `None`
/// means the load has no further value (an exhausted profile) and is the
/// converter's termination signal, not an error.
pub trait OutputLoad {
    /// Fixes the voltage across the load.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitError::OverDeterminedLoad`] if the voltage is already
    /// determined by other fixed quantities.
    fn set_voltage(&mut self, volts: f64) -> Result<(), CircuitError>;

    /// Load current in amperes at simulated time `now`.
    fn current(&mut self, now: f64) -> Option<f64>;

    /// Load power draw in watts at simulated time `now`.
    fn power(&mut self, now: f64) -> Option<f64>;
}
