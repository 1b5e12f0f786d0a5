//! Lumped capacitor model: stored charge with derived voltage and energy.

/// An energy storage element with fixed capacitance and mutable charge.
///
/// Voltage and energy are pure derivations of the charge (`V = Q/C`,
/// `U = C·V²/2`); the setters recompute the charge. There is no bounds
/// checking: negative or otherwise physically invalid charge propagates, and
/// preventing runaway negative voltage is the balancing algorithm's job.
///
/// # Examples
///
/// ```
/// use harvest_sim::devices::Capacitor;
///
/// let mut cap = Capacitor::new("stor", 4.7e-6);
/// cap.set_voltage(2.0);
/// assert!((cap.energy() - 9.4e-6).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Capacitor {
    name: String,
    capacitance: f64,
    charge: f64,
}

impl Capacitor {
    /// Creates a capacitor with zero initial charge.
    ///
    /// # Panics
    ///
    /// Panics if `capacitance` is not a positive finite number.
    pub fn new(name: impl Into<String>, capacitance: f64) -> Self {
        assert!(
            capacitance > 0.0 && capacitance.is_finite(),
            "capacitance must be > 0"
        );
        Self {
            name: name.into(),
            capacitance,
            charge: 0.0,
        }
    }

    /// Label used in probe and log output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacitance in farads; fixed for the object's lifetime.
    pub fn capacitance(&self) -> f64 {
        self.capacitance
    }

    /// Stored charge in coulombs.
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Overwrites the stored charge.
    pub fn set_charge(&mut self, charge: f64) {
        self.charge = charge;
    }

    /// Terminal voltage, `Q / C`.
    pub fn voltage(&self) -> f64 {
        self.charge / self.capacitance
    }

    /// Sets the charge to produce `voltage`, `Q = C·V`.
    pub fn set_voltage(&mut self, voltage: f64) {
        self.charge = self.capacitance * voltage;
    }

    /// Stored energy, `U = C·V²/2`.
    pub fn energy(&self) -> f64 {
        self.capacitance * self.voltage() * self.voltage() / 2.0
    }

    /// Sets the charge to hold `energy`, `Q = sqrt(2·U·C)`.
    pub fn set_energy(&mut self, energy: f64) {
        self.charge = (2.0 * energy * self.capacitance).sqrt();
    }

    /// Adds `delta` to the stored charge and returns the new charge.
    pub fn add_charge(&mut self, delta: f64) -> f64 {
        self.charge += delta;
        self.charge
    }
}
