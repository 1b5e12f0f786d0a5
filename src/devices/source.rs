//! Time-indexed power source with linear interpolation at the current instant.
//!
//! A background feed process walks the sample series in real (simulated) time,
//! keeping a bracketing `(prev, next)` cursor pair current. Queries interpolate
//! between the pair; once the series is exhausted both cursors collapse and the
//! source reports no further value, which consumers must treat as "stop
//! consuming", never as zero power.

use std::cell::RefCell;
use std::rc::Rc;

use crate::devices::types::{Enable, OPEN_CIRCUIT_OHMS, OutputLoad};
use crate::error::CircuitError;
use crate::io::loader::Sample;
use crate::sim::scheduler::{Process, Wait};

/// Default source impedance in ohms (thermoelectric generator input).
pub const DEFAULT_IMPEDANCE_OHMS: f64 = 2.9;

/// Default cap on the utilization accumulator.
pub const DEFAULT_UTILIZATION_CAP: f64 = 0.3571;

/// A measured or synthetic power-versus-time series.
pub struct PowerSource {
    name: String,
    enabled: bool,
    impedance: f64,
    utilization_cap: f64,
    utilization: f64,
    last_power: f64,
    fixed_current: Option<f64>,
    fixed_voltage: Option<f64>,
    fixed_resistance: Option<f64>,
    samples: Vec<Sample>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl PowerSource {
    /// Creates a source over a sample series (header already removed).
    ///
    /// The cursors stay undefined until the feed process primes them at t = 0,
    /// so spawn a [`SourceFeed`] before any consumer process.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two samples are given; interpolation needs a
    /// bracketing pair.
    pub fn new(
        name: impl Into<String>,
        samples: Vec<Sample>,
        impedance: f64,
        utilization_cap: f64,
        enabled: bool,
    ) -> Self {
        assert!(samples.len() >= 2, "a source series needs at least two samples");
        Self {
            name: name.into(),
            enabled,
            impedance,
            utilization_cap,
            utilization: 0.0,
            last_power: 0.0,
            fixed_current: None,
            fixed_voltage: None,
            fixed_resistance: None,
            samples,
            prev: None,
            next: None,
        }
    }

    /// Label used in probe and log output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed source impedance in ohms; metadata for cross-component use.
    pub fn impedance(&self) -> f64 {
        self.impedance
    }

    /// Power at the last successful query, watts.
    pub fn last_power(&self) -> f64 {
        self.last_power
    }

    /// Running utilization total. Accumulates the queried power on every
    /// successful interpolation until the cap is crossed, then freezes.
    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    /// `true` once the feed has walked off the end of the series.
    pub fn is_exhausted(&self) -> bool {
        self.prev.is_some() && self.next.is_none()
    }

    /// Primes the cursor pair at the first two samples and returns the delay
    /// to the second one. Called by the feed process at t = 0.
    pub(crate) fn prime(&mut self) -> f64 {
        self.prev = Some(0);
        self.next = Some(1);
        self.samples[1].time - self.samples[0].time
    }

    /// Advances the cursor pair by one sample. Returns the delay to the next
    /// sample, or `None` once the series is exhausted (both cursors collapse).
    pub(crate) fn advance(&mut self) -> Option<f64> {
        let pos = self.next.unwrap_or(self.samples.len() - 1);
        if pos + 1 < self.samples.len() {
            self.prev = Some(pos);
            self.next = Some(pos + 1);
            Some(self.samples[pos + 1].time - self.samples[pos].time)
        } else {
            self.prev = Some(pos);
            self.next = None;
            None
        }
    }

    /// Interpolated power at `now`, independent of the enable flag.
    ///
    /// `None` before the feed primes the cursors and after exhaustion.
    fn interpolated(&mut self, now: f64) -> Option<f64> {
        let a = self.samples[self.prev?];
        let b = self.samples[self.next?];
        let power = a.value + (b.value - a.value) / (b.time - a.time) * (now - a.time);
        self.last_power = power;
        if self.utilization <= self.utilization_cap {
            self.utilization += power;
        }
        Some(power)
    }

    /// Output power in watts: the interpolated value while enabled, exactly
    /// zero while disabled (a disabled source is defined, not exhausted).
    pub fn power(&mut self, now: f64) -> Option<f64> {
        if self.enabled {
            self.interpolated(now)
        } else {
            Some(0.0)
        }
    }

    /// Fixes the terminal voltage for derived reads.
    ///
    /// # Errors
    ///
    /// Rejected once a fixed current or resistance exists: power comes from the
    /// series, so a second fixed quantity over-determines the node.
    pub fn set_voltage(&mut self, volts: f64) -> Result<(), CircuitError> {
        if self.fixed_current.is_some() || self.fixed_resistance.is_some() {
            tracing::warn!(source = %self.name, "voltage write rejected");
            return Err(CircuitError::OverDeterminedLoad {
                quantity: "voltage",
            });
        }
        self.fixed_voltage = Some(volts);
        Ok(())
    }

    /// Fixes the terminal current for derived reads.
    ///
    /// # Errors
    ///
    /// Rejected once a fixed voltage or resistance exists.
    pub fn set_current(&mut self, amps: f64) -> Result<(), CircuitError> {
        if self.fixed_voltage.is_some() || self.fixed_resistance.is_some() {
            tracing::warn!(source = %self.name, "current write rejected");
            return Err(CircuitError::OverDeterminedLoad {
                quantity: "current",
            });
        }
        self.fixed_current = Some(amps);
        Ok(())
    }

    /// Fixes the terminal resistance for derived reads.
    ///
    /// # Errors
    ///
    /// Rejected once a fixed voltage or current exists.
    pub fn set_resistance(&mut self, ohms: f64) -> Result<(), CircuitError> {
        if self.fixed_voltage.is_some() || self.fixed_current.is_some() {
            tracing::warn!(source = %self.name, "resistance write rejected");
            return Err(CircuitError::OverDeterminedLoad {
                quantity: "resistance",
            });
        }
        self.fixed_resistance = Some(ohms);
        Ok(())
    }

    /// Terminal voltage derived from the interpolated power and the one fixed
    /// quantity. Zero while disabled; `None` when exhausted or under-determined.
    pub fn voltage(&mut self, now: f64) -> Option<f64> {
        if !self.enabled {
            return Some(0.0);
        }
        let power = self.interpolated(now)?;
        if let Some(v) = self.fixed_voltage {
            Some(v)
        } else if let Some(i) = self.fixed_current {
            Some(power / i)
        } else if let Some(r) = self.fixed_resistance {
            Some((power * r).sqrt())
        } else {
            tracing::warn!(source = %self.name, "voltage read needs a fixed current or resistance");
            None
        }
    }

    /// Terminal current, derived like [`PowerSource::voltage`].
    pub fn current(&mut self, now: f64) -> Option<f64> {
        if !self.enabled {
            return Some(0.0);
        }
        let power = self.interpolated(now)?;
        if let Some(i) = self.fixed_current {
            Some(i)
        } else if let Some(v) = self.fixed_voltage {
            Some(power / v)
        } else if let Some(r) = self.fixed_resistance {
            Some((power / r).sqrt())
        } else {
            tracing::warn!(source = %self.name, "current read needs a fixed voltage or resistance");
            None
        }
    }

    /// Terminal resistance; open circuit while disabled.
    pub fn resistance(&mut self, now: f64) -> Option<f64> {
        if !self.enabled {
            return Some(OPEN_CIRCUIT_OHMS);
        }
        let power = self.interpolated(now)?;
        if let Some(r) = self.fixed_resistance {
            Some(r)
        } else if let Some(i) = self.fixed_current {
            Some(power / (i * i))
        } else if let Some(v) = self.fixed_voltage {
            Some(v * v / power)
        } else {
            tracing::warn!(source = %self.name, "resistance read needs a fixed current or voltage");
            None
        }
    }
}

impl Enable for PowerSource {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl OutputLoad for PowerSource {
    fn set_voltage(&mut self, volts: f64) -> Result<(), CircuitError> {
        PowerSource::set_voltage(self, volts)
    }

    fn current(&mut self, now: f64) -> Option<f64> {
        PowerSource::current(self, now)
    }

    fn power(&mut self, now: f64) -> Option<f64> {
        PowerSource::power(self, now)
    }
}

/// Background process that advances the source's bracketing cursors.
///
/// Primes `(prev, next)` at t = 0, then sleeps the time delta to each following
/// sample; after the final sample both cursors collapse and the source reports
/// no further value.
pub struct SourceFeed {
    source: Rc<RefCell<PowerSource>>,
    label: String,
    primed: bool,
}

impl SourceFeed {
    pub fn new(source: Rc<RefCell<PowerSource>>) -> Self {
        let label = format!("{}-feed", source.borrow().name());
        Self {
            source,
            label,
            primed: false,
        }
    }
}

impl Process for SourceFeed {
    fn name(&self) -> &str {
        &self.label
    }

    fn resume(&mut self, now: f64) -> Wait {
        let mut source = self.source.borrow_mut();
        if !self.primed {
            self.primed = true;
            tracing::info!(source = %source.name, time = now, "source feed start");
            return Wait::Delay(source.prime());
        }

        match source.advance() {
            Some(delay) => Wait::Delay(delay),
            None => {
                tracing::info!(source = %source.name, time = now, "source exhausted");
                Wait::Done
            }
        }
    }
}
