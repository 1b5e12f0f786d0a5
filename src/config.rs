//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the bench scenario (synthetic constant
/// source, constant-current load, and the measured bench's load-switching
/// schedule). Load from TOML with [`ScenarioConfig::from_toml_file`] or use a
/// named preset.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Clock period and stop time.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Input power source parameters.
    #[serde(default)]
    pub source: SourceConfig,
    /// Storage capacitor parameters.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Battery capacitor parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Harvester thresholds and loss factors.
    #[serde(default)]
    pub harvester: HarvesterConfig,
    /// Buck-converter parameters.
    #[serde(default)]
    pub converter: ConverterConfig,
    /// Output load parameters.
    #[serde(default)]
    pub load: LoadConfig,
    /// Enable-toggler schedule for the converter.
    #[serde(default)]
    pub switch: SwitchConfig,
    /// Probe wiring.
    #[serde(default)]
    pub probes: ProbesConfig,
}

/// Clock period and stop time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Primary clock period in seconds (must be > 0).
    pub period: f64,
    /// Stop time in seconds; omit to run until the event queue drains.
    pub stop_time: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            period: 0.001,
            stop_time: Some(50.0),
        }
    }
}

/// Input power source parameters.
///
/// `model = "file"` loads a measured two-column CSV; `model = "synthetic"`
/// generates a seeded profile so the simulator runs without data files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Source model: `"file"` or `"synthetic"`.
    pub model: String,
    /// CSV path for the file model.
    pub data_file: Option<String>,
    /// Scale factor applied to the time column at load.
    pub time_scale: f64,
    /// Scale factor applied to the power column at load.
    pub power_scale: f64,
    /// Fixed source impedance in ohms (metadata).
    pub impedance: f64,
    /// Cap on the utilization accumulator.
    pub utilization_cap: f64,
    /// Enable flag.
    pub enabled: bool,
    /// Synthetic shape: `"constant"` or `"half_sine"`.
    pub shape: String,
    /// Synthetic peak power in watts.
    pub peak_w: f64,
    /// Synthetic profile duration in seconds.
    pub duration_s: f64,
    /// Synthetic sample spacing in seconds.
    pub sample_interval_s: f64,
    /// Synthetic additive noise standard deviation in watts.
    pub noise_std: f64,
    /// Seed for the synthetic noise generator.
    pub seed: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            model: "synthetic".to_string(),
            data_file: None,
            time_scale: 1.0,
            power_scale: 1.0,
            impedance: 2.9,
            utilization_cap: 0.3571,
            enabled: true,
            shape: "constant".to_string(),
            peak_w: 1e-3,
            duration_s: 60.0,
            sample_interval_s: 0.5,
            noise_std: 0.0,
            seed: 42,
        }
    }
}

/// Storage capacitor parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Capacitance in farads.
    pub capacitance: f64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capacitance: 4.7e-6,
        }
    }
}

/// Battery capacitor parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Capacitance in farads.
    pub capacitance: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacitance: 52.5e-3,
        }
    }
}

/// Harvester thresholds and loss factors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvesterConfig {
    /// Enable flag.
    pub enabled: bool,
    /// Loss factor in the cold state (derate is `1 - loss`).
    pub loss_cold: f64,
    /// Loss factor in the warm and full states.
    pub loss_warm: f64,
    /// Coldstart trigger voltage.
    pub coldstart: f64,
    /// Main boost trigger voltage; also the battery precharge voltage.
    pub chgen: f64,
    /// Battery undervoltage limit.
    pub bat_uv: f64,
    /// Battery-health threshold gating the converter.
    pub bat_ok: f64,
    /// Battery overvoltage limit.
    pub bat_ov: f64,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            loss_cold: 0.95,
            loss_warm: 0.25,
            coldstart: 0.1,
            chgen: 1.73,
            bat_uv: 2.0,
            bat_ok: 2.5,
            bat_ov: 5.5,
        }
    }
}

/// Buck-converter parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Enable flag.
    pub enabled: bool,
    /// Fixed output voltage in volts.
    pub output_voltage: f64,
    /// Fixed loss fraction in `[0, 1)`.
    pub loss: f64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_voltage: 2.5,
            loss: 0.10,
        }
    }
}

/// Output load parameters.
///
/// `model = "constant"` is an algebraic sink holding the given quantities;
/// `model = "profile"` drives the converter from a measured consumption trace.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Load model: `"constant"` or `"profile"`.
    pub model: String,
    /// Fixed load current in amperes.
    pub current: Option<f64>,
    /// Fixed load voltage in volts.
    pub voltage: Option<f64>,
    /// Fixed load resistance in ohms.
    pub resistance: Option<f64>,
    /// CSV path for the profile model.
    pub data_file: Option<String>,
    /// Scale factor applied to the time column at load.
    pub time_scale: f64,
    /// Scale factor applied to the power column at load.
    pub power_scale: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            model: "constant".to_string(),
            current: Some(0.05),
            voltage: None,
            resistance: None,
            data_file: None,
            time_scale: 1.0,
            power_scale: 1.0,
        }
    }
}

/// Enable-toggler schedule applied to the converter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwitchConfig {
    /// Non-cumulative delays in seconds; empty disables the toggler.
    pub delays: Vec<f64>,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        // the measured bench alternated the load after 1 s, then 4 s, then
        // every 3 s
        let mut delays = vec![1.0, 4.0];
        delays.extend(std::iter::repeat_n(3.0, 23));
        Self { delays }
    }
}

/// Probe wiring: which quantities get a scope attached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbesConfig {
    /// Quantity names; see [`ScenarioConfig::PROBE_QUANTITIES`].
    pub quantities: Vec<String>,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            quantities: [
                "source_power",
                "storage_voltage",
                "battery_voltage",
                "converter_voltage",
                "converter_current",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ScenarioConfig {
    /// Probe quantities the runner knows how to wire.
    pub const PROBE_QUANTITIES: &[&str] = &[
        "source_power",
        "source_utilization",
        "storage_voltage",
        "battery_voltage",
        "storage_charge",
        "battery_charge",
        "stored_energy",
        "harvester_energy_delta",
        "harvester_charge_delta",
        "converter_voltage",
        "converter_current",
        "converter_energy_delta",
    ];

    /// Available preset names.
    pub const PRESETS: &[&str] = &["bench", "soak"];

    /// Returns the bench preset (same parameters as the defaults): constant
    /// synthetic source, constant-current load, load-switching schedule.
    pub fn bench() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            source: SourceConfig::default(),
            storage: StorageConfig::default(),
            battery: BatteryConfig::default(),
            harvester: HarvesterConfig::default(),
            converter: ConverterConfig::default(),
            load: LoadConfig::default(),
            switch: SwitchConfig::default(),
            probes: ProbesConfig::default(),
        }
    }

    /// Returns the soak preset: a strong noisy half-sine burst with no load
    /// switching, long enough for the battery-health flag to engage.
    pub fn soak() -> Self {
        Self {
            simulation: SimulationConfig {
                stop_time: Some(120.0),
                ..SimulationConfig::default()
            },
            source: SourceConfig {
                shape: "half_sine".to_string(),
                peak_w: 0.25,
                duration_s: 150.0,
                sample_interval_s: 0.5,
                noise_std: 2e-3,
                seed: 7,
                ..SourceConfig::default()
            },
            switch: SwitchConfig { delays: Vec::new() },
            ..Self::bench()
        }
    }

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "bench" => Ok(Self::bench()),
            "soak" => Ok(Self::soak()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Examples
    ///
    /// ```
    /// use harvest_sim::config::ScenarioConfig;
    ///
    /// let cfg = ScenarioConfig::from_toml_str("[simulation]\nperiod = 0.002\n").unwrap();
    /// assert_eq!(cfg.simulation.period, 0.002);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let sim = &self.simulation;
        if !(sim.period > 0.0 && sim.period.is_finite()) {
            errors.push(ConfigError::new("simulation.period", "must be > 0"));
        }
        if let Some(stop) = sim.stop_time {
            if !(stop > 0.0 && stop.is_finite()) {
                errors.push(ConfigError::new("simulation.stop_time", "must be > 0"));
            }
        } else if self.load.model == "constant" {
            errors.push(ConfigError::new(
                "simulation.stop_time",
                "required with a constant load (the draw loop never exhausts)",
            ));
        }

        let src = &self.source;
        match src.model.as_str() {
            "file" => {
                if src.data_file.is_none() {
                    errors.push(ConfigError::new(
                        "source.data_file",
                        "required when source.model is \"file\"",
                    ));
                }
            }
            "synthetic" => {
                if src.shape != "constant" && src.shape != "half_sine" {
                    errors.push(ConfigError::new(
                        "source.shape",
                        format!("must be \"constant\" or \"half_sine\", got \"{}\"", src.shape),
                    ));
                }
                if src.peak_w < 0.0 {
                    errors.push(ConfigError::new("source.peak_w", "must be >= 0"));
                }
                if src.duration_s <= 0.0 {
                    errors.push(ConfigError::new("source.duration_s", "must be > 0"));
                }
                if src.sample_interval_s <= 0.0 {
                    errors.push(ConfigError::new("source.sample_interval_s", "must be > 0"));
                }
                if src.noise_std < 0.0 {
                    errors.push(ConfigError::new("source.noise_std", "must be >= 0"));
                }
            }
            other => {
                errors.push(ConfigError::new(
                    "source.model",
                    format!("must be \"file\" or \"synthetic\", got \"{other}\""),
                ));
            }
        }
        if src.time_scale <= 0.0 || src.power_scale <= 0.0 {
            errors.push(ConfigError::new(
                "source.time_scale",
                "scale factors must be > 0",
            ));
        }

        if self.storage.capacitance <= 0.0 {
            errors.push(ConfigError::new("storage.capacitance", "must be > 0"));
        }
        if self.battery.capacitance <= 0.0 {
            errors.push(ConfigError::new("battery.capacitance", "must be > 0"));
        }

        let hv = &self.harvester;
        if !(0.0..1.0).contains(&hv.loss_cold) {
            errors.push(ConfigError::new("harvester.loss_cold", "must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&hv.loss_warm) {
            errors.push(ConfigError::new("harvester.loss_warm", "must be in [0, 1)"));
        }
        if hv.chgen <= 0.0 {
            errors.push(ConfigError::new("harvester.chgen", "must be > 0"));
        }
        if hv.bat_ov <= hv.chgen {
            errors.push(ConfigError::new(
                "harvester.bat_ov",
                "must be > harvester.chgen",
            ));
        }
        if hv.bat_ok > hv.bat_ov {
            errors.push(ConfigError::new(
                "harvester.bat_ok",
                "must be <= harvester.bat_ov",
            ));
        }

        let cv = &self.converter;
        if !(0.0..1.0).contains(&cv.loss) {
            errors.push(ConfigError::new("converter.loss", "must be in [0, 1)"));
        }
        if cv.output_voltage <= 0.0 {
            errors.push(ConfigError::new("converter.output_voltage", "must be > 0"));
        }

        let load = &self.load;
        match load.model.as_str() {
            "constant" => {
                let fixed = [load.current, load.voltage, load.resistance]
                    .iter()
                    .filter(|q| q.is_some())
                    .count();
                if fixed == 0 {
                    errors.push(ConfigError::new(
                        "load",
                        "a constant load needs at least one of current, voltage, resistance",
                    ));
                }
                if fixed > 2 {
                    errors.push(ConfigError::new(
                        "load",
                        "at most two of current, voltage, resistance may be fixed",
                    ));
                }
            }
            "profile" => {
                if load.data_file.is_none() {
                    errors.push(ConfigError::new(
                        "load.data_file",
                        "required when load.model is \"profile\"",
                    ));
                }
            }
            other => {
                errors.push(ConfigError::new(
                    "load.model",
                    format!("must be \"constant\" or \"profile\", got \"{other}\""),
                ));
            }
        }
        if load.time_scale <= 0.0 || load.power_scale <= 0.0 {
            errors.push(ConfigError::new(
                "load.time_scale",
                "scale factors must be > 0",
            ));
        }

        for (k, delay) in self.switch.delays.iter().enumerate() {
            if !(*delay > 0.0 && delay.is_finite()) {
                errors.push(ConfigError::new(
                    format!("switch.delays[{k}]"),
                    "must be > 0",
                ));
            }
        }

        for name in &self.probes.quantities {
            if !Self::PROBE_QUANTITIES.contains(&name.as_str()) {
                errors.push(ConfigError::new(
                    "probes.quantities",
                    format!(
                        "unknown quantity \"{name}\", available: {}",
                        Self::PROBE_QUANTITIES.join(", ")
                    ),
                ));
            }
        }

        errors
    }
}
