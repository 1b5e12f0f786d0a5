//! harvest-sim entry point — CLI wiring and config-driven circuit construction.

use std::cell::RefCell;
use std::path::Path;
use std::process;
use std::rc::Rc;

use harvest_sim::config::{ScenarioConfig, SourceConfig};
use harvest_sim::devices::harvester::{LossFactors, Thresholds};
use harvest_sim::devices::{
    Capacitor, Converter, ConverterTask, Enable, Harvester, HarvesterTask, LoadSink, OutputLoad,
    PowerSource, SourceFeed, StateWatch,
};
use harvest_sim::io::export::{export_state_log_csv, export_trace_csv};
use harvest_sim::io::loader::{Sample, SeriesScale, load_series};
use harvest_sim::profile::{ProfileShape, SyntheticProfile};
use harvest_sim::sim::clock::Clock;
use harvest_sim::sim::probe::{Probe, ProbeTask, Sampler};
use harvest_sim::sim::report::RunReport;
use harvest_sim::sim::scheduler::Scheduler;
use harvest_sim::sim::toggler::Toggler;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    stop_override: Option<f64>,
    out_dir: Option<String>,
}

fn print_help() {
    eprintln!("harvest-sim — energy-harvesting power-management circuit simulator");
    eprintln!();
    eprintln!("Usage: harvest-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>   Load scenario from TOML config file");
    eprintln!("  --preset <name>     Use a built-in preset (bench, soak)");
    eprintln!("  --stop <seconds>    Override the stop time");
    eprintln!("  --out <dir>         Export probe traces and the state log as CSV");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the bench preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        stop_override: None,
        out_dir: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--stop" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --stop requires a seconds argument");
                    process::exit(1);
                }
                if let Ok(s) = args[i].parse::<f64>() {
                    cli.stop_override = Some(s);
                } else {
                    eprintln!("error: --stop value \"{}\" is not a valid number", args[i]);
                    process::exit(1);
                }
            }
            "--out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --out requires a directory argument");
                    process::exit(1);
                }
                cli.out_dir = Some(args[i].clone());
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// The assembled circuit with its scheduler and probes.
struct Circuit {
    scheduler: Scheduler,
    source: Rc<RefCell<PowerSource>>,
    storage: Rc<RefCell<Capacitor>>,
    battery: Rc<RefCell<Capacitor>>,
    harvester: Rc<RefCell<Harvester>>,
    converter: Rc<RefCell<Converter>>,
    probes: Vec<Rc<RefCell<Probe>>>,
}

/// Produces the input sample series from either a measured file or the
/// synthetic generator.
fn source_samples(cfg: &SourceConfig) -> Result<Vec<Sample>, String> {
    match cfg.model.as_str() {
        "file" => {
            let path = cfg.data_file.as_deref().unwrap_or_default();
            let scale = SeriesScale {
                time: cfg.time_scale,
                value: cfg.power_scale,
            };
            load_series(Path::new(path), scale).map_err(|e| e.to_string())
        }
        _ => {
            let shape = match cfg.shape.as_str() {
                "half_sine" => ProfileShape::HalfSine,
                _ => ProfileShape::Constant,
            };
            Ok(SyntheticProfile::new(
                shape,
                cfg.peak_w,
                cfg.duration_s,
                cfg.sample_interval_s,
                cfg.noise_std,
                cfg.seed,
            )
            .samples())
        }
    }
}

/// Wires every component into a scheduler per the scenario configuration.
///
/// Spawn order fixes the same-instant execution order: source feed, harvester
/// tick and state watch, load profile feed (if any), converter, switch, probes.
fn build_circuit(cfg: &ScenarioConfig) -> Result<Circuit, String> {
    let clock = Rc::new(RefCell::new(Clock::new(cfg.simulation.period)));
    let mut scheduler = Scheduler::new(clock.clone());

    let source = Rc::new(RefCell::new(PowerSource::new(
        "teg",
        source_samples(&cfg.source)?,
        cfg.source.impedance,
        cfg.source.utilization_cap,
        cfg.source.enabled,
    )));
    scheduler.spawn(Box::new(SourceFeed::new(source.clone())));

    let storage = Rc::new(RefCell::new(Capacitor::new("stor", cfg.storage.capacitance)));
    let battery = Rc::new(RefCell::new(Capacitor::new("bat", cfg.battery.capacitance)));

    let hv = &cfg.harvester;
    let harvester = Rc::new(RefCell::new(Harvester::new(
        clock.clone(),
        source.clone(),
        storage.clone(),
        battery.clone(),
        Thresholds {
            coldstart: hv.coldstart,
            chgen: hv.chgen,
            bat_uv: hv.bat_uv,
            bat_ok: hv.bat_ok,
            bat_ov: hv.bat_ov,
        },
        LossFactors {
            cold: hv.loss_cold,
            warm: hv.loss_warm,
        },
        hv.enabled,
    )));
    scheduler.spawn(Box::new(HarvesterTask::new(harvester.clone())));
    scheduler.spawn(Box::new(StateWatch::new(harvester.clone())));

    let load: Rc<RefCell<dyn OutputLoad>> = match cfg.load.model.as_str() {
        "profile" => {
            let path = cfg.load.data_file.as_deref().unwrap_or_default();
            let scale = SeriesScale {
                time: cfg.load.time_scale,
                value: cfg.load.power_scale,
            };
            let samples = load_series(Path::new(path), scale).map_err(|e| e.to_string())?;
            let profile = Rc::new(RefCell::new(PowerSource::new(
                "dsply",
                samples,
                cfg.source.impedance,
                f64::INFINITY,
                true,
            )));
            scheduler.spawn(Box::new(SourceFeed::new(profile.clone())));
            profile
        }
        _ => {
            let mut sink = LoadSink::new("load");
            if let Some(amps) = cfg.load.current {
                sink.set_current(amps).map_err(|e| e.to_string())?;
            }
            if let Some(volts) = cfg.load.voltage {
                sink.set_voltage(volts).map_err(|e| e.to_string())?;
            }
            if let Some(ohms) = cfg.load.resistance {
                sink.set_resistance(ohms).map_err(|e| e.to_string())?;
            }
            Rc::new(RefCell::new(sink))
        }
    };

    let converter = Rc::new(RefCell::new(Converter::new(
        clock.clone(),
        harvester.clone(),
        load,
        cfg.converter.output_voltage,
        cfg.converter.loss,
        cfg.converter.enabled,
    )));
    scheduler.spawn(Box::new(ConverterTask::new(converter.clone())));

    if !cfg.switch.delays.is_empty() {
        let target: Rc<RefCell<dyn Enable>> = converter.clone();
        scheduler.spawn(Box::new(Toggler::new(
            clock.clone(),
            target,
            cfg.switch.delays.clone(),
        )));
    }

    let mut probes = Vec::new();
    for name in &cfg.probes.quantities {
        let probe = Rc::new(RefCell::new(Probe::new(name.clone())));
        let sampler = make_sampler(name, &source, &storage, &battery, &harvester, &converter);
        scheduler.spawn(Box::new(ProbeTask::new(
            clock.clone(),
            probe.clone(),
            sampler,
        )));
        probes.push(probe);
    }

    Ok(Circuit {
        scheduler,
        source,
        storage,
        battery,
        harvester,
        converter,
        probes,
    })
}

/// Builds the accessor closure for a named probe quantity.
fn make_sampler(
    name: &str,
    source: &Rc<RefCell<PowerSource>>,
    storage: &Rc<RefCell<Capacitor>>,
    battery: &Rc<RefCell<Capacitor>>,
    harvester: &Rc<RefCell<Harvester>>,
    converter: &Rc<RefCell<Converter>>,
) -> Sampler {
    match name {
        "source_power" => {
            let source = source.clone();
            Box::new(move |now| source.borrow_mut().power(now))
        }
        "source_utilization" => {
            let source = source.clone();
            Box::new(move |_| Some(source.borrow().utilization()))
        }
        "storage_voltage" => {
            let storage = storage.clone();
            Box::new(move |_| Some(storage.borrow().voltage()))
        }
        "battery_voltage" => {
            let battery = battery.clone();
            Box::new(move |_| Some(battery.borrow().voltage()))
        }
        "storage_charge" => {
            let storage = storage.clone();
            Box::new(move |_| Some(storage.borrow().charge()))
        }
        "battery_charge" => {
            let battery = battery.clone();
            Box::new(move |_| Some(battery.borrow().charge()))
        }
        "stored_energy" => {
            let harvester = harvester.clone();
            Box::new(move |_| Some(harvester.borrow().stored_energy()))
        }
        "harvester_energy_delta" => {
            let harvester = harvester.clone();
            Box::new(move |_| Some(harvester.borrow().last_energy_delta()))
        }
        "harvester_charge_delta" => {
            let harvester = harvester.clone();
            Box::new(move |_| Some(harvester.borrow().last_charge_delta()))
        }
        "converter_voltage" => {
            let converter = converter.clone();
            Box::new(move |_| Some(converter.borrow().voltage()))
        }
        "converter_current" => {
            let converter = converter.clone();
            Box::new(move |now| converter.borrow_mut().current(now))
        }
        "converter_energy_delta" => {
            let converter = converter.clone();
            Box::new(move |_| Some(converter.borrow().last_energy_delta()))
        }
        // unreachable after config validation
        _ => Box::new(|_| None),
    }
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then bench default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::bench()
    };

    // Apply stop override
    if let Some(stop) = cli.stop_override {
        scenario.simulation.stop_time = Some(stop);
    }

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    // Build and run
    let mut circuit = build_circuit(&scenario).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    match scenario.simulation.stop_time {
        Some(stop) => circuit.scheduler.run_until(stop),
        None => circuit.scheduler.run(),
    }

    // Finish the state log and report
    let now = circuit.scheduler.now();
    circuit.harvester.borrow_mut().close_log(now);
    let report = RunReport::collect(
        now,
        &circuit.harvester.borrow(),
        &circuit.source.borrow(),
        &circuit.storage.borrow(),
        &circuit.battery.borrow(),
        circuit.converter.borrow().is_on(),
    );
    println!("{report}");

    // Export CSV if requested
    if let Some(ref dir) = cli.out_dir {
        let dir = Path::new(dir);
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: cannot create \"{}\": {e}", dir.display());
            process::exit(1);
        }
        let harvester = circuit.harvester.borrow();
        if let Err(e) = export_state_log_csv(harvester.log(), &dir.join("state_log.csv")) {
            eprintln!("error: failed to write state log: {e}");
            process::exit(1);
        }
        for probe in &circuit.probes {
            let probe = probe.borrow();
            let path = dir.join(format!("probe_{}.csv", probe.name()));
            if let Err(e) = export_trace_csv(&probe, &path) {
                eprintln!("error: failed to write \"{}\": {e}", path.display());
                process::exit(1);
            }
        }
        eprintln!("Results written to {}", dir.display());
    }
}
