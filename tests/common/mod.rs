//! Shared fixtures for integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use harvest_sim::devices::harvester::{LossFactors, Thresholds};
use harvest_sim::devices::{
    Capacitor, Converter, ConverterTask, Harvester, HarvesterTask, LoadSink, PowerSource,
    SourceFeed, StateWatch,
};
use harvest_sim::io::loader::Sample;
use harvest_sim::sim::clock::Clock;
use harvest_sim::sim::probe::{Probe, ProbeTask};
use harvest_sim::sim::scheduler::Scheduler;

/// Default primary clock period used by the fixtures, seconds.
pub const PERIOD: f64 = 0.001;

/// A fully wired bench circuit.
pub struct Bench {
    pub scheduler: Scheduler,
    pub clock: Rc<RefCell<Clock>>,
    pub source: Rc<RefCell<PowerSource>>,
    pub storage: Rc<RefCell<Capacitor>>,
    pub battery: Rc<RefCell<Capacitor>>,
    pub harvester: Rc<RefCell<Harvester>>,
    pub converter: Rc<RefCell<Converter>>,
    pub load: Rc<RefCell<LoadSink>>,
}

/// Two samples bracketing a constant-power trace.
pub fn constant_samples(watts: f64, duration_s: f64) -> Vec<Sample> {
    vec![
        Sample {
            time: 0.0,
            value: watts,
        },
        Sample {
            time: duration_s,
            value: watts,
        },
    ]
}

/// Builds the measurement bench: constant source, the bq25570 capacitor pair,
/// constant-current load on the converter.
pub fn build_bench(source_watts: f64, thresholds: Thresholds) -> Bench {
    let clock = Rc::new(RefCell::new(Clock::new(PERIOD)));
    let mut scheduler = Scheduler::new(clock.clone());

    let source = Rc::new(RefCell::new(PowerSource::new(
        "teg",
        constant_samples(source_watts, 1e4),
        2.9,
        0.3571,
        true,
    )));
    scheduler.spawn(Box::new(SourceFeed::new(source.clone())));

    let storage = Rc::new(RefCell::new(Capacitor::new("stor", 4.7e-6)));
    let battery = Rc::new(RefCell::new(Capacitor::new("bat", 52.5e-3)));

    let harvester = Rc::new(RefCell::new(Harvester::new(
        clock.clone(),
        source.clone(),
        storage.clone(),
        battery.clone(),
        thresholds,
        LossFactors::default(),
        true,
    )));
    scheduler.spawn(Box::new(HarvesterTask::new(harvester.clone())));
    scheduler.spawn(Box::new(StateWatch::new(harvester.clone())));

    let load = Rc::new(RefCell::new(LoadSink::constant_current("load", 0.05)));
    let converter = Rc::new(RefCell::new(Converter::new(
        clock.clone(),
        harvester.clone(),
        load.clone(),
        2.5,
        0.10,
        true,
    )));
    scheduler.spawn(Box::new(ConverterTask::new(converter.clone())));

    Bench {
        scheduler,
        clock,
        source,
        storage,
        battery,
        harvester,
        converter,
        load,
    }
}

/// Attaches a probe for a storage-side quantity to a bench under assembly.
pub fn attach_probe(
    bench: &mut Bench,
    name: &str,
    sampler: harvest_sim::sim::probe::Sampler,
) -> Rc<RefCell<Probe>> {
    let probe = Rc::new(RefCell::new(Probe::new(name)));
    bench.scheduler.spawn(Box::new(ProbeTask::new(
        bench.clock.clone(),
        probe.clone(),
        sampler,
    )));
    probe
}
