//! End-to-end bench runs: probes, switching, and clock lifecycle.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use harvest_sim::devices::harvester::{LossFactors, Thresholds};
use harvest_sim::devices::{Enable, HarvesterState};
use harvest_sim::sim::toggler::Toggler;

#[test]
fn probes_sample_once_per_tock_for_the_whole_run() {
    let mut bench = common::build_bench(1e-3, Thresholds::default());
    let storage = bench.storage.clone();
    let storage_v = common::attach_probe(
        &mut bench,
        "storage_voltage",
        Box::new(move |_| Some(storage.borrow().voltage())),
    );
    let converter = bench.converter.clone();
    let converter_i = common::attach_probe(
        &mut bench,
        "converter_current",
        Box::new(move |now| converter.borrow_mut().current(now)),
    );

    bench.scheduler.run_until(10.0);

    // tocks at 1e-4 + k*1e-3 below 10 s
    let storage_v = storage_v.borrow();
    let converter_i = converter_i.borrow();
    assert_eq!(storage_v.len(), 10_000);
    assert_eq!(converter_i.len(), 10_000);
    assert!((storage_v.times()[0] - 1e-4).abs() < 1e-12);
    assert!(
        storage_v
            .times()
            .windows(2)
            .all(|w| w[0] < w[1]),
        "sample times must be strictly increasing"
    );
    // voltage never decreases with no draw, and the converter stayed gated off
    assert!(storage_v.values().last().copied() > Some(1.7));
    assert!(converter_i.values().iter().all(|&i| i == 0.0));
    // the load itself still demands its constant current the whole time
    assert_eq!(bench.load.borrow().current(), Some(0.05));
}

#[test]
fn switch_gates_the_converter_mid_run() {
    // strong source: battery health engages within the first second; a single
    // switch event at t = 5 s turns the converter off for the rest of the run
    let mut bench = common::build_bench(0.25, Thresholds::default());
    let converter = bench.converter.clone();
    let converter_i = common::attach_probe(
        &mut bench,
        "converter_current",
        Box::new(move |now| converter.borrow_mut().current(now)),
    );
    let target: Rc<RefCell<dyn harvest_sim::devices::Enable>> = bench.converter.clone();
    bench.scheduler.spawn(Box::new(Toggler::new(
        bench.clock.clone(),
        target,
        vec![5.0],
    )));

    bench.scheduler.run_until(8.0);

    let converter_i = converter_i.borrow();
    // index k samples at 1e-4 + k*1e-3
    let at = |seconds: f64| -> f64 {
        let k = ((seconds - 1e-4) / 1e-3).round() as usize;
        converter_i.values()[k]
    };
    assert_eq!(at(0.0001), 0.0); // battery still cold at the start
    assert_eq!(at(4.5), 0.05); // healthy and enabled
    assert_eq!(at(6.5), 0.0); // switched off at t = 5
    assert!(!bench.converter.borrow().is_on());
}

#[test]
fn source_exhaustion_unwinds_the_whole_run() {
    // harvester-only rig (a constant-sink converter would hold the clock open
    // forever): 50 ms of data, then the harvester unregisters and the clock
    // stops within one period
    use harvest_sim::devices::{Capacitor, Harvester, HarvesterTask, PowerSource, SourceFeed,
        StateWatch};
    use harvest_sim::sim::clock::Clock;
    use harvest_sim::sim::scheduler::Scheduler;

    let clock = Rc::new(RefCell::new(Clock::new(common::PERIOD)));
    let mut scheduler = Scheduler::new(clock.clone());
    let source = Rc::new(RefCell::new(PowerSource::new(
        "teg",
        common::constant_samples(1e-3, 0.05),
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
        storage,
        battery,
        Thresholds::default(),
        LossFactors::default(),
        true,
    )));
    scheduler.spawn(Box::new(HarvesterTask::new(harvester.clone())));
    scheduler.spawn(Box::new(StateWatch::new(harvester)));

    scheduler.run();

    assert!(!clock.borrow().is_running());
    assert!(source.borrow().is_exhausted());
    // data ends at 50 ms; the harvester detaches at the next tick and the
    // tick train notices one period later
    let stopped_at = scheduler.now();
    assert!(
        (0.05..0.06).contains(&stopped_at),
        "clock should stop shortly after exhaustion, stopped at {stopped_at}"
    );
}

#[test]
fn state_log_opens_off_and_closes_with_the_final_state() {
    let mut bench = common::build_bench(1e-3, Thresholds::default());
    bench.scheduler.run_until(10.0);
    bench.harvester.borrow_mut().close_log(bench.scheduler.now());

    let log = bench.harvester.borrow().log().clone();
    assert_eq!(log.states.first().copied(), Some(HarvesterState::Off));
    assert_eq!(log.times.first().copied(), Some(0.0));
    assert_eq!(log.states.last().copied(), Some(HarvesterState::Warm));
    assert_eq!(log.times.last().copied(), Some(10.0));
    // off -> cold -> warm, each bracketed by a same-instant pair
    assert_eq!(log.transitions(), 2);
    assert!(log.times.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn disabled_harvester_discards_everything() {
    let mut bench = common::build_bench(1e-3, Thresholds::default());
    bench.harvester.borrow_mut().set_enabled(false);
    bench.scheduler.run_until(5.0);

    assert_eq!(bench.harvester.borrow().state(), HarvesterState::Off);
    assert_eq!(bench.storage.borrow().charge(), 0.0);
    // the battery keeps only its precharge
    assert!((bench.battery.borrow().voltage() - 1.73).abs() < 1e-12);
}
