//! Closed-form energy checks through the full event kernel.

mod common;

use harvest_sim::devices::harvester::Thresholds;
use harvest_sim::devices::{Enable, HarvesterState};

/// Thresholds raised far out of reach so the harvester stays cold for the
/// whole run and never balances.
fn cold_forever() -> Thresholds {
    Thresholds {
        chgen: 100.0,
        bat_ok: 500.0,
        bat_ov: 1000.0,
        ..Thresholds::default()
    }
}

#[test]
fn cold_harvest_matches_the_closed_form() {
    // 1 mW constant input, cold loss 0.95: after 10 s the storage capacitor
    // holds P * (1 - loss) * t joules, to floating-point accumulation error
    let mut bench = common::build_bench(1e-3, cold_forever());
    bench.scheduler.run_until(10.0 + common::PERIOD / 2.0);

    let expected = 1e-3 * (1.0 - 0.95) * 10.0;
    let got = bench.storage.borrow().energy();
    assert!(
        ((got - expected) / expected).abs() < 1e-9,
        "expected {expected} J, got {got} J"
    );
    assert_eq!(bench.harvester.borrow().state(), HarvesterState::Cold);
    // cold never balances: the battery still holds exactly its precharge
    let precharge = 100.0; // chgen
    assert!((bench.battery.borrow().voltage() - precharge).abs() < 1e-9);
}

#[test]
fn warm_run_balances_the_capacitor_pair() {
    let mut bench = common::build_bench(1e-3, Thresholds::default());
    bench.scheduler.run_until(10.0);

    let storage_v = bench.storage.borrow().voltage();
    let battery_v = bench.battery.borrow().voltage();
    assert_eq!(bench.harvester.borrow().state(), HarvesterState::Warm);
    assert!(
        (storage_v - battery_v).abs() < 1e-9,
        "balanced voltages should match: {storage_v} vs {battery_v}"
    );
    // joint energy sits between the all-cold and all-warm harvest bounds on
    // top of the battery precharge
    let precharge_energy = 0.5 * 52.5e-3 * 1.73 * 1.73;
    let harvested = bench.harvester.borrow().stored_energy() - precharge_energy;
    assert!(harvested > 1e-3 * 0.05 * 10.0 * 0.99);
    assert!(harvested < 1e-3 * 0.75 * 10.0 * 1.01);
    // nothing was drawn: 1.81 V stays below the battery-health threshold
    assert!(!bench.harvester.borrow().battery_ok());
    assert!(!bench.converter.borrow().is_on());
}

#[test]
fn strong_source_clamps_at_the_overvoltage_limit() {
    let mut bench = common::build_bench(0.5, Thresholds::default());
    bench.converter.borrow_mut().set_enabled(false);
    bench.scheduler.run_until(5.0);

    let storage_v = bench.storage.borrow().voltage();
    assert!(
        storage_v <= 5.5 + 1e-9,
        "overvoltage clamp failed: {storage_v} V"
    );
    assert!((storage_v - 5.5).abs() < 1e-6);
    assert_eq!(bench.harvester.borrow().state(), HarvesterState::Full);

    // the ladder was climbed in order: off -> cold -> warm -> full
    let log = bench.harvester.borrow().log().clone();
    assert_eq!(log.transitions(), 3);
    let changes: Vec<HarvesterState> = log
        .states
        .windows(2)
        .filter(|w| w[0] != w[1])
        .map(|w| w[1])
        .collect();
    assert_eq!(
        changes,
        [
            HarvesterState::Cold,
            HarvesterState::Warm,
            HarvesterState::Full,
        ]
    );
}

#[test]
fn converter_draw_shows_up_as_missing_energy() {
    // strong source so the battery-health flag engages early, then the
    // converter continuously drains 0.125 W derated up to ~0.139 W
    let thresholds = Thresholds::default();
    let mut with_draw = common::build_bench(0.25, thresholds);
    let mut without_draw = common::build_bench(0.25, thresholds);
    without_draw.converter.borrow_mut().set_enabled(false);

    with_draw.scheduler.run_until(10.0);
    without_draw.scheduler.run_until(10.0);

    // the undrained bench saturates at the overvoltage clamp (~0.79 J joint),
    // the drained one stays well below it
    let drained = without_draw.harvester.borrow().stored_energy()
        - with_draw.harvester.borrow().stored_energy();
    assert!(
        drained > 0.1,
        "the converter should have withdrawn energy, diff {drained} J"
    );
    assert!(with_draw.converter.borrow().is_on());
    assert!(with_draw.harvester.borrow().battery_ok());
}
