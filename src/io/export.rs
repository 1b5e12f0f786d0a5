//! CSV export for probe traces and the harvester state log.

use std::io::{self, Write};
use std::path::Path;

use crate::devices::harvester::StateLog;
use crate::sim::probe::Probe;

/// Column header for probe-trace exports.
const TRACE_HEADER: &[&str] = &["time_s", "value"];

/// Column header for state-log exports.
const STATE_HEADER: &[&str] = &["time_s", "state"];

/// Exports a probe trace to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_trace_csv(probe: &Probe, path: &Path) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_trace_csv(probe, io::BufWriter::new(file))
}

/// Writes a probe trace as CSV to any writer.
///
/// One row per sample; values use scientific notation so microjoule and
/// microcoulomb scales survive the round trip.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trace_csv(probe: &Probe, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRACE_HEADER)?;
    for (time, value) in probe.times().iter().zip(probe.values()) {
        wtr.write_record(&[format!("{time:.6}"), format!("{value:.9e}")])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exports the harvester state log to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_state_log_csv(log: &StateLog, path: &Path) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_state_log_csv(log, io::BufWriter::new(file))
}

/// Writes the state log as CSV to any writer, one row per log entry.
///
/// Transitions appear as two rows at the same instant (previous state, then
/// new state), ready for step-plot rendering.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_state_log_csv(log: &StateLog, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(STATE_HEADER)?;
    for (time, state) in log.times.iter().zip(&log.states) {
        wtr.write_record(&[format!("{time:.6}"), state.as_str().to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::harvester::HarvesterState;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sample_probe() -> Probe {
        let probe = Rc::new(RefCell::new(Probe::new("storage_voltage")));
        {
            let clock = Rc::new(RefCell::new(crate::sim::clock::Clock::new(1.0)));
            let mut sched = crate::sim::scheduler::Scheduler::new(clock.clone());
            let mut v = 0.0;
            sched.spawn(Box::new(crate::sim::probe::ProbeTask::new(
                clock,
                probe.clone(),
                Box::new(move |_| {
                    v += 0.5;
                    Some(v)
                }),
            )));
            sched.run_until(3.0);
        }
        probe.borrow().clone()
    }

    #[test]
    fn trace_csv_has_header_and_one_row_per_sample() {
        let probe = sample_probe();
        let mut buf = Vec::new();
        write_trace_csv(&probe, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_s,value");
        assert_eq!(lines.len(), 1 + probe.len());
    }

    #[test]
    fn trace_values_round_trip_as_f64() {
        let probe = sample_probe();
        let mut buf = Vec::new();
        write_trace_csv(&probe, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        for (record, expected) in rdr.records().zip(probe.values()) {
            let row = record.unwrap();
            let value: f64 = row[1].parse().unwrap();
            assert!((value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn state_log_rows_carry_lowercase_names() {
        let mut log = StateLog::default();
        log_push(&mut log, 0.0, HarvesterState::Off);
        log_push(&mut log, 0.5, HarvesterState::Off);
        log_push(&mut log, 0.5, HarvesterState::Cold);

        let mut buf = Vec::new();
        write_state_log_csv(&log, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_s,state");
        assert_eq!(lines[1], "0.000000,off");
        assert_eq!(lines[3], "0.500000,cold");
    }

    #[test]
    fn deterministic_output() {
        let probe = sample_probe();
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_trace_csv(&probe, &mut a).unwrap();
        write_trace_csv(&probe, &mut b).unwrap();
        assert_eq!(a, b);
    }

    fn log_push(log: &mut StateLog, time: f64, state: HarvesterState) {
        log.times.push(time);
        log.states.push(state);
    }
}
