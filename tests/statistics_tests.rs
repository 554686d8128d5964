//! Event statistics tests: windowed/cumulative counting, success-interval
//! histograms and CSV export.

use active_cell_network::{
    config::Command,
    error::ConfigError,
    events::EventType,
    export::{CsvExporter, NullLog},
    particles::{MonomerPool, SingleDomain},
    KineticsEngine,
};
use approx::assert_relative_eq;
use glam::DVec3;

const ACN: &str = "actin";

/// One pair that nucleates every step and is released every step
fn churning_engine(pool: &MonomerPool) -> KineticsEngine {
    let mut engine = KineticsEngine::new(3);
    let commands = [
        Command::CreateActiveNetwork {
            acn: ACN.to_string(),
            monomer: "A".to_string(),
        },
        Command::SetPolymerFormsEvent {
            acn: ACN.to_string(),
            duration: 0,
            min_range: 0.0,
            range: 1.0,
            spring: 1.0,
            length: 0.5,
        },
        Command::SetFixedTailOffRate {
            acn: ACN.to_string(),
            rate: 1.0,
        },
        Command::SetBondUnbindsFromPolymerTailEvent {
            acn: ACN.to_string(),
            duration: 0,
            spring: 1.0,
            length: 0.5,
        },
    ];
    for command in &commands {
        engine.apply(command, pool, &mut NullLog).unwrap();
    }
    engine
}

fn pair() -> MonomerPool {
    let mut pool = MonomerPool::new();
    pool.add("A", DVec3::ZERO);
    pool.add("A", DVec3::new(0.5, 0.0, 0.0));
    pool
}

fn bin(bin_total: u32, bin_width: f64, sample_periods: u32) -> Command {
    Command::BinEventSuccessIntervals {
        acn: ACN.to_string(),
        event: EventType::PolymerForms,
        bin_total,
        bin_width,
        sample_periods,
    }
}

// ============================================================================
// Counters
// ============================================================================

#[test]
fn test_windowed_then_cumulative_counts() {
    let pool = pair();
    let mut engine = churning_engine(&pool);
    for step in 0..5 {
        engine.tick(step, &pool, &SingleDomain, &mut NullLog).unwrap();
    }
    let first = engine.sample(4);
    let forms = first.iter().find(|s| s.sample.event == EventType::PolymerForms).unwrap();
    assert_eq!(forms.sample.counts.successes, 5);
    assert_eq!(forms.sample.counts.failures, 0);

    engine
        .apply(
            &Command::ToggleCumulativeEventStatistics {
                acn: ACN.to_string(),
                cumulative: true,
            },
            &pool,
            &mut NullLog,
        )
        .unwrap();
    for step in 5..10 {
        engine.tick(step, &pool, &SingleDomain, &mut NullLog).unwrap();
    }
    let second = engine.sample(9);
    let forms = second.iter().find(|s| s.sample.event == EventType::PolymerForms).unwrap();
    assert_eq!(forms.sample.counts.successes, 10);
}

#[test]
fn test_skip_counts_as_failure() {
    let mut pool = MonomerPool::new();
    pool.add("A", DVec3::ZERO);
    pool.add("A", DVec3::new(5.0, 0.0, 0.0));
    let mut engine = churning_engine(&pool);
    for step in 0..3 {
        engine.tick(step, &pool, &SingleDomain, &mut NullLog).unwrap();
    }
    let samples = engine.sample(2);
    let forms = samples.iter().find(|s| s.sample.event == EventType::PolymerForms).unwrap();
    assert_eq!(forms.sample.counts.successes, 0);
    assert_eq!(forms.sample.counts.failures, 3);
    assert_relative_eq!(forms.sample.counts.success_ratio(), 0.0);
}

// ============================================================================
// Success-interval histogram
// ============================================================================

#[test]
fn test_bin_combinations() {
    let pool = pair();
    let mut engine = churning_engine(&pool);
    assert!(engine.apply(&bin(50, 0.0, 1), &pool, &mut NullLog).is_ok());
    assert_eq!(
        engine.apply(&bin(50, 2.0, 1), &pool, &mut NullLog),
        Err(ConfigError::InvalidBinning { total: 50, width: 2.0 })
    );
    assert_eq!(
        engine.apply(&bin(0, 0.0, 1), &pool, &mut NullLog),
        Err(ConfigError::InvalidBinning { total: 0, width: 0.0 })
    );
    assert_eq!(
        engine.apply(&bin(100_001, 0.0, 1), &pool, &mut NullLog),
        Err(ConfigError::InvalidBinning { total: 100_001, width: 0.0 })
    );
    assert_eq!(
        engine.apply(&bin(0, 1.0, 0), &pool, &mut NullLog),
        Err(ConfigError::ZeroSamplePeriods)
    );
}

#[test]
fn test_histogram_flushes_after_sample_periods() {
    let pool = pair();
    let mut engine = churning_engine(&pool);
    engine.apply(&bin(0, 1.0, 2), &pool, &mut NullLog).unwrap();

    for step in 0..5 {
        engine.tick(step, &pool, &SingleDomain, &mut NullLog).unwrap();
    }
    let first = engine.sample(4);
    let forms = first.iter().find(|s| s.sample.event == EventType::PolymerForms).unwrap();
    assert!(forms.sample.histogram.is_none());

    for step in 5..10 {
        engine.tick(step, &pool, &SingleDomain, &mut NullLog).unwrap();
    }
    let second = engine.sample(9);
    let forms = second.iter().find(|s| s.sample.event == EventType::PolymerForms).unwrap();
    let histogram = forms.sample.histogram.as_ref().unwrap();
    // Successes at steps 0..=9 give nine intervals of one step
    assert_eq!(histogram.samples, 9);
    assert_relative_eq!(histogram.mean_interval, 1.0);
    assert_relative_eq!(histogram.bin_width, 1.0);
    assert_eq!(histogram.counts, vec![0, 9]);
}

#[test]
fn test_unknown_event_rejected() {
    let pool = pair();
    let mut engine = churning_engine(&pool);
    let command = Command::BinEventSuccessIntervals {
        acn: ACN.to_string(),
        event: EventType::AtpHydrolysis,
        bin_total: 10,
        bin_width: 0.0,
        sample_periods: 1,
    };
    assert!(matches!(
        engine.apply(&command, &pool, &mut NullLog),
        Err(ConfigError::UnknownEvent { .. })
    ));
}

// ============================================================================
// CSV export
// ============================================================================

#[test]
fn test_csv_rows_per_event() {
    let pool = pair();
    let mut engine = churning_engine(&pool);
    for step in 0..4 {
        engine.tick(step, &pool, &SingleDomain, &mut NullLog).unwrap();
    }

    let path = std::env::temp_dir().join(format!("acn_statistics_{}.csv", std::process::id()));
    let mut exporter = CsvExporter::create(&path).unwrap();
    exporter.record(&engine.sample(3)).unwrap();
    assert_eq!(exporter.rows(), 2);
    let written = exporter.finish().unwrap();

    let contents = std::fs::read_to_string(&written).unwrap();
    std::fs::remove_file(&written).ok();
    let mut lines = contents.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("step,network,event,event_id,successes,failures,success_ratio"));
    assert!(contents.contains("PolymerForms"));
    assert!(contents.contains("BondUnbindsFromPolymerTail"));
    assert_eq!(lines.count(), 2);
}
