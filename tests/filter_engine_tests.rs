//! Filter Engine Tests
//!
//! Block-level properties of the time-domain and frequency-domain engines.

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use rustfft::num_complex::Complex64;
use test_case::test_case;

use wavefilter::config::EngineConfig;
use wavefilter::dsp::{
    BinMapping, CascadeMemory, FilterBank, FilterSection, FrequencyBinScaler,
    FrequencyFilterEntry, ParallelEqDefinition, TimeDomainMode,
};
use wavefilter::engine::{AudioBlock, SpectrumBlock};
use wavefilter::FilterError;

/// Deterministic test signal with a few partials and a step
fn test_signal(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| {
            let t = n as f64;
            0.6 * (t * 0.031).sin() + 0.3 * (t * 0.47).cos() + if n > len / 3 { 0.1 } else { 0.0 }
        })
        .collect()
}

fn test_spectrum(len: usize) -> SpectrumBlock {
    let bins = (0..len)
        .map(|k| Complex64::new((k as f64 * 0.7).sin(), (k as f64 * 1.3).cos()))
        .collect();
    AudioBlock::mono(7, bins)
}

/// Two second-order resonant bands in `[b.., a..]` layout
fn two_band_eq(bias: f64) -> ParallelEqDefinition {
    ParallelEqDefinition::from_rows(
        &[
            [0.0675, 0.0, -0.0675, 1.0, -1.8, 0.865],
            [0.12, 0.0, -0.12, 1.0, -0.9, 0.76],
        ],
        bias,
    )
    .unwrap()
}

// === Identity ===

#[test_case(0 ; "empty block")]
#[test_case(1 ; "single sample")]
#[test_case(256 ; "default block")]
#[test_case(1000 ; "long block")]
fn test_unconfigured_time_domain_is_identity(len: usize) {
    let mut bank = FilterBank::default();
    let block = AudioBlock::mono(3, test_signal(len));

    let output = bank.process_time_domain(&block).unwrap();
    assert_eq!(output, block);
}

#[test]
fn test_unconfigured_frequency_domain_is_identity() {
    let mut scaler = FrequencyBinScaler::default();
    let spectrum = test_spectrum(129);

    let output = scaler.process_frequency_domain(&spectrum).unwrap();
    assert_eq!(output, spectrum);
}

// === Cascade ===

#[test_case(1 ; "one section")]
#[test_case(4 ; "four sections")]
fn test_passthrough_cascade_is_exact(sections: usize) {
    let mut bank = FilterBank::default();
    for _ in 0..sections {
        bank.add_filter_section(FilterSection::new(vec![1.0], vec![1.0]).unwrap())
            .unwrap();
    }
    let input = test_signal(300);

    let output = bank.process_time_domain(&AudioBlock::mono(0, input.clone())).unwrap();
    assert_eq!(output.samples(), input.as_slice());
}

#[test]
fn test_stateful_cascade_matches_single_pass() {
    let section = FilterSection::new(vec![0.2, 0.2], vec![1.0, -0.6]).unwrap();
    let input = test_signal(512);

    let mut whole = FilterBank::default();
    whole.set_cascade_memory(CascadeMemory::Stateful).unwrap();
    whole.add_filter_section(section.clone()).unwrap();
    let expected = whole.process_time_domain(&AudioBlock::mono(0, input.clone())).unwrap();

    let mut split = whole.fork();
    let mut output = Vec::new();
    for (sequence, chunk) in input.chunks(100).enumerate() {
        let block = split
            .process_time_domain(&AudioBlock::mono(sequence as u64, chunk.to_vec()))
            .unwrap();
        output.extend_from_slice(block.samples());
    }

    for (a, b) in output.iter().zip(expected.samples()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-9);
    }
}

// === Parallel EQ ===

#[test]
fn test_single_band_matches_direct_form() {
    let (b0, b1, a1) = (0.2, 0.2, -0.6);
    let definition = ParallelEqDefinition::from_rows(&[[b0, b1, 1.0, a1]], 0.0).unwrap();
    let mut bank = FilterBank::default();
    bank.configure_parallel_eq(definition).unwrap();

    let input = test_signal(400);
    let output = bank.process_time_domain(&AudioBlock::mono(0, input.clone())).unwrap();

    // y[n] = b0 x[n] + b1 x[n-1] - a1 y[n-1]
    let mut reference = Vec::with_capacity(input.len());
    let (mut x_prev, mut y_prev) = (0.0, 0.0);
    for &x in &input {
        let y = b0 * x + b1 * x_prev - a1 * y_prev;
        reference.push(y);
        x_prev = x;
        y_prev = y;
    }

    for (a, b) in output.samples().iter().zip(&reference) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-9);
    }
}

#[test_case(1 ; "split after first sample")]
#[test_case(128 ; "split in the middle")]
#[test_case(255 ; "split before last sample")]
fn test_delay_state_bridges_blocks(split_at: usize) {
    let input = test_signal(256);

    let mut whole = FilterBank::default();
    whole.configure_parallel_eq(two_band_eq(0.5)).unwrap();
    let expected = whole.process_time_domain(&AudioBlock::mono(0, input.clone())).unwrap();

    let mut split = whole.fork();
    let (head, tail) = input.split_at(split_at);
    let first = split.process_time_domain(&AudioBlock::mono(0, head.to_vec())).unwrap();
    let second = split.process_time_domain(&AudioBlock::mono(1, tail.to_vec())).unwrap();

    let joined: Vec<f64> = first.samples().iter().chain(second.samples()).copied().collect();
    assert_eq!(joined.len(), expected.len());
    for (a, b) in joined.iter().zip(expected.samples()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-9);
    }
    assert_eq!(second.sequence(), 1);
}

#[test]
fn test_silent_block_on_fresh_state_is_silent() {
    let silent = AudioBlock::mono(0, vec![0.0; 256]);

    let mut eq = FilterBank::default();
    eq.configure_parallel_eq(two_band_eq(2.0)).unwrap();
    let output = eq.process_time_domain(&silent).unwrap();
    assert!(output.samples().iter().all(|&y| y == 0.0));

    let mut cascade = FilterBank::default();
    cascade
        .add_filter_section(FilterSection::new(vec![0.5, 0.5], vec![1.0, -0.3, 0.1]).unwrap())
        .unwrap();
    let output = cascade.process_time_domain(&silent).unwrap();
    assert!(output.samples().iter().all(|&y| y == 0.0));
}

#[test]
fn test_bias_adds_scaled_input() {
    let input = test_signal(200);

    let mut without = FilterBank::default();
    without.configure_parallel_eq(two_band_eq(0.0)).unwrap();
    let mut with = FilterBank::default();
    with.configure_parallel_eq(two_band_eq(0.0)).unwrap();
    with.set_bias(0.75).unwrap();

    let a = without.process_time_domain(&AudioBlock::mono(0, input.clone())).unwrap();
    let b = with.process_time_domain(&AudioBlock::mono(0, input.clone())).unwrap();
    for ((y0, y1), x) in a.samples().iter().zip(b.samples()).zip(&input) {
        assert_relative_eq!(*y1, y0 + 0.75 * x, epsilon = 1e-12);
    }
}

// === Lifecycle ===

#[test]
fn test_modes_are_exclusive() {
    let mut bank = FilterBank::default();
    bank.add_filter_section(FilterSection::passthrough()).unwrap();

    let result = bank.configure_parallel_eq(two_band_eq(1.0));
    assert!(matches!(result, Err(FilterError::ModeConflict { .. })));
    assert!(matches!(bank.mode(), TimeDomainMode::Cascade(_)));
}

#[test]
fn test_configuration_locks_until_reset() {
    let mut bank = FilterBank::new(EngineConfig::default());
    bank.configure_parallel_eq(two_band_eq(1.0)).unwrap();
    bank.process_time_domain(&AudioBlock::mono(0, test_signal(64))).unwrap();

    assert!(matches!(
        bank.set_bias(0.0),
        Err(FilterError::ConfigurationLocked { .. })
    ));

    bank.reset();
    bank.set_bias(0.0).unwrap();
}

// === Frequency domain ===

#[test_case(0, 0 ; "first band")]
#[test_case(10, 0 ; "inner band")]
#[test_case(10, 56 ; "offset mapping")]
fn test_bin_isolation(bin_index: usize, offset: usize) {
    let mut scaler = FrequencyBinScaler::new(EngineConfig::default(), BinMapping::new(offset));
    scaler.add_entry(FrequencyFilterEntry::new(bin_index, 0.3)).unwrap();
    let spectrum = test_spectrum(129);

    let output = scaler.process_frequency_domain(&spectrum).unwrap();
    let addressed = bin_index + 1 + offset;
    for (k, (out, inp)) in output.samples().iter().zip(spectrum.samples()).enumerate() {
        if k == addressed {
            assert_eq!(*out, *inp * 0.3);
        } else {
            assert_eq!(out, inp);
        }
    }
    assert_eq!(output.sequence(), 0);
}

#[test]
fn test_bin_past_spectrum_is_an_error() {
    let mut scaler = FrequencyBinScaler::default();
    scaler.add_entry(FrequencyFilterEntry::new(200, 2.0)).unwrap();

    let result = scaler.process_frequency_domain(&test_spectrum(129));
    assert!(matches!(
        result,
        Err(FilterError::BinOutOfRange { bin: 201, len: 129 })
    ));
}
