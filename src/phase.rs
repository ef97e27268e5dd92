//! Phase normalization and cycle-accumulator math.
//!
//! Everything here is a pure function over `f64`. Phase is measured in
//! radians; the "cycle accumulator" is a running, unwrapped phase total (it
//! never folds back at 2π), which keeps frequency-rate and phase-target
//! calculations numerically consistent across many cycles. Frequencies appear
//! in two forms: plain Hz at the API surface, and normalized radians-per-sample
//! (`2π·f / sample_rate`) inside the accumulator algebra.

use std::f64::consts::{PI, TAU};

/// Folds any phase value into the range `[0, 2π)`.
pub fn phase_mod(phase: f64) -> f64 {
    let result = phase % TAU;
    if result < 0.0 {
        result + TAU
    } else {
        result
    }
}

/// Smallest signed value to add to `source_phase` so that it becomes phase
/// coherent with `target_phase`. Both arguments may be unwrapped (> 2π).
/// The result lies in `[-π, π]`.
///
/// Exactly equal inputs short-circuit to zero so that the common "no
/// correction needed" path stays free of floating-point residue.
pub fn coherence_compensation(source_phase: f64, target_phase: f64) -> f64 {
    if source_phase == target_phase {
        return 0.0;
    }

    let source = phase_mod(source_phase);
    let target = phase_mod(target_phase);

    let mut difference = target - source;
    if difference > PI {
        difference -= TAU;
    } else if difference < -PI {
        difference += TAU;
    }

    debug_assert!((-PI..=PI).contains(&difference));
    difference
}

/// The phase a linear frequency ramp `start_frequency → end_frequency` (Hz)
/// would reach after `duration_samples`, starting from `start_phase`.
///
/// The value is the mean of the two phase trajectories obtained by holding
/// each endpoint frequency constant over the span, which is the trapezoidal
/// integral of the ramp. With `only_incomplete_cycles` the result is folded
/// into `[0, 2π)`; otherwise the unwrapped total (complete cycles included)
/// is returned.
pub fn natural_phase(
    start_phase: f64,
    start_frequency: f64,
    end_frequency: f64,
    duration_samples: u32,
    sample_rate: u32,
    only_incomplete_cycles: bool,
) -> f64 {
    debug_assert!((0.0..=TAU).contains(&start_phase));
    debug_assert!(duration_samples > 0);
    debug_assert!(start_frequency > 0.0 && end_frequency > 0.0);

    let f1_increment = normalize_frequency(start_frequency, sample_rate);
    let f1_phase_end = start_phase + f1_increment * f64::from(duration_samples);

    let f2_increment = normalize_frequency(end_frequency, sample_rate);
    let f2_phase_end = start_phase + f2_increment * f64::from(duration_samples);

    let full_phase_end = (f1_phase_end + f2_phase_end) / 2.0;
    let incomplete_phase_end = phase_mod(full_phase_end);

    debug_assert!(full_phase_end >= incomplete_phase_end);

    if only_incomplete_cycles {
        incomplete_phase_end
    } else {
        full_phase_end
    }
}

/// Truncating conversion from seconds to a sample index.
pub fn seconds_to_samples(time_seconds: f64, sample_rate: u32) -> u32 {
    (time_seconds * f64::from(sample_rate)) as u32
}

pub fn samples_to_seconds(time_samples: u32, sample_rate: u32) -> f64 {
    f64::from(time_samples) / f64::from(sample_rate)
}

/// Converts Hz to normalized radians per sample.
pub fn normalize_frequency(frequency_hz: f64, sample_rate: u32) -> f64 {
    frequency_hz * TAU / f64::from(sample_rate)
}

/// Converts normalized radians per sample back to Hz.
pub fn denormalize_frequency(frequency: f64, sample_rate: u32) -> f64 {
    frequency * f64::from(sample_rate) / TAU
}

/// Cycle-accumulator value after `samples_since_start`, given a start value,
/// a start frequency (normalized) and a frequency rate (normalized per
/// sample). Integrating the linear frequency ramp gives the quadratic
/// `½·rate·t² + f₀·t + accumulator₀`.
pub fn compute_cycle_accumulator(
    start_cycle_accumulator: f64,
    start_frequency: f64,
    start_frequency_rate: f64,
    samples_since_start: u32,
) -> f64 {
    let t = f64::from(samples_since_start);
    0.5 * start_frequency_rate * t * t + start_frequency * t + start_cycle_accumulator
}

/// Cycle-accumulator value at the end of a span whose exact end frequency is
/// known. Anchoring to the end frequency avoids the error a rate estimate
/// would introduce at points that correspond to exact envelope breakpoints.
pub fn compute_cycle_accumulator_to_exact_end(
    start_cycle_accumulator: f64,
    start_frequency: f64,
    end_frequency: f64,
    samples_between: u32,
) -> f64 {
    let t = f64::from(samples_between);
    start_cycle_accumulator + start_frequency * t + (end_frequency - start_frequency) * t / 2.0
}

/// Inverse of [`compute_cycle_accumulator`]: the frequency rate required to
/// reach `end_cycle_accumulator` exactly after `samples_since_start`.
pub fn compute_frequency_rate(
    start_cycle_accumulator: f64,
    start_frequency: f64,
    end_cycle_accumulator: f64,
    samples_since_start: u32,
) -> f64 {
    let t = f64::from(samples_since_start);
    2.0 * (end_cycle_accumulator - start_cycle_accumulator - start_frequency * t) / (t * t)
}
