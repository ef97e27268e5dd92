use crate::phase::{compute_cycle_accumulator, normalize_frequency, seconds_to_samples};
use crate::spec::coordinate::PhaseTarget;

/// A frequency breakpoint on the sample grid. The frequency is normalized to
/// radians per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalFrequencyCoordinate {
    pub frequency: f64,
    pub time_samples: u32,
}

impl PhysicalFrequencyCoordinate {
    pub fn new(frequency: f64, time_samples: u32) -> Self {
        debug_assert!(frequency > 0.0);
        Self { frequency, time_samples }
    }

    /// Normalizes a breakpoint given in Hz and seconds.
    pub fn from_hz(frequency_hz: f64, time_seconds: f64, sample_rate: u32) -> Self {
        debug_assert!(time_seconds >= 0.0);
        Self::new(
            normalize_frequency(frequency_hz, sample_rate),
            seconds_to_samples(time_seconds, sample_rate),
        )
    }
}

/// An amplitude breakpoint on the sample grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalAmplitudeCoordinate {
    pub amplitude: f64,
    pub time_samples: u32,
}

impl PhysicalAmplitudeCoordinate {
    pub fn new(amplitude: f64, time_samples: u32) -> Self {
        debug_assert!((-1.0..=1.0).contains(&amplitude));
        Self { amplitude, time_samples }
    }
}

/// A phase coordinate on the sample grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalPhaseCoordinate {
    pub target: PhaseTarget,
    pub time_samples: u32,
}

/// One point on the merged physical envelope, the unit that drives per-sample
/// interpolation. The cycle accumulator is unwrapped phase in radians; the
/// rate fields describe the segment towards the *next* point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalEnvelopePoint {
    pub time_samples: u32,
    pub cycle_accumulator: f64,
    pub frequency: f64,
    pub frequency_rate: f64,
    pub amplitude: f64,
    pub amplitude_rate: f64,
}

impl PhysicalEnvelopePoint {
    /// A synthetic point marking silence from `time_samples` onward. Zero
    /// frequency is reserved for these markers; real envelope points always
    /// carry a positive frequency.
    pub fn silent(time_samples: u32) -> Self {
        Self {
            time_samples,
            cycle_accumulator: 0.0,
            frequency: 0.0,
            frequency_rate: 0.0,
            amplitude: 0.0,
            amplitude_rate: 0.0,
        }
    }
}

/// Creates the point lying on the segment between `point_a` and `point_b` at
/// `time_samples`. Frequency and amplitude interpolate linearly; the cycle
/// accumulator extrapolates from `point_a` with its own rate, so the value is
/// consistent with per-sample rendering of that segment.
pub fn interpolate(
    point_a: &PhysicalEnvelopePoint,
    point_b: &PhysicalEnvelopePoint,
    time_samples: u32,
) -> PhysicalEnvelopePoint {
    debug_assert!(time_samples >= point_a.time_samples);
    debug_assert!(time_samples <= point_b.time_samples);

    let ratio = f64::from(time_samples - point_a.time_samples)
        / f64::from(point_b.time_samples - point_a.time_samples);

    PhysicalEnvelopePoint {
        time_samples,
        cycle_accumulator: compute_cycle_accumulator(
            point_a.cycle_accumulator,
            point_a.frequency,
            point_a.frequency_rate,
            time_samples - point_a.time_samples,
        ),
        frequency: ratio * (point_b.frequency - point_a.frequency) + point_a.frequency,
        frequency_rate: point_a.frequency_rate,
        amplitude: ratio * (point_b.amplitude - point_a.amplitude) + point_a.amplitude,
        amplitude_rate: point_a.amplitude_rate,
    }
}

/// A partial's envelope sliced onto the paxel grid: one point sequence per
/// grid cell, with times local to that cell. `first_paxel_index` places the
/// first cell absolutely within the piece. The two fractions record how much
/// of the first and last rendered samples the partial actually occupies when
/// its boundaries fall between sample instants; they are recorded here and
/// applied as weights by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalPartialEnvelope {
    pub paxel_points: Vec<Vec<PhysicalEnvelopePoint>>,
    pub first_paxel_index: u32,
    pub first_sample_fraction: f64,
    pub last_sample_fraction: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_is_linear_in_frequency_and_amplitude() {
        let a = PhysicalEnvelopePoint {
            time_samples: 0,
            cycle_accumulator: 0.0,
            frequency: 0.1,
            frequency_rate: 0.0,
            amplitude: 0.0,
            amplitude_rate: 0.001,
        };
        let b = PhysicalEnvelopePoint {
            time_samples: 100,
            cycle_accumulator: 10.0,
            frequency: 0.3,
            frequency_rate: 0.0,
            amplitude: 0.1,
            amplitude_rate: 0.001,
        };

        let mid = interpolate(&a, &b, 50);
        assert_eq!(mid.time_samples, 50);
        assert!((mid.frequency - 0.2).abs() < 1e-12);
        assert!((mid.amplitude - 0.05).abs() < 1e-12);
        // Accumulator follows a's trajectory: 0.1 rad/sample over 50 samples.
        assert!((mid.cycle_accumulator - 5.0).abs() < 1e-12);
    }

    #[test]
    fn interpolation_at_the_segment_start_returns_point_a() {
        let a = PhysicalEnvelopePoint {
            time_samples: 10,
            cycle_accumulator: 1.0,
            frequency: 0.2,
            frequency_rate: 0.0,
            amplitude: 0.5,
            amplitude_rate: 0.0,
        };
        let b = PhysicalEnvelopePoint { time_samples: 20, ..a };

        assert_eq!(interpolate(&a, &b, 10), a);
    }
}
