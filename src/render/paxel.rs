use crate::phase::{
    coherence_compensation, compute_cycle_accumulator, compute_frequency_rate, natural_phase,
    normalize_frequency,
};
use crate::physical::point::PhysicalEnvelopePoint;
use crate::render::{to_f32, to_i24};
use crate::spec::paxel::Paxel;

/*
Paxel Sample Renderer
=====================

One grid cell is described by a short sequence of envelope points. Each point
opens a segment that runs to the next point (or to the end of the cell), and
within a segment every sample is:

    amplitude(i) = amplitude₀ + amplitude_rate · i
    cycle(i)     = ½ · frequency_rate · i² + frequency₀ · i + accumulator₀
    sample(i)    = sin(cycle(i)) · amplitude(i)

Samples before the first point are silent; that is how a partial that starts
inside a cell gets its lead-in. A sequence always produces exactly the cell's
sample count.

A `Paxel` value renders through the same evaluator. Its endpoint description
(frequencies, amplitudes, wrapped boundary phases) first has to be turned back
into a segment: the natural end phase of the frequency ramp is computed, the
coherence compensation towards the demanded end phase is applied, and the
frequency rate that reaches the compensated total exactly is recovered. The
compensation never exceeds half a cycle, which is inaudible spread over a
block but keeps boundaries click-free.
*/

/// Renders one grid cell's point sequence into `cell_samples` samples.
pub fn render_points(points: &[PhysicalEnvelopePoint], cell_samples: u32) -> Vec<f64> {
    let mut samples = vec![0.0_f64; cell_samples as usize];

    for (k, stage) in points.iter().enumerate() {
        let fill_to = if k + 1 < points.len() { points[k + 1].time_samples } else { cell_samples };
        debug_assert!(stage.time_samples <= fill_to);
        debug_assert!(fill_to <= cell_samples);

        for i in 0..fill_to - stage.time_samples {
            let amplitude = stage.amplitude + stage.amplitude_rate * f64::from(i);
            let cycles = compute_cycle_accumulator(
                stage.cycle_accumulator,
                stage.frequency,
                stage.frequency_rate,
                i,
            );
            let sample = cycles.sin() * amplitude;
            debug_assert!((-1.0..=1.0).contains(&sample));
            samples[(stage.time_samples + i) as usize] = sample;
        }
    }

    samples
}

pub fn render_points_f32(points: &[PhysicalEnvelopePoint], cell_samples: u32) -> Vec<f32> {
    to_f32(&render_points(points, cell_samples))
}

pub fn render_points_i24(points: &[PhysicalEnvelopePoint], cell_samples: u32) -> Vec<i32> {
    to_i24(&render_points(points, cell_samples))
}

/// Renders a paxel value into a block of `duration_samples`, silent outside
/// its audible range.
pub fn render_paxel(paxel: &Paxel, sample_rate: u32) -> Vec<f64> {
    let audio_samples = paxel.audio_samples();

    let start_frequency = normalize_frequency(paxel.start_frequency(), sample_rate);
    let natural_end = natural_phase(
        paxel.start_phase(),
        paxel.start_frequency(),
        paxel.end_frequency(),
        audio_samples,
        sample_rate,
        false,
    );
    let compensation = coherence_compensation(natural_end, paxel.end_phase());
    let frequency_rate = compute_frequency_rate(
        paxel.start_phase(),
        start_frequency,
        natural_end + compensation,
        audio_samples,
    );
    let amplitude_rate =
        (paxel.end_amplitude() - paxel.start_amplitude()) / f64::from(audio_samples);

    let mut points = vec![PhysicalEnvelopePoint {
        time_samples: paxel.start_sample(),
        cycle_accumulator: paxel.start_phase(),
        frequency: start_frequency,
        frequency_rate,
        amplitude: paxel.start_amplitude(),
        amplitude_rate,
    }];
    if paxel.end_sample() + 1 < paxel.duration_samples() {
        points.push(PhysicalEnvelopePoint::silent(paxel.end_sample() + 1));
    }

    render_points(&points, paxel.duration_samples())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::phase_mod;
    use std::f64::consts::{FRAC_PI_2, TAU};

    const SAMPLE_RATE: u32 = 96_000;

    #[test]
    fn renders_a_plain_sine() {
        let omega = normalize_frequency(440.0, SAMPLE_RATE);
        let points = [PhysicalEnvelopePoint {
            time_samples: 0,
            cycle_accumulator: 0.0,
            frequency: omega,
            frequency_rate: 0.0,
            amplitude: 1.0,
            amplitude_rate: 0.0,
        }];
        let samples = render_points(&points, 4_800);

        // Sample n is sin(2π f n / sr).
        let n = 123;
        let expected = (TAU * 440.0 * n as f64 / f64::from(SAMPLE_RATE)).sin();
        assert!((samples[n] - expected).abs() < 1e-9);
    }

    #[test]
    fn silence_before_the_first_point_and_after_a_silent_marker() {
        let omega = normalize_frequency(1000.0, SAMPLE_RATE);
        let points = [
            PhysicalEnvelopePoint {
                time_samples: 100,
                cycle_accumulator: FRAC_PI_2,
                frequency: omega,
                frequency_rate: 0.0,
                amplitude: 0.5,
                amplitude_rate: 0.0,
            },
            PhysicalEnvelopePoint::silent(200),
        ];
        let samples = render_points(&points, 300);

        assert!(samples[..100].iter().all(|&s| s == 0.0));
        assert!(samples[200..].iter().all(|&s| s == 0.0));
        // sin(π/2) at the first audible sample.
        assert!((samples[100] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn output_length_always_matches_the_cell() {
        let samples = render_points(&[], 256);
        assert_eq!(samples.len(), 256);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn paxel_render_stays_inside_its_audible_range() {
        let paxel = Paxel::new(1000.0, 1000.0, 0.8, 0.8, 0.0, 0.0, 1_000, 250, 749).unwrap();
        let samples = render_paxel(&paxel, SAMPLE_RATE);

        assert_eq!(samples.len(), 1_000);
        assert!(samples[..250].iter().all(|&s| s == 0.0));
        assert!(samples[750..].iter().all(|&s| s == 0.0));
        assert!(samples[250..750].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn paxel_render_reaches_its_end_phase() {
        // A ramp whose natural end phase differs from the demanded one; the
        // evaluator has to bend the trajectory to land on it.
        let target = FRAC_PI_2;
        let paxel =
            Paxel::new(997.3, 1501.1, 0.5, 0.5, 0.0, target, 96_000, 0, 95_999).unwrap();

        let start_frequency = normalize_frequency(997.3, SAMPLE_RATE);
        let natural_end = natural_phase(0.0, 997.3, 1501.1, 96_000, SAMPLE_RATE, false);
        let compensation = coherence_compensation(natural_end, target);
        let rate =
            compute_frequency_rate(0.0, start_frequency, natural_end + compensation, 96_000);
        let end_accumulator = compute_cycle_accumulator(0.0, start_frequency, rate, 96_000);

        let distance = (phase_mod(end_accumulator) - target).abs();
        assert!(distance.min(TAU - distance) < 1e-9);

        // And every sample of the actual render stays in range.
        let samples = render_paxel(&paxel, SAMPLE_RATE);
        assert!(samples.iter().all(|&s| s.abs() <= 0.5 + 1e-12));
    }

    #[test]
    fn amplitude_ramp_is_linear() {
        let omega = normalize_frequency(250.0, SAMPLE_RATE);
        let points = [PhysicalEnvelopePoint {
            time_samples: 0,
            cycle_accumulator: FRAC_PI_2, // sin starts at 1.0
            frequency: omega,
            frequency_rate: 0.0,
            amplitude: 0.0,
            amplitude_rate: 1.0 / 96_000.0,
        }];
        let samples = render_points(&points, 96_000);
        // At sample 0 the amplitude is zero regardless of phase.
        assert_eq!(samples[0], 0.0);
        // Envelope magnitude grows towards the end of the block.
        let early: f64 = samples[..9_600].iter().map(|s| s.abs()).fold(0.0, f64::max);
        let late: f64 = samples[86_400..].iter().map(|s| s.abs()).fold(0.0, f64::max);
        assert!(late > early);
    }
}
