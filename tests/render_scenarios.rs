//! End-to-end scenarios driving the full envelope-to-sample pipeline through
//! the public API.

use std::collections::BTreeSet;
use std::f64::consts::TAU;

use paxel_dsp::phase::{compute_cycle_accumulator, phase_mod};
use paxel_dsp::render::multi_partial::headroom_shift;
use paxel_dsp::render::partial::render_partial;
use paxel_dsp::render::{MultiPartialGenerator, PartialGenerator, RenderConfig};
use paxel_dsp::spec::{
    AmplitudeEnvelope, FrequencyEnvelope, PartialEnvelopes, PhaseCoordinate, PhaseCoordinates,
};
use paxel_dsp::MAX_SAMPLE_I24;

const SAMPLE_RATE: u32 = 96_000;

fn config() -> RenderConfig {
    RenderConfig::new(SAMPLE_RATE, SAMPLE_RATE, 0).unwrap()
}

fn explicit(time: f64, phase: f64) -> PhaseCoordinate {
    PhaseCoordinate::explicit(time, phase, SAMPLE_RATE).unwrap()
}

fn natural(time: f64) -> PhaseCoordinate {
    PhaseCoordinate::natural(time, SAMPLE_RATE).unwrap()
}

fn partial_envelopes(
    amplitude: (Vec<f64>, Vec<f64>),
    frequency: (Vec<f64>, Vec<f64>),
    coordinates: Vec<PhaseCoordinate>,
) -> PartialEnvelopes {
    PartialEnvelopes::new(
        AmplitudeEnvelope::new(amplitude.0, amplitude.1, Vec::new(), SAMPLE_RATE).unwrap(),
        FrequencyEnvelope::new(frequency.0, frequency.1, Vec::new(), SAMPLE_RATE).unwrap(),
        PhaseCoordinates::new(coordinates).unwrap(),
    )
}

#[test]
fn minimal_constant_partial() {
    // One second of 1 kHz at amplitude 0.4 on a sample-rate-sized grid:
    // exactly one cell, one second of samples, bounded by the amplitude.
    let envelopes = partial_envelopes(
        (vec![0.4], Vec::new()),
        (vec![1000.0], Vec::new()),
        vec![explicit(0.0, 0.0), explicit(1.0, 0.0)],
    );
    let generator = PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config()).unwrap();

    assert_eq!(generator.physical_envelope().paxel_points.len(), 1);

    let samples = generator.render();
    assert_eq!(samples.len(), SAMPLE_RATE as usize);
    assert!(samples.iter().all(|&s| s.abs() <= 0.4 + 1e-12));
    assert!(samples.iter().any(|&s| s.abs() > 0.39), "should reach the envelope peak");
}

#[test]
fn frequency_ramp_meets_its_phase_target() {
    // 1000 -> 2000 Hz over 2.5 s inside a 3 s partial, phase pinned to zero
    // at both ends: three one-second cells, and the phase at the final
    // boundary is coherent with the target no matter the ramp in between.
    let envelopes = partial_envelopes(
        (vec![0.5], Vec::new()),
        (vec![1000.0, 2000.0], vec![2.5]),
        vec![explicit(0.0, 0.0), explicit(3.0, 0.0)],
    );
    let generator = PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config()).unwrap();

    let physical = generator.physical_envelope();
    assert_eq!(physical.paxel_points.len(), 3);

    let last_cell = physical.paxel_points.last().unwrap();
    let last_point = last_cell.last().unwrap();
    let end_accumulator = compute_cycle_accumulator(
        last_point.cycle_accumulator,
        last_point.frequency,
        last_point.frequency_rate,
        SAMPLE_RATE - last_point.time_samples,
    );
    let end_phase = phase_mod(end_accumulator);
    assert!(end_phase.min(TAU - end_phase) < 1e-6, "end phase {end_phase}");

    // The explicit paxel view agrees.
    let final_paxel = generator.partial_spec().multi_paxels().last().unwrap().paxels().last().unwrap();
    let spec_phase = final_paxel.end_phase();
    assert!(spec_phase.min(TAU - spec_phase) < 1e-6);
}

#[test]
fn amplitude_breakpoint_splits_one_cell_into_a_multipaxel() {
    // Fade 1.0 -> 0.0 with the breakpoint at 1.5 s: the middle cell of the
    // three-second partial splits into two paxels that share their boundary
    // amplitude exactly.
    let envelopes = partial_envelopes(
        (vec![1.0, 0.0], vec![1.5]),
        (vec![440.0], Vec::new()),
        vec![explicit(0.0, 0.0), natural(3.0)],
    );
    let generator = PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config()).unwrap();
    let partial = generator.partial_spec();

    assert_eq!(partial.multi_paxels().len(), 3);
    let split = &partial.multi_paxels()[1];
    assert_eq!(split.paxels().len(), 2);

    let (first, second) = (&split.paxels()[0], &split.paxels()[1]);
    assert_eq!(first.end_sample() + 1, second.start_sample());
    assert_eq!(first.end_amplitude(), second.start_amplitude());
    assert_eq!(first.end_frequency(), second.start_frequency());
    assert_eq!(first.end_phase(), second.start_phase());
}

#[test]
fn boundary_continuity_holds_across_a_generated_partial() {
    // A deliberately busy partial: frequency ramps, amplitude breakpoints and
    // a mid-life phase target, all off the grid.
    let envelopes = partial_envelopes(
        (vec![0.0, 0.9, 0.3, 0.6], vec![0.7, 1.1, 0.9]),
        (vec![220.0, 1760.0, 440.0], vec![1.3, 1.2]),
        vec![explicit(0.0, 1.0), explicit(1.7, 2.0), natural(2.9)],
    );
    let generator = PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config()).unwrap();
    let partial = generator.partial_spec();

    for multi_paxel in partial.multi_paxels() {
        for pair in multi_paxel.paxels().windows(2) {
            assert_eq!(pair[0].end_frequency(), pair[1].start_frequency());
            assert_eq!(pair[0].end_amplitude(), pair[1].start_amplitude());
            assert_eq!(pair[0].end_phase(), pair[1].start_phase());
        }
    }
    for pair in partial.multi_paxels().windows(2) {
        let back = pair[0].paxels().last().unwrap();
        let front = pair[1].paxels().first().unwrap();
        assert_eq!(back.end_frequency(), front.start_frequency());
        assert_eq!(back.end_amplitude(), front.start_amplitude());
        assert_eq!(back.end_phase(), front.start_phase());
    }
}

#[test]
fn grid_coverage_matches_duration_rounded_up() {
    for (seconds, expected_cells) in [(1.0, 1), (2.25, 3), (2.9, 3), (3.0, 3)] {
        let envelopes = partial_envelopes(
            (vec![0.5], Vec::new()),
            (vec![440.0], Vec::new()),
            vec![explicit(0.0, 0.0), natural(seconds)],
        );
        let generator =
            PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config()).unwrap();

        assert_eq!(generator.physical_envelope().paxel_points.len(), expected_cells);
        assert_eq!(generator.render().len(), expected_cells * SAMPLE_RATE as usize);
        assert_eq!(generator.partial_spec().total_samples(), expected_cells * SAMPLE_RATE as usize);
    }
}

#[test]
fn summation_headroom_keeps_equal_partials_in_range() {
    // Four equal full-scale partials: each is shifted right by two bits
    // before summation, so the sum stays bit-exactly representable.
    let build = || {
        let envelopes = partial_envelopes(
            (vec![1.0], Vec::new()),
            (vec![440.0], Vec::new()),
            vec![explicit(0.0, 0.0), natural(1.0)],
        );
        PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config()).unwrap()
    };

    let single = build().render_i24();
    let bundle =
        MultiPartialGenerator::new((0..4).map(|_| build()).collect(), BTreeSet::new()).unwrap();
    let summed = bundle.render_i24();

    assert_eq!(headroom_shift(4), 2);
    assert_eq!(summed.len(), single.len());
    for (sum, &alone) in summed.iter().zip(&single) {
        assert_eq!(*sum, (alone >> 2) * 4);
        assert!(sum.abs() <= MAX_SAMPLE_I24);
    }
}

#[test]
fn value_type_and_physical_paths_render_the_same_waveform() {
    let envelopes = partial_envelopes(
        (vec![0.8, 0.2], vec![1.5]),
        (vec![330.0, 990.0], vec![2.0]),
        vec![explicit(0.0, 0.5), natural(2.0)],
    );
    let generator = PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config()).unwrap();

    let physical = generator.render();
    let value_typed = render_partial(generator.partial_spec(), SAMPLE_RATE);

    assert_eq!(physical.len(), value_typed.len());
    for (index, (a, b)) in physical.iter().zip(&value_typed).enumerate() {
        assert!((a - b).abs() < 1e-6, "sample {index}: {a} vs {b}");
    }
}

#[test]
fn off_grid_placement_keeps_the_waveform_and_pads_with_silence() {
    let envelopes = partial_envelopes(
        (vec![0.7], Vec::new()),
        (vec![523.25], Vec::new()),
        vec![explicit(0.0, 0.0), natural(1.0)],
    );

    let aligned =
        PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config()).unwrap().render();
    let shifted =
        PartialGenerator::new(&envelopes, BTreeSet::new(), 0.5, &config()).unwrap().render();

    let offset = SAMPLE_RATE as usize / 2;
    assert_eq!(shifted.len(), 2 * SAMPLE_RATE as usize);
    assert!(shifted[..offset].iter().all(|&s| s == 0.0));
    assert!(shifted[offset + SAMPLE_RATE as usize..].iter().all(|&s| s == 0.0));
    for (index, (a, b)) in
        aligned.iter().zip(&shifted[offset..offset + SAMPLE_RATE as usize]).enumerate()
    {
        assert!((a - b).abs() < 1e-9, "sample {index}: {a} vs {b}");
    }
}
