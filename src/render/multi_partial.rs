use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::debug;

use crate::render::partial::{render_partial, PartialGenerator};
use crate::render::to_i24;
use crate::spec::error::SpecError;
use crate::spec::paxel::{MultiPartial, Partial};

/// Headroom applied before summing `partial_count` partials: each partial's
/// integer samples are shifted right by `ceil(log2(partial_count))` bits, so
/// the sum cannot overflow no matter how the partials align. The shift is a
/// bit operation, deterministic and bit-exact across runs.
pub fn headroom_shift(partial_count: usize) -> u32 {
    debug_assert!(partial_count > 0);
    if partial_count <= 1 {
        0
    } else {
        (partial_count as u32).next_power_of_two().trailing_zeros()
    }
}

fn sum_shifted(blocks: Vec<Vec<i32>>, shift: u32) -> Vec<i32> {
    let longest = blocks.iter().map(Vec::len).max().unwrap_or(0);
    let mut samples = vec![0_i32; longest];
    for block in &blocks {
        for (target, &source) in samples.iter_mut().zip(block) {
            *target += source >> shift;
        }
    }
    samples
}

fn sum_scaled(blocks: Vec<Vec<f64>>, scale: f64) -> Vec<f32> {
    let longest = blocks.iter().map(Vec::len).max().unwrap_or(0);
    let mut samples = vec![0.0_f64; longest];
    for block in &blocks {
        for (target, &source) in samples.iter_mut().zip(block) {
            *target += source * scale;
        }
    }
    samples.iter().map(|&s| s as f32).collect()
}

/// Renders and sums a multipartial into 24-bit integer samples. Member
/// partials render in parallel into private buffers; shorter partials are
/// zero-padded to the longest.
pub fn render_multi_partial_i24(multi_partial: &MultiPartial, sample_rate: u32) -> Vec<i32> {
    let partials = multi_partial.partials();
    let shift = headroom_shift(partials.len());
    let blocks: Vec<Vec<i32>> = partials
        .par_iter()
        .map(|partial: &Partial| to_i24(&render_partial(partial, sample_rate)))
        .collect();
    debug!(partials = partials.len(), shift, "summing multipartial");
    sum_shifted(blocks, shift)
}

/// Floating-point rendition of [`render_multi_partial_i24`]: the same
/// headroom is applied as a scale by the matching power of two, so the two
/// outputs differ only in quantization.
pub fn render_multi_partial_f32(multi_partial: &MultiPartial, sample_rate: u32) -> Vec<f32> {
    let partials = multi_partial.partials();
    let scale = 1.0 / f64::from(1_u32 << headroom_shift(partials.len()));
    let blocks: Vec<Vec<f64>> =
        partials.par_iter().map(|partial: &Partial| render_partial(partial, sample_rate)).collect();
    sum_scaled(blocks, scale)
}

/// Renders a bundle of envelope-defined partials together.
#[derive(Debug)]
pub struct MultiPartialGenerator {
    generators: Vec<PartialGenerator>,
    labels: BTreeSet<String>,
}

impl MultiPartialGenerator {
    pub fn new(
        generators: Vec<PartialGenerator>,
        labels: BTreeSet<String>,
    ) -> Result<Self, SpecError> {
        if generators.is_empty() {
            return Err(SpecError::EmptyPartials);
        }
        if labels.iter().any(|label| label.is_empty()) {
            return Err(SpecError::EmptyLabel);
        }
        Ok(Self { generators, labels })
    }

    pub fn generators(&self) -> &[PartialGenerator] {
        &self.generators
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// The bundle expressed as explicit value types.
    pub fn multi_partial_spec(&self) -> MultiPartial {
        let partials =
            self.generators.iter().map(|g| g.partial_spec().clone()).collect::<Vec<_>>();
        MultiPartial::new(partials).expect("generator list is non-empty")
    }

    pub fn render_i24(&self) -> Vec<i32> {
        let shift = headroom_shift(self.generators.len());
        let blocks: Vec<Vec<i32>> =
            self.generators.par_iter().map(|generator| generator.render_i24()).collect();
        debug!(partials = self.generators.len(), shift, "summing multipartial");
        sum_shifted(blocks, shift)
    }

    pub fn render_f32(&self) -> Vec<f32> {
        let scale = 1.0 / f64::from(1_u32 << headroom_shift(self.generators.len()));
        let blocks: Vec<Vec<f64>> =
            self.generators.par_iter().map(|generator| generator.render()).collect();
        sum_scaled(blocks, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderConfig;
    use crate::spec::coordinate::{PartialEnvelopes, PhaseCoordinate, PhaseCoordinates};
    use crate::spec::envelope::{AmplitudeEnvelope, FrequencyEnvelope};

    const SAMPLE_RATE: u32 = 96_000;

    fn generator(frequency: f64, seconds: f64) -> PartialGenerator {
        let config = RenderConfig::new(SAMPLE_RATE, SAMPLE_RATE, 0).unwrap();
        let envelopes = PartialEnvelopes::new(
            AmplitudeEnvelope::constant(0.5, SAMPLE_RATE).unwrap(),
            FrequencyEnvelope::constant(frequency, SAMPLE_RATE).unwrap(),
            PhaseCoordinates::new(vec![
                PhaseCoordinate::explicit(0.0, 0.0, SAMPLE_RATE).unwrap(),
                PhaseCoordinate::natural(seconds, SAMPLE_RATE).unwrap(),
            ])
            .unwrap(),
        );
        PartialGenerator::new(&envelopes, BTreeSet::new(), 0.0, &config).unwrap()
    }

    #[test]
    fn headroom_shift_is_ceil_log2() {
        assert_eq!(headroom_shift(1), 0);
        assert_eq!(headroom_shift(2), 1);
        assert_eq!(headroom_shift(3), 2);
        assert_eq!(headroom_shift(4), 2);
        assert_eq!(headroom_shift(5), 3);
        assert_eq!(headroom_shift(8), 3);
        assert_eq!(headroom_shift(9), 4);
    }

    #[test]
    fn equal_partials_sum_to_shifted_multiples() {
        let single = generator(440.0, 1.0).render_i24();

        let bundle = MultiPartialGenerator::new(
            (0..4).map(|_| generator(440.0, 1.0)).collect(),
            BTreeSet::new(),
        )
        .unwrap();
        let summed = bundle.render_i24();

        assert_eq!(summed.len(), single.len());
        for (sum, &alone) in summed.iter().zip(&single) {
            assert_eq!(*sum, (alone >> 2) * 4);
        }
    }

    #[test]
    fn shorter_partials_are_zero_padded() {
        let bundle = MultiPartialGenerator::new(
            vec![generator(440.0, 2.0), generator(880.0, 1.0)],
            BTreeSet::new(),
        )
        .unwrap();
        let summed = bundle.render_i24();
        assert_eq!(summed.len(), 2 * SAMPLE_RATE as usize);

        // Past the short partial only the long one contributes.
        let long_alone = generator(440.0, 2.0).render_i24();
        let tail = SAMPLE_RATE as usize + 100;
        assert_eq!(summed[tail], long_alone[tail] >> 1);
    }

    #[test]
    fn summed_output_never_overflows_the_sample_range() {
        let bundle = MultiPartialGenerator::new(
            (0..5).map(|i| generator(100.0 * (i + 1) as f64, 1.0)).collect(),
            BTreeSet::new(),
        )
        .unwrap();
        let summed = bundle.render_i24();
        assert!(summed.iter().all(|&s| s.abs() <= crate::MAX_SAMPLE_I24));
    }

    #[test]
    fn float_and_integer_paths_share_one_waveform() {
        let bundle = MultiPartialGenerator::new(
            vec![generator(440.0, 1.0), generator(660.0, 1.0)],
            BTreeSet::new(),
        )
        .unwrap();
        let float = bundle.render_f32();
        let integer = bundle.render_i24();

        assert_eq!(float.len(), integer.len());
        for (f, &i) in float.iter().zip(&integer) {
            let rescaled = f64::from(i) / f64::from(crate::MAX_SAMPLE_I24);
            // Integer truncation costs at most a couple of sample steps.
            assert!((f64::from(*f) - rescaled).abs() < 1e-4);
        }
    }

    #[test]
    fn value_type_path_matches_the_generator_path() {
        let bundle = MultiPartialGenerator::new(
            vec![generator(440.0, 1.0), generator(550.0, 1.0)],
            BTreeSet::new(),
        )
        .unwrap();

        let spec = bundle.multi_partial_spec();
        let from_spec = render_multi_partial_i24(&spec, SAMPLE_RATE);
        let from_generators = bundle.render_i24();

        assert_eq!(from_spec.len(), from_generators.len());
        for (a, b) in from_spec.iter().zip(&from_generators) {
            assert!((a - b).abs() <= 2, "spec {a} vs generator {b}");
        }
    }

    #[test]
    fn rejects_an_empty_bundle() {
        let err = MultiPartialGenerator::new(Vec::new(), BTreeSet::new());
        assert_eq!(err.unwrap_err(), SpecError::EmptyPartials);
    }
}
