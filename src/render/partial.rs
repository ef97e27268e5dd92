use std::collections::BTreeSet;

use tracing::debug;

use crate::phase::{denormalize_frequency, phase_mod};
use crate::physical::generator::PhysicalEnvelopeGenerator;
use crate::physical::point::{PhysicalEnvelopePoint, PhysicalPartialEnvelope};
use crate::render::paxel::{render_paxel, render_points};
use crate::render::{to_f32, to_i24, RenderConfig};
use crate::spec::coordinate::PartialEnvelopes;
use crate::spec::error::SpecError;
use crate::spec::paxel::{MultiPaxel, Partial, Paxel};

/// Renders one grid cell described as a multipaxel: each member paxel renders
/// independently over the shared block and the blocks are summed. Members
/// occupy disjoint sample ranges by construction, so the sum is a merge.
pub fn render_multi_paxel(multi_paxel: &MultiPaxel, sample_rate: u32) -> Vec<f64> {
    let paxels = multi_paxel.paxels();
    let mut samples = render_paxel(&paxels[0], sample_rate);
    for paxel in &paxels[1..] {
        let block = render_paxel(paxel, sample_rate);
        for (target, source) in samples.iter_mut().zip(&block) {
            *target += source;
        }
    }
    samples
}

/// Renders a partial's full timeline by concatenating its multipaxels in
/// time order.
pub fn render_partial(partial: &Partial, sample_rate: u32) -> Vec<f64> {
    let mut samples = Vec::with_capacity(partial.total_samples());
    let mut final_block_sample = 0.0;

    for multi_paxel in partial.multi_paxels() {
        let block = render_multi_paxel(multi_paxel, sample_rate);
        final_block_sample = *block.last().expect("cells are never empty");
        samples.extend_from_slice(&block);
    }

    // Guards against a concatenation that silently truncates the last cell.
    assert_eq!(samples.len(), partial.total_samples());
    assert_eq!(*samples.last().expect("partial renders are non-empty"), final_block_sample);

    samples
}

/// Generates one partial from its composer-facing envelopes.
///
/// Construction runs the full physical-envelope conversion and keeps both
/// results: the per-cell point sequences for rendering, and the same timeline
/// expressed as validated paxel value types. The two views describe the same
/// waveform; the value types exist to be stored, inspected, or shipped to
/// another renderer as an explicit specification.
#[derive(Debug)]
pub struct PartialGenerator {
    partial: Partial,
    physical: PhysicalPartialEnvelope,
    labels: BTreeSet<String>,
    config: RenderConfig,
}

impl PartialGenerator {
    pub fn new(
        envelopes: &PartialEnvelopes,
        labels: BTreeSet<String>,
        start_time_seconds: f64,
        config: &RenderConfig,
    ) -> Result<Self, SpecError> {
        if labels.iter().any(|label| label.is_empty()) {
            return Err(SpecError::EmptyLabel);
        }

        let generator = PhysicalEnvelopeGenerator::new(envelopes, start_time_seconds, config);
        let (physical, segments) = generator.generate_with_segments();
        let partial = partial_from_segments(&segments, config)?;

        debug!(
            cells = physical.paxel_points.len(),
            labels = labels.len(),
            "generated partial from envelopes"
        );

        Ok(Self { partial, physical, labels, config: config.clone() })
    }

    pub fn partial_spec(&self) -> &Partial {
        &self.partial
    }

    pub fn physical_envelope(&self) -> &PhysicalPartialEnvelope {
        &self.physical
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Renders the partial's full timeline from the physical envelope,
    /// applying the sub-sample edge weights.
    pub fn render(&self) -> Vec<f64> {
        let cell_samples = self.config.paxel_samples();
        let mut samples =
            Vec::with_capacity(self.physical.paxel_points.len() * cell_samples as usize);
        for points in &self.physical.paxel_points {
            samples.extend(render_points(points, cell_samples));
        }

        if self.physical.first_sample_fraction < 1.0 {
            let index = self.first_audio_index();
            samples[index] *= self.physical.first_sample_fraction;
        }
        if self.physical.last_sample_fraction < 1.0 {
            let index = self.last_audio_index(samples.len());
            samples[index] *= self.physical.last_sample_fraction;
        }

        samples
    }

    pub fn render_f32(&self) -> Vec<f32> {
        to_f32(&self.render())
    }

    pub fn render_i24(&self) -> Vec<i32> {
        to_i24(&self.render())
    }

    /// Index of the partial's first audible sample: the first point of the
    /// first cell that is not a synthetic silence marker.
    fn first_audio_index(&self) -> usize {
        let first_cell = &self.physical.paxel_points[0];
        first_cell
            .iter()
            .find(|point| point.frequency > 0.0)
            .map_or(0, |point| point.time_samples as usize)
    }

    /// Index of the partial's last audible sample: one before the trailing
    /// silence marker of the last cell, or the very end when the partial is
    /// grid-aligned.
    fn last_audio_index(&self, total_samples: usize) -> usize {
        let cell_samples = self.config.paxel_samples() as usize;
        let last_cell = self.physical.paxel_points.last().expect("cells are never empty");
        let base = (self.physical.paxel_points.len() - 1) * cell_samples;
        match last_cell.last() {
            Some(point) if point.frequency == 0.0 && point.time_samples > 0 => {
                base + point.time_samples as usize - 1
            }
            _ => total_samples - 1,
        }
    }
}

/// Re-expresses the corrected segment timeline (absolute sample times) as a
/// partial of grid-sized multipaxels. Each segment becomes one paxel; a
/// segment never straddles a cell boundary because the generator inserts a
/// point on every boundary it crosses.
fn partial_from_segments(
    segments: &[PhysicalEnvelopePoint],
    config: &RenderConfig,
) -> Result<Partial, SpecError> {
    assert!(segments.len() >= 2);

    let cell = config.paxel_samples();
    let offset = config.grid_offset();
    let sample_rate = config.sample_rate();
    let first_index = (segments[0].time_samples - offset) / cell;

    let mut cells: Vec<Vec<Paxel>> = Vec::new();
    for pair in segments.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let index = ((from.time_samples - offset) / cell - first_index) as usize;
        if cells.len() <= index {
            cells.resize_with(index + 1, Vec::new);
        }

        let local_start = (from.time_samples - offset) % cell;
        let span = to.time_samples - from.time_samples;
        let paxel = Paxel::new(
            denormalize_frequency(from.frequency, sample_rate),
            denormalize_frequency(to.frequency, sample_rate),
            from.amplitude,
            to.amplitude,
            phase_mod(from.cycle_accumulator),
            phase_mod(to.cycle_accumulator),
            cell,
            local_start,
            local_start + span - 1,
        )?;
        cells[index].push(paxel);
    }

    let multi_paxels =
        cells.into_iter().map(MultiPaxel::new).collect::<Result<Vec<_>, SpecError>>()?;
    Partial::new(multi_paxels)
}
