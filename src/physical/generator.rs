use std::collections::BTreeSet;

use tracing::debug;

use crate::phase::{
    coherence_compensation, compute_cycle_accumulator_to_exact_end, compute_frequency_rate,
    normalize_frequency, seconds_to_samples,
};
use crate::physical::point::{
    interpolate, PhysicalAmplitudeCoordinate, PhysicalEnvelopePoint, PhysicalFrequencyCoordinate,
    PhysicalPartialEnvelope, PhysicalPhaseCoordinate,
};
use crate::render::RenderConfig;
use crate::spec::coordinate::{PartialEnvelopes, PhaseCoordinates, PhaseTarget};

/*
PhysicalEnvelopeGenerator
=========================

Converts the logical definition of a partial (envelopes in continuous time,
phase coordinates as target values) into the physical definition the renderer
consumes. The conversion runs in ordered stages:

1. Trim. Envelopes may carry redundant trailing entries, and their total
   duration rarely matches the partial's lifetime exactly (the lifetime is
   defined by the final phase coordinate). Short envelopes hold their final
   level to the end; long ones are truncated, interpolating the value exactly
   at the cut so no dangling segment remains.

2. Materialize. Breakpoints become sample-indexed coordinates; frequency is
   normalized to radians per sample.

3. Merge. Every breakpoint of either envelope, and every phase coordinate,
   yields one envelope point. Between points, frequency and amplitude change
   linearly. Phase accumulates into an unwrapped cycle accumulator, seeded
   with the partial's start phase; it never wraps here, so a consistent
   frequency rate can be computed across any span.

4. Phase correction. At every explicit phase coordinate the naturally
   accumulated value is compared with the demanded phase (including whatever
   cumulative shift earlier coordinates already introduced) and the coherent
   compensation is distributed over the points since the previous coordinate,
   proportionally to elapsed samples. Frequency rates are then recomputed from
   the shifted accumulator values so that per-sample interpolation lands on
   each point exactly.

5. Grid slicing. The corrected timeline is split into paxel-grid cells,
   interpolating a point wherever a cell boundary falls inside a segment.
   A partial whose start or end is not grid-aligned gets synthetic silent
   points at the edges, and the sub-sample remainder of the first and last
   sample instants is recorded as a pair of fractional weights for the
   renderer to apply.

Time inside the generator is relative to the partial's first sample; only the
slicing stage places the result absolutely within the piece.

An instance performs one conversion: `generate` consumes the generator, so
scratch state cannot leak between runs. Anything that goes wrong past
construction of the input types is a defect in this module or its caller, and
asserts accordingly.
*/

pub struct PhysicalEnvelopeGenerator<'a> {
    sample_rate: u32,
    paxel_samples: u32,
    grid_offset: u32,

    frequency_levels: Vec<f64>,
    frequency_times: Vec<f64>,
    amplitude_levels: Vec<f64>,
    amplitude_times: Vec<f64>,
    phase_coordinates: &'a PhaseCoordinates,

    end_time_seconds: f64,
    end_sample: u32,
    start_sample: u32,
    first_sample_fraction: f64,
    last_sample_fraction: f64,

    // All envelope points live in this one ordered arena; `anchors` holds
    // indices (not references) into it, one per phase coordinate.
    points: Vec<PhysicalEnvelopePoint>,
    anchors: Vec<usize>,
}

impl<'a> PhysicalEnvelopeGenerator<'a> {
    pub fn new(
        envelopes: &'a PartialEnvelopes,
        start_time_seconds: f64,
        config: &RenderConfig,
    ) -> Self {
        assert!(start_time_seconds >= 0.0, "partial placed before the start of the piece");

        let sample_rate = config.sample_rate();
        let end_time_seconds = envelopes.phase_coordinates.end_time_seconds();
        let end_sample = envelopes.phase_coordinates.end_time_samples();

        let exact_start = start_time_seconds * f64::from(sample_rate);
        let start_sample = exact_start.floor() as u32;
        let start_remainder = exact_start - exact_start.floor();
        let first_sample_fraction = if start_remainder == 0.0 { 1.0 } else { 1.0 - start_remainder };

        let exact_end = exact_start + end_time_seconds * f64::from(sample_rate);
        let end_remainder = exact_end - exact_end.floor();
        let last_sample_fraction = if end_remainder == 0.0 { 1.0 } else { end_remainder };

        Self {
            sample_rate,
            paxel_samples: config.paxel_samples(),
            grid_offset: config.grid_offset(),
            frequency_levels: envelopes.frequency.envelope().levels().to_vec(),
            frequency_times: envelopes.frequency.envelope().times_seconds().to_vec(),
            amplitude_levels: envelopes.amplitude.envelope().levels().to_vec(),
            amplitude_times: envelopes.amplitude.envelope().times_seconds().to_vec(),
            phase_coordinates: &envelopes.phase_coordinates,
            end_time_seconds,
            end_sample,
            start_sample,
            first_sample_fraction,
            last_sample_fraction,
            points: Vec::new(),
            anchors: Vec::new(),
        }
    }

    /// Runs the conversion, consuming the generator.
    pub fn generate(self) -> PhysicalPartialEnvelope {
        self.run().0
    }

    /// As [`generate`](Self::generate), additionally returning the corrected
    /// segment timeline with absolute sample times. The composition layer
    /// uses it to express the same result as paxel value types.
    pub(crate) fn generate_with_segments(
        self,
    ) -> (PhysicalPartialEnvelope, Vec<PhysicalEnvelopePoint>) {
        self.run()
    }

    fn run(mut self) -> (PhysicalPartialEnvelope, Vec<PhysicalEnvelopePoint>) {
        trim_envelope(&mut self.amplitude_levels, &mut self.amplitude_times, self.end_time_seconds);
        trim_envelope(&mut self.frequency_levels, &mut self.frequency_times, self.end_time_seconds);

        let frequency_coords = self.frequency_coords();
        let amplitude_coords = self.amplitude_coords();
        let phase_coords = self.phase_coords();

        self.merge_coordinates(&frequency_coords, &amplitude_coords, &phase_coords);
        self.correct_controlled_phase(&phase_coords);
        self.recompute_rates();
        self.slice_into_grid()
    }

    fn frequency_coords(&self) -> Vec<PhysicalFrequencyCoordinate> {
        materialize_breakpoints(
            &self.frequency_levels,
            &self.frequency_times,
            self.end_sample,
            self.sample_rate,
        )
        .into_iter()
        .map(|(time_samples, hz)| {
            PhysicalFrequencyCoordinate::new(normalize_frequency(hz, self.sample_rate), time_samples)
        })
        .collect()
    }

    fn amplitude_coords(&self) -> Vec<PhysicalAmplitudeCoordinate> {
        materialize_breakpoints(
            &self.amplitude_levels,
            &self.amplitude_times,
            self.end_sample,
            self.sample_rate,
        )
        .into_iter()
        .map(|(time_samples, amplitude)| PhysicalAmplitudeCoordinate::new(amplitude, time_samples))
        .collect()
    }

    fn phase_coords(&self) -> Vec<PhysicalPhaseCoordinate> {
        let coordinates = self.phase_coordinates.coordinates();
        coordinates
            .iter()
            .enumerate()
            .map(|(i, coordinate)| PhysicalPhaseCoordinate {
                target: coordinate.target(),
                // The final coordinate defines the end of the partial; pin it
                // to the trimmed envelopes' end sample.
                time_samples: if i + 1 == coordinates.len() {
                    self.end_sample
                } else {
                    coordinate.time_samples()
                },
            })
            .collect()
    }

    /// Stage 3: one envelope point per breakpoint sample index, natural cycle
    /// accumulation in between.
    fn merge_coordinates(
        &mut self,
        frequency_coords: &[PhysicalFrequencyCoordinate],
        amplitude_coords: &[PhysicalAmplitudeCoordinate],
        phase_coords: &[PhysicalPhaseCoordinate],
    ) {
        let mut boundaries = BTreeSet::new();
        for coordinate in frequency_coords {
            boundaries.insert(coordinate.time_samples);
        }
        for coordinate in amplitude_coords {
            boundaries.insert(coordinate.time_samples);
        }
        for coordinate in phase_coords {
            boundaries.insert(coordinate.time_samples);
        }

        let start_phase = match phase_coords[0].target {
            PhaseTarget::Explicit(phase) => phase,
            PhaseTarget::Natural => unreachable!("first phase coordinate is always explicit"),
        };

        let mut previous: Option<(u32, f64)> = None;
        for &time_samples in &boundaries {
            let frequency = frequency_at(frequency_coords, time_samples);
            let amplitude = amplitude_at(amplitude_coords, time_samples);
            let cycle_accumulator = match previous {
                None => start_phase,
                Some((previous_time, previous_frequency)) => compute_cycle_accumulator_to_exact_end(
                    self.points.last().expect("previous point exists").cycle_accumulator,
                    previous_frequency,
                    frequency,
                    time_samples - previous_time,
                ),
            };
            self.points.push(PhysicalEnvelopePoint {
                time_samples,
                cycle_accumulator,
                frequency,
                frequency_rate: 0.0,
                amplitude,
                amplitude_rate: 0.0,
            });
            previous = Some((time_samples, frequency));
        }

        self.anchors = phase_coords
            .iter()
            .map(|coordinate| {
                self.points
                    .binary_search_by_key(&coordinate.time_samples, |point| point.time_samples)
                    .expect("every phase coordinate has a merged point")
            })
            .collect();

        assert_eq!(self.anchors.first(), Some(&0));
        assert_eq!(self.anchors.last(), Some(&(self.points.len() - 1)));
        assert_eq!(self.anchors.len(), self.phase_coordinates.coordinates().len());

        debug!(points = self.points.len(), anchors = self.anchors.len(), "merged envelope timeline");
    }

    /// Stage 4: reconcile the accumulated cycle values with every explicit
    /// phase coordinate. Corrections accumulate forward: each coordinate is
    /// compared against the naturally accumulated value plus the shift that
    /// earlier coordinates already introduced.
    fn correct_controlled_phase(&mut self, phase_coords: &[PhysicalPhaseCoordinate]) {
        let mut cumulative_shift = 0.0_f64;

        for k in 1..self.anchors.len() {
            let previous_index = self.anchors[k - 1];
            let current_index = self.anchors[k];

            let proportional_shift = match phase_coords[k].target {
                PhaseTarget::Explicit(target) => coherence_compensation(
                    self.points[current_index].cycle_accumulator + cumulative_shift,
                    target,
                ),
                PhaseTarget::Natural => 0.0,
            };

            if cumulative_shift == 0.0 && proportional_shift == 0.0 {
                continue;
            }

            let span_start = self.points[previous_index].time_samples;
            let span = self.points[current_index].time_samples - span_start;
            assert!(span > 0);

            for index in previous_index + 1..current_index {
                let elapsed = self.points[index].time_samples - span_start;
                self.points[index].cycle_accumulator +=
                    cumulative_shift + proportional_shift * f64::from(elapsed) / f64::from(span);
            }

            // The anchor itself is set from the cumulative total so that no
            // interpolation residue reaches the coordinate sample.
            cumulative_shift += proportional_shift;
            self.points[current_index].cycle_accumulator += cumulative_shift;
        }
    }

    /// Frequency rates must reproduce each point's accumulator exactly, so
    /// they are derived from the (possibly shifted) accumulator deltas rather
    /// than from the endpoint frequencies. For uncorrected segments the two
    /// derivations agree.
    fn recompute_rates(&mut self) {
        for i in 0..self.points.len() - 1 {
            let next = self.points[i + 1];
            let point = &mut self.points[i];
            let span = next.time_samples - point.time_samples;
            point.amplitude_rate = (next.amplitude - point.amplitude) / f64::from(span);
            point.frequency_rate = compute_frequency_rate(
                point.cycle_accumulator,
                point.frequency,
                next.cycle_accumulator,
                span,
            );
        }
    }

    /// Stage 5: split the corrected timeline over the paxel grid.
    fn slice_into_grid(self) -> (PhysicalPartialEnvelope, Vec<PhysicalEnvelopePoint>) {
        let cell = self.paxel_samples;
        let offset = self.grid_offset;

        assert!(self.end_sample > 0);
        assert!(self.points.len() >= 2);
        assert!(
            self.start_sample >= offset,
            "partial starts before the grid origin (start {}, offset {offset})",
            self.start_sample
        );

        let start_abs = self.start_sample;
        let end_abs = start_abs + self.end_sample;
        let first_index = (start_abs - offset) / cell;
        let last_index = (end_abs - 1 - offset) / cell;

        // Expand the timeline with an interpolated point wherever a cell
        // boundary falls strictly inside a segment.
        let mut segments: Vec<PhysicalEnvelopePoint> = Vec::with_capacity(self.points.len());
        for i in 0..self.points.len() - 1 {
            segments.push(self.points[i]);
            let segment_start_abs = start_abs + self.points[i].time_samples;
            let segment_end_abs = start_abs + self.points[i + 1].time_samples;
            let mut boundary = offset + ((segment_start_abs - offset) / cell + 1) * cell;
            while boundary < segment_end_abs {
                segments.push(interpolate(
                    &self.points[i],
                    &self.points[i + 1],
                    boundary - start_abs,
                ));
                boundary += cell;
            }
        }
        segments.push(*self.points.last().expect("points are non-empty"));

        let cell_count = (last_index - first_index + 1) as usize;
        let mut paxel_points: Vec<Vec<PhysicalEnvelopePoint>> = vec![Vec::new(); cell_count];
        for point in &segments {
            let abs = start_abs + point.time_samples;
            if abs == end_abs {
                // The terminal point only marks the end boundary.
                break;
            }
            let index = ((abs - offset) / cell - first_index) as usize;
            let local = (abs - offset) % cell;
            paxel_points[index].push(PhysicalEnvelopePoint { time_samples: local, ..*point });
        }

        if (start_abs - offset) % cell != 0 {
            paxel_points[0].insert(0, PhysicalEnvelopePoint::silent(0));
        }
        let end_local = (end_abs - offset) % cell;
        if end_local != 0 {
            paxel_points[cell_count - 1].push(PhysicalEnvelopePoint::silent(end_local));
        }

        for points in &paxel_points {
            assert!(!points.is_empty());
            assert_eq!(points[0].time_samples, 0);
        }

        debug!(
            cells = cell_count,
            first_paxel_index = first_index,
            "sliced envelope onto the paxel grid"
        );

        // Hand the segment timeline back in absolute time for the value-type
        // conversion.
        for point in &mut segments {
            point.time_samples += start_abs;
        }

        (
            PhysicalPartialEnvelope {
                paxel_points,
                first_paxel_index: first_index,
                first_sample_fraction: self.first_sample_fraction,
                last_sample_fraction: self.last_sample_fraction,
            },
            segments,
        )
    }
}

/// Stage 1: normalize a (levels, times) pair against the partial's end time.
///
/// Redundant trailing times, then redundant trailing levels, are dropped
/// first (lenient legacy envelopes allow both). A short envelope holds its
/// final level to the end; a long one is cut, with the level interpolated
/// exactly at the cut point.
fn trim_envelope(levels: &mut Vec<f64>, times: &mut Vec<f64>, end_time_seconds: f64) {
    while times.len() >= levels.len() {
        times.pop();
    }
    while levels.len() > times.len() + 1 {
        levels.pop();
    }

    assert!(!levels.is_empty());
    assert_eq!(times.len() + 1, levels.len());

    let mut total: f64 = times.iter().sum();
    if total == end_time_seconds {
        return;
    }

    if total < end_time_seconds {
        times.push(end_time_seconds - total);
        levels.push(*levels.last().expect("levels are non-empty"));
    } else {
        // Drop whole segments that lie entirely beyond the end, keeping the
        // one that crosses it.
        while total - times.last().expect("times are non-empty") > end_time_seconds {
            total -= times.pop().expect("times are non-empty");
            levels.pop();
            assert!(!levels.is_empty());
            assert!(!times.is_empty());
        }

        let crossing_time = *times.last().expect("times are non-empty");
        let before_end = total - crossing_time;
        let remaining = end_time_seconds - before_end;
        let level_after = levels[levels.len() - 1];
        let level_before = levels[levels.len() - 2];
        let interpolated = level_before + (level_after - level_before) * (remaining / crossing_time);

        levels.pop();
        times.pop();
        levels.push(interpolated);
        times.push(remaining);
    }

    assert!(!levels.is_empty());
    assert_eq!(times.len() + 1, levels.len());
}

/// Walks a trimmed (levels, times) pair into `(sample_index, level)` pairs.
/// Breakpoints that quantize onto the same sample collapse into a step,
/// keeping the later value; the final breakpoint is pinned to `end_sample`.
fn materialize_breakpoints(
    levels: &[f64],
    times: &[f64],
    end_sample: u32,
    sample_rate: u32,
) -> Vec<(u32, f64)> {
    let mut coords: Vec<(u32, f64)> = Vec::with_capacity(levels.len());
    let mut elapsed = 0.0_f64;

    for (i, &level) in levels.iter().enumerate() {
        let time_samples = if i + 1 == levels.len() {
            end_sample
        } else {
            seconds_to_samples(elapsed, sample_rate)
        };
        match coords.last_mut() {
            Some(last) if last.0 == time_samples => last.1 = level,
            _ => coords.push((time_samples, level)),
        }
        if i < times.len() {
            elapsed += times[i];
        }
    }

    assert_eq!(coords.first().map(|c| c.0), Some(0));
    assert_eq!(coords.last().map(|c| c.0), Some(end_sample));
    coords
}

fn frequency_at(coords: &[PhysicalFrequencyCoordinate], time_samples: u32) -> f64 {
    piecewise_linear(coords, time_samples, |c| (c.time_samples, c.frequency))
}

fn amplitude_at(coords: &[PhysicalAmplitudeCoordinate], time_samples: u32) -> f64 {
    piecewise_linear(coords, time_samples, |c| (c.time_samples, c.amplitude))
}

fn piecewise_linear<T>(coords: &[T], time_samples: u32, project: impl Fn(&T) -> (u32, f64)) -> f64 {
    match coords.binary_search_by_key(&time_samples, |c| project(c).0) {
        Ok(i) => project(&coords[i]).1,
        Err(i) => {
            assert!(i > 0 && i < coords.len(), "time {time_samples} outside the envelope");
            let (t0, v0) = project(&coords[i - 1]);
            let (t1, v1) = project(&coords[i]);
            v0 + (v1 - v0) * (f64::from(time_samples - t0) / f64::from(t1 - t0))
        }
    }
}
