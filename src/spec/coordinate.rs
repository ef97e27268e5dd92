use std::f64::consts::TAU;

use crate::phase::seconds_to_samples;
use crate::spec::envelope::{AmplitudeEnvelope, FrequencyEnvelope};
use crate::spec::error::SpecError;

/// Where the oscillator's phase must land at a coordinate: an explicit target
/// value, or whatever value unconstrained continuation would reach
/// ("natural" phase).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseTarget {
    Explicit(f64),
    Natural,
}

/// A point in the evolution of a partial where the phase is pinned.
///
/// Times here are absolute positions within the partial, not relative
/// durations like envelope times. A natural coordinate acts as an anchor: it
/// releases control of the phase up to that point so that a later explicit
/// coordinate only corrects the span after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseCoordinate {
    time_seconds: f64,
    time_samples: u32,
    target: PhaseTarget,
}

impl PhaseCoordinate {
    /// A coordinate that demands an explicit phase, in radians within
    /// `[0, 2π]`.
    pub fn explicit(time_seconds: f64, phase: f64, sample_rate: u32) -> Result<Self, SpecError> {
        if sample_rate == 0 {
            return Err(SpecError::ZeroSampleRate);
        }
        if time_seconds < 0.0 {
            return Err(SpecError::NegativeTime(time_seconds));
        }
        if !(0.0..=TAU).contains(&phase) {
            return Err(SpecError::PhaseOutOfRange(phase));
        }
        Ok(Self {
            time_seconds,
            time_samples: seconds_to_samples(time_seconds, sample_rate),
            target: PhaseTarget::Explicit(phase),
        })
    }

    /// A coordinate that accepts the naturally accumulated phase. Not allowed
    /// at time zero, where the phase must be stated.
    pub fn natural(time_seconds: f64, sample_rate: u32) -> Result<Self, SpecError> {
        if sample_rate == 0 {
            return Err(SpecError::ZeroSampleRate);
        }
        if time_seconds <= 0.0 {
            return Err(SpecError::NaturalAtTimeZero);
        }
        Ok(Self {
            time_seconds,
            time_samples: seconds_to_samples(time_seconds, sample_rate),
            target: PhaseTarget::Natural,
        })
    }

    pub fn time_seconds(&self) -> f64 {
        self.time_seconds
    }

    pub fn time_samples(&self) -> u32 {
        self.time_samples
    }

    pub fn target(&self) -> PhaseTarget {
        self.target
    }
}

/// The ordered phase coordinates of one partial. The first and last
/// coordinates bound the partial's lifetime: the first must sit at time zero
/// with an explicit phase, and every coordinate must be strictly later than
/// its predecessor (in samples too, so no two coordinates collapse onto the
/// same grid position).
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseCoordinates {
    coordinates: Vec<PhaseCoordinate>,
}

impl PhaseCoordinates {
    pub fn new(coordinates: Vec<PhaseCoordinate>) -> Result<Self, SpecError> {
        if coordinates.len() < 2 {
            return Err(SpecError::CoordinateCount(coordinates.len()));
        }

        let first = &coordinates[0];
        if first.time_seconds != 0.0 || first.time_samples != 0 {
            return Err(SpecError::FirstCoordinateTime(first.time_seconds));
        }
        if matches!(first.target, PhaseTarget::Natural) {
            return Err(SpecError::FirstCoordinateNatural);
        }

        for (i, pair) in coordinates.windows(2).enumerate() {
            if pair[1].time_seconds <= pair[0].time_seconds
                || pair[1].time_samples <= pair[0].time_samples
            {
                return Err(SpecError::CoordinateOrder(i + 1));
            }
        }

        Ok(Self { coordinates })
    }

    pub fn coordinates(&self) -> &[PhaseCoordinate] {
        &self.coordinates
    }

    pub fn end_time_seconds(&self) -> f64 {
        self.coordinates.last().expect("coordinates are non-empty").time_seconds
    }

    pub fn end_time_samples(&self) -> u32 {
        self.coordinates.last().expect("coordinates are non-empty").time_samples
    }
}

/// The full composer-facing description of one partial. Placement within a
/// composition is supplied separately, as a start time, when converting to
/// physical form.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialEnvelopes {
    pub amplitude: AmplitudeEnvelope,
    pub frequency: FrequencyEnvelope,
    pub phase_coordinates: PhaseCoordinates,
}

impl PartialEnvelopes {
    /// Invariants are carried by the three members themselves.
    pub fn new(
        amplitude: AmplitudeEnvelope,
        frequency: FrequencyEnvelope,
        phase_coordinates: PhaseCoordinates,
    ) -> Self {
        Self { amplitude, frequency, phase_coordinates }
    }
}
