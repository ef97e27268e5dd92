use crate::phase::seconds_to_samples;
use crate::spec::error::SpecError;

/*
Breakpoint Envelopes
====================

An envelope is a piecewise-linear trajectory given as `levels` (the breakpoint
values) and `times` (the duration of each segment between two levels). A
single level with no times is a constant. Extra trailing times are tolerated
and ignored; the physical-envelope stage trims them away before use.

Times are stored both in seconds (as authored) and in samples (as rendered),
so later stages never have to re-derive the conversion.

Frequency and amplitude envelopes share this one representation and differ
only in which levels they accept; the constructors inject the level rule, so
there is no type hierarchy to maintain.

Curve markers are parsed and carried but not yet interpreted: every segment
renders linearly today.
*/

/// Curve shape for one envelope segment. Reserved: all rendering is linear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveType {
    Lin,
    Exp,
    Sine,
    Welch,
    Step,
    Numeric(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    levels: Vec<f64>,
    times_seconds: Vec<f64>,
    times_samples: Vec<u32>,
    curves: Vec<CurveType>,
}

impl Envelope {
    fn validated(
        levels: Vec<f64>,
        times: Vec<f64>,
        curves: Vec<CurveType>,
        sample_rate: u32,
        level_ok: fn(f64) -> bool,
        level_error: fn(f64) -> SpecError,
    ) -> Result<Self, SpecError> {
        if sample_rate == 0 {
            return Err(SpecError::ZeroSampleRate);
        }
        if levels.is_empty() {
            return Err(SpecError::EmptyLevels);
        }
        if times.len() + 1 < levels.len() {
            return Err(SpecError::TimesTooShort { levels: levels.len(), times: times.len() });
        }
        if let Some(&bad) = times.iter().find(|&&t| t < 0.0) {
            return Err(SpecError::NegativeTime(bad));
        }
        if let Some(&bad) = levels.iter().find(|&&level| !level_ok(level)) {
            return Err(level_error(bad));
        }

        let times_samples = times.iter().map(|&t| seconds_to_samples(t, sample_rate)).collect();
        Ok(Self { levels, times_seconds: times, times_samples, curves })
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn times_seconds(&self) -> &[f64] {
        &self.times_seconds
    }

    pub fn times_samples(&self) -> &[u32] {
        &self.times_samples
    }

    pub fn curves(&self) -> &[CurveType] {
        &self.curves
    }
}

/// An envelope applied to the frequency of a partial. Levels are Hz and must
/// stay strictly positive; no upper bound is enforced because sweeps beyond
/// the audible band are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyEnvelope {
    env: Envelope,
}

impl FrequencyEnvelope {
    pub fn new(
        levels: Vec<f64>,
        times: Vec<f64>,
        curves: Vec<CurveType>,
        sample_rate: u32,
    ) -> Result<Self, SpecError> {
        Envelope::validated(levels, times, curves, sample_rate, |l| l > 0.0, SpecError::FrequencyLevel)
            .map(|env| Self { env })
    }

    /// A constant-frequency envelope.
    pub fn constant(frequency_hz: f64, sample_rate: u32) -> Result<Self, SpecError> {
        Self::new(vec![frequency_hz], Vec::new(), Vec::new(), sample_rate)
    }

    pub fn envelope(&self) -> &Envelope {
        &self.env
    }
}

/// An envelope applied to the amplitude of a partial. Levels stay within
/// `[-1, 1]`; negative levels are allowed and correspond to phase inversion.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeEnvelope {
    env: Envelope,
}

impl AmplitudeEnvelope {
    pub fn new(
        levels: Vec<f64>,
        times: Vec<f64>,
        curves: Vec<CurveType>,
        sample_rate: u32,
    ) -> Result<Self, SpecError> {
        Envelope::validated(
            levels,
            times,
            curves,
            sample_rate,
            |l| (-1.0..=1.0).contains(&l),
            SpecError::AmplitudeLevel,
        )
        .map(|env| Self { env })
    }

    /// A constant-amplitude envelope.
    pub fn constant(amplitude: f64, sample_rate: u32) -> Result<Self, SpecError> {
        Self::new(vec![amplitude], Vec::new(), Vec::new(), sample_rate)
    }

    pub fn envelope(&self) -> &Envelope {
        &self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 96_000;

    #[test]
    fn stores_times_in_seconds_and_samples() {
        let env = FrequencyEnvelope::new(vec![100.0, 200.0], vec![0.5], Vec::new(), SAMPLE_RATE)
            .unwrap();
        assert_eq!(env.envelope().times_seconds(), &[0.5]);
        assert_eq!(env.envelope().times_samples(), &[48_000]);
    }

    #[test]
    fn a_single_level_is_a_constant() {
        let env = AmplitudeEnvelope::constant(0.4, SAMPLE_RATE).unwrap();
        assert_eq!(env.envelope().levels(), &[0.4]);
        assert!(env.envelope().times_seconds().is_empty());
    }

    #[test]
    fn extra_trailing_times_are_tolerated() {
        // Emulates lenient legacy envelopes; the generator trims them later.
        let env =
            FrequencyEnvelope::new(vec![100.0], vec![1.0, 2.0], Vec::new(), SAMPLE_RATE).unwrap();
        assert_eq!(env.envelope().times_seconds().len(), 2);
    }

    #[test]
    fn rejects_empty_levels() {
        let err = FrequencyEnvelope::new(Vec::new(), Vec::new(), Vec::new(), SAMPLE_RATE);
        assert_eq!(err.unwrap_err(), SpecError::EmptyLevels);
    }

    #[test]
    fn rejects_missing_times() {
        let err = FrequencyEnvelope::new(vec![100.0, 200.0, 300.0], vec![1.0], Vec::new(), SAMPLE_RATE);
        assert!(matches!(err.unwrap_err(), SpecError::TimesTooShort { .. }));
    }

    #[test]
    fn rejects_negative_times() {
        let err = AmplitudeEnvelope::new(vec![0.5, 0.2], vec![-0.5], Vec::new(), SAMPLE_RATE);
        assert_eq!(err.unwrap_err(), SpecError::NegativeTime(-0.5));
    }

    #[test]
    fn frequency_levels_must_be_positive() {
        let err = FrequencyEnvelope::new(vec![100.0, 0.0], vec![1.0], Vec::new(), SAMPLE_RATE);
        assert_eq!(err.unwrap_err(), SpecError::FrequencyLevel(0.0));
    }

    #[test]
    fn amplitude_levels_may_be_negative_within_range() {
        assert!(AmplitudeEnvelope::new(vec![-0.8, 0.8], vec![1.0], Vec::new(), SAMPLE_RATE).is_ok());
        let err = AmplitudeEnvelope::new(vec![1.2], Vec::new(), Vec::new(), SAMPLE_RATE);
        assert_eq!(err.unwrap_err(), SpecError::AmplitudeLevel(1.2));
    }
}
