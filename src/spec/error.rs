use std::fmt;

/// Why a specification value failed to construct.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecError {
    EmptyLevels,
    TimesTooShort { levels: usize, times: usize },
    NegativeTime(f64),
    FrequencyLevel(f64),
    AmplitudeLevel(f64),
    PhaseOutOfRange(f64),
    NaturalAtTimeZero,
    CoordinateCount(usize),
    FirstCoordinateTime(f64),
    FirstCoordinateNatural,
    CoordinateOrder(usize),
    ZeroDuration,
    SampleRange { start_sample: u32, end_sample: u32, duration_samples: u32 },
    EmptyPaxels,
    EmptyMultiPaxels,
    EmptyPartials,
    PaxelMismatch { index: usize, field: &'static str },
    MultiPaxelMismatch { index: usize, field: &'static str },
    EmptyLabel,
    GridConfig { paxel_samples: u32, grid_offset: u32 },
    ZeroSampleRate,
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::EmptyLevels => write!(f, "envelope has no levels"),
            SpecError::TimesTooShort { levels, times } => write!(
                f,
                "envelope with {levels} levels needs at least {} times, got {times}",
                levels - 1
            ),
            SpecError::NegativeTime(t) => write!(f, "negative time value {t}"),
            SpecError::FrequencyLevel(v) => {
                write!(f, "frequency level {v} is not strictly positive")
            }
            SpecError::AmplitudeLevel(v) => {
                write!(f, "amplitude level {v} is outside [-1, 1]")
            }
            SpecError::PhaseOutOfRange(v) => write!(f, "phase {v} is outside [0, 2\u{3c0}]"),
            SpecError::NaturalAtTimeZero => {
                write!(f, "natural phase is not allowed at the start of a partial")
            }
            SpecError::CoordinateCount(n) => {
                write!(f, "phase coordinates need at least a start and an end, got {n}")
            }
            SpecError::FirstCoordinateTime(t) => {
                write!(f, "first phase coordinate must be at time zero, got {t}")
            }
            SpecError::FirstCoordinateNatural => {
                write!(f, "first phase coordinate must specify an explicit phase")
            }
            SpecError::CoordinateOrder(i) => {
                write!(f, "phase coordinate {i} is not strictly later than its predecessor")
            }
            SpecError::ZeroDuration => write!(f, "paxel duration must be at least one sample"),
            SpecError::SampleRange { start_sample, end_sample, duration_samples } => write!(
                f,
                "sample range {start_sample}..={end_sample} does not fit a {duration_samples}-sample paxel"
            ),
            SpecError::EmptyPaxels => write!(f, "multipaxel has no paxels"),
            SpecError::EmptyMultiPaxels => write!(f, "partial has no multipaxels"),
            SpecError::EmptyPartials => write!(f, "multipartial has no partials"),
            SpecError::PaxelMismatch { index, field } => {
                write!(f, "paxel {index} does not continue its predecessor's {field}")
            }
            SpecError::MultiPaxelMismatch { index, field } => {
                write!(f, "multipaxel {index} does not continue its predecessor's {field}")
            }
            SpecError::EmptyLabel => write!(f, "labels must not be empty strings"),
            SpecError::GridConfig { paxel_samples, grid_offset } => write!(
                f,
                "grid offset {grid_offset} must be smaller than the paxel size {paxel_samples}"
            ),
            SpecError::ZeroSampleRate => write!(f, "sample rate must be positive"),
        }
    }
}

impl std::error::Error for SpecError {}
