//! Physical (sample-indexed) envelope representation.
//!
//! The composer-facing envelopes in [`crate::spec`] live in continuous time.
//! Before anything can be rendered they are re-expressed on the sample grid:
//! times become sample indices, frequencies become normalized
//! radians-per-sample, and frequency plus phase merge into one unwrapped
//! cycle-accumulator trajectory. The [`generator`] performs that conversion;
//! [`point`] holds the converted forms.

/// Conversion from logical envelopes to the physical form.
pub mod generator;
/// Sample-indexed coordinate and envelope-point types.
pub mod point;

pub use generator::PhysicalEnvelopeGenerator;
pub use point::{
    interpolate, PhysicalAmplitudeCoordinate, PhysicalEnvelopePoint, PhysicalFrequencyCoordinate,
    PhysicalPartialEnvelope, PhysicalPhaseCoordinate,
};
