//! Specification value types for paxel-based additive synthesis.
//!
//! These types carry structured data between the layers of the pipeline and
//! perform no processing of their own. Each constructor is also the
//! validator: an out-of-range or structurally inconsistent specification
//! fails to construct at all, so downstream code only ever sees legal
//! values. They are decoupled from the rendering code so that specifying a
//! synthesis job stays independent from performing it.
//!
//! The renderable hierarchy builds up as: [`Paxel`] (one fixed block),
//! [`MultiPaxel`] (one grid cell, possibly subdivided), [`Partial`] (a full
//! oscillator lifetime), [`MultiPartial`] (partials summed together). The
//! composer-facing forms are [`FrequencyEnvelope`], [`AmplitudeEnvelope`] and
//! [`PhaseCoordinates`], aggregated by [`PartialEnvelopes`].

/// Composer-facing phase targets and the envelope aggregate.
pub mod coordinate;
/// Breakpoint envelopes with per-kind level validation.
pub mod envelope;
/// Construction failures.
pub mod error;
/// The renderable paxel / partial hierarchy.
pub mod paxel;

pub use coordinate::{PartialEnvelopes, PhaseCoordinate, PhaseCoordinates, PhaseTarget};
pub use envelope::{AmplitudeEnvelope, CurveType, Envelope, FrequencyEnvelope};
pub use error::SpecError;
pub use paxel::{MultiPartial, MultiPaxel, Partial, Paxel};
