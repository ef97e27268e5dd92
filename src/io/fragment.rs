use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::spec::coordinate::{PartialEnvelopes, PhaseCoordinate, PhaseCoordinates};
use crate::spec::envelope::{AmplitudeEnvelope, CurveType, FrequencyEnvelope};
use crate::spec::error::SpecError;
use crate::{MAX_AUDIO_FREQUENCY, MIN_AUDIO_FREQUENCY};

/*
Audio fragment documents
========================

A fragment is the declarative, file-based form of a multipartial: a start
time, optional labels, and one `[[partial]]` table per partial, each holding
its two envelopes and its phase coordinate list. A phase entry without a
`phase` key means natural phase.

    start_time = 0.0
    labels = ["demo"]

    [[partial]]
    labels = ["fundamental"]
    frequency = { levels = [440.0], times = [] }
    amplitude = { levels = [0.5], times = [] }
    phase = [{ time = 0.0, phase = 0.0 }, { time = 2.0 }]

All range and ordering rules live in the `spec` value-type constructors; this
module only maps the document onto them and reports their verdicts.
*/

#[derive(Debug, Deserialize)]
pub struct FragmentDoc {
    pub start_time: f64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(rename = "partial")]
    pub partials: Vec<PartialDoc>,
}

#[derive(Debug, Deserialize)]
pub struct PartialDoc {
    #[serde(default)]
    pub labels: Vec<String>,
    pub frequency: EnvelopeDoc,
    pub amplitude: EnvelopeDoc,
    pub phase: Vec<PhaseDoc>,
}

#[derive(Debug, Deserialize)]
pub struct EnvelopeDoc {
    pub levels: Vec<f64>,
    #[serde(default)]
    pub times: Vec<f64>,
    #[serde(default)]
    pub curves: Vec<CurveDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CurveDoc {
    Named(String),
    Numeric(f64),
}

#[derive(Debug, Deserialize)]
pub struct PhaseDoc {
    pub time: f64,
    #[serde(default)]
    pub phase: Option<f64>,
}

/// A loaded fragment: the start time plus each partial's validated envelopes.
#[derive(Debug)]
pub struct AudioFragment {
    pub start_time: f64,
    pub labels: BTreeSet<String>,
    pub partials: Vec<(BTreeSet<String>, PartialEnvelopes)>,
}

#[derive(Debug)]
pub enum FragmentError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Spec(SpecError),
    UnknownCurve(String),
}

impl fmt::Display for FragmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentError::Io(e) => write!(f, "reading fragment: {e}"),
            FragmentError::Parse(e) => write!(f, "parsing fragment: {e}"),
            FragmentError::Spec(e) => write!(f, "invalid fragment: {e}"),
            FragmentError::UnknownCurve(name) => write!(f, "unknown envelope curve type: {name}"),
        }
    }
}

impl std::error::Error for FragmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FragmentError::Io(e) => Some(e),
            FragmentError::Parse(e) => Some(e),
            FragmentError::Spec(e) => Some(e),
            FragmentError::UnknownCurve(_) => None,
        }
    }
}

impl From<std::io::Error> for FragmentError {
    fn from(e: std::io::Error) -> Self {
        FragmentError::Io(e)
    }
}

impl From<toml::de::Error> for FragmentError {
    fn from(e: toml::de::Error) -> Self {
        FragmentError::Parse(e)
    }
}

impl From<SpecError> for FragmentError {
    fn from(e: SpecError) -> Self {
        FragmentError::Spec(e)
    }
}

fn curves_from_doc(curves: &[CurveDoc]) -> Result<Vec<CurveType>, FragmentError> {
    curves
        .iter()
        .map(|curve| match curve {
            CurveDoc::Numeric(value) => Ok(CurveType::Numeric(*value)),
            CurveDoc::Named(name) => match name.as_str() {
                "lin" => Ok(CurveType::Lin),
                "exp" => Ok(CurveType::Exp),
                "sine" => Ok(CurveType::Sine),
                "welch" => Ok(CurveType::Welch),
                "step" => Ok(CurveType::Step),
                other => Err(FragmentError::UnknownCurve(other.to_string())),
            },
        })
        .collect()
}

/// Reads and validates a fragment document from disk.
pub fn load_fragment(path: &Path, sample_rate: u32) -> Result<AudioFragment, FragmentError> {
    let text = fs::read_to_string(path)?;
    let fragment = parse_fragment(&text, sample_rate)?;
    info!(partials = fragment.partials.len(), path = %path.display(), "loaded fragment");
    Ok(fragment)
}

/// Validates a fragment document already held in memory.
pub fn parse_fragment(text: &str, sample_rate: u32) -> Result<AudioFragment, FragmentError> {
    let doc: FragmentDoc = toml::from_str(text)?;
    if doc.start_time < 0.0 {
        return Err(SpecError::NegativeTime(doc.start_time).into());
    }

    let mut partials = Vec::with_capacity(doc.partials.len());
    for partial in &doc.partials {
        let frequency = FrequencyEnvelope::new(
            partial.frequency.levels.clone(),
            partial.frequency.times.clone(),
            curves_from_doc(&partial.frequency.curves)?,
            sample_rate,
        )?;
        let amplitude = AmplitudeEnvelope::new(
            partial.amplitude.levels.clone(),
            partial.amplitude.times.clone(),
            curves_from_doc(&partial.amplitude.curves)?,
            sample_rate,
        )?;
        let coordinates = partial
            .phase
            .iter()
            .map(|entry| match entry.phase {
                Some(phase) => PhaseCoordinate::explicit(entry.time, phase, sample_rate),
                None => PhaseCoordinate::natural(entry.time, sample_rate),
            })
            .collect::<Result<Vec<_>, SpecError>>()?;
        let coordinates = PhaseCoordinates::new(coordinates)?;

        if let Some(&outside) = partial
            .frequency
            .levels
            .iter()
            .find(|&&hz| !(MIN_AUDIO_FREQUENCY..=MAX_AUDIO_FREQUENCY).contains(&hz))
        {
            warn!(frequency = outside, "partial leaves the audible band");
        }

        let labels: BTreeSet<String> = partial.labels.iter().cloned().collect();
        partials.push((labels, PartialEnvelopes::new(amplitude, frequency, coordinates)));
    }

    Ok(AudioFragment {
        start_time: doc.start_time,
        labels: doc.labels.iter().cloned().collect(),
        partials,
    })
}
