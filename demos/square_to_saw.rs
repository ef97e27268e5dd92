//! Morphs a square-wave harmonic stack into a sawtooth.
//!
//! Odd harmonics start at their square-wave weights; even harmonics start
//! silent. Between seconds 1 and 3 every harmonic glides to its sawtooth
//! weight (negative for even harmonics, which flips their phase), so the
//! timbre slides from hollow to buzzy while each partial keeps its phase
//! pinned at the morph boundaries.
//!
//! Writes `square_to_saw.wav` in the working directory.

use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::path::Path;

use paxel_dsp::io::wav::write_wav_i24;
use paxel_dsp::render::{MultiPartialGenerator, PartialGenerator, RenderConfig};
use paxel_dsp::spec::{
    AmplitudeEnvelope, FrequencyEnvelope, PartialEnvelopes, PhaseCoordinate, PhaseCoordinates,
};
use paxel_dsp::{DEFAULT_SAMPLE_RATE, MAX_AUDIO_FREQUENCY};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let sample_rate = DEFAULT_SAMPLE_RATE;
    let config = RenderConfig::new(sample_rate, sample_rate, 0)?;
    let fundamental = 100.123;

    let mut generators = Vec::new();
    let mut harmonic = 1_i32;
    loop {
        let frequency = fundamental * f64::from(harmonic);
        if frequency > MAX_AUDIO_FREQUENCY {
            break;
        }

        let square_weight = 2.0 / (f64::from(harmonic) * PI);
        let saw_weight = 2.0 * (-1.0_f64).powi(harmonic + 1) / (f64::from(harmonic) * PI);
        let start_weight = if harmonic % 2 == 1 { square_weight } else { 0.0 };

        let envelopes = PartialEnvelopes::new(
            AmplitudeEnvelope::new(
                vec![start_weight / 2.0, start_weight / 2.0, saw_weight / 2.0],
                vec![1.0, 2.0],
                Vec::new(),
                sample_rate,
            )?,
            FrequencyEnvelope::constant(frequency, sample_rate)?,
            PhaseCoordinates::new(vec![
                PhaseCoordinate::explicit(0.0, 0.0, sample_rate)?,
                PhaseCoordinate::natural(1.0, sample_rate)?,
                PhaseCoordinate::explicit(3.0, 0.0, sample_rate)?,
                PhaseCoordinate::natural(6.0, sample_rate)?,
            ])?,
        );

        let label = if harmonic % 2 == 1 { "odd" } else { "even" };
        let labels: BTreeSet<String> = [label.to_string()].into_iter().collect();
        generators.push(PartialGenerator::new(&envelopes, labels, 0.0, &config)?);

        harmonic += 1;
    }

    println!("rendering {} harmonics", generators.len());
    let bundle = MultiPartialGenerator::new(generators, BTreeSet::new())?;
    let samples = bundle.render_i24();

    write_wav_i24(Path::new("square_to_saw.wav"), &samples, sample_rate)?;
    println!("wrote square_to_saw.wav ({} samples)", samples.len());
    Ok(())
}
