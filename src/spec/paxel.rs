use std::f64::consts::TAU;

use crate::spec::error::SpecError;

/// The atomic renderable unit: a fixed block of samples carrying linear
/// frequency and amplitude trajectories and pinned boundary phases.
///
/// `start_sample` and `end_sample` (inclusive) delimit the audible region
/// inside `duration_samples`; anything outside renders as silence. That is
/// how sub-blocks align to envelope breakpoints that do not land on grid
/// boundaries, and how a partial starts or ends inside a grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paxel {
    start_frequency: f64,
    end_frequency: f64,
    start_amplitude: f64,
    end_amplitude: f64,
    start_phase: f64,
    end_phase: f64,
    duration_samples: u32,
    start_sample: u32,
    end_sample: u32,
}

impl Paxel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_frequency: f64,
        end_frequency: f64,
        start_amplitude: f64,
        end_amplitude: f64,
        start_phase: f64,
        end_phase: f64,
        duration_samples: u32,
        start_sample: u32,
        end_sample: u32,
    ) -> Result<Self, SpecError> {
        if duration_samples == 0 {
            return Err(SpecError::ZeroDuration);
        }
        if start_sample > end_sample || end_sample > duration_samples - 1 {
            return Err(SpecError::SampleRange { start_sample, end_sample, duration_samples });
        }
        if start_frequency <= 0.0 {
            return Err(SpecError::FrequencyLevel(start_frequency));
        }
        if end_frequency <= 0.0 {
            return Err(SpecError::FrequencyLevel(end_frequency));
        }
        if !(-1.0..=1.0).contains(&start_amplitude) {
            return Err(SpecError::AmplitudeLevel(start_amplitude));
        }
        if !(-1.0..=1.0).contains(&end_amplitude) {
            return Err(SpecError::AmplitudeLevel(end_amplitude));
        }
        if !(0.0..=TAU).contains(&start_phase) {
            return Err(SpecError::PhaseOutOfRange(start_phase));
        }
        if !(0.0..=TAU).contains(&end_phase) {
            return Err(SpecError::PhaseOutOfRange(end_phase));
        }

        Ok(Self {
            start_frequency,
            end_frequency,
            start_amplitude,
            end_amplitude,
            start_phase,
            end_phase,
            duration_samples,
            start_sample,
            end_sample,
        })
    }

    pub fn start_frequency(&self) -> f64 {
        self.start_frequency
    }

    pub fn end_frequency(&self) -> f64 {
        self.end_frequency
    }

    pub fn start_amplitude(&self) -> f64 {
        self.start_amplitude
    }

    pub fn end_amplitude(&self) -> f64 {
        self.end_amplitude
    }

    pub fn start_phase(&self) -> f64 {
        self.start_phase
    }

    pub fn end_phase(&self) -> f64 {
        self.end_phase
    }

    pub fn duration_samples(&self) -> u32 {
        self.duration_samples
    }

    pub fn start_sample(&self) -> u32 {
        self.start_sample
    }

    pub fn end_sample(&self) -> u32 {
        self.end_sample
    }

    /// Number of audible samples, counting both boundary samples.
    pub fn audio_samples(&self) -> u32 {
        1 + self.end_sample - self.start_sample
    }
}

/// One fixed grid cell, possibly subdivided into several paxels because an
/// envelope breakpoint falls inside it.
///
/// Member paxels share one duration, are contiguous in sample index, and at
/// every internal boundary the end values of one paxel equal the start values
/// of the next exactly. Silence may remain only before the first paxel or
/// after the last one, which happens at the outer cells of a partial.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPaxel {
    paxels: Vec<Paxel>,
}

impl MultiPaxel {
    pub fn new(paxels: Vec<Paxel>) -> Result<Self, SpecError> {
        if paxels.is_empty() {
            return Err(SpecError::EmptyPaxels);
        }

        for i in 1..paxels.len() {
            let previous = &paxels[i - 1];
            let current = &paxels[i];
            let mismatch = |field| SpecError::PaxelMismatch { index: i, field };

            if current.duration_samples != previous.duration_samples {
                return Err(mismatch("duration"));
            }
            if current.start_sample != previous.end_sample + 1 {
                return Err(mismatch("sample position"));
            }
            if current.start_frequency != previous.end_frequency {
                return Err(mismatch("frequency"));
            }
            if current.start_phase != previous.end_phase {
                return Err(mismatch("phase"));
            }
            if current.start_amplitude != previous.end_amplitude {
                return Err(mismatch("amplitude"));
            }
        }

        Ok(Self { paxels })
    }

    pub fn paxels(&self) -> &[Paxel] {
        &self.paxels
    }

    pub fn duration_samples(&self) -> u32 {
        self.paxels[0].duration_samples
    }
}

/// The complete lifetime of one oscillator: multipaxels of one shared cell
/// duration, continuous across every boundary. Interior cells must be fully
/// covered; only the first cell may start late and only the last may end
/// early.
#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    multi_paxels: Vec<MultiPaxel>,
}

impl Partial {
    pub fn new(multi_paxels: Vec<MultiPaxel>) -> Result<Self, SpecError> {
        if multi_paxels.is_empty() {
            return Err(SpecError::EmptyMultiPaxels);
        }

        for i in 1..multi_paxels.len() {
            let back = multi_paxels[i - 1].paxels().last().expect("multipaxels are non-empty");
            let front = multi_paxels[i].paxels().first().expect("multipaxels are non-empty");
            let mismatch = |field| SpecError::MultiPaxelMismatch { index: i, field };

            if front.duration_samples != back.duration_samples {
                return Err(mismatch("duration"));
            }
            if back.end_sample != back.duration_samples - 1 {
                return Err(mismatch("coverage"));
            }
            if front.start_sample != 0 {
                return Err(mismatch("coverage"));
            }
            if front.start_frequency != back.end_frequency {
                return Err(mismatch("frequency"));
            }
            if front.start_amplitude != back.end_amplitude {
                return Err(mismatch("amplitude"));
            }
            if front.start_phase != back.end_phase {
                return Err(mismatch("phase"));
            }
        }

        Ok(Self { multi_paxels })
    }

    pub fn multi_paxels(&self) -> &[MultiPaxel] {
        &self.multi_paxels
    }

    pub fn duration_samples(&self) -> u32 {
        self.multi_paxels[0].duration_samples()
    }

    /// Length of the rendered partial, including edge silence.
    pub fn total_samples(&self) -> usize {
        self.multi_paxels.len() * self.duration_samples() as usize
    }
}

/// A set of partials rendered and summed together. Continuity is each
/// partial's own responsibility; the set only has to be non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPartial {
    partials: Vec<Partial>,
}

impl MultiPartial {
    pub fn new(partials: Vec<Partial>) -> Result<Self, SpecError> {
        if partials.is_empty() {
            return Err(SpecError::EmptyPartials);
        }
        Ok(Self { partials })
    }

    pub fn partials(&self) -> &[Partial] {
        &self.partials
    }
}
