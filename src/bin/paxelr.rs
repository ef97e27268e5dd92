use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use tracing::info;

use paxel_dsp::io::fragment::load_fragment;
use paxel_dsp::io::wav::{write_wav_f32, write_wav_i24};
use paxel_dsp::render::{MultiPartialGenerator, PartialGenerator, RenderConfig};
use paxel_dsp::DEFAULT_SAMPLE_RATE;

/// Render a declarative audio fragment to a WAV file.
#[derive(Parser, Debug)]
#[command(name = "paxelr", version, about = "Offline additive-synthesis renderer")]
struct Args {
    /// Fragment description (TOML)
    fragment: PathBuf,

    /// Output WAV path
    #[arg(short, long, default_value = "fragment.wav")]
    output: PathBuf,

    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Paxel grid cell size in samples (defaults to one second)
    #[arg(long)]
    paxel_samples: Option<u32>,

    /// Offset of the paxel grid in samples
    #[arg(long, default_value_t = 0)]
    grid_offset: u32,

    /// Write float-32 samples instead of 24-bit PCM
    #[arg(long)]
    float: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = RenderConfig::new(
        args.sample_rate,
        args.paxel_samples.unwrap_or(args.sample_rate),
        args.grid_offset,
    )?;

    let fragment = load_fragment(&args.fragment, args.sample_rate)
        .wrap_err("failed to load the fragment document")?;

    let generators = fragment
        .partials
        .iter()
        .map(|(labels, envelopes)| {
            PartialGenerator::new(envelopes, labels.clone(), fragment.start_time, &config)
        })
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("failed to generate partials")?;

    let bundle = MultiPartialGenerator::new(generators, fragment.labels.clone())?;

    if args.float {
        let samples = bundle.render_f32();
        info!(samples = samples.len(), "rendered fragment");
        write_wav_f32(&args.output, &samples, args.sample_rate)
            .wrap_err("failed to write the WAV file")?;
    } else {
        let samples = bundle.render_i24();
        info!(samples = samples.len(), "rendered fragment");
        write_wav_i24(&args.output, &samples, args.sample_rate)
            .wrap_err("failed to write the WAV file")?;
    }

    Ok(())
}
