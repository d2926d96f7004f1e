use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tracegen::{
    Error,
    config::GeneratorConfig,
    export::{NpyExporter, TraceSink},
    generator::{BatchSummary, Generator},
    leakage_model::LeakPolicy,
    processors::MeanVar,
    synthesis::NoiseProfile,
    util::argmax_by,
};

/// Generate traces with side-channel leakage for testing side-channel analysis tools.
#[derive(Debug, StructOpt)]
#[structopt(name = "tracegen")]
struct Opt {
    /// Directory receiving the traces and the ciphertext database
    #[structopt(parse(from_os_str))]
    destination: PathBuf,
    /// Base name of the generated files [default: traces_<YYYYMMDD>]
    #[structopt(short, long)]
    basename: Option<String>,
    /// JSON file with generator parameters. Command line options take precedence.
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// Number of traces to generate [default: 1000]
    #[structopt(short = "n", long = "traces")]
    num_traces: Option<usize>,
    /// Number of samples in a trace [default: 1000]
    #[structopt(short = "s", long = "samples")]
    num_samples: Option<usize>,
    /// Amplitude of the uniform noise [default: 0.05]
    #[structopt(long = "noise")]
    noise_level: Option<f64>,
    /// Amplitude of the leakage [default: 0.01]
    #[structopt(long = "leakage")]
    leakage_level: Option<f64>,
    /// Relative position of the leakage in the trace [default: 0.8]
    #[structopt(long)]
    diff_pos: Option<f64>,
    /// Maximum clock jitter, in samples [default: 3]
    #[structopt(long = "jitter")]
    jitter_width: Option<usize>,
    /// Bit of the left half watched for a 0 to 1 transition [default: 0]
    #[structopt(long)]
    watched_bit: Option<usize>,
    /// 6-bit round key [default: 0]
    #[structopt(long)]
    round_key: Option<u8>,
    /// simulate, always_leak or never_leak [default: simulate]
    #[structopt(long)]
    policy: Option<LeakPolicy>,
    /// Use an all-zero baseline instead of uniform noise
    #[structopt(long)]
    degenerate_noise: bool,
    /// Seed of the random generator
    #[structopt(long)]
    seed: Option<u64>,
    /// Generate traces on all cores
    #[structopt(long)]
    parallel: bool,
    /// Plot the resulting average trace
    #[structopt(short, long)]
    plot: bool,
    #[structopt(short, long)]
    verbose: bool,
}

impl Opt {
    fn apply(&self, config: &mut GeneratorConfig) {
        if let Some(n) = self.num_traces {
            config.num_traces = n;
        }
        if let Some(n) = self.num_samples {
            config.num_samples = n;
        }
        if let Some(level) = self.noise_level {
            config.noise_level = level;
        }
        if let Some(level) = self.leakage_level {
            config.leakage_level = level;
        }
        if let Some(pos) = self.diff_pos {
            config.diff_pos = pos;
        }
        if let Some(width) = self.jitter_width {
            config.jitter_width = width;
        }
        if let Some(bit) = self.watched_bit {
            config.watched_bit_index = bit;
        }
        if let Some(key) = self.round_key {
            config.round_key = key;
        }
        if let Some(policy) = self.policy {
            config.leak_policy = policy;
        }
        if self.degenerate_noise {
            config.noise_profile = NoiseProfile::Degenerate;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_basename() -> String {
    let date = OffsetDateTime::now_utc().date();
    format!(
        "traces_{:04}{:02}{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[cfg(feature = "progress_bar")]
fn generate<S: TraceSink>(
    generator: &Generator,
    parallel: bool,
    sink: &mut S,
) -> Result<BatchSummary, Error> {
    let progress_bar = tracegen::util::progress_bar(generator.config().num_traces);
    let summary = generator.run(parallel, sink, |done| progress_bar.set_position(done as u64));
    progress_bar.finish();
    summary
}

#[cfg(not(feature = "progress_bar"))]
fn generate<S: TraceSink>(
    generator: &Generator,
    parallel: bool,
    sink: &mut S,
) -> Result<BatchSummary, Error> {
    let total = generator.config().num_traces;
    let step = (total / 10).max(1);
    generator.run(parallel, sink, |done| {
        if done % step == 0 || done == total {
            info!(done, total, "progress");
        }
    })
}

#[cfg(feature = "plot")]
fn plot(mean_var: &MeanVar) -> Result<()> {
    tracegen::plot::plot_average(mean_var).context("Failed to plot the average trace")
}

#[cfg(not(feature = "plot"))]
fn plot(_mean_var: &MeanVar) -> Result<()> {
    tracing::warn!("tracegen was built without the plot feature, skipping plot");
    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    init_tracing(opt.verbose);

    let mut config = match &opt.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    opt.apply(&mut config);

    let generator = Generator::new(config).context("Invalid generator configuration")?;
    let basename = opt.basename.clone().unwrap_or_else(default_basename);

    let exporter = NpyExporter::create(&opt.destination, &basename)
        .with_context(|| format!("Failed to create {}", opt.destination.display()))?;
    exporter
        .save_config(generator.config())
        .context("Failed to save the generator configuration")?;

    let mut sink = (exporter, MeanVar::new(generator.config().num_samples));
    let summary =
        generate(&generator, opt.parallel, &mut sink).context("Failed to generate traces")?;

    let (exporter, mean_var) = sink;
    if summary.num_traces > 0 {
        let peak = argmax_by(mean_var.mean().view(), f64::total_cmp);
        info!(peak, "average trace maximum");
    }

    println!(
        "Generated {} traces, {} with leakage. Ciphertexts: {}",
        summary.num_traces,
        summary.leak_count,
        exporter.database_path().display()
    );

    if opt.plot {
        plot(&mean_var)?;
    }

    Ok(())
}
