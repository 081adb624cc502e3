use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use onset_silence::analysis::OnsetFunctionType;
use onset_silence::config::DetectorConfig;
use onset_silence::host::{read_wav, PluginRunner, StampedFeature};
use onset_silence::plugin::Plugin;
use onset_silence::plugins::{OnsetPlugin, SilencePlugin};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "onset_silence_cli",
    about = "Run the onset and silence detectors over a WAV file"
)]
struct Cli {
    /// JSON configuration file (missing or invalid files fall back to defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Step size in frames (defaults to the detector's preferred size)
    #[arg(long, global = true)]
    step: Option<usize>,
    /// Write the JSON report here instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect note onsets
    Onsets {
        #[arg(long)]
        input: PathBuf,
        /// Detection function: energy, spectral_difference, hfc, complex, phase, kl, mkl
        #[arg(long)]
        function: Option<OnsetFunctionType>,
        /// Peak picker threshold (0..1)
        #[arg(long)]
        threshold: Option<f32>,
        /// Silence veto threshold in dB
        #[arg(long, allow_hyphen_values = true)]
        silence: Option<f32>,
    },
    /// Detect silent and non-silent regions
    Silence {
        #[arg(long)]
        input: PathBuf,
        /// Silence threshold in dB
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f32>,
        /// Host API version (1 reports start/end instants)
        #[arg(long)]
        api_version: Option<u32>,
    },
    /// Print the default configuration as JSON
    DumpConfig,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = cli
        .config
        .as_ref()
        .map(DetectorConfig::load_from_file)
        .unwrap_or_default();
    if let Some(step) = cli.step {
        config.host.step_size = Some(step);
    }

    match cli.command {
        Commands::Onsets {
            input,
            function,
            threshold,
            silence,
        } => {
            if let Some(function) = function {
                config.onset.function = function;
            }
            if let Some(threshold) = threshold {
                config.onset.peak_pick_threshold = threshold;
            }
            if let Some(silence) = silence {
                config.onset.silence_threshold_db = silence;
            }
            run_onsets(&config, &input, cli.output)
        }
        Commands::Silence {
            input,
            threshold,
            api_version,
        } => {
            if let Some(threshold) = threshold {
                config.silence.threshold_db = threshold;
            }
            if let Some(api_version) = api_version {
                config.silence.api_version = api_version;
            }
            run_silence(&config, &input, cli.output)
        }
        Commands::DumpConfig => {
            let json = serde_json::to_string_pretty(&DetectorConfig::default())?;
            println!("{json}");
            Ok(ExitCode::from(0))
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run_onsets(
    config: &DetectorConfig,
    input: &Path,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let audio = read_wav(input)?;
    let mut plugin = OnsetPlugin::with_config(audio.sample_rate as f32, config.onset.clone());
    check_onset_parameters(&plugin)?;

    let features = PluginRunner::from_config(&config.host)
        .run(&mut plugin, &audio.channels)
        .with_context(|| format!("detecting onsets in {}", input.display()))?;

    emit_report(&plugin, input, audio.sample_rate, &features, output)
}

fn run_silence(
    config: &DetectorConfig,
    input: &Path,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let audio = read_wav(input)?;
    let mut plugin =
        SilencePlugin::with_config(audio.sample_rate as f32, config.silence.clone());
    if plugin
        .parameter_descriptors()
        .iter()
        .any(|d| !d.contains(config.silence.threshold_db))
    {
        return Err(anyhow!(
            "Silence threshold {} dB is outside -120..0",
            config.silence.threshold_db
        ));
    }

    let features = PluginRunner::from_config(&config.host)
        .run(&mut plugin, &audio.channels)
        .with_context(|| format!("detecting silence in {}", input.display()))?;

    emit_report(&plugin, input, audio.sample_rate, &features, output)
}

/// Reject configured values outside the declared parameter ranges
fn check_onset_parameters(plugin: &OnsetPlugin) -> Result<()> {
    for descriptor in plugin.parameter_descriptors() {
        if let Some(value) = plugin.parameter(descriptor.identifier) {
            if !descriptor.contains(value) {
                return Err(anyhow!(
                    "{} = {} is outside {}..{}",
                    descriptor.identifier,
                    value,
                    descriptor.min_value,
                    descriptor.max_value
                ));
            }
        }
    }
    Ok(())
}

fn emit_report(
    plugin: &dyn Plugin,
    input: &Path,
    sample_rate: u32,
    features: &[StampedFeature],
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let report = FeatureReport {
        plugin: plugin.identifier(),
        plugin_version: plugin.plugin_version(),
        input: input.display().to_string(),
        sample_rate,
        feature_count: features.len(),
        features,
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct FeatureReport<'a> {
    plugin: &'static str,
    plugin_version: u32,
    input: String,
    sample_rate: u32,
    feature_count: usize,
    #[serde(skip_serializing_if = "slice_empty")]
    features: &'a [StampedFeature],
}

fn slice_empty(features: &&[StampedFeature]) -> bool {
    features.is_empty()
}
