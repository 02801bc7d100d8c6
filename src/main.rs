//! BovHEAT CLI
//!
//! Heat detection on dairy cow activity sensor exports.

use anyhow::{bail, Context};
use bovheat::{
    config::{AnalysisParams, Config, MAX_PARAM},
    core::Pipeline,
    ingest::{discover_files, HeaderLanguage, SourceReader},
    report::{default_base_name, ManifestBuilder, ReportWriter},
    stats::create_shared_stats,
    INTERACTIVE_BANNER, VERSION,
};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bovheat")]
#[command(version = VERSION)]
#[command(about = "Heat detection on dairy cow activity exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse all exports below a directory
    Run {
        /// Directory containing the activity exports
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Base name of the output files
        #[arg(short = 'o', long)]
        outputname: Option<String>,

        /// Do not write the per-step window table
        #[arg(long)]
        no_windows: bool,

        /// Increase log verbosity (-v info, -vv debug)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Show configuration
    Config {
        /// Persist the given options as new defaults
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Options overriding the stored configuration.
#[derive(Args)]
struct Overrides {
    /// Observation window in days in milk, e.g. `-s 0 30`
    #[arg(
        short = 's',
        long,
        num_args = 2,
        value_names = ["START", "STOP"],
        allow_negative_numbers = true
    )]
    startstop: Option<Vec<i64>>,

    /// Activity threshold (0-100)
    #[arg(short = 't', long)]
    threshold: Option<u32>,

    /// Minimum number of consecutive observations above the threshold (1-100)
    #[arg(short = 'm', long)]
    minheatlength: Option<usize>,

    /// Maximum number of consecutive missing observations to interpolate, 0 disables
    #[arg(short = 'i', long)]
    interpolation_limit: Option<usize>,

    /// Column header language of the exports
    #[arg(short = 'l', long)]
    language: Option<HeaderLanguage>,

    /// Worker threads for reading exports, 0 = auto
    #[arg(short = 'c', long)]
    cores: Option<usize>,

    /// Directory the results are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(&[start, stop]) = self.startstop.as_deref() {
            config.start_dim = start;
            config.stop_dim = stop;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(min_heat_length) = self.minheatlength {
            config.min_heat_length = min_heat_length;
        }
        if let Some(limit) = self.interpolation_limit {
            config.interpolation_limit = limit;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(cores) = self.cores {
            config.cores = cores;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            overrides,
            outputname,
            no_windows,
            verbose,
        } => {
            init_tracing(verbose);
            cmd_run(path, &overrides, outputname, no_windows)
        }
        Commands::Config { save, overrides } => cmd_config(save, &overrides),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn cmd_run(
    path: PathBuf,
    overrides: &Overrides,
    outputname: Option<String>,
    no_windows: bool,
) -> anyhow::Result<()> {
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load configuration ({e}), using defaults");
        Config::default()
    });
    overrides.apply(&mut config);

    let mut params = config.params();
    if overrides.startstop.is_none() {
        params = interactive_params(params)?;
    }
    params.validate().context("Invalid analysis parameters")?;
    check_cores(config.cores)?;

    println!("BovHEAT v{VERSION}");
    println!();
    println!("Analysing {}", path.display());
    println!("  Language: {}", params.language);
    println!("  Window: DIM {} to {}", params.start_dim, params.stop_dim);
    println!("  Threshold: {}", params.threshold);
    println!("  Minimum heat length: {}", params.min_heat_length);
    match params.interpolation_limit {
        Some(limit) => println!("  Interpolation limit: {limit}"),
        None => println!("  Interpolation: disabled"),
    }
    println!();

    let files = discover_files(&path)
        .with_context(|| format!("Could not list exports in {}", path.display()))?;
    println!("Found {} export file(s)", files.len());

    let stats = create_shared_stats();
    let reader = SourceReader::new(params.language, config.cores, stats.clone());
    tracing::info!(workers = reader.workers(), "reading exports");
    let observations = reader.read_all(&files).context("Reading exports failed")?;

    println!();
    println!("Analysing {} observations...", observations.len());
    let output = Pipeline::with_stats(&params, stats.clone())
        .run(&observations)
        .context("Analysis failed")?;

    let base_name =
        outputname.unwrap_or_else(|| default_base_name(&params, Local::now().naive_local()));
    let mut writer = ReportWriter::new(&config.output_dir, base_name);
    if no_windows {
        writer = writer.without_windows();
    }

    let written = writer
        .write_tables(&output)
        .context("Writing result tables failed")?;
    let manifest = ManifestBuilder::new().build(
        &params,
        stats.snapshot(),
        &output,
        writer.planned_files(),
    );
    let manifest_path = writer
        .write_manifest(&manifest)
        .context("Writing run manifest failed")?;

    println!();
    for file in written.iter().chain(std::iter::once(&manifest_path)) {
        println!("Wrote {}", file.display());
    }
    println!();
    println!("{}", stats.summary());

    Ok(())
}

fn cmd_config(save: bool, overrides: &Overrides) -> anyhow::Result<()> {
    let mut config = Config::load().context("Could not load configuration")?;
    overrides.apply(&mut config);

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if save {
        config.params().validate().context("Refusing to save")?;
        check_cores(config.cores)?;
        config.save().context("Error saving config")?;
        println!();
        println!("Configuration saved.");
    }
    Ok(())
}

fn check_cores(cores: usize) -> anyhow::Result<()> {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if cores > available {
        bail!("Only {available} cores available, {cores} requested");
    }
    Ok(())
}

/// Ask for the analysis parameters on stdin until the user confirms them.
fn interactive_params(defaults: AnalysisParams) -> anyhow::Result<AnalysisParams> {
    println!("{INTERACTIVE_BANNER}");

    let mut current = defaults;
    loop {
        let language = ask_parsed("Header language (eng/ger)", current.language)?;
        let start_dim = ask_parsed("Start DIM", current.start_dim)?;
        let stop_dim = ask_parsed("Stop DIM", current.stop_dim)?;
        let threshold = ask_parsed(&format!("Threshold (0-{MAX_PARAM})"), current.threshold)?;
        let min_heat_length = ask_parsed(
            &format!("Minimum heat length (1-{MAX_PARAM})"),
            current.min_heat_length,
        )?;

        current = AnalysisParams {
            language,
            start_dim,
            stop_dim,
            threshold,
            min_heat_length,
            interpolation_limit: current.interpolation_limit,
        };

        if let Err(e) = current.validate() {
            println!("{e}");
            println!();
            continue;
        }

        println!();
        println!(
            "Language: {}, DIM {} to {}, threshold {}, minimum heat length {}",
            current.language,
            current.start_dim,
            current.stop_dim,
            current.threshold,
            current.min_heat_length
        );
        loop {
            match ask("Continue (c) or retry (r)?", "c")?.as_str() {
                "c" => return Ok(current),
                "r" => break,
                _ => println!("Please enter c or r."),
            }
        }
        println!();
    }
}

fn ask(question: &str, default: &str) -> anyhow::Result<String> {
    print!("{question} [{default}]: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        bail!("Input closed while waiting for an answer");
    }
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_lowercase()
    })
}

fn ask_parsed<T>(question: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    loop {
        match ask(question, &default.to_string())?.parse::<T>() {
            Ok(value) => return Ok(value),
            Err(e) => println!("Invalid input: {e}"),
        }
    }
}
