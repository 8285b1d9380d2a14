//! Package flow simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::inline_always
)]

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};

use parcelsim::{
    CsvSink, MetricsRecorder, Scheduler, SimulationConfig, TextSink, Tick,
};

/// Runs package flow simulation.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Simulation input: a JSON configuration if the extension is `.json`, and the plain-text
    /// format otherwise.
    input: PathBuf,

    /// Read the plain-text input in the extended format, with feature flags and edge lists.
    #[clap(long)]
    extended: bool,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Store the logs this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to stderr.
    #[clap(long)]
    no_stderr: bool,

    /// Write package transitions to this file in CSV format.
    #[clap(long)]
    csv_output: Option<PathBuf>,

    /// Stop the simulation after this time.
    #[clap(long)]
    max_time: Option<Tick>,

    /// Do not print package transitions to stdout.
    #[clap(short, long)]
    quiet: bool,

    /// Display a progress bar of delivered packages.
    #[clap(long)]
    progress: bool,
}

/// Advances a progress bar whenever a package reaches a final state.
struct ProgressRecorder {
    pb: ProgressBar,
}

impl MetricsRecorder for ProgressRecorder {
    fn delivery(&mut self, time: Tick, _: Tick) {
        self.pb.inc(1);
        self.pb.set_message(&format!("[{}]", time));
    }

    fn undeliverable(&mut self) {
        self.pb.inc(1);
    }
}

fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        let _ = std::fs::remove_file(path);
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .append(false)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

/// Reads the simulation configuration.
///
/// If the file's extension is `.json`, then it will treat it as a JSON file.
/// Otherwise, it will be treated as the plain-text format.
fn read_config(file_path: &Path, extended: bool) -> eyre::Result<SimulationConfig> {
    let file = File::open(file_path)
        .wrap_err_with(|| format!("unable to open input file: {}", file_path.display()))?;
    let reader = BufReader::new(file);
    if file_path.extension().map_or(false, |e| e == "json") {
        SimulationConfig::from_json(reader).wrap_err("unable to parse JSON configuration")
    } else if extended {
        SimulationConfig::from_legacy_extended(reader)
            .wrap_err("unable to parse input in the extended format")
    } else {
        SimulationConfig::from_legacy(reader).wrap_err("unable to parse input")
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;

    let config = read_config(&opt.input, opt.extended)?;
    let setup = config
        .into_setup()
        .wrap_err("invalid simulation configuration")?;
    let total = setup.packages.len() as u64;
    let mut scheduler = Scheduler::new(setup)?;

    if !opt.quiet {
        scheduler.add_sink(Box::new(TextSink::new(io::BufWriter::new(io::stdout()))));
    }
    if let Some(path) = &opt.csv_output {
        let file = File::create(path)
            .wrap_err_with(|| format!("unable to create CSV output: {}", path.display()))?;
        scheduler.add_sink(Box::new(CsvSink::new(io::BufWriter::new(file))));
    }
    let pb = if opt.progress {
        ProgressBar::new(total)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(ProgressStyle::default_bar().template("{msg} {wide_bar} {pos}/{len}"));
    scheduler.add_recorder(Box::new(ProgressRecorder { pb: pb.clone() }));

    let metrics = match opt.max_time {
        Some(time) => scheduler.run_until(time)?,
        None => scheduler.run()?,
    };
    pb.finish();
    for line in metrics.to_string().lines() {
        log::info!("{}", line);
    }
    if scheduler.active_packages() > 0 {
        log::warn!(
            "{} packages still on their way at {}",
            scheduler.active_packages(),
            scheduler.time()
        );
    }
    Ok(())
}
