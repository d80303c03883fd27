use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use glob::glob;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use uav_insight::{
    analyze_log_file, build_digest, AnalysisConfig, AnalysisRun, TrajectorySummary,
};

fn main() -> Result<()> {
    let matches = Command::new("uav_insight")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Telemetry diagnostics for ArduPilot (.bin) and PX4 (.ulg) flight logs")
        .arg(
            Arg::new("inputs")
                .help("Log files or glob patterns")
                .required(true)
                .num_args(1..),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .action(ArgAction::SetTrue)
                .help("Write the aligned dataset as <log>.aligned.csv"),
        )
        .arg(
            Arg::new("digest")
                .long("digest")
                .action(ArgAction::SetTrue)
                .help("Write the summary digest as <log>.digest.json"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory (default: next to each input file)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML file overriding analysis thresholds"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .get_matches();

    let default_filter = if matches.get_flag("verbose") {
        "uav_insight=debug"
    } else {
        "uav_insight=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = match matches.get_one::<String>("config") {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => AnalysisConfig::default(),
    };

    let inputs: Vec<String> = matches
        .get_many::<String>("inputs")
        .expect("inputs are required")
        .cloned()
        .collect();
    let files = expand_input_paths(&inputs)?;
    if files.is_empty() {
        anyhow::bail!("No input files matched");
    }

    let output_dir = matches.get_one::<String>("output-dir").map(PathBuf::from);
    let write_csv = matches.get_flag("csv");
    let write_digest = matches.get_flag("digest");

    let mut failures = 0usize;
    for file in &files {
        match analyze_log_file(file, &config) {
            Ok(run) => {
                print_summary(&run);
                if let Err(e) =
                    write_outputs(&run, file, output_dir.as_deref(), write_csv, write_digest, &config)
                {
                    eprintln!("Error writing outputs for {}: {}", file.display(), e);
                    failures += 1;
                }
            }
            Err(e) => {
                eprintln!("Error: {}: {}", file.display(), e);
                failures += 1;
            }
        }
    }

    if failures == files.len() {
        anyhow::bail!("All {} input file(s) failed", failures);
    }
    Ok(())
}

/// Expand plain paths and glob patterns into a file list.
fn expand_input_paths(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.contains('*') || input.contains('?') {
            let paths = glob(input)
                .with_context(|| format!("Invalid glob pattern '{}'", input))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("Error expanding glob pattern '{}'", input))?;
            for path in paths {
                if path.is_file() {
                    files.push(path);
                }
            }
        } else {
            let path = PathBuf::from(input);
            if path.is_file() {
                files.push(path);
            } else {
                eprintln!("Warning: path not found or not a file: {}", input);
            }
        }
    }

    Ok(files)
}

fn print_summary(run: &AnalysisRun) {
    let report = &run.report;
    println!("=== {} ({}) ===", run.source.name, run.source.format);
    println!(
        "  duration: {:.1}s, rows: {}, channels: {}",
        report.duration_s,
        run.dataset.len(),
        run.dataset.columns.len()
    );

    println!(
        "  vibration events: {}, clipping events: {}",
        report.vibration_events.len(),
        report.clipping_events.len()
    );
    for event in &report.vibration_events {
        println!(
            "    vibration {}: {:.2}s-{:.2}s peak {:.1} m/s^2",
            event.axis,
            event.start_us as f64 / 1e6,
            event.end_us as f64 / 1e6,
            event.peak
        );
    }

    for metric in &report.tracking {
        println!(
            "  tracking {}: MAE {:.3} deg/s over {} samples",
            metric.axis, metric.mean_abs_error, metric.samples
        );
    }

    if let Some(flow) = &report.optical_flow {
        println!(
            "  optical flow: {:.1}% degraded, {} sustained run(s)",
            flow.degraded_fraction * 100.0,
            flow.degraded_runs.len()
        );
    }

    match &report.trajectory {
        Some(TrajectorySummary::Gps {
            alt_min_m,
            alt_max_m,
            relative_alt_max_m,
            ..
        }) => println!(
            "  altitude: {:.1}m to {:.1}m ({:.1}m above home)",
            alt_min_m, alt_max_m, relative_alt_max_m
        ),
        Some(TrajectorySummary::LocalPath {
            x_min_m,
            x_max_m,
            y_min_m,
            y_max_m,
            ..
        }) => println!(
            "  local path extent: x {:.1}m to {:.1}m, y {:.1}m to {:.1}m",
            x_min_m, x_max_m, y_min_m, y_max_m
        ),
        None => {}
    }

    for omission in &report.omissions {
        println!("  note: {}", omission);
    }
    for warning in &run.warnings {
        println!("  warning: {}", warning);
    }
}

fn write_outputs(
    run: &AnalysisRun,
    input: &Path,
    output_dir: Option<&Path>,
    write_csv: bool,
    write_digest: bool,
    config: &AnalysisConfig,
) -> Result<()> {
    if !write_csv && !write_digest {
        return Ok(());
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    #[cfg(feature = "csv")]
    if write_csv {
        let path = dir.join(format!("{}.aligned.csv", stem));
        uav_insight::export_to_csv(&run.dataset, &path)
            .with_context(|| format!("CSV export failed for {}", path.display()))?;
        println!("  wrote {}", path.display());
    }
    #[cfg(not(feature = "csv"))]
    if write_csv {
        anyhow::bail!("built without the `csv` feature");
    }

    if write_digest {
        let digest = build_digest(&run.source, &run.dataset, &run.report, config);
        let path = dir.join(format!("{}.digest.json", stem));
        std::fs::write(&path, digest.to_json()?)
            .with_context(|| format!("Failed to write digest to {}", path.display()))?;
        println!("  wrote {}", path.display());
    }

    Ok(())
}
