use anyhow::{anyhow, bail, Context, Result};
use focuscal::config::CalibrationConfig;
use focuscal::region::select_window;
use focuscal::report::format_sample_line;
use focuscal::sweep::{load_gray, Cancellable, DirectoryReplay, ManualPrompt, SweepController};
use focuscal::types::{CropWindow, Metric};
use focuscal::{CalibrationReport, SharpnessEstimator};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const USAGE: &str = "Usage: focuscal-cli <command> [args]

Commands:
  sweep [--images DIR] [--run N] [--config FILE] [--metric NAME]...
        [--window WxH] [--manual] [--batch] [--json] [--output FILE]
  score <image> [--window WxH] [--json]
  fit <report.json> [--config FILE] [--json]
  config [--write FILE]
  version [--json]

--window takes the half width and half height of the centered crop.";

fn main() -> Result<()> {
    focuscal::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "sweep" => cmd_sweep(&args),
        "score" => cmd_score(&args),
        "fit" => cmd_fit(&args),
        "config" => cmd_config(&args),
        "version" | "--version" | "-V" => cmd_version(&args),
        "help" | "--help" | "-h" => {
            let info = focuscal::get_info();
            println!("{} {}: {}\n", info.name, info.version, info.description);
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    }
}

fn cmd_sweep(args: &[String]) -> Result<()> {
    let mut images = None;
    let mut run = None;
    let mut config_path = None;
    let mut metrics = Vec::new();
    let mut window = None;
    let mut manual = false;
    let mut batch = false;
    let mut json = false;
    let mut output = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--images" => images = Some(PathBuf::from(value_after(args, &mut i)?)),
            "--run" => run = Some(value_after(args, &mut i)?.parse::<u32>()?),
            "--config" => config_path = Some(PathBuf::from(value_after(args, &mut i)?)),
            "--metric" => metrics.push(value_after(args, &mut i)?.parse::<Metric>()?),
            "--window" => window = Some(parse_window(value_after(args, &mut i)?)?),
            "--output" => output = Some(PathBuf::from(value_after(args, &mut i)?)),
            "--manual" => manual = true,
            "--batch" => batch = true,
            "--json" => json = true,
            other => bail!("Unexpected argument: {}", other),
        }
        i += 1;
    }

    let mut config = load_config(config_path.as_deref())?;
    if let Some(images) = images {
        config.sweep.image_directory = Some(images);
    }
    if let Some(run) = run {
        config.sweep.run = run;
    }
    if !metrics.is_empty() {
        config.scoring.selected_metrics = metrics;
    }
    if let Some(window) = window {
        config.crop.half_width = window.half_width;
        config.crop.half_height = window.half_height;
    }

    let directory = config
        .sweep
        .image_directory
        .clone()
        .ok_or_else(|| anyhow!("No image source: pass --images DIR or set sweep.image_directory"))?;

    let controller = SweepController::from_config(&config)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("Cancelling sweep (press Ctrl-C again to exit immediately)");
    })
    .context("Failed to install Ctrl-C handler")?;

    let replay = DirectoryReplay::new(&directory, config.sweep.run);
    let mut source = ManualPrompt::new(Cancellable::new(replay, cancelled), !manual || batch);

    log::info!(
        "Replaying run {} from {:?}",
        config.sweep.run,
        directory
    );

    let report = controller.calibrate(&config.sweep.adjustments, &mut source, |sample| {
        if !json {
            println!("{}", format_sample_line(sample));
        }
    })?;

    if let Some(output) = output {
        report.save_json(&output)?;
    }

    print_report(&report, json, false)
}

fn cmd_score(args: &[String]) -> Result<()> {
    let mut image = None;
    let mut window = CropWindow::new(
        focuscal::region::DEFAULT_HALF_WIDTH,
        focuscal::region::DEFAULT_HALF_HEIGHT,
    );
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--window" => window = parse_window(value_after(args, &mut i)?)?,
            "--json" => json = true,
            other if image.is_none() => image = Some(PathBuf::from(other)),
            other => bail!("Unexpected argument: {}", other),
        }
        i += 1;
    }

    let image = image.ok_or_else(|| anyhow!("Usage: focuscal-cli score <image> [--window WxH] [--json]"))?;
    let frame = load_gray(&image)?;
    let window = select_window(frame.width, frame.height, window.half_width, window.half_height)?;
    let score = SharpnessEstimator::default().estimate(&frame, &window)?;

    if json {
        let value = serde_json::json!({
            "image": image,
            "window": window,
            "score": score,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "{}: variance {:.4} / gradient {:.4} / fft_band {:.4} ({}x{} window)",
            image.display(),
            score.variance,
            score.gradient,
            score.fft_band,
            window.width(),
            window.height()
        );
    }
    Ok(())
}

fn cmd_fit(args: &[String]) -> Result<()> {
    let mut report_path = None;
    let mut config_path = None;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => config_path = Some(PathBuf::from(value_after(args, &mut i)?)),
            "--json" => json = true,
            other if report_path.is_none() => report_path = Some(PathBuf::from(other)),
            other => bail!("Unexpected argument: {}", other),
        }
        i += 1;
    }

    let report_path =
        report_path.ok_or_else(|| anyhow!("Usage: focuscal-cli fit <report.json> [--json]"))?;
    let config = load_config(config_path.as_deref())?;
    config.fit.validate().map_err(|e| anyhow!(e))?;

    let report = CalibrationReport::load_json(&report_path)?.refit(&config.fit);
    print_report(&report, json, true)
}

fn cmd_config(args: &[String]) -> Result<()> {
    let config = CalibrationConfig::default();
    match args.get(2).map(String::as_str) {
        Some("--write") => {
            let path = args
                .get(3)
                .map(PathBuf::from)
                .unwrap_or_else(CalibrationConfig::default_path);
            config.save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        Some(other) => bail!("Unexpected argument: {}", other),
        None => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

fn cmd_version(args: &[String]) -> Result<()> {
    let info = focuscal::get_info();
    if args.iter().skip(2).any(|a| a == "--json") {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let metrics: Vec<&str> = info.metrics.iter().map(|m| m.as_str()).collect();
        println!("{} {}", info.name, info.version);
        println!("Metrics: {}", metrics.join(", "));
    }
    Ok(())
}

fn print_report(report: &CalibrationReport, json: bool, with_samples: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json()?);
    } else if with_samples {
        print!("{}", report.format_table());
    } else {
        println!("{}", report.fit_summary());
    }

    if report.best_adjustment().is_none() {
        std::process::exit(2);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CalibrationConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            Ok(CalibrationConfig::load_from_file(path)?)
        }
        None => Ok(CalibrationConfig::load_from_file(
            CalibrationConfig::default_path(),
        )?),
    }
}

fn value_after<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{} requires a value", flag))
}

/// `900x600` -> half width 900, half height 600
fn parse_window(value: &str) -> Result<CropWindow> {
    let (w, h) = value
        .split_once(|c| c == 'x' || c == 'X')
        .ok_or_else(|| anyhow!("Invalid window '{}', expected WxH", value))?;
    let window = CropWindow::new(
        w.trim().parse().with_context(|| format!("Invalid window width '{}'", w))?,
        h.trim().parse().with_context(|| format!("Invalid window height '{}'", h))?,
    );
    if window.half_width == 0 || window.half_height == 0 {
        bail!("Window extents must be positive: {}", value);
    }
    Ok(window)
}
