mod autopilot;

use std::path::Path;

use tracing_subscriber::EnvFilter;

use blaster_arcade::ArcadeConfig;
use blaster_core::level_config::ResolvedRunConfig;

fn arg_value<'a>(args: &'a [String], prefix: &str) -> Option<&'a str> {
    args.iter().find_map(|a| a.strip_prefix(prefix))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let seed = arg_value(&args, "--seed=")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(7);
    let fps = arg_value(&args, "--fps=")
        .and_then(|s| s.parse::<f32>().ok())
        .filter(|fps| *fps > 0.0)
        .unwrap_or(60.0);
    let max_frames = arg_value(&args, "--max-frames=")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(60 * 60 * 10);

    let run = match arg_value(&args, "--run=") {
        Some(path) => match ResolvedRunConfig::from_path(Path::new(path)) {
            Ok(run) => run,
            Err(e) => {
                tracing::error!(path, error = %e, "Could not load run config");
                std::process::exit(1);
            },
        },
        None => autopilot::demo_run(),
    };

    let config = ArcadeConfig::load();
    tracing::info!(seed, fps, levels = run.level_count(), "Headless run starting");

    let report = autopilot::play(config, run, seed, 1000.0 / fps, max_frames);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize report");
            std::process::exit(1);
        },
    }
}
