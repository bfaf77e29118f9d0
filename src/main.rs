//! Replays a recorded landmark session through a game controller and
//! prints one JSON tick summary per frame.
//!
//! A session file is JSON lines; each line holds the frame's timestamp
//! and the hands the detector reported for it:
//!   {"t_ms": 1234, "hands": [[[x, y, z], ... 21 points]]}
//!
//! Usage: rps-booth <session.jsonl> [config.json] [--serial]

use anyhow::{Context, Result};
use image::RgbImage;
use rps_booth::{AppConfig, Mode};
use rps_classify::{AngleClassifier, Classifier};
use rps_game::{Controller, Dispatcher, Freestyle, ManualClock, TimedRound};
use rps_hand::{single_hand, LandmarkSet, Point};
use rps_link::SerialLink;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, serde::Deserialize)]
struct SessionFrame {
    t_ms: u64,
    #[serde(default)]
    hands: Vec<Vec<[f32; 3]>>,
}

fn main() -> Result<()> {
    rps_booth::init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let force_serial = args.iter().any(|a| a == "--serial");
    args.retain(|a| a != "--serial");

    let Some(session_path) = args.first().map(PathBuf::from) else {
        eprintln!("Usage: rps-booth <session.jsonl> [config.json] [--serial]");
        std::process::exit(1);
    };
    let config_path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("rps.json"));

    let config = AppConfig::load(&config_path)?;
    info!(
        "Mode: {:?}; detector thresholds: complexity={} detection={} tracking={}",
        config.mode,
        config.detector.model_complexity,
        config.detector.min_detection_confidence,
        config.detector.min_tracking_confidence,
    );

    let dispatcher: Option<Box<dyn Dispatcher>> = if config.serial.enabled || force_serial {
        let mut link = SerialLink::new(
            config.serial.ports.clone(),
            config.serial.baudrate,
            config.serial.timeout(),
        );
        link.discover_and_open();
        Some(Box::new(link))
    } else {
        None
    };

    // The clock follows the session's own timestamps instead of wall time
    let clock = ManualClock::new();
    let game_config = config.controller_config().clone();
    let classifier: Box<dyn Classifier> = Box::new(AngleClassifier::new(game_config.angle_cutoff));
    let mut controller: Box<dyn Controller> = match config.mode {
        Mode::Timed => Box::new(TimedRound::with_clock(
            game_config,
            classifier,
            dispatcher,
            Box::new(clock.clone()),
        )),
        Mode::Freestyle => Box::new(Freestyle::with_clock(
            game_config,
            classifier,
            dispatcher,
            Box::new(clock.clone()),
        )),
    };

    let file = std::fs::File::open(&session_path)
        .with_context(|| format!("Failed to open {}", session_path.display()))?;

    // Replay frames carry no pixels; the overlays are the output
    let frame = Arc::new(RgbImage::new(640, 480));
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read session line")?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: SessionFrame =
            serde_json::from_str(&line).context("Malformed session line")?;

        clock.set_elapsed(Duration::from_millis(entry.t_ms));

        let hands: Vec<LandmarkSet> = entry
            .hands
            .iter()
            .filter_map(|hand| {
                let points: Vec<Point> = hand
                    .iter()
                    .map(|[x, y, z]| Point::new(*x, *y, *z))
                    .collect();
                LandmarkSet::from_points(&points)
            })
            .collect();
        let hand = single_hand(hands);

        let output = controller.tick(frame.clone(), hand.as_ref());
        let summary = serde_json::json!({
            "t_ms": entry.t_ms,
            "overlay": output.overlay,
            "frozen": output.frozen,
        });
        writeln!(out, "{}", summary)?;
    }

    Ok(())
}
