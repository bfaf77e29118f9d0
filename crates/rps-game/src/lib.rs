mod clock;
mod dispatch;
mod freestyle;
mod timed;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{counter_command, Dispatcher};
pub use freestyle::Freestyle;
pub use timed::TimedRound;

use image::RgbImage;
use rps_classify::{ColorWeights, Label};
use rps_hand::LandmarkSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Timing and display knobs for one game mode. Externally supplied;
/// the defaults are the booth's production values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Countdown length in seconds; the capture window opens one second early
    pub round_secs: f64,
    /// How long a verdict frame is held before the next round
    pub freeze_secs: f64,
    /// Cooldown after a gesture was shown during the countdown
    pub too_fast_secs: f64,
    /// Freestyle: minimum gap between dispatches to the actuator
    pub cache_secs: f64,
    pub angle_cutoff: f32,
    pub colors: ColorWeights,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_secs: 3.0,
            freeze_secs: 5.0,
            too_fast_secs: 3.0,
            cache_secs: 1.0,
            angle_cutoff: rps_classify::DEFAULT_ANGLE_CUTOFF,
            colors: ColorWeights::default(),
        }
    }
}

impl GameConfig {
    pub fn freeze_duration(&self) -> Duration {
        Duration::from_secs_f64(self.freeze_secs.max(0.0))
    }

    pub fn too_fast_duration(&self) -> Duration {
        Duration::from_secs_f64(self.too_fast_secs.max(0.0))
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs_f64(self.cache_secs.max(0.0))
    }
}

/// What the presentation layer should draw over a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Overlay {
    /// Nothing to draw; pass the frame through
    Clear,
    /// Seconds left before the capture window opens
    Countdown(u32),
    /// The player showed a gesture before the countdown ended
    TooFast,
    /// A classified gesture with its display diagnostics
    Verdict {
        label: Label,
        top_angle: f32,
        bottom_angle: f32,
        color: [f32; 3],
    },
}

/// One controller tick: the frame to show and what to draw on it.
/// `frozen` marks the tick that produced (or is holding) a round verdict.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub frame: Arc<RgbImage>,
    pub overlay: Overlay,
    pub frozen: bool,
}

/// A game-flow controller: consumes one frame plus the (already
/// single-hand-filtered) detection for it, returns what to display.
pub trait Controller: Send {
    fn tick(&mut self, frame: Arc<RgbImage>, hand: Option<&LandmarkSet>) -> TickOutput;
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use rps_classify::{Classification, Classifier};
    use rps_hand::{Point, LANDMARK_COUNT};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub fn blank_frame() -> Arc<RgbImage> {
        Arc::new(RgbImage::new(4, 4))
    }

    pub fn any_hand() -> LandmarkSet {
        LandmarkSet::new([Point::default(); LANDMARK_COUNT])
    }

    /// Classifier pinned to one label, counting invocations
    pub struct StubClassifier {
        pub label: Label,
        pub calls: Arc<AtomicUsize>,
    }

    impl StubClassifier {
        pub fn new(label: Label) -> (Box<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    label,
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    impl Classifier for StubClassifier {
        fn classify(&self, _hand: &LandmarkSet) -> Classification {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Classification {
                top_angle: 120.0,
                bottom_angle: 60.0,
                label: self.label,
                rockiness: 0.0,
                paperiness: 0.0,
                scissoriness: 0.0,
            }
        }
    }

    /// Dispatcher that records every command byte
    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub sent: Arc<Mutex<Vec<u8>>>,
    }

    impl RecordingDispatcher {
        pub fn new() -> (Box<Self>, Arc<Mutex<Vec<u8>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            (Box::new(Self { sent: sent.clone() }), sent)
        }
    }

    impl Dispatcher for RecordingDispatcher {
        fn dispatch(&mut self, command: u8) {
            self.sent.lock().unwrap().push(command);
        }
    }
}
