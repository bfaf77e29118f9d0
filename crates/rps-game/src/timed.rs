use crate::clock::{Clock, SystemClock};
use crate::dispatch::{counter_command, Dispatcher};
use crate::{Controller, GameConfig, Overlay, TickOutput};
use image::RgbImage;
use rps_classify::{display_color, Classifier};
use rps_hand::LandmarkSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Round-based controller: countdown, capture window, frozen verdict,
/// reset.
///
/// Showing a gesture while the countdown is still running counts as
/// playing too fast: rather than silently ignoring it, the round is
/// penalized with an extended cooldown. After a verdict the display is
/// frozen so the same gesture cannot re-trigger.
pub struct TimedRound {
    config: GameConfig,
    classifier: Box<dyn Classifier>,
    dispatcher: Option<Box<dyn Dispatcher>>,
    clock: Box<dyn Clock>,
    /// When the current countdown started (may sit in the future after a
    /// penalty or a freeze, which simply delays the next countdown)
    countdown_epoch: Instant,
    last_freeze: Option<Instant>,
    last_too_fast: Option<Instant>,
    held: Option<TickOutput>,
}

impl TimedRound {
    pub fn new(
        config: GameConfig,
        classifier: Box<dyn Classifier>,
        dispatcher: Option<Box<dyn Dispatcher>>,
    ) -> Self {
        Self::with_clock(config, classifier, dispatcher, Box::new(SystemClock))
    }

    pub fn with_clock(
        config: GameConfig,
        classifier: Box<dyn Classifier>,
        dispatcher: Option<Box<dyn Dispatcher>>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let countdown_epoch = clock.now();
        Self {
            config,
            classifier,
            dispatcher,
            clock,
            countdown_epoch,
            last_freeze: None,
            last_too_fast: None,
            held: None,
        }
    }

    /// Seconds to display while the countdown is running, or None once
    /// the capture window is open. The window opens one second before the
    /// displayed count reaches zero so the player's gesture lands inside
    /// it.
    fn countdown_remaining(&self, elapsed_secs: f64) -> Option<u32> {
        if elapsed_secs < (self.config.round_secs - 1.0).max(0.0) {
            Some((self.config.round_secs - elapsed_secs.round()).max(0.0) as u32)
        } else {
            None
        }
    }
}

impl Controller for TimedRound {
    fn tick(&mut self, frame: Arc<RgbImage>, hand: Option<&LandmarkSet>) -> TickOutput {
        let now = self.clock.now();

        // Freeze window: hold the verdict frame, skip all new work
        if let Some(frozen_at) = self.last_freeze {
            if now.saturating_duration_since(frozen_at) <= self.config.freeze_duration() {
                if let Some(held) = &self.held {
                    return held.clone();
                }
            }
        }

        // Too-fast cooldown: keep the notice up, skip classification
        if let Some(flagged_at) = self.last_too_fast {
            if now.saturating_duration_since(flagged_at) < self.config.too_fast_duration() {
                return TickOutput {
                    frame,
                    overlay: Overlay::TooFast,
                    frozen: false,
                };
            }
        }

        let elapsed = now.saturating_duration_since(self.countdown_epoch);
        if let Some(remaining) = self.countdown_remaining(elapsed.as_secs_f64()) {
            if hand.is_some() {
                debug!("Gesture during countdown; cooling down");
                self.countdown_epoch = now + self.config.too_fast_duration();
                self.last_too_fast = Some(now);
                return TickOutput {
                    frame,
                    overlay: Overlay::TooFast,
                    frozen: false,
                };
            }
            return TickOutput {
                frame,
                overlay: Overlay::Countdown(remaining),
                frozen: false,
            };
        }

        if let Some(hand) = hand {
            let result = self.classifier.classify(hand);
            info!("Round verdict: {}", result.label);
            if let Some(dispatcher) = self.dispatcher.as_mut() {
                dispatcher.dispatch(counter_command(result.label));
            }
            let output = TickOutput {
                frame,
                overlay: Overlay::Verdict {
                    label: result.label,
                    top_angle: result.top_angle,
                    bottom_angle: result.bottom_angle,
                    color: display_color(&result, &self.config.colors),
                },
                frozen: true,
            };
            // Next countdown starts once the freeze window has passed
            self.countdown_epoch = now + self.config.freeze_duration();
            self.last_freeze = Some(now);
            self.held = Some(output.clone());
            return output;
        }

        // Capture window open but no hand yet: plain pass-through
        TickOutput {
            frame,
            overlay: Overlay::Clear,
            frozen: false,
        }
    }
}
