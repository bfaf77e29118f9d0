use crate::clock::{Clock, SystemClock};
use crate::dispatch::{counter_command, Dispatcher};
use crate::{Controller, GameConfig, Overlay, TickOutput};
use image::RgbImage;
use rps_classify::{display_color, Classifier, Label};
use rps_hand::LandmarkSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// What was last sent to the actuator, so a held gesture does not spam it
#[derive(Debug, Default)]
struct DispatchCache {
    last_label: Option<Label>,
    sent_at: Option<Instant>,
}

/// Continuous controller: every frame with a valid detection is classified
/// and overlaid immediately. Dispatch to the actuator is a debounced side
/// effect and never gates or delays the displayed overlay.
pub struct Freestyle {
    config: GameConfig,
    classifier: Box<dyn Classifier>,
    dispatcher: Option<Box<dyn Dispatcher>>,
    clock: Box<dyn Clock>,
    cache: DispatchCache,
}

impl Freestyle {
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
        Self {
            config,
            classifier,
            dispatcher,
            clock,
            cache: DispatchCache::default(),
        }
    }
}

impl Controller for Freestyle {
    fn tick(&mut self, frame: Arc<RgbImage>, hand: Option<&LandmarkSet>) -> TickOutput {
        let Some(hand) = hand else {
            return TickOutput {
                frame,
                overlay: Overlay::Clear,
                frozen: false,
            };
        };

        let result = self.classifier.classify(hand);

        if let Some(dispatcher) = self.dispatcher.as_mut() {
            let now = self.clock.now();
            let cooled_down = self
                .cache
                .sent_at
                .map_or(true, |sent| {
                    now.saturating_duration_since(sent) > self.config.cache_duration()
                });
            // Only a new gesture, and only after the cache window, reaches
            // the hardware. The cache tracks attempts, not deliveries.
            if cooled_down && self.cache.last_label != Some(result.label) {
                debug!("Dispatching {} to actuator", result.label);
                dispatcher.dispatch(counter_command(result.label));
                self.cache = DispatchCache {
                    last_label: Some(result.label),
                    sent_at: Some(now),
                };
            }
        }

        TickOutput {
            frame,
            overlay: Overlay::Verdict {
                label: result.label,
                top_angle: result.top_angle,
                bottom_angle: result.bottom_angle,
                color: display_color(&result, &self.config.colors),
            },
            frozen: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testutil::{any_hand, blank_frame, RecordingDispatcher, StubClassifier};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn controller(
        label: Label,
    ) -> (
        Freestyle,
        ManualClock,
        std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    ) {
        let clock = ManualClock::new();
        let (classifier, _calls) = StubClassifier::new(label);
        let (dispatcher, sent) = RecordingDispatcher::new();
        let freestyle = Freestyle::with_clock(
            GameConfig::default(),
            classifier,
            Some(dispatcher),
            Box::new(clock.clone()),
        );
        (freestyle, clock, sent)
    }

    #[test]
    fn test_no_hand_is_passthrough() {
        let clock = ManualClock::new();
        let (classifier, calls) = StubClassifier::new(Label::Rock);
        let (dispatcher, _sent) = RecordingDispatcher::new();
        let mut freestyle = Freestyle::with_clock(
            GameConfig::default(),
            classifier,
            Some(dispatcher),
            Box::new(clock),
        );
        let output = freestyle.tick(blank_frame(), None);
        assert_eq!(output.overlay, Overlay::Clear);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_every_detection_is_overlaid() {
        let (mut freestyle, clock, _sent) = controller(Label::Scissors);
        let hand = any_hand();
        for i in 0..5 {
            clock.set_elapsed(Duration::from_millis(i * 50));
            let output = freestyle.tick(blank_frame(), Some(&hand));
            assert!(matches!(output.overlay, Overlay::Verdict { .. }));
            assert!(!output.frozen);
        }
    }

    #[test]
    fn test_repeated_label_dispatches_at_most_once() {
        let (mut freestyle, clock, sent) = controller(Label::Rock);
        let hand = any_hand();
        for i in 0..10 {
            clock.set_elapsed(Duration::from_millis(i * 50));
            freestyle.tick(blank_frame(), Some(&hand));
        }
        assert_eq!(*sent.lock().unwrap(), vec![b'P']);
    }

    #[test]
    fn test_same_label_never_resent_even_after_cooldown() {
        let (mut freestyle, clock, sent) = controller(Label::Paper);
        let hand = any_hand();
        freestyle.tick(blank_frame(), Some(&hand));
        clock.set_elapsed(Duration::from_secs(10));
        freestyle.tick(blank_frame(), Some(&hand));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_new_label_waits_for_cooldown() {
        let clock = ManualClock::new();
        let (dispatcher, sent) = RecordingDispatcher::new();
        let (classifier, _calls) = StubClassifier::new(Label::Rock);
        let mut freestyle = Freestyle::with_clock(
            GameConfig::default(),
            classifier,
            Some(dispatcher),
            Box::new(clock.clone()),
        );
        let hand = any_hand();
        freestyle.tick(blank_frame(), Some(&hand));
        assert_eq!(*sent.lock().unwrap(), vec![b'P']);

        // Swap the gesture while the cache window is still open
        freestyle.classifier = StubClassifier::new(Label::Scissors).0;
        clock.set_elapsed(Duration::from_millis(500));
        freestyle.tick(blank_frame(), Some(&hand));
        assert_eq!(sent.lock().unwrap().len(), 1, "cache window blocks the send");

        // Past the window the new gesture goes out
        clock.set_elapsed(Duration::from_millis(1100));
        freestyle.tick(blank_frame(), Some(&hand));
        assert_eq!(*sent.lock().unwrap(), vec![b'P', b'R']);
    }

    #[test]
    fn test_first_dispatch_is_immediate() {
        let (mut freestyle, _clock, sent) = controller(Label::Scissors);
        let hand = any_hand();
        freestyle.tick(blank_frame(), Some(&hand));
        assert_eq!(*sent.lock().unwrap(), vec![b'R']);
    }
}
