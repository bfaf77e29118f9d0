use image::RgbImage;
use rps_capture::{capture_loop, CaptureStatus, FrameSource};
use rps_game::{Controller, TickOutput};
use rps_hand::{single_hand, LandmarkDetector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Manages the capture → detect → classify → game-state pipeline.
///
/// Three concurrent activities, none blocking another: the capture loop
/// overwrites a single-slot frame register; the processing loop (the only
/// writer of game state) turns the latest frame into a [`TickOutput`];
/// the presentation side reads the latest output at its own pace through
/// [`Pipeline::subscribe_outputs`]. Serial dispatch runs synchronously
/// inside a processing tick — on device loss a tick can stall for the
/// full retry budget, which is accepted latency, not a fault.
pub struct Pipeline {
    stop: Arc<AtomicBool>,
    frame_rx: watch::Receiver<Option<Arc<RgbImage>>>,
    status_rx: watch::Receiver<CaptureStatus>,
    output_rx: watch::Receiver<Option<TickOutput>>,
}

impl Pipeline {
    /// Spawns the capture and processing tasks and returns the handles to
    /// observe them.
    pub fn start(
        source: impl FrameSource,
        detector: impl LandmarkDetector + 'static,
        controller: impl Controller + 'static,
        frame_interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));

        let (frame_tx, frame_rx) = watch::channel::<Option<Arc<RgbImage>>>(None);
        let (status_tx, status_rx) = watch::channel(CaptureStatus::default());
        let (output_tx, output_rx) = watch::channel::<Option<TickOutput>>(None);

        let stop_capture = stop.clone();
        tokio::spawn(async move {
            capture_loop(source, frame_tx, status_tx, frame_interval, stop_capture).await;
        });

        let mut proc_frame_rx = frame_rx.clone();
        let stop_processing = stop.clone();
        tokio::spawn(async move {
            // Detector and controller are synchronous and stateful; they
            // travel into each blocking tick and back out
            let mut worker = (detector, controller);
            loop {
                if stop_processing.load(Ordering::Relaxed) {
                    break;
                }
                if proc_frame_rx.changed().await.is_err() {
                    break;
                }

                let frame = proc_frame_rx.borrow().clone();
                let Some(frame) = frame else { continue };

                let ticked = tokio::task::spawn_blocking(move || {
                    let (mut detector, mut controller) = worker;
                    let hand = single_hand(detector.detect(&frame));
                    let output = controller.tick(frame, hand.as_ref());
                    ((detector, controller), output)
                })
                .await;

                match ticked {
                    Ok((returned, output)) => {
                        worker = returned;
                        let _ = output_tx.send(Some(output));
                    }
                    Err(e) => {
                        warn!("Processing tick panicked: {}", e);
                        break;
                    }
                }
            }
            info!("Processing loop stopped");
        });

        info!("Pipeline started");

        Self {
            stop,
            frame_rx,
            status_rx,
            output_rx,
        }
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        info!("Pipeline stop requested");
    }

    pub fn capture_status(&self) -> CaptureStatus {
        self.status_rx.borrow().clone()
    }

    /// The most recent raw frame
    pub fn latest_frame(&self) -> Option<Arc<RgbImage>> {
        self.frame_rx.borrow().clone()
    }

    /// The most recent controller output
    pub fn latest_output(&self) -> Option<TickOutput> {
        self.output_rx.borrow().clone()
    }

    /// Register for controller outputs; the presentation layer paces itself
    pub fn subscribe_outputs(&self) -> watch::Receiver<Option<TickOutput>> {
        self.output_rx.clone()
    }
}
