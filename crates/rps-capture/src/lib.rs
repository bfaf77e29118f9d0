use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// A camera or other frame producer: a lazy, infinite, non-restartable
/// sequence of 3-channel frames. `None` means the source is gone.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> Option<RgbImage>;
}

/// Status of the capture pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureStatus {
    pub is_capturing: bool,
    pub fps: f64,
    pub last_capture_time: Option<u64>,
    pub resolution: Option<(u32, u32)>,
}

impl Default for CaptureStatus {
    fn default() -> Self {
        Self {
            is_capturing: false,
            fps: 0.0,
            last_capture_time: None,
            resolution: None,
        }
    }
}

/// The capture loop that runs as a background task.
///
/// Frames go through a single-slot watch register, overwriting on every
/// iteration: consumers may see a frame stale by one, never a queue
/// buildup. The source itself is synchronous, so each grab runs on a
/// blocking thread. Stops cooperatively on the shared flag, or for good
/// when the source ends.
pub async fn capture_loop(
    mut source: impl FrameSource,
    frame_tx: watch::Sender<Option<Arc<RgbImage>>>,
    status_tx: watch::Sender<CaptureStatus>,
    frame_interval: Duration,
    stop: Arc<AtomicBool>,
) {
    info!("Capture loop started, interval: {:?}", frame_interval);

    let mut last_capture = Instant::now();
    let mut frame_count = 0u64;
    let mut fps_timer = Instant::now();

    loop {
        if stop.load(Ordering::Relaxed) {
            info!("Capture loop stopping (stop signal received)");
            break;
        }

        let grabbed = tokio::task::spawn_blocking(move || {
            let frame = source.next_frame();
            (source, frame)
        })
        .await;

        let frame = match grabbed {
            Ok((returned, frame)) => {
                source = returned;
                frame
            }
            Err(e) => {
                warn!("Frame grab task panicked: {}", e);
                break;
            }
        };

        match frame {
            Some(frame) => {
                frame_count += 1;

                let elapsed = fps_timer.elapsed().as_secs_f64();
                let fps = if elapsed > 0.0 {
                    frame_count as f64 / elapsed
                } else {
                    0.0
                };

                // Reset FPS counter every 5 seconds
                if elapsed > 5.0 {
                    frame_count = 0;
                    fps_timer = Instant::now();
                }

                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;

                let _ = status_tx.send(CaptureStatus {
                    is_capturing: true,
                    fps,
                    last_capture_time: Some(now),
                    resolution: Some((frame.width(), frame.height())),
                });

                let _ = frame_tx.send(Some(Arc::new(frame)));
                last_capture = Instant::now();
            }
            None => {
                // Non-restartable: once the source ends, so does the loop
                warn!("Frame source ended; capture loop exiting");
                break;
            }
        }

        // Sleep out the remainder of the capture interval
        let elapsed = last_capture.elapsed();
        if elapsed < frame_interval {
            tokio::time::sleep(frame_interval - elapsed).await;
        }
    }

    let _ = status_tx.send(CaptureStatus::default());
    info!("Capture loop stopped");
}
