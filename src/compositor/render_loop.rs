use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Compositor;
use crate::error::{CaptureError, CaptureResult};

/// Handle to a running render loop
pub struct RenderLoop {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Compositor {
    /// Render once per `period` until the returned loop (or the compositor) is cancelled
    pub fn spawn_render_loop(&self, period: Duration) -> RenderLoop {
        let token = self.shutdown.child_token();
        let compositor = self.clone();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            info!("Render loop started ({:?} per frame)", period);

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if loop_token.is_cancelled() {
                    break;
                }

                if let Err(e) = compositor.render_frame() {
                    debug!("Skipping frame: {}", e);
                }
            }

            info!(
                "Render loop stopped after {} frames",
                compositor.stats().frames_rendered
            );
        });

        RenderLoop {
            token,
            handle: Some(handle),
        }
    }
}

impl RenderLoop {
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel and wait for the loop to exit. No frame is drawn after this returns.
    pub async fn cancel(&mut self) -> CaptureResult<()> {
        self.token.cancel();

        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| CaptureError::InvalidState(format!("render loop task failed: {}", e))),
            None => Ok(()),
        }
    }
}
