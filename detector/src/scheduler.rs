use proximity_common::source::FrameSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use crate::listener::DetectionListener;
use crate::session::DetectionSession;

/// Cancels a running tick loop. Cheap to clone; any clone can cancel.
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Handle to a session being driven on a fixed interval.
///
/// The task owns the session until it finishes; `stop` or `join` hands it
/// back. Dropping every handle and canceller also ends the loop.
pub struct TickHandle<S: FrameSource, L> {
    canceller: Canceller,
    task: JoinHandle<DetectionSession<S, L>>,
}

impl<S: FrameSource, L> TickHandle<S, L> {
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Prevent any further tick from starting. A tick already running completes.
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// Cancel and wait for the loop to release the camera.
    pub async fn stop(self) -> Result<DetectionSession<S, L>, JoinError> {
        self.cancel();
        self.task.await
    }

    /// Wait for the loop to end on its own (pipeline failure or cancellation).
    pub async fn join(self) -> Result<DetectionSession<S, L>, JoinError> {
        self.task.await
    }
}

/// Drive a started session: tick now, then again one check interval after
/// each tick completes. Missed ticks are not caught up.
pub fn spawn<S, L>(session: DetectionSession<S, L>) -> TickHandle<S, L>
where
    S: FrameSource + Send + 'static,
    S::Handle: Send + 'static,
    L: DetectionListener + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    let interval = session.check_interval();
    let task = tokio::spawn(drive(session, interval, rx));
    TickHandle {
        canceller: Canceller { tx: Arc::new(tx) },
        task,
    }
}

async fn drive<S, L>(
    mut session: DetectionSession<S, L>,
    interval: Duration,
    mut cancelled: watch::Receiver<bool>,
) -> DetectionSession<S, L>
where
    S: FrameSource,
    L: DetectionListener,
{
    info!(interval_ms = interval.as_millis() as u64, "tick loop started");

    loop {
        if *cancelled.borrow() || !session.is_running() {
            break;
        }

        if session.tick().is_err() {
            // The session has already stopped itself and told the listener.
            break;
        }

        // A stop may have landed while the tick ran; don't schedule another.
        if *cancelled.borrow() || !session.is_running() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = cancelled.changed() => {
                if changed.is_err() {
                    debug!("all tick handles dropped, ending loop");
                    break;
                }
            }
        }
    }

    session.stop();
    info!(ticks = session.ticks(), "tick loop ended");
    session
}
