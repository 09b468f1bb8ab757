//! Single-lane scheduler for upstream calls.
//!
//! Every outbound call to the upstream API takes a turn in one process-wide
//! lane. Turns are granted strictly in arrival order by a dedicated worker
//! task, only one turn is active at a time, and the worker keeps at least
//! `min_spacing` between the end of one call and the start of the next.
//!
//! ```text
//! caller ──enqueue──▶ [ mpsc queue ] ──▶ worker: sleep_until(last + spacing)
//!                                              │
//! caller ◀──────────── LanePermit ◀────────────┘
//!   (call upstream, drop permit) ──────────▶ worker: last = now, next turn
//! ```
//!
//! The permit is released on drop, so a caller cancelled mid-call (client
//! disconnect, request timeout) still hands the lane back. The last-call
//! time lives only inside the worker.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::errors::UpstreamError;

/// Default minimum spacing between upstream calls.
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_millis(1100);

/// A queued request for a turn in the lane.
struct TurnRequest {
    grant: oneshot::Sender<LanePermit>,
}

/// Proof that the holder owns the lane. Dropping it ends the turn.
#[derive(Debug)]
pub struct LanePermit {
    _done: oneshot::Sender<()>,
}

/// A place in the queue that has not been granted yet.
#[derive(Debug)]
pub struct Turn {
    grant: oneshot::Receiver<LanePermit>,
}

impl Turn {
    /// Wait until the worker grants this turn.
    pub async fn wait(self) -> Result<LanePermit, UpstreamError> {
        self.grant.await.map_err(|_| UpstreamError::LaneClosed)
    }
}

/// FIFO scheduler serializing and pacing upstream calls.
///
/// Must be constructed inside a tokio runtime; the worker task lives until
/// the scheduler is dropped.
#[derive(Debug)]
pub struct UpstreamScheduler {
    queue: mpsc::UnboundedSender<TurnRequest>,
    min_spacing: Duration,
}

impl UpstreamScheduler {
    /// Create a scheduler with the default spacing.
    pub fn new() -> Self {
        Self::with_spacing(DEFAULT_MIN_SPACING)
    }

    /// Create a scheduler with a custom minimum spacing.
    pub fn with_spacing(min_spacing: Duration) -> Self {
        let (queue, requests) = mpsc::unbounded_channel();
        tokio::spawn(run_lane(requests, min_spacing));
        Self { queue, min_spacing }
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Join the tail of the lane.
    ///
    /// The place in line is taken synchronously, before the returned
    /// [`Turn`] is awaited.
    pub fn enqueue(&self) -> Result<Turn, UpstreamError> {
        let (grant, turn) = oneshot::channel();
        self.queue
            .send(TurnRequest { grant })
            .map_err(|_| UpstreamError::LaneClosed)?;
        Ok(Turn { grant: turn })
    }

    /// Wait for a turn in the lane.
    pub async fn acquire(&self) -> Result<LanePermit, UpstreamError> {
        self.enqueue()?.wait().await
    }

    /// Run `call` as one turn in the lane.
    pub async fn run<F, T>(&self, call: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        let turn = self.enqueue()?;
        let _permit = turn.wait().await?;
        call.await
    }
}

impl Default for UpstreamScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker loop owning the lane's timing state.
async fn run_lane(mut requests: mpsc::UnboundedReceiver<TurnRequest>, min_spacing: Duration) {
    let mut last_call: Option<Instant> = None;

    while let Some(request) = requests.recv().await {
        if request.grant.is_closed() {
            debug!("Upstream lane: skipping abandoned turn");
            continue;
        }

        if let Some(last) = last_call {
            let ready_at = last + min_spacing;
            let now = Instant::now();
            if ready_at > now {
                debug!("Upstream lane: waiting {:?} before next call", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let (done, finished) = oneshot::channel();
        if request.grant.send(LanePermit { _done: done }).is_err() {
            // Waiter went away while we slept; nothing was called.
            debug!("Upstream lane: turn abandoned before grant");
            continue;
        }

        // Resolves with Err once the permit is dropped, which is the only
        // way a turn ends.
        let _ = finished.await;
        last_call = Some(Instant::now());
    }

    warn!("Upstream lane closed");
}
