//! Off-thread diff computation
//!
//! A [`DiffTask`] runs the three channel diffs on the rayon pool and hands
//! the result back through a one-shot channel. Callers that must keep their
//! own thread responsive spawn a task and collect it later; the caller stays
//! the single writer of whatever it does with the result.

use std::sync::Arc;
use std::time::Duration;

use chromadiff_core::{Error, Image, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use tracing::debug;

use crate::diff::{ChannelDiffs, DiffEngine};

/// Handle to a diff running on the rayon pool
#[derive(Debug)]
pub struct DiffTask {
    rx: Receiver<Result<ChannelDiffs>>,
}

impl DiffTask {
    /// Block until the diff finishes
    pub fn wait(self) -> Result<ChannelDiffs> {
        self.rx.recv().unwrap_or_else(|_| Err(disconnected()))
    }

    /// Block for at most `timeout`
    ///
    /// Returns `Ok(None)` when the task is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<ChannelDiffs>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(disconnected()),
        }
    }

    /// Result if the diff already finished
    pub fn try_take(&self) -> Result<Option<ChannelDiffs>> {
        match self.rx.try_recv() {
            Ok(result) => result.map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(disconnected()),
        }
    }
}

fn disconnected() -> Error {
    Error::TaskDisconnected {
        message: "diff worker exited without a result".to_string(),
    }
}

impl DiffEngine {
    /// Start computing all three channel diffs on the rayon pool
    pub fn spawn(&self, a: Arc<Image>, b: Arc<Image>, gain: f32) -> DiffTask {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let engine = *self;

        rayon::spawn(move || {
            let result = engine.try_compute_all(&a, &b, gain);
            if tx.send(result).is_err() {
                debug!("Diff task handle dropped before completion");
            }
        });

        DiffTask { rx }
    }
}
