use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, warn};
use videodiff_common::frame::Frame;

use super::layout::frame_path;
use super::writer::FrameWriter;

/// Result of one persistence task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub frame_index: u64,
    pub path: PathBuf,
    pub success: bool,
}

/// Caller-side view of a submitted write.
#[derive(Debug)]
pub struct WriteHandle {
    frame_index: u64,
    abort: AbortHandle,
}

impl WriteHandle {
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("frame {index} submitted after frame {last}")]
    Duplicate { index: u64, last: u64 },
}

struct PendingWrite {
    frame_index: u64,
    path: PathBuf,
    join: JoinHandle<bool>,
}

/// Writes result frames to disk off the capture loop.
///
/// Every submission becomes its own tokio task; at most `workers` of them
/// encode at once (a semaphore gates entry to the blocking pool). Tasks may
/// finish in any order, but [`PersistenceSink::drain`] reports outcomes in
/// submission order with the frame index attached.
pub struct PersistenceSink {
    writer: Arc<dyn FrameWriter>,
    output_dir: PathBuf,
    permits: Arc<Semaphore>,
    pending: VecDeque<PendingWrite>,
    completed: Vec<WriteOutcome>,
    /// Highest frame index submitted so far. Indices only grow.
    last_submitted: Option<u64>,
}

impl PersistenceSink {
    pub fn new(writer: Arc<dyn FrameWriter>, output_dir: impl Into<PathBuf>, workers: usize) -> Self {
        Self {
            writer,
            output_dir: output_dir.into(),
            permits: Arc::new(Semaphore::new(workers.max(1))),
            pending: VecDeque::new(),
            completed: Vec::new(),
            last_submitted: None,
        }
    }

    /// Number of submitted writes not yet collected by `drain`.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Write `frame` to the standard location for `frame_index` in the output directory.
    pub fn submit_frame(&mut self, frame_index: u64, frame: Frame) -> Result<WriteHandle, SubmitError> {
        let path = frame_path(&self.output_dir, frame_index);
        self.submit(frame_index, frame, path)
    }

    /// Queue a write. Ownership of `frame` moves into the task.
    pub fn submit(
        &mut self,
        frame_index: u64,
        frame: Frame,
        path: PathBuf,
    ) -> Result<WriteHandle, SubmitError> {
        if let Some(last) = self.last_submitted.filter(|last| frame_index <= *last) {
            return Err(SubmitError::Duplicate {
                index: frame_index,
                last,
            });
        }
        self.last_submitted = Some(frame_index);

        let writer = Arc::clone(&self.writer);
        let permits = Arc::clone(&self.permits);
        let task_path = path.clone();
        let join = tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return false;
            };
            tokio::task::spawn_blocking(move || writer.write(&task_path, &frame))
                .await
                .unwrap_or(false)
        });

        debug!(frame_index, path = %path.display(), "queued frame write");
        let handle = WriteHandle {
            frame_index,
            abort: join.abort_handle(),
        };
        self.pending.push_back(PendingWrite {
            frame_index,
            path,
            join,
        });
        Ok(handle)
    }

    /// Wait for every submitted write and return all outcomes collected so far.
    ///
    /// Cancel-safe: if this future is dropped, finished results stay
    /// recorded and the rest stay pending.
    pub async fn drain(&mut self) -> Vec<WriteOutcome> {
        while let Some(write) = self.pending.front_mut() {
            let success = match (&mut write.join).await {
                Ok(success) => success,
                Err(e) => {
                    error!(frame_index = write.frame_index, error = %e, "frame write task failed");
                    false
                }
            };
            if let Some(write) = self.pending.pop_front() {
                self.completed.push(WriteOutcome {
                    frame_index: write.frame_index,
                    path: write.path,
                    success,
                });
            }
        }
        std::mem::take(&mut self.completed)
    }

    /// Collect writes that have already completed, without waiting for the rest.
    pub async fn drain_finished(&mut self) -> Vec<WriteOutcome> {
        let (done, waiting): (VecDeque<_>, VecDeque<_>) =
            self.pending.drain(..).partition(|write| write.join.is_finished());
        self.pending = waiting;
        for write in done {
            let success = write.join.await.unwrap_or(false);
            self.completed.push(WriteOutcome {
                frame_index: write.frame_index,
                path: write.path,
                success,
            });
        }
        std::mem::take(&mut self.completed)
    }

    /// Cancel every write still pending. Returns the abandoned frame indices.
    ///
    /// Writes already inside the encoder run to completion in the background
    /// and may leave a partial file.
    pub fn abandon(&mut self) -> Vec<u64> {
        let abandoned: Vec<u64> = self
            .pending
            .drain(..)
            .map(|write| {
                write.join.abort();
                write.frame_index
            })
            .collect();
        if !abandoned.is_empty() {
            warn!(count = abandoned.len(), "abandoned pending frame writes");
        }
        abandoned
    }
}
