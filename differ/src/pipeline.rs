//! The driver loop: read, compare, show, persist.

use std::time::Duration;
use tracing::{debug, error, info, warn};
use videodiff_common::frame::{Frame, StreamMetadata};
use videodiff_common::mode::ComparisonMode;

use crate::capture::{CaptureError, FrameSource};
use crate::diff::{self, FrameDiff};
use crate::display::{DisplayError, FrameDisplay};
use crate::input::KeySource;
use crate::mode::{event_for_key, ModeStateMachine, Transition};
use crate::persist::{PersistenceSink, SubmitError};
use crate::shutdown::Interrupt;

pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Why the loop stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Quit,
    Interrupted,
    DisplayClosed,
}

/// One comparison result, tagged with the source position it was produced at.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub frame_index: u64,
    pub frame: Frame,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStep {
    Emit(Emission),
    Stopped(StopReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stop: StopReason,
    pub emitted: u64,
    pub written: usize,
    /// Frame indices whose write reported failure.
    pub failed: Vec<u64>,
    /// Frame indices dropped because the drain was interrupted.
    pub abandoned: Vec<u64>,
}

impl RunSummary {
    pub fn drain_interrupted(&self) -> bool {
        !self.abandoned.is_empty()
    }
}

pub struct Pipeline<S> {
    source: S,
    keys: Box<dyn KeySource>,
    state: ModeStateMachine,
    diff: Box<dyn FrameDiff>,
    fill: u8,
    previous: Option<Frame>,
    metadata: Option<StreamMetadata>,
    interrupt: Interrupt,
    idle_poll: Duration,
    hold_on_end: bool,
}

impl<S: FrameSource> Pipeline<S> {
    pub fn new(source: S, keys: Box<dyn KeySource>, mode: ComparisonMode, fill: u8) -> Self {
        Self {
            source,
            keys,
            state: ModeStateMachine::new(mode, false),
            diff: diff::for_mode(mode, fill),
            fill,
            previous: None,
            metadata: None,
            interrupt: Interrupt::new(),
            idle_poll: DEFAULT_IDLE_POLL,
            hold_on_end: false,
        }
    }

    /// Start in frame-by-frame playback.
    pub fn start_paused(mut self, paused: bool) -> Self {
        self.state = ModeStateMachine::new(self.state.mode(), paused);
        self
    }

    pub fn interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    /// After the source runs dry, keep the display up until `q`.
    pub fn hold_on_end(mut self, hold: bool) -> Self {
        self.hold_on_end = hold;
        self
    }

    pub fn mode(&self) -> ComparisonMode {
        self.state.mode()
    }

    /// Stream metadata, available after the first successful read.
    pub fn metadata(&self) -> Option<&StreamMetadata> {
        self.metadata.as_ref()
    }

    /// Run one iteration of the loop, idling while paused, until a result is
    /// ready or the loop has to stop.
    pub async fn next_step(&mut self) -> Result<PipelineStep, PipelineError> {
        loop {
            if self.interrupt.is_set() {
                return Ok(PipelineStep::Stopped(StopReason::Interrupted));
            }

            if let Some(event) = self.keys.poll_key().and_then(event_for_key) {
                match self.state.apply(event) {
                    Transition::Quit => return Ok(PipelineStep::Stopped(StopReason::Quit)),
                    Transition::ModeChanged { to, .. } => {
                        self.diff = diff::for_mode(to, self.fill);
                    }
                    _ => {}
                }
            }

            if !self.state.should_advance() {
                tokio::time::sleep(self.idle_poll).await;
                continue;
            }

            let Some(current) = self.source.read_frame().await? else {
                return Ok(PipelineStep::Stopped(StopReason::EndOfStream));
            };
            self.record_metadata();

            let Some(previous) = self.previous.take() else {
                debug!("seeded comparison with first frame");
                self.previous = Some(current);
                continue;
            };
            if !previous.same_shape(&current) {
                warn!(
                    from = ?previous.shape(),
                    to = ?current.shape(),
                    "frame shape changed, reseeding"
                );
                self.previous = Some(current);
                continue;
            }

            let frame = self.diff.apply(&current, &previous);
            self.previous = Some(self.diff.carry_forward(current));
            self.state.consume_render();

            let frame_index = self.source.position();
            debug!(frame_index, method = self.diff.name(), "result frame ready");
            return Ok(PipelineStep::Emit(Emission { frame_index, frame }));
        }
    }

    fn record_metadata(&mut self) {
        if self.metadata.is_some() {
            return;
        }
        let meta = self.source.metadata();
        info!(
            backend = %meta.backend,
            fourcc = %meta.pixel_format,
            container = %meta.container,
            width = meta.width,
            height = meta.height,
            fps = meta.fps,
            channels = meta.channels,
            depth = meta.depth,
            "stream opened"
        );
        self.metadata = Some(meta);
    }

    /// Wait for `q` (or an interrupt) with the last result still on screen.
    async fn hold(&mut self) -> StopReason {
        info!("end of input, press q to exit");
        loop {
            if self.interrupt.is_set() {
                return StopReason::Interrupted;
            }
            if let Some(event) = self.keys.poll_key().and_then(event_for_key) {
                if self.state.apply(event) == Transition::Quit {
                    return StopReason::Quit;
                }
            }
            tokio::time::sleep(self.idle_poll).await;
        }
    }

    async fn drive<D: FrameDisplay>(
        &mut self,
        mut display: Option<&mut D>,
        mut sink: Option<&mut PersistenceSink>,
        emitted: &mut u64,
    ) -> Result<StopReason, PipelineError> {
        loop {
            let emission = match self.next_step().await? {
                PipelineStep::Emit(emission) => emission,
                PipelineStep::Stopped(StopReason::EndOfStream) if self.hold_on_end && display.is_some() => {
                    return Ok(self.hold().await);
                }
                PipelineStep::Stopped(reason) => return Ok(reason),
            };
            *emitted += 1;

            if let Some(display) = display.as_deref_mut() {
                match display.show(&emission.frame).await {
                    Ok(()) => {}
                    Err(DisplayError::Closed) => return Ok(StopReason::DisplayClosed),
                    Err(e @ DisplayError::ShapeChanged { .. }) => {
                        warn!(frame_index = emission.frame_index, error = %e, "frame not shown");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            if let Some(sink) = sink.as_deref_mut() {
                sink.submit_frame(emission.frame_index, emission.frame)?;
            }
        }
    }

    /// Drive the loop to completion.
    ///
    /// Whatever stops the loop, the display and the source are closed once
    /// and every submitted write is awaited. A Ctrl-C during that wait
    /// abandons the remaining writes.
    pub async fn run<D: FrameDisplay>(
        mut self,
        mut display: Option<&mut D>,
        mut sink: Option<&mut PersistenceSink>,
    ) -> Result<RunSummary, PipelineError> {
        let mut emitted = 0;
        let outcome = self
            .drive(display.as_deref_mut(), sink.as_deref_mut(), &mut emitted)
            .await;

        if let Some(display) = display {
            display.close().await;
        }
        self.source.close().await;
        info!(emitted, mode = %self.state.mode(), "capture stopped");

        // Hand the terminal back so a further Ctrl-C arrives as a signal.
        let Self { keys, interrupt, .. } = self;
        drop(keys);

        let settled = match sink {
            Some(sink) => settle(sink, &interrupt).await,
            None => Settled::default(),
        };

        let stop = match outcome {
            Ok(stop) => stop,
            Err(e) => {
                error!(
                    error = %e,
                    written = settled.written,
                    failed = settled.failed.len(),
                    abandoned = settled.abandoned.len(),
                    "pipeline failed"
                );
                return Err(e);
            }
        };
        let summary = RunSummary {
            stop,
            emitted,
            written: settled.written,
            failed: settled.failed,
            abandoned: settled.abandoned,
        };

        info!(
            reason = ?summary.stop,
            emitted = summary.emitted,
            written = summary.written,
            failed = summary.failed.len(),
            "pipeline finished"
        );
        Ok(summary)
    }
}

#[derive(Debug, Default)]
struct Settled {
    written: usize,
    failed: Vec<u64>,
    abandoned: Vec<u64>,
}

/// Wait for every submitted write, logging each failure. A Ctrl-C during
/// the wait abandons whatever has not finished yet.
async fn settle(sink: &mut PersistenceSink, interrupt: &Interrupt) -> Settled {
    let mut settled = Settled::default();
    if sink.pending() > 0 {
        info!(pending = sink.pending(), "waiting for frame writes to finish");
    }
    let seen = interrupt.count();
    let outcomes = tokio::select! {
        outcomes = sink.drain() => outcomes,
        _ = interrupt.beyond(seen) => {
            let mut outcomes = sink.drain_finished().await;
            settled.abandoned = sink.abandon();
            warn!(abandoned = ?settled.abandoned, "stopped waiting for frame writes");
            outcomes.sort_by_key(|o| o.frame_index);
            outcomes
        }
    };
    for outcome in &outcomes {
        if outcome.success {
            settled.written += 1;
        } else {
            error!(
                frame_index = outcome.frame_index,
                path = %outcome.path.display(),
                "failed to write result frame"
            );
            settled.failed.push(outcome.frame_index);
        }
    }
    settled
}
