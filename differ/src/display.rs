//! Live preview of result frames.

use std::future::Future;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};
use videodiff_common::frame::Frame;

pub trait FrameDisplay: Send {
    fn show(&mut self, frame: &Frame) -> impl Future<Output = Result<(), DisplayError>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("failed to spawn ffplay: {0}")]
    Spawn(std::io::Error),
    #[error("display window was closed")]
    Closed,
    #[error("frame shape changed from {from:?} to {to:?}")]
    ShapeChanged {
        from: (u32, u32, u8),
        to: (u32, u32, u8),
    },
}

/// ffplay window fed raw frames over stdin.
///
/// The player is spawned on the first frame, once the frame size is known.
pub struct FfplayDisplay {
    title: String,
    player: Option<Player>,
}

struct Player {
    child: Child,
    stdin: ChildStdin,
    shape: (u32, u32, u8),
}

impl FfplayDisplay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            player: None,
        }
    }

    fn spawn(&self, shape: (u32, u32, u8)) -> Result<Player, DisplayError> {
        let (width, height, channels) = shape;
        let pixel_format = if channels == 4 { "bgra" } else { "bgr24" };
        let mut child = Command::new("ffplay")
            .args(["-hide_banner", "-loglevel", "error", "-autoexit"])
            .args(["-window_title", &self.title])
            .args(["-f", "rawvideo", "-pixel_format", pixel_format])
            .args(["-video_size", &format!("{width}x{height}")])
            .args(["-i", "pipe:0"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(DisplayError::Spawn)?;
        let stdin = child.stdin.take().ok_or_else(|| {
            DisplayError::Spawn(std::io::Error::other("could not get stdin handle"))
        })?;
        info!(title = %self.title, width, height, "display window opened");
        Ok(Player {
            child,
            stdin,
            shape,
        })
    }
}

impl FrameDisplay for FfplayDisplay {
    async fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        if self.player.is_none() {
            self.player = Some(self.spawn(frame.shape())?);
        }
        let Some(player) = self.player.as_mut() else {
            return Err(DisplayError::Closed);
        };
        if player.shape != frame.shape() {
            return Err(DisplayError::ShapeChanged {
                from: player.shape,
                to: frame.shape(),
            });
        }
        player.stdin.write_all(frame.data()).await.map_err(|e| {
            debug!(error = %e, "write to ffplay failed");
            DisplayError::Closed
        })
    }

    async fn close(&mut self) {
        if let Some(mut player) = self.player.take() {
            drop(player.stdin);
            if let Err(e) = player.child.kill().await {
                warn!(error = %e, "failed to stop ffplay");
            }
            debug!(title = %self.title, "display window closed");
        }
    }
}
