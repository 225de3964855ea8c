use serde::Deserialize;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use videodiff_common::config::{Backend, SourceConfig};
use videodiff_common::frame::{Frame, StreamMetadata};

use super::{CaptureError, FrameSource};

/// Decoded frames are requested from ffmpeg in this layout.
const RAW_PIX_FMT: &str = "bgr24";
const RAW_CHANNELS: u8 = 3;

/// A video file or capture device decoded by an ffmpeg subprocess.
///
/// ffmpeg writes raw `bgr24` frames to its stdout; each read pulls exactly
/// one frame's worth of bytes from the pipe.
pub struct FfmpegSource {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    input: String,
    width: u32,
    height: u32,
    frame_len: usize,
    position: u64,
    metadata: StreamMetadata,
    finished: bool,
}

/// Where frames come from and how ffmpeg should open it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    /// Arguments placed before the output options (input options + `-i`).
    pub args: Vec<String>,
    /// Human-readable input name for logs and errors.
    pub display: String,
    /// Backend name reported in stream metadata.
    pub backend: String,
}

/// How a requested four-character code is passed to ffmpeg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelRequest {
    /// Compressed stream from the device (MJPG, H264).
    Codec(&'static str),
    /// Raw pixel layout name understood by ffmpeg.
    Pixel(String),
}

impl PixelRequest {
    pub fn from_fourcc(fourcc: &str) -> Self {
        match fourcc.to_ascii_uppercase().as_str() {
            "MJPG" => PixelRequest::Codec("mjpeg"),
            "H264" | "AVC1" => PixelRequest::Codec("h264"),
            "YUY2" | "YUYV" => PixelRequest::Pixel("yuyv422".into()),
            "UYVY" => PixelRequest::Pixel("uyvy422".into()),
            "NV12" => PixelRequest::Pixel("nv12".into()),
            "I420" | "YU12" => PixelRequest::Pixel("yuv420p".into()),
            other => PixelRequest::Pixel(other.to_ascii_lowercase()),
        }
    }

    fn name(&self) -> &str {
        match self {
            PixelRequest::Codec(name) => name,
            PixelRequest::Pixel(name) => name,
        }
    }
}

impl InputSpec {
    /// Translate the source section of the config into ffmpeg input arguments.
    pub fn from_config(config: &SourceConfig) -> Result<Self, CaptureError> {
        if let Some(file) = config.files.first() {
            if config.width.is_some()
                || config.height.is_some()
                || config.fps.is_some()
                || config.pixel_format.is_some()
            {
                warn!("capture tuning options are ignored for file input");
            }
            let path = file.display().to_string();
            return Ok(Self {
                args: vec!["-i".into(), path.clone()],
                display: path,
                backend: "ffmpeg".into(),
            });
        }

        let device = config.device.clone().unwrap_or_else(|| "0".into());
        let backend = resolve_backend(config.backend);
        let is_index = !device.is_empty() && device.chars().all(|c| c.is_ascii_digit());
        let pixel = config.pixel_format.as_deref().map(PixelRequest::from_fourcc);

        let mut args: Vec<String> = vec!["-f".into(), backend.as_str().into()];
        match (&pixel, backend) {
            (Some(p), Backend::V4l2) => args.extend(["-input_format".into(), p.name().into()]),
            (Some(PixelRequest::Codec(c)), Backend::Dshow) => {
                args.extend(["-vcodec".into(), (*c).into()])
            }
            (Some(PixelRequest::Pixel(p)), Backend::Dshow | Backend::Avfoundation) => {
                args.extend(["-pixel_format".into(), p.clone()])
            }
            (Some(PixelRequest::Codec(c)), _) => {
                warn!(codec = c, backend = %backend, "compressed pixel format not supported by backend, ignoring");
            }
            _ => {}
        }
        if let (Some(w), Some(h)) = (config.width, config.height) {
            args.extend(["-video_size".into(), format!("{w}x{h}")]);
        } else if config.width.is_some() || config.height.is_some() {
            warn!("width and height must be requested together, ignoring");
        }
        if let Some(fps) = config.fps {
            args.extend(["-framerate".into(), fps.to_string()]);
        }

        let input = match backend {
            Backend::V4l2 if is_index => format!("/dev/video{device}"),
            Backend::Avfoundation if !device.contains(':') => format!("{device}:none"),
            Backend::Dshow if is_index => {
                return Err(CaptureError::Device {
                    backend,
                    device,
                    reason: "dshow needs a device name, e.g. \"Integrated Camera\"",
                })
            }
            Backend::Dshow if !device.starts_with("video=") => format!("video={device}"),
            _ => device.clone(),
        };
        args.extend(["-i".into(), input.clone()]);

        Ok(Self {
            args,
            display: input,
            backend: format!("ffmpeg/{backend}"),
        })
    }
}

/// Platform default for device capture when no backend was requested.
fn resolve_backend(requested: Backend) -> Backend {
    match requested {
        Backend::Any if cfg!(target_os = "macos") => Backend::Avfoundation,
        Backend::Any if cfg!(target_os = "windows") => Backend::Dshow,
        Backend::Any => Backend::V4l2,
        other => other,
    }
}

// -- ffprobe ------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    codec_name: Option<String>,
    codec_tag_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
}

/// Stream properties read from `ffprobe -of json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub pixel_format: String,
    pub container: String,
}

/// Parse ffprobe's JSON. `None` when there is no usable video stream.
pub fn parse_probe(json: &str) -> Result<Option<ProbeInfo>, serde_json::Error> {
    let output: ProbeOutput = serde_json::from_str(json)?;
    let Some(stream) = output.streams.into_iter().next() else {
        return Ok(None);
    };
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Ok(None);
    };
    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(0.0);
    let pixel_format = stream
        .codec_tag_string
        .filter(|tag| tag.len() == 4 && tag.chars().all(|c| c.is_ascii_graphic()) && !tag.starts_with('['))
        .or(stream.codec_name)
        .unwrap_or_else(|| "unknown".into());
    let container = output
        .format
        .and_then(|f| f.format_name)
        .unwrap_or_else(|| "unknown".into());
    Ok(Some(ProbeInfo {
        width,
        height,
        fps,
        pixel_format,
        container,
    }))
}

/// Parse an ffmpeg rational such as `30000/1001`. Zero denominators yield `None`.
pub fn parse_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => rate.trim().parse().ok(),
    }
}

async fn probe(spec: &InputSpec) -> Result<ProbeInfo, CaptureError> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
        .arg("stream=width,height,r_frame_rate,avg_frame_rate,codec_name,codec_tag_string:format=format_name")
        .args(["-of", "json"])
        .args(&spec.args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| CaptureError::Spawn("ffprobe", e))?;

    if !output.status.success() {
        return Err(CaptureError::Probe {
            input: spec.display.clone(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let json = String::from_utf8_lossy(&output.stdout);
    parse_probe(&json)
        .map_err(|e| CaptureError::Probe {
            input: spec.display.clone(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| CaptureError::NoVideoStream(spec.display.clone()))
}

// -- decoding -----------------------------------------------------------------

impl FfmpegSource {
    /// Probe the input, then start decoding it to raw frames.
    pub async fn open(config: &SourceConfig) -> Result<Self, CaptureError> {
        let spec = InputSpec::from_config(config)?;
        let info = probe(&spec).await?;
        debug!(input = %spec.display, ?info, "probed input");

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .args(&spec.args)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", RAW_PIX_FMT, "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| CaptureError::Spawn("ffmpeg", e))?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::Spawn("ffmpeg", std::io::Error::other("could not get stdout handle"))
        })?;

        // Drain stderr in the background so a chatty ffmpeg never blocks on a full pipe.
        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text).await;
                text
            })
        });

        let fps = match (info.fps, config.fps) {
            (fps, _) if fps > 0.0 => fps,
            (_, Some(requested)) => requested,
            _ => 0.0,
        };
        let metadata = StreamMetadata {
            container: info.container,
            pixel_format: info.pixel_format,
            backend: spec.backend.clone(),
            width: info.width,
            height: info.height,
            fps,
            channels: RAW_CHANNELS,
            depth: 8,
        };

        info!(
            input = %spec.display,
            width = info.width,
            height = info.height,
            "ffmpeg decoder started"
        );

        Ok(Self {
            child,
            stdout,
            stderr,
            input: spec.display,
            width: info.width,
            height: info.height,
            frame_len: Frame::buffer_len(info.width, info.height, RAW_CHANNELS),
            position: 0,
            metadata,
            finished: false,
        })
    }

    /// Reap ffmpeg after its stdout closed. A failure before the first frame
    /// means the input never opened.
    async fn finish(&mut self) -> Result<(), CaptureError> {
        self.finished = true;
        let status = self.child.wait().await.map_err(CaptureError::Read)?;
        let stderr = match self.stderr.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        if !status.success() {
            if self.position == 0 {
                return Err(CaptureError::FfmpegFailed(stderr.trim().to_string()));
            }
            warn!(status = %status, stderr = stderr.trim(), "ffmpeg exited with error after decoding frames");
        }
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    async fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < self.frame_len {
            let n = self
                .stdout
                .read(&mut buf[filled..])
                .await
                .map_err(CaptureError::Read)?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled < self.frame_len {
            if filled > 0 {
                warn!(
                    got = filled,
                    expected = self.frame_len,
                    "discarding truncated trailing frame"
                );
            }
            debug!(input = %self.input, frames = self.position, "end of stream");
            self.finish().await?;
            return Ok(None);
        }

        self.position += 1;
        Frame::new(self.width, self.height, RAW_CHANNELS, buf)
            .map(Some)
            .map_err(|e| CaptureError::Frame(self.input.clone(), e))
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn metadata(&self) -> StreamMetadata {
        self.metadata.clone()
    }

    async fn close(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, "ffmpeg already exited");
        }
        let _ = self.child.wait().await;
        if let Some(task) = self.stderr.take() {
            task.abort();
        }
        debug!(input = %self.input, "capture closed");
    }
}
