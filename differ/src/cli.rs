//! Command-line flags. Every flag overrides the matching config file entry.

use clap::Parser;
use std::path::PathBuf;
use videodiff_common::config::{Backend, Config, RunMode};
use videodiff_common::mode::ComparisonMode;

#[derive(Debug, Parser)]
#[command(name = "videodiff")]
#[command(version, about = "Show what changed between consecutive video frames")]
#[command(after_help = "KEYS (while running):
    b g r     single-channel difference (blue, green, red)
    a         absolute difference
    m         mask changed pixels with the fill value
    n         normal playback
    p         pause / step one frame
    c         continue playback
    q         quit

EXAMPLES:
    # Live webcam, red channel only
    videodiff --cap 0 --method red --display

    # Difference mask of a recording, saved as TIFF
    videodiff --file clip.avi --method mask --fill-value 200 --output out

    # Compare two stills
    videodiff --mode image --file before.png --file after.png --method absolute --output out")]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input mode: stream (alias dithering) or pair (alias image)
    #[arg(short, long)]
    pub mode: Option<RunMode>,

    /// Comparison method: blue, green, red, absolute, mask, normal (or first letter)
    #[arg(short = 'x', long)]
    pub method: Option<ComparisonMode>,

    /// Color written over changed pixels in mask mode (0-255)
    #[arg(long, allow_negative_numbers = true)]
    pub fill_value: Option<i64>,

    /// Show results in a window
    #[arg(short, long)]
    pub display: bool,

    /// Save every result frame into this directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Start in frame-by-frame playback
    #[arg(short, long)]
    pub pause: bool,

    /// Capture device index or name
    #[arg(long, value_name = "DEVICE")]
    pub cap: Option<String>,

    /// Input file: one video for stream mode, two images for pair mode
    #[arg(long = "file", value_name = "PATH", num_args = 1..=2, action = clap::ArgAction::Append)]
    pub files: Vec<PathBuf>,

    /// Capture backend: any, v4l2, avfoundation, dshow
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Requested capture width
    #[arg(long)]
    pub width: Option<u32>,

    /// Requested capture height
    #[arg(long)]
    pub height: Option<u32>,

    /// Requested capture frame rate
    #[arg(long)]
    pub fps: Option<f64>,

    /// Requested four-character pixel format, e.g. MJPG
    #[arg(long)]
    pub fourcc: Option<String>,

    /// Concurrent frame writers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Layer the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        let source = &mut config.source;
        if let Some(mode) = self.mode {
            source.mode = mode;
        }
        if let Some(cap) = &self.cap {
            source.device = Some(cap.clone());
        }
        if !self.files.is_empty() {
            source.files = self.files.clone();
        }
        if let Some(backend) = self.backend {
            source.backend = backend;
        }
        if self.width.is_some() {
            source.width = self.width;
        }
        if self.height.is_some() {
            source.height = self.height;
        }
        if self.fps.is_some() {
            source.fps = self.fps;
        }
        if let Some(fourcc) = &self.fourcc {
            source.pixel_format = Some(fourcc.clone());
        }

        if let Some(method) = self.method {
            config.diff.method = method;
        }
        if let Some(fill) = self.fill_value {
            config.diff.fill_value = fill;
        }
        if self.display {
            config.playback.display = true;
        }
        if self.pause {
            config.playback.start_paused = true;
        }
        if let Some(dir) = &self.output {
            config.output.dir = Some(dir.clone());
        }
        if let Some(workers) = self.workers {
            config.persist.workers = workers;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "videodiff", "--cap", "1", "-x", "r", "--fill-value", "7", "-d", "-p", "-o", "out",
            "--backend", "v4l2", "--width", "320", "--height", "240", "--fourcc", "YUYV",
            "--workers", "2",
        ])
        .unwrap();
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.source.device.as_deref(), Some("1"));
        assert_eq!(config.source.backend, Backend::V4l2);
        assert_eq!(config.source.width, Some(320));
        assert_eq!(config.source.pixel_format.as_deref(), Some("YUYV"));
        assert_eq!(config.diff.method, ComparisonMode::Red);
        assert_eq!(config.diff.fill_value, 7);
        assert!(config.playback.display);
        assert!(config.playback.start_paused);
        assert_eq!(config.output.dir, Some(PathBuf::from("out")));
        assert_eq!(config.persist.workers, 2);
        config.validate().unwrap();
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let args = Args::try_parse_from(["videodiff"]).unwrap();
        let mut config = Config::default();
        config.diff.method = ComparisonMode::Mask;
        config.playback.display = true;
        args.apply(&mut config);
        assert_eq!(config.diff.method, ComparisonMode::Mask);
        assert!(config.playback.display);
    }

    #[test]
    fn pair_mode_takes_two_files() {
        let args = Args::try_parse_from([
            "videodiff", "--mode", "image", "--file", "a.png", "--file", "b.png", "-x", "absolute",
        ])
        .unwrap();
        assert_eq!(args.mode, Some(RunMode::Pair));
        assert_eq!(args.files, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);

        let args = Args::try_parse_from(["videodiff", "--mode", "pair", "--file", "a.png", "b.png"]).unwrap();
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn bad_values_are_rejected_by_the_parser() {
        assert!(Args::try_parse_from(["videodiff", "-x", "purple"]).is_err());
        assert!(Args::try_parse_from(["videodiff", "--backend", "gstreamer"]).is_err());
        assert!(Args::try_parse_from(["videodiff", "--mode", "burst"]).is_err());
    }

    #[test]
    fn negative_fill_reaches_validation() {
        let args = Args::try_parse_from(["videodiff", "--file", "a.avi", "--fill-value", "-3"]).unwrap();
        let mut config = Config::default();
        args.apply(&mut config);
        assert!(config.validate().is_err());
    }
}
