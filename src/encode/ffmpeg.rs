use std::io::{Read, Write as _};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::config::Container;
use crate::encode::encoder::{
    EncodedOutput, EncoderConfig, FrameOrder, StreamEncoder, check_frame_size,
    flatten_premul_over_bg_to_opaque_rgba8,
};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

const STDOUT_CHUNK: usize = 64 * 1024;

/// Encoder that spawns the system `ffmpeg`, streams raw frames to its stdin and collects the
/// muxed container from its stdout.
///
/// Frame writes block when `ffmpeg` falls behind, which throttles the render loop.
pub struct FfmpegEncoder {
    program: String,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_drain: Option<JoinHandle<std::io::Result<Vec<Vec<u8>>>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<EncoderConfig>,
    order: FrameOrder,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    /// Use a specific `ffmpeg` executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            child: None,
            stdin: None,
            stdout_drain: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            order: FrameOrder::default(),
        }
    }

    fn build_command(&self, cfg: &EncoderConfig) -> ReelResult<Command> {
        let s = &cfg.settings;
        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Frames arrive flattened to opaque RGBA; ffmpeg has no premultiplied input format.
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 || audio.channels == 0 {
                return Err(ReelError::encode(
                    "audio sample_rate and channels must be non-zero when audio is enabled",
                ));
            }
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path);
        }

        cmd.args([
            "-c:v",
            &s.video_codec,
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            &format!("{}k", s.video_bitrate_kbps),
        ]);
        if cfg.audio.is_some() {
            // The mix may end a fraction of a frame before the last video frame; pad it so the
            // frame count alone decides where the output ends.
            cmd.args([
                "-c:a",
                &s.audio_codec,
                "-b:a",
                &format!("{}k", s.audio_bitrate_kbps),
                "-af",
                "apad",
                "-shortest",
            ]);
        } else {
            cmd.arg("-an");
        }
        if s.container == Container::Mp4 {
            // A pipe is not seekable, so the moov atom has to come first.
            cmd.args(["-movflags", "frag_keyframe+empty_moov+default_base_moof"]);
        }
        cmd.args(["-f", s.container.muxer(), "pipe:1"]);
        Ok(cmd)
    }

    fn join_drains(&mut self) -> ReelResult<(Vec<u8>, Vec<u8>)> {
        let stdout = match self.stdout_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encode("ffmpeg stdout drain thread panicked"))?
                .map_err(|e| ReelError::encode(format!("ffmpeg stdout read failed: {e}")))?
                .concat(),
            None => Vec::new(),
        };
        let stderr = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ReelError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        Ok((stdout, stderr))
    }
}

impl StreamEncoder for FfmpegEncoder {
    fn begin(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ReelError::encode("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::encode(
                "ffmpeg encoder width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ReelError::encode(
                "ffmpeg encoder width/height must be even (required for yuv420p output)",
            ));
        }
        if self.child.is_some() {
            return Err(ReelError::encode("ffmpeg encoder already started"));
        }
        if !is_program_on_path(&self.program) {
            return Err(ReelError::encode(format!(
                "{} is required for encoding, but was not found on PATH",
                self.program
            )));
        }

        let mut cmd = self.build_command(&cfg)?;
        tracing::debug!(command = ?cmd, "spawning ffmpeg");
        let mut child = cmd.spawn().map_err(|e| {
            ReelError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(mut stdout), Some(mut stderr)) = (stdin, stdout, stderr) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReelError::encode("failed to open ffmpeg pipes"));
        };

        let stdout_drain = std::thread::spawn(move || {
            let mut chunks = Vec::new();
            let mut buf = vec![0u8; STDOUT_CHUNK];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                chunks.push(buf[..n].to_vec());
            }
            Ok(chunks)
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout_drain = Some(stdout_drain);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.order = FrameOrder::default();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encode("ffmpeg encoder not started"))?;
        check_frame_size(cfg, frame)?;
        self.order.accept(idx)?;

        flatten_premul_over_bg_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            cfg.settings.bg_rgba,
        )?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::encode("ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            ReelError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn end(&mut self) -> ReelResult<EncodedOutput> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReelError::encode("ffmpeg encoder not started"))?;
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| ReelError::encode("ffmpeg encoder not started"))?;

        let status = child
            .wait()
            .map_err(|e| ReelError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let (blob, stderr_bytes) = self.join_drains()?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        if blob.is_empty() {
            return Err(ReelError::encode("ffmpeg produced no output"));
        }

        tracing::debug!(bytes = blob.len(), frames = self.order.count(), "ffmpeg finished");
        Ok(EncodedOutput {
            blob,
            frame_count: self.order.count(),
            has_audio: cfg.audio.is_some(),
            container: cfg.settings.container,
        })
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = self.join_drains();
        self.cfg = None;
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // `-r` before `-i` sets the rawvideo input rate; rational as `num/den`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

fn is_program_on_path(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_program_on_path("ffmpeg")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
