//! [`MediaEncoder`] backed by the system `ffmpeg` binary.
//!
//! Raw RGBA frames sampled from the stream's first live video track are piped to `ffmpeg`,
//! which writes WebM to stdout. A background thread drains stdout into chunks; another drains
//! stderr for diagnostics. Frames are emitted on a fixed grid of active (non-paused) time, so a
//! slow or idle source repeats its latest frame. Audio tracks are not encoded.

use std::cell::OnceCell;
use std::io::{Read, Write as _};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

use crate::foundation::core::{FrameRGBA, Rgba8};
use crate::foundation::error::{InkreelError, InkreelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::media::track::{MediaStream, MediaTrack};
use crate::record::encoder::{EncoderConfig, EncoderState, MediaEncoder};
use crate::render::composite::flatten_onto;

const STDOUT_READ_BLOCK: usize = 64 * 1024;

/// Options for [`FfmpegMediaEncoder`].
#[derive(Clone, Debug, PartialEq)]
pub struct FfmpegEncoderOpts {
    /// Output size. `None` takes the size of the track's frame at start.
    pub size: Option<(u32, u32)>,
    /// Output frame rate.
    pub fps: u32,
    /// Color used to flatten transparency and to fill frames before the source has one.
    pub background: Rgba8,
}

impl Default for FfmpegEncoderOpts {
    fn default() -> Self {
        Self {
            size: None,
            fps: 30,
            background: Rgba8::BLACK,
        }
    }
}

/// Video codec `ffmpeg` should use for a WebM mime string.
///
/// `None` for mimes this encoder cannot produce.
pub fn codec_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.trim().to_ascii_lowercase();
    let (container, params) = match mime.split_once(';') {
        Some((c, p)) => (c.trim().to_string(), p.to_string()),
        None => (mime.clone(), String::new()),
    };
    if container != "video/webm" {
        return None;
    }
    if params.contains("vp9") {
        Some("libvpx-vp9")
    } else if params.is_empty() || params.contains("vp8") {
        Some("libvpx")
    } else {
        None
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Encoder names listed by `ffmpeg -encoders`. Empty when `ffmpeg` is unavailable.
pub fn available_encoders() -> Vec<String> {
    let Ok(output) = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output()
    else {
        return Vec::new();
    };
    parse_encoder_list(&String::from_utf8_lossy(&output.stdout))
}

fn parse_encoder_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            // Capability columns look like "V....D"; the legend lines use "V..... = Video".
            let is_row = flags.len() == 6
                && flags.starts_with(['V', 'A', 'S'])
                && name != "="
                && !name.starts_with('=');
            is_row.then(|| name.to_string())
        })
        .collect()
}

/// Number of frames that belong to `active_ms` of video at `fps`.
pub(crate) fn frames_due(active_ms: u64, fps: u32) -> u64 {
    active_ms * u64::from(fps) / 1000
}

/// Production encoder spawning `ffmpeg`.
pub struct FfmpegMediaEncoder {
    opts: FfmpegEncoderOpts,
    encoders: OnceCell<Vec<String>>,
    state: EncoderState,

    track: Option<MediaTrack>,
    size: (u32, u32),
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    chunks: Option<Receiver<Vec<u8>>>,
    stdout_drain: Option<JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    active_ms: u64,
    resumed_at: u64,
    frames_written: u64,
    last_frame: Vec<u8>,
    size_mismatch_logged: bool,
}

impl std::fmt::Debug for FfmpegMediaEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegMediaEncoder")
            .field("opts", &self.opts)
            .field("state", &self.state)
            .field("size", &self.size)
            .field("frames_written", &self.frames_written)
            .finish_non_exhaustive()
    }
}

impl FfmpegMediaEncoder {
    /// Create an idle encoder. `ffmpeg` is probed lazily.
    pub fn new(opts: FfmpegEncoderOpts) -> Self {
        Self {
            opts,
            encoders: OnceCell::new(),
            state: EncoderState::Inactive,
            track: None,
            size: (0, 0),
            child: None,
            stdin: None,
            chunks: None,
            stdout_drain: None,
            stderr_drain: None,
            active_ms: 0,
            resumed_at: 0,
            frames_written: 0,
            last_frame: Vec::new(),
            size_mismatch_logged: false,
        }
    }

    /// Frames piped to `ffmpeg` in the current run.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn encoders(&self) -> &[String] {
        self.encoders.get_or_init(available_encoders)
    }

    fn resolve_size(&self, track: &MediaTrack) -> InkreelResult<(u32, u32)> {
        let (w, h) = match self.opts.size {
            Some(size) => size,
            None => track
                .with_frame(|f| f.map(|f| (f.width, f.height)))
                .ok_or_else(|| {
                    InkreelError::validation(
                        "encoder size is unset and the video track has no frame yet",
                    )
                })?,
        };
        if w == 0 || h == 0 {
            return Err(InkreelError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if !w.is_multiple_of(2) || !h.is_multiple_of(2) {
            return Err(InkreelError::validation(
                "encode width/height must be even (required for yuv420p output)",
            ));
        }
        Ok((w, h))
    }

    fn spawn(&mut self, codec: &str, cfg: &EncoderConfig) -> InkreelResult<()> {
        let (w, h) = self.size;
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{w}x{h}"),
            "-r",
            &self.opts.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            codec,
            "-b:v",
            &cfg.video_bits_per_second.to_string(),
            "-deadline",
            "realtime",
            "-pix_fmt",
            "yuv420p",
            "-f",
            "webm",
            "pipe:1",
        ]);

        let mut child = cmd.spawn().map_err(|e| {
            InkreelError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InkreelError::encoding("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| InkreelError::encoding("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| InkreelError::encoding("failed to open ffmpeg stderr (unexpected)"))?;

        let (tx, rx) = mpsc::channel();
        let stdout_drain = std::thread::spawn(move || {
            let mut buf = vec![0u8; STDOUT_READ_BLOCK];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    return Ok(());
                }
                if tx.send(buf[..n].to_vec()).is_err() {
                    return Ok(());
                }
            }
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.chunks = Some(rx);
        self.stdout_drain = Some(stdout_drain);
        self.stderr_drain = Some(stderr_drain);
        Ok(())
    }

    fn sample_frame(&mut self) {
        let Some(track) = self.track.as_ref() else {
            return;
        };
        let (w, h) = self.size;
        let background = [
            self.opts.background.r,
            self.opts.background.g,
            self.opts.background.b,
        ];
        let sampled = track.with_frame(|frame| match frame {
            Some(f) if f.width == w && f.height == h && f.validate().is_ok() => {
                Some(Ok(opaque_rgba(f, background)))
            }
            Some(f) => Some(Err((f.width, f.height))),
            None => None,
        });
        match sampled {
            Some(Ok(bytes)) => self.last_frame = bytes,
            Some(Err((fw, fh))) => {
                if !self.size_mismatch_logged {
                    tracing::warn!(
                        frame_w = fw,
                        frame_h = fh,
                        w,
                        h,
                        "video frame size differs from encoder size; repeating last frame"
                    );
                    self.size_mismatch_logged = true;
                }
            }
            None => {}
        }
    }

    fn write_due_frames(&mut self, target: u64) -> InkreelResult<()> {
        if self.frames_written >= target {
            return Ok(());
        }
        self.sample_frame();
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(InkreelError::encoding("ffmpeg encoder is already finalized"));
        };
        while self.frames_written < target {
            stdin.write_all(&self.last_frame).map_err(|e| {
                InkreelError::encoding(format!("failed to write frame to ffmpeg stdin: {e}"))
            })?;
            self.frames_written += 1;
        }
        Ok(())
    }

    fn accumulate(&mut self, now_ms: u64) {
        if self.state == EncoderState::Recording {
            self.active_ms += now_ms.saturating_sub(self.resumed_at);
            self.resumed_at = now_ms;
        }
    }

    fn drain_ready(&self) -> Vec<Vec<u8>> {
        self.chunks
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }

    fn finish(&mut self) -> InkreelResult<Vec<Vec<u8>>> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| InkreelError::encoding("ffmpeg encoder not started"))?;

        if let Some(handle) = self.stdout_drain.take() {
            handle
                .join()
                .map_err(|_| InkreelError::encoding("ffmpeg stdout drain thread panicked"))?
                .map_err(|e| InkreelError::encoding(format!("ffmpeg stdout read failed: {e}")))?;
        }
        let out = self.drain_ready();
        self.chunks = None;

        let status = child.wait().map_err(|e| {
            InkreelError::encoding(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| InkreelError::encoding("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| InkreelError::encoding(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(InkreelError::encoding(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(out)
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.chunks = None;
        self.stdout_drain = None;
        self.stderr_drain = None;
        self.track = None;
        self.state = EncoderState::Inactive;
    }
}

impl MediaEncoder for FfmpegMediaEncoder {
    fn is_type_supported(&self, mime: &str) -> bool {
        codec_for_mime(mime).is_some_and(|codec| self.encoders().iter().any(|e| e == codec))
    }

    #[tracing::instrument(skip(self, stream, cfg), fields(mime = %cfg.mime))]
    fn start(
        &mut self,
        stream: &MediaStream,
        cfg: &EncoderConfig,
        now_ms: u64,
    ) -> InkreelResult<()> {
        if self.state != EncoderState::Inactive {
            return Err(InkreelError::validation("ffmpeg encoder already running"));
        }
        if self.opts.fps == 0 {
            return Err(InkreelError::validation("encode fps must be non-zero"));
        }
        let codec = codec_for_mime(&cfg.mime).ok_or_else(|| {
            InkreelError::encoding(format!("unsupported mime '{}'", cfg.mime))
        })?;
        let track = stream
            .first_live_video()
            .cloned()
            .ok_or_else(|| InkreelError::validation("stream has no live video track"))?;
        self.size = self.resolve_size(&track)?;

        let (w, h) = self.size;
        self.last_frame = opaque_rgba(&FrameRGBA::solid(w, h, self.opts.background), [0, 0, 0]);
        self.track = Some(track);
        self.spawn(codec, cfg)?;

        self.state = EncoderState::Recording;
        self.active_ms = 0;
        self.resumed_at = now_ms;
        self.frames_written = 0;
        self.size_mismatch_logged = false;
        tracing::debug!(codec, w, h, fps = self.opts.fps, "ffmpeg encoder started");
        Ok(())
    }

    fn pause(&mut self, now_ms: u64) {
        if self.state == EncoderState::Recording {
            self.accumulate(now_ms);
            self.state = EncoderState::Paused;
        }
    }

    fn resume(&mut self, now_ms: u64) {
        if self.state == EncoderState::Paused {
            self.state = EncoderState::Recording;
            self.resumed_at = now_ms;
        }
    }

    fn poll(&mut self, now_ms: u64) -> InkreelResult<Vec<Vec<u8>>> {
        if self.state == EncoderState::Inactive {
            return Ok(Vec::new());
        }
        self.accumulate(now_ms);
        if let Err(err) = self.write_due_frames(frames_due(self.active_ms, self.opts.fps)) {
            self.abort();
            return Err(err);
        }
        Ok(self.drain_ready())
    }

    fn stop(&mut self, now_ms: u64) -> InkreelResult<Vec<Vec<u8>>> {
        if self.state == EncoderState::Inactive {
            return Ok(Vec::new());
        }
        self.accumulate(now_ms);
        let target = frames_due(self.active_ms, self.opts.fps).max(1);
        let result = self
            .write_due_frames(target)
            .and_then(|()| self.finish());
        match result {
            Ok(out) => {
                self.track = None;
                self.state = EncoderState::Inactive;
                tracing::debug!(frames = self.frames_written, "ffmpeg encoder finished");
                Ok(out)
            }
            Err(err) => {
                self.abort();
                Err(err)
            }
        }
    }

    fn state(&self) -> EncoderState {
        self.state
    }
}

impl Drop for FfmpegMediaEncoder {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn opaque_rgba(frame: &FrameRGBA, bg: [u8; 3]) -> Vec<u8> {
    if frame.premultiplied {
        flatten_onto(&frame.data, bg)
    } else {
        let mut premul = frame.data.clone();
        premultiply_rgba8_in_place(&mut premul);
        flatten_onto(&premul, bg)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
