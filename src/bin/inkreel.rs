use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use inkreel::RecordStore as _;
use inkreel::{
    ArtifactKind, AudioConstraints, CaptureConstraints, Clock, ClockTicker, CompositorOpts,
    FfmpegEncoderOpts, FfmpegMediaEncoder, FsObjectStore, FsRasterizer, InkreelResult,
    LayerSource, ManualClock, MemoryRecordStore, PlaybackSynchronizer, RecorderEvent,
    RecorderOpts, RecorderState, RecordingEngine, RecordingSession, RecordingTranscriber,
    ReviewContext, ReviewSubmission, Size, StillFrameDevice, StreamCompositor, SurfaceLayers,
    UploadIds, VideoConstraints,
};

#[derive(Parser, Debug)]
#[command(name = "inkreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the annotation playback state at one time as a PNG.
    Frame(FrameArgs),
    /// Replay annotations over the artifact into a WebM clip (requires `ffmpeg` on PATH).
    Replay(ReplayArgs),
    /// Print how an uploaded file name would be handled.
    Classify(ClassifyArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Image,
    Pdf,
}

impl From<KindArg> for ArtifactKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Image => ArtifactKind::Image,
            KindArg::Pdf => ArtifactKind::Pdf,
        }
    }
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Artifact image, or a directory of page images for a PDF.
    #[arg(long)]
    artifact: PathBuf,

    /// Artifact kind. Inferred from the path when omitted.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Annotation sidecar JSON.
    #[arg(long)]
    snapshots: PathBuf,

    /// Playback time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Canvas width.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Canvas height.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Artifact image, or a directory of page images for a PDF.
    #[arg(long)]
    artifact: PathBuf,

    /// Artifact kind. Inferred from the path when omitted.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Annotation sidecar JSON.
    #[arg(long)]
    snapshots: PathBuf,

    /// Still image shown as the webcam bubble.
    #[arg(long)]
    webcam: Option<PathBuf>,

    /// Clip length in seconds.
    #[arg(long)]
    duration: f64,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Output width (even).
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Output height (even).
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Output WebM path.
    #[arg(long)]
    out: PathBuf,

    /// Also submit the clip and sidecar to a directory-backed object store.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Session id used for the submission.
    #[arg(long, default_value = "local-session")]
    session: String,

    /// Reviewer name used for the submission.
    #[arg(long, default_value = "local reviewer")]
    reviewer: String,
}

#[derive(Parser, Debug)]
struct ClassifyArgs {
    /// File name to classify.
    name: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inkreel=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Replay(args) => cmd_replay(args),
        Command::Classify(args) => cmd_classify(args),
    }
}

fn artifact_kind(path: &Path, kind: Option<KindArg>) -> anyhow::Result<ArtifactKind> {
    if let Some(k) = kind {
        return Ok(k.into());
    }
    if path.is_dir() {
        return Ok(ArtifactKind::Pdf);
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("artifact path '{}' has no file name", path.display()))?;
    Ok(ArtifactKind::from_file_name(name)?)
}

fn playback(
    artifact: &Path,
    kind: Option<KindArg>,
    snapshots: &Path,
    width: u32,
    height: u32,
) -> anyhow::Result<PlaybackSynchronizer<FsRasterizer>> {
    let kind = artifact_kind(artifact, kind)?;
    let json = std::fs::read_to_string(snapshots)
        .with_context(|| format!("read snapshots '{}'", snapshots.display()))?;

    let mut sync = PlaybackSynchronizer::new(
        FsRasterizer::new(),
        Size::new(f64::from(width), f64::from(height)),
    );
    let url = artifact.to_string_lossy();
    sync.load_background(&url, kind)?;
    let n = sync.load_snapshots_json(&json)?;
    tracing::info!(snapshots = n, kind = kind.as_str(), "playback loaded");
    Ok(sync)
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut sync = playback(
        &args.artifact,
        args.kind,
        &args.snapshots,
        args.width,
        args.height,
    )?;
    let selected = sync.render(args.time)?;
    let layers = sync
        .render_layers()?
        .context("canvas has no drawable size")?;

    let frame = layers.lower.to_straight_alpha();
    ensure_parent(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    match selected {
        Some(idx) => eprintln!("wrote {} (snapshot {idx})", args.out.display()),
        None => eprintln!("wrote {} (no annotations yet)", args.out.display()),
    }
    Ok(())
}

/// Playback driven by a clock, rendering the state at the clock's time on every pull.
struct ReplaySource<'a> {
    sync: &'a mut PlaybackSynchronizer<FsRasterizer>,
    clock: ManualClock,
    start_ms: u64,
    shown: Option<usize>,
}

impl LayerSource for ReplaySource<'_> {
    fn layers(&mut self) -> InkreelResult<Option<SurfaceLayers>> {
        let t = self.clock.now_ms().saturating_sub(self.start_ms) as f64 / 1000.0;
        let selected = self.sync.render(t)?;
        if selected != self.shown {
            tracing::debug!(t, ?selected, "snapshot changed");
            self.shown = selected;
        }
        self.sync.render_layers()
    }
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    if !inkreel::is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg is required for replay but was not found on PATH");
    }
    if !(args.duration.is_finite() && args.duration > 0.0) {
        anyhow::bail!("--duration must be a positive number of seconds");
    }

    let mut sync = playback(
        &args.artifact,
        args.kind,
        &args.snapshots,
        args.width,
        args.height,
    )?;

    let mut devices = match &args.webcam {
        Some(path) => StillFrameDevice::new(inkreel::load_image_file(path)?),
        None => StillFrameDevice::audio_only(),
    };
    let constraints = CaptureConstraints {
        audio: Some(AudioConstraints::default()),
        video: args.webcam.as_ref().map(|_| VideoConstraints::default()),
    };
    let device_stream = inkreel::request_permissions(&mut devices, &constraints)?;

    let clock = ManualClock::new(0);
    let shared: Rc<dyn Clock> = Rc::new(clock.clone());
    let fps = args.fps.max(1);

    let mut compositor = StreamCompositor::new(
        &device_stream,
        CompositorOpts {
            fps,
            ..CompositorOpts::default()
        },
    );
    let encoder = FfmpegMediaEncoder::new(FfmpegEncoderOpts {
        size: Some((args.width, args.height)),
        fps,
        ..FfmpegEncoderOpts::default()
    });
    let mut engine = RecordingEngine::new(encoder, shared, RecorderOpts::from_env());
    engine.start(compositor.stream())?;

    let frames = (args.duration * f64::from(fps)).ceil() as u64;
    let mut ticker = ClockTicker::new(clock.clone(), fps, frames);
    let mut failure = None;
    let drawn = {
        let mut source = ReplaySource {
            sync: &mut sync,
            clock: clock.clone(),
            start_ms: clock.now_ms(),
            shown: None,
        };
        compositor.run(&mut source, &mut ticker, |_frame| {
            for event in engine.tick() {
                if let RecorderEvent::Failed(err) = event {
                    failure = Some(err);
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        })?
    };
    if let Some(err) = failure {
        return Err(err.into());
    }

    clock.set_ms((args.duration * 1000.0).round() as u64);
    let clip = engine.stop();
    let clip = match clip {
        Some(clip) => clip,
        None => {
            let cause = engine.tick().into_iter().find_map(|e| match e {
                RecorderEvent::Failed(err) => Some(err),
                _ => None,
            });
            compositor.destroy();
            return Err(match cause {
                Some(err) => err.into(),
                None => anyhow::anyhow!("recording produced no clip"),
            });
        }
    };
    compositor.destroy();
    engine.destroy(Some(&device_stream));

    ensure_parent(&args.out)?;
    std::fs::write(&args.out, &clip.bytes)
        .with_context(|| format!("write webm '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({drawn} frames, {} s, {})",
        args.out.display(),
        clip.duration_secs,
        clip.mime
    );

    if let Some(root) = &args.store {
        submit_to_store(root, &args, clip, &sync)?;
    }
    Ok(())
}

fn submit_to_store(
    root: &Path,
    args: &ReplayArgs,
    clip: inkreel::RecordedClip,
    sync: &PlaybackSynchronizer<FsRasterizer>,
) -> anyhow::Result<()> {
    let objects = FsObjectStore::new(root);
    let records = MemoryRecordStore::new();
    let transcriber = RecordingTranscriber::new();
    let ctx = ReviewContext::new(&objects, &records, &transcriber);

    let reviewer_id = records.insert_reviewer(&args.session, &args.reviewer)?;
    let mut session = RecordingSession::new(None);
    session.transition(RecorderState::Recording)?;
    session.transition(RecorderState::Stopped)?;
    session.set_clip(Some(clip));

    let mut submission = ReviewSubmission::new(
        UploadIds::new(args.session.clone(), reviewer_id),
        sync.snapshots().to_vec(),
    );
    let uploaded = submission.submit(&ctx, &mut session)?;
    let url = inkreel::signed_recording_url(&objects, &ctx.bucket, &uploaded.video_path)?;
    eprintln!("stored {} as {}", uploaded.recording_id, url);
    Ok(())
}

fn cmd_classify(args: ClassifyArgs) -> anyhow::Result<()> {
    let kind = ArtifactKind::from_file_name(&args.name)?;
    println!("kind: {}", kind.as_str());
    println!(
        "markup: {}",
        if kind.supports_markup() {
            "supported"
        } else {
            "download only"
        }
    );
    println!("content type: {}", inkreel::content_type_for(&args.name));
    Ok(())
}
