use clap::{Parser, ValueEnum};
use crossbeam_channel::Receiver;
use narrative_core::media::MediaCall;
use narrative_core::{HeadlessMediaBackend, SceneInfo, StoryEngine, Viewport};
use narrative_schema::{load_story, StoryDocument};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the story document (JSON)
    #[arg(value_name = "STORY")]
    story: PathBuf,

    /// Override the document viewport, e.g. 1440x900
    #[arg(long, value_parser = parse_viewport)]
    viewport: Option<Viewport>,

    /// Scroll distance per simulated frame, in pixels
    #[arg(long, default_value_t = 40.0)]
    step: f64,

    /// Simulated frame interval in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Scroll back up to the top after reaching the end
    #[arg(long)]
    back: bool,

    /// Write every stage frame to stdout as NDJSON
    #[arg(long)]
    frames: bool,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: f64 = w.trim().parse().map_err(|_| format!("bad width '{w}'"))?;
    let height: f64 = h.trim().parse().map_err(|_| format!("bad height '{h}'"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("viewport must be positive, got '{s}'"));
    }
    Ok(Viewport::new(width, height))
}

/// Drives the engine frame by frame and reports what changed.
struct Simulation {
    engine: StoryEngine,
    backend: HeadlessMediaBackend,
    info_rx: Receiver<Option<SceneInfo>>,
    now: Duration,
    frame_interval: Duration,
    emit_frames: bool,
    seen_calls: usize,
    frames: usize,
}

impl Simulation {
    fn scroll_to(&mut self, position: f64) {
        self.engine.scroll_to(position);
        self.now += self.frame_interval;
        let frame = self.engine.tick(self.now);
        self.frames += 1;

        debug!(
            scroll = frame.scroll,
            playhead = frame.playhead,
            offset = frame.track_offset,
            phase = frame.phase.map(|p| p.as_str()),
            "frame"
        );
        if self.emit_frames {
            match serde_json::to_string(&frame) {
                Ok(line) => {
                    let _ = writeln!(std::io::stdout(), "{line}");
                }
                Err(e) => error!("Failed to serialize frame: {}", e),
            }
        }
        self.report_media();
        self.report_active();
    }

    fn report_active(&self) {
        for published in self.info_rx.try_iter() {
            match published {
                Some(scene) => info!(title = %scene.title, description = %scene.description, "active scene"),
                None => info!("active scene cleared"),
            }
        }
    }

    fn report_media(&mut self) {
        let calls = self.backend.calls();
        for MediaCall { scene, media, kind } in &calls[self.seen_calls.min(calls.len())..] {
            info!(scene = %scene, media = %media, call = ?kind, "media");
        }
        self.seen_calls = calls.len();
    }

    /// Scrolls from `from` to `to` in steps of `step`, then lets the playhead settle.
    fn sweep(&mut self, from: f64, to: f64, step: f64) {
        let direction = if to >= from { 1.0 } else { -1.0 };
        let mut position = from;
        while (to - position) * direction > 0.0 {
            position = if (to - position).abs() <= step {
                to
            } else {
                position + step * direction
            };
            self.scroll_to(position);
        }
        let settle = self.engine.config().scrub_lag_secs + 0.25;
        let settle_frames = (settle / self.frame_interval.as_secs_f64().max(1e-3)).ceil() as usize;
        for _ in 0..settle_frames {
            self.scroll_to(to);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(cli.log_level).into())
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match cli.log_format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }

    info!("Story: {:?}", cli.story);

    let mut document = match StoryDocument::load(&cli.story) {
        Ok(doc) => doc,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(viewport) = cli.viewport {
        document.viewport = viewport;
    }

    let backend = HeadlessMediaBackend::new();
    let mut engine = match load_story(&document, Arc::new(backend.clone())) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to load story: {}", e);
            std::process::exit(1);
        }
    };
    let info_rx = engine.subscribe_info();

    let pin_length = engine.pin_length();
    info!(
        viewport = %format!("{}x{}", document.viewport.width, document.viewport.height),
        pin_length,
        travel_start = engine.travel_start(),
        triggers = engine.trigger_count(),
        "Simulating scroll..."
    );

    let mut sim = Simulation {
        engine,
        backend,
        info_rx,
        now: Duration::ZERO,
        frame_interval: Duration::from_millis(cli.frame_ms.max(1)),
        emit_frames: cli.frames,
        seen_calls: 0,
        frames: 0,
    };
    let step = cli.step.abs().max(1.0);

    sim.scroll_to(0.0);
    sim.sweep(0.0, pin_length, step);
    if cli.back {
        sim.sweep(pin_length, 0.0, step);
    }

    sim.engine.shutdown();
    sim.report_active();
    info!(
        frames = sim.frames,
        media_calls = sim.backend.calls().len(),
        "Simulation complete."
    );
}
