use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use storyreel::encode::ffmpeg::ensure_parent_dir;
use storyreel::{
    EncoderFactory, ExportController, FfmpegEncoderFactory, FrameIndex, HalfRounding,
    InMemoryEncoderFactory, Pacing, ProgressEvent, RenderConfig, RenderStatus, Scenario,
    SplitRule, SubRangeLabel,
};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version, about = "Render scenario manifests to video")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scenario to video (requires `ffmpeg` on PATH unless `--dry-run`).
    Render(RenderArgs),
    /// Print how a scenario would be split into parts.
    Split(SplitArgs),
    /// Render a single composited frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Input scenario JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Render config JSON; every field is optional.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font file used for captions. Captions are skipped without one.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output path. Split exports write `<stem>.partN.<ext>` next to it.
    #[arg(long)]
    out: PathBuf,

    /// Split rule: `whole`, `halves`, `halves-floor`, `max:N` or `parts:N`.
    #[arg(long, default_value = "whole", value_parser = parse_split_rule)]
    split: SplitRule,

    /// Render as fast as possible instead of in real time.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Print progress events as JSON lines on stdout.
    #[arg(long, default_value_t = false)]
    progress_json: bool,

    /// Run the whole pipeline with an in-memory encoder and write nothing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Parser, Debug)]
struct SplitArgs {
    /// Input scenario JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Split rule: `whole`, `halves`, `halves-floor`, `max:N` or `parts:N`.
    #[arg(long, default_value = "halves", value_parser = parse_split_rule)]
    split: SplitRule,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Split(args) => cmd_split(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn parse_split_rule(s: &str) -> Result<SplitRule, String> {
    let count = |n: &str| {
        n.parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("expected a positive count in '{s}'"))
    };
    match s {
        "whole" => Ok(SplitRule::Whole),
        "halves" => Ok(SplitRule::halves()),
        "halves-floor" => Ok(SplitRule::Halves {
            first: HalfRounding::Floor,
        }),
        _ => match s.split_once(':') {
            Some(("max", n)) => Ok(SplitRule::MaxScenesPerPart(count(n)?)),
            Some(("parts", n)) => Ok(SplitRule::Parts(count(n)?)),
            _ => Err(format!(
                "unknown split rule '{s}' (expected whole, halves, halves-floor, max:N or parts:N)"
            )),
        },
    }
}

fn assets_root(in_path: &Path) -> &Path {
    in_path.parent().unwrap_or_else(|| Path::new("."))
}

fn load_config(common: &CommonArgs) -> anyhow::Result<RenderConfig> {
    let mut cfg = match common.config.as_ref() {
        Some(p) => RenderConfig::from_path(p)?,
        None => RenderConfig::default(),
    };
    if let Some(font) = common.font.as_ref() {
        cfg = cfg.with_caption_font_file(font)?;
    }
    Ok(cfg)
}

/// `out.mp4` for a single part, `out.partN.mp4` otherwise.
fn part_path(out: &Path, label: &SubRangeLabel) -> PathBuf {
    if label.part_count <= 1 {
        return out.to_path_buf();
    }
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_owned());
    let name = match out.extension() {
        Some(ext) => format!("{stem}.part{}.{}", label.part_index + 1, ext.to_string_lossy()),
        None => format!("{stem}.part{}", label.part_index + 1),
    };
    out.with_file_name(name)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scenario = Scenario::from_path(&args.common.in_path)?;
    let scenes = scenario.load_scenes(assets_root(&args.common.in_path))?;
    let mut cfg = load_config(&args.common)?;
    if args.offline {
        cfg = cfg.with_pacing(Pacing::Offline);
    }

    let factory: Box<dyn EncoderFactory> = if args.dry_run {
        Box::new(InMemoryEncoderFactory::default())
    } else {
        Box::new(FfmpegEncoderFactory::new())
    };

    let progress_json = args.progress_json;
    let mut stdout = std::io::stdout().lock();
    let outcome = ExportController::new(cfg).export(
        &scenes,
        &args.split,
        factory.as_ref(),
        &mut |label: &SubRangeLabel, ev: ProgressEvent| {
            if progress_json {
                let line = serde_json::json!({ "part": label, "event": ev });
                let _ = writeln!(stdout, "{line}");
            } else if ev.status != RenderStatus::Rendering {
                tracing::info!(
                    part = label.part_index + 1,
                    status = ?ev.status,
                    percent = ev.progress_percent,
                    "progress"
                );
            }
        },
    );

    for part in &outcome.parts {
        let Some(blob) = part.result.blob.as_ref() else {
            continue;
        };
        if args.dry_run {
            eprintln!(
                "part {}: {} frames, {:.2}s (dry run, nothing written)",
                part.label.part_index + 1,
                part.result.frame_count,
                part.result.duration_secs
            );
            continue;
        }
        let path = part_path(&args.out, &part.label);
        ensure_parent_dir(&path)?;
        std::fs::write(&path, blob).with_context(|| format!("write '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }

    match outcome.error {
        Some(e) => anyhow::bail!(e),
        None => Ok(()),
    }
}

fn cmd_split(args: SplitArgs) -> anyhow::Result<()> {
    let scenario = Scenario::from_path(&args.in_path)?;
    let scenes = scenario.load_scenes(assets_root(&args.in_path))?;
    let ranges = storyreel::split_scenes(&scenes, &args.split);

    let parts: Vec<_> = ranges
        .iter()
        .enumerate()
        .map(|(i, r)| {
            serde_json::json!({
                "part": i + 1,
                "scenes": scenes[r.clone()].iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
                "duration_secs": scenes[r.clone()].iter().map(|s| s.duration_secs).sum::<f64>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&parts)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let scenario = Scenario::from_path(&args.common.in_path)?;
    let scenes = scenario.load_scenes(assets_root(&args.common.in_path))?;
    let cfg = load_config(&args.common)?;
    let frame = storyreel::render_still(&scenes, &cfg, FrameIndex(args.frame))?;

    ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
