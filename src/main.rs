use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fitvision::config::Config;
use fitvision::exercise::ExerciseKind;
use fitvision::session::{Mode, SessionRunner, SessionSummary};
use fitvision::source::{FrameSource, JsonlSource, ThreadedSource};

/// ランドマーク記録からレップ数を数える
#[derive(Parser)]
#[command(name = "fitvision", version = env!("GIT_VERSION"))]
struct Cli {
    /// 設定ファイル (無ければデフォルト値)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// 数える種目 (bicep_curl, push_up, squat, shoulder_press)
    #[arg(long, conflicts_with = "auto")]
    exercise: Option<ExerciseKind>,

    /// 種目を自動判定する
    #[arg(long)]
    auto: bool,

    /// 取得を別スレッドで行う
    #[arg(long)]
    threaded: bool,

    /// N フレーム処理したら停止する
    #[arg(long)]
    max_frames: Option<u64>,

    /// JSON Lines 形式のランドマーク記録
    input: PathBuf,
}

fn print_summary(summary: &SessionSummary) {
    eprintln!();
    eprintln!("=== Session summary ({:?}) ===", summary.end);
    for seg in &summary.segments {
        eprintln!(
            "  {:<15} {:>4} reps  (frames {}..={})",
            seg.kind.display_name(),
            seg.reps,
            seg.started_frame,
            seg.ended_frame
        );
    }
    eprintln!(
        "  total {} reps, {} frames, {} skipped, {} unclassifiable",
        summary.total_reps(),
        summary.frames_processed,
        summary.frames_skipped,
        summary.frames_unclassifiable
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("fitvision ({})", env!("GIT_VERSION"));

    let mode = match (cli.exercise, cli.auto) {
        (Some(kind), _) => Mode::Fixed(kind),
        (None, true) => Mode::AutoClassify,
        (None, false) => bail!("either --exercise <kind> or --auto is required"),
    };

    let config = Config::load_or_default(&cli.config)?;
    let analysis = config.analysis;

    let jsonl = JsonlSource::open(&cli.input)
        .with_context(|| format!("failed to open {}", cli.input.display()))?;
    let mut source: Box<dyn FrameSource> = if cli.threaded {
        Box::new(ThreadedSource::spawn(jsonl, analysis.handoff_depth).context("failed to start acquisition thread")?)
    } else {
        Box::new(jsonl)
    };

    let mut runner = SessionRunner::new(mode, &analysis)?;
    let stop = runner.stop_handle();
    let max_frames = cli.max_frames;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut write_error: Option<anyhow::Error> = None;
    let mut seen = 0u64;

    let summary = runner.run(&mut source, |result| {
        seen += 1;
        if write_error.is_none() {
            let written = serde_json::to_writer(&mut out, result)
                .map_err(anyhow::Error::from)
                .and_then(|_| writeln!(out).map_err(anyhow::Error::from));
            if let Err(e) = written {
                // 出力先が閉じられたら止める
                write_error = Some(e);
                stop.stop();
            }
        }
        if max_frames.is_some_and(|n| seen >= n) {
            stop.stop();
        }
    })?;
    out.flush()?;
    if let Some(e) = write_error {
        return Err(e.context("failed to write results"));
    }

    print_summary(&summary);
    Ok(())
}
