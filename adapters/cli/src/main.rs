#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that inspects recorded gem-hunt traces.
//!
//! This is the query surface the replay engine exposes: session overview,
//! round listing and reports, cross-round analytics, and a layer-by-layer
//! dump of any projected replay frame.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gem_replay_core::SessionRecord;
use gem_replay_rendering::{project, Layer};
use gem_replay_system_aggregation::aggregate_round;
use gem_replay_system_analytics::{cross_round, overview, round_report};
use gem_replay_system_cursor::ReplayCursor;
use gem_replay_trace::TraceStore;
use tracing::info;

#[derive(Parser)]
#[command(name = "gem-replay", about = "Inspect recorded gem-hunt simulation traces")]
struct Cli {
    /// Path to the trace document to load.
    trace: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the session overview block.
    Overview,
    /// List the rounds contained in the trace.
    Rounds,
    /// Print the report for one round.
    Round {
        /// One-based round number as shown by `rounds`.
        #[arg(long)]
        number: usize,
    },
    /// Print the cross-round analytics block.
    Analytics,
    /// Project one replay frame and dump its layer list.
    Frame {
        /// One-based round number.
        #[arg(long)]
        round: usize,
        /// Tick index to seek to; out-of-range values are clamped.
        #[arg(long, default_value_t = 0)]
        tick: i64,
        /// Shade visited cells by visit frequency.
        #[arg(long)]
        heatmap: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut store = TraceStore::new();
    let session = store
        .load(&cli.trace)
        .with_context(|| format!("loading trace {}", cli.trace.display()))?
        .clone();
    info!(
        rounds = session.rounds.len(),
        total_score = session.total_score,
        "loaded trace session"
    );

    match cli.command {
        Command::Overview => println!("{}", overview(&session)),
        Command::Rounds => print_rounds(&session),
        Command::Round { number } => print_round(&session, number)?,
        Command::Analytics => println!("{}", cross_round(&session)),
        Command::Frame {
            round,
            tick,
            heatmap,
        } => print_frame(&session, round, tick, heatmap)?,
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn print_rounds(session: &SessionRecord) {
    if session.rounds.is_empty() {
        println!("No rounds recorded");
        return;
    }

    for (index, round) in session.rounds.iter().enumerate() {
        let frames = aggregate_round(round).frame_count();
        println!(
            "Round {}: score {}, {} frames",
            index + 1,
            round.score,
            frames
        );
    }
}

fn print_round(session: &SessionRecord, number: usize) -> Result<()> {
    let index = number
        .checked_sub(1)
        .filter(|index| *index < session.rounds.len());
    let Some(index) = index else {
        bail!(
            "round {number} does not exist; the trace has {} round(s)",
            session.rounds.len()
        );
    };

    println!("{}", round_report(index, &session.rounds[index]));
    Ok(())
}

fn print_frame(session: &SessionRecord, number: usize, tick: i64, heatmap: bool) -> Result<()> {
    let index = number
        .checked_sub(1)
        .filter(|index| *index < session.rounds.len());
    let Some(index) = index else {
        bail!(
            "round {number} does not exist; the trace has {} round(s)",
            session.rounds.len()
        );
    };

    let mut cursor = ReplayCursor::new(session);
    cursor.select_round(session, index);
    cursor.seek_tick(tick);

    let layers = project(
        cursor.current_frame(),
        cursor.trail(),
        cursor.knowledge(),
        heatmap,
    );

    println!("Round {number}, grid {}x{}", layers.width, layers.height);
    match cursor.current_tick() {
        Some(tick_number) => println!(
            "Tick {tick_number} (frame {} of {})",
            cursor.tick_index() + 1,
            cursor.frame_count()
        ),
        None => println!("No frames recorded for this round"),
    }
    println!("Layers:");
    for (position, layer) in layers.layers.iter().enumerate() {
        println!("  {}. {}", position + 1, describe_layer(layer));
    }

    Ok(())
}

fn describe_layer(layer: &Layer) -> String {
    match layer {
        Layer::Background { .. } => "background fill".to_owned(),
        Layer::BaseCells { fills } => format!("base cells: {} fills", fills.len()),
        Layer::FieldOfView { tints } => format!("field of view: {} cells", tints.len()),
        Layer::Highlights { tints } => format!("highlights: {} cells", tints.len()),
        Layer::Gems { markers } => format!("gems: {} markers", markers.len()),
        Layer::Trail { line } => format!("trail: {} points", line.points.len()),
        Layer::Bot { marker } => format!(
            "bot marker at ({:.1}, {:.1})",
            marker.center.x, marker.center.y
        ),
        Layer::StateDelta { added, removed } => format!(
            "state delta: {} added, {} removed",
            added.len(),
            removed.len()
        ),
        Layer::PlannedPath { line } => format!("planned path: {} points", line.points.len()),
    }
}
