use anyhow::{Context, Result};
use clap::Parser;
use pedcount::pipeline::Pipeline;
use pedcount::replay::{DetectionsReader, ReplayDetector};
use pedcount::{MatchPolicy, TrackerConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pedcount", about = "Count pedestrians in recorded detections")]
struct Args {
    /// Detections file, one `<timestamp>:<json array>` line per frame
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// JSON tracker config; flags below override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Class id treated as pedestrian
    #[arg(long)]
    class: Option<i32>,
    /// One-to-one nearest matching instead of first-fit
    #[arg(long)]
    best_fit: bool,
    /// Drop tracks unmatched for more than N frames
    #[arg(long, value_name = "N")]
    max_missing: Option<u32>,
    /// Cap on live tracks
    #[arg(long, value_name = "N")]
    max_tracks: Option<usize>,
    /// Print the final tracks as JSON
    #[arg(long)]
    tracks: bool,
}

fn load_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    if let Some(class) = args.class {
        config.target_class = class;
    }
    if args.best_fit {
        config.policy = MatchPolicy::BestFit;
    }
    if args.max_missing.is_some() {
        config.max_missing_frames = args.max_missing;
    }
    if args.max_tracks.is_some() {
        config.max_tracks = args.max_tracks;
    }

    config.validate()?;

    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let mut source = match DetectionsReader::open(&args.input) {
        Ok(source) => source,
        Err(err) => {
            println!("Error: Could not open video source.");
            return Err(err.into());
        }
    };

    let (mut pipeline, _controller) = Pipeline::new(config)?;
    let summary = pipeline.run(&mut source, &mut ReplayDetector, |_, update| {
        for id in update.new_ids() {
            log::debug!("frame {}: pedestrian {} entered", update.frame_index, id);
        }
    })?;

    println!(
        "Total Pedestrians Detected: {} ({} frames)",
        summary.total_created, summary.frames
    );

    if args.tracks {
        println!("{}", serde_json::to_string_pretty(&pipeline.session().tracks())?);
    }

    Ok(())
}
