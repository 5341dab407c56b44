//! `streamtrack`: generate streamline tracks from a peak orientation image.
//!
//! ```bash
//! streamtrack SD_PROB peaks.ron tracks.txt --seed 0,0,0,3 --include wm.ron -n 1000
//! ```
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fibertrack::field::peaks::DEFAULT_TRIALS;
use fibertrack::prelude::*;
use fibertrack_cli::{
    add_rois, clock_seed, init_tracing, parse_init_direction, RonVolumeLoader, StderrProgress,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "streamtrack",
    version,
    about = "Generate streamline tracks through an orientation field",
    long_about = None
)]
struct Args {
    /// Tracking algorithm: DT_STREAM, DT_PROB, SD_STREAM or SD_PROB.
    #[arg(value_name = "TYPE")]
    method: TrackingMethod,

    /// Peak orientation image (RON volume with three components per voxel).
    source: PathBuf,

    /// Output track file.
    output: PathBuf,

    /// Seed region, either `x,y,z,radius` or a mask image. Repeatable.
    #[arg(long = "seed", value_name = "SPEC", required = true, allow_hyphen_values = true)]
    seeds: Vec<String>,

    /// Tracks must pass through this region. Repeatable.
    #[arg(long = "include", value_name = "SPEC", allow_hyphen_values = true)]
    includes: Vec<String>,

    /// Tracks entering this region are discarded. Repeatable.
    #[arg(long = "exclude", value_name = "SPEC", allow_hyphen_values = true)]
    excludes: Vec<String>,

    /// Tracks stop when they leave this region. Repeatable.
    #[arg(long = "mask", value_name = "SPEC", allow_hyphen_values = true)]
    masks: Vec<String>,

    /// Step size in mm [default: 0.1 (DT) or 0.2 (SD) x voxel size].
    #[arg(long, value_name = "MM")]
    step: Option<f32>,

    /// Minimum radius of curvature in mm [default: 2 (DT) or 1 (SD)].
    #[arg(long, value_name = "MM")]
    curvature: Option<f32>,

    /// Number of tracks to write.
    #[arg(short = 'n', long, default_value_t = 100)]
    number: usize,

    /// Maximum number of attempts [default: 100 x number].
    #[arg(long, value_name = "N")]
    maxnum: Option<usize>,

    /// Maximum track length in mm.
    #[arg(long, value_name = "MM", default_value_t = 200.0)]
    length: f32,

    /// Tracks not longer than this (in mm) are discarded.
    #[arg(long, value_name = "MM", default_value_t = 10.0)]
    minlength: f32,

    /// Amplitude cutoff for propagation.
    #[arg(long, default_value_t = 0.1)]
    cutoff: f32,

    /// Amplitude cutoff for seeds [default: 2 x cutoff].
    #[arg(long)]
    initcutoff: Option<f32>,

    /// Stop a track once it has visited every include region.
    #[arg(long)]
    stop: bool,

    /// Use nearest-voxel lookup for mask regions.
    #[arg(long)]
    nomaskinterp: bool,

    /// Sampling attempts per step for probabilistic methods.
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Grow tracks from the seed in one direction only.
    #[arg(long)]
    unidirectional: bool,

    /// Preferred initial direction `azimuth,elevation[,tolerance]` in degrees.
    #[arg(long, value_name = "AZ,EL[,TOL]", allow_hyphen_values = true)]
    initdirection: Option<String>,

    /// Interpolate the field instead of using per-voxel lookups.
    #[arg(long)]
    noprecomputed: bool,

    /// Number of worker threads.
    #[arg(long, env = "FIBERTRACK_THREADS", default_value_t = 1)]
    threads: usize,

    /// Base random seed; worker `i` uses `seed + i` [default: from the clock].
    #[arg(long)]
    seed_value: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let loader = RonVolumeLoader::new();

    let source = args.source.to_string_lossy();
    let image = loader
        .load(&source)
        .with_context(|| format!("loading orientation image {source}"))?;
    let voxel = image.min_voxel_size();
    info!(
        "Loaded {} ({}x{}x{}, voxel {} mm).",
        source,
        image.dims()[0],
        image.dims()[1],
        image.dims()[2],
        voxel
    );

    let method = args.method;
    let step = args.step.unwrap_or(method.default_step_fraction() * voxel);
    let threshold = args.cutoff;
    let init_threshold = args.initcutoff.unwrap_or(2.0 * threshold);

    let mut tracker_config = TrackerConfig::new(step)
        .with_min_curvature_radius(args.curvature.unwrap_or(method.default_curvature()))
        .with_max_dist(args.length)
        .with_min_dist(args.minlength)
        .with_thresholds(threshold, init_threshold)
        .with_unidirectional(args.unidirectional)
        .with_stop_when_included(args.stop)
        .with_precomputed(!args.noprecomputed);
    if let Some(spec) = &args.initdirection {
        let (direction, tolerance) = parse_init_direction(spec)?;
        let tolerance = tolerance.unwrap_or(tracker_config.init_tolerance);
        tracker_config = tracker_config.with_init_direction(direction, tolerance);
    }
    tracker_config.validate()?;

    let field = PeakField::new(image, method)?
        .with_trials(args.trials)
        .with_max_angle(tracker_config.max_angle());

    let interpolate = !args.nomaskinterp;
    let mut rois = RoiSet::new();
    add_rois(&mut rois, Role::Seed, &args.seeds, &loader, interpolate)?;
    add_rois(&mut rois, Role::Include, &args.includes, &loader, interpolate)?;
    add_rois(&mut rois, Role::Exclude, &args.excludes, &loader, interpolate)?;
    add_rois(&mut rois, Role::Mask, &args.masks, &loader, interpolate)?;

    let base_seed = args.seed_value.unwrap_or_else(clock_seed);
    let engine_config = EngineConfig::new(args.number)
        .with_threads(args.threads)
        .with_max_num_attempts(args.maxnum.unwrap_or(args.number.saturating_mul(100)))
        .with_base_seed(base_seed);

    let mut properties = Properties::new()
        .with("method", method)
        .with("source", &source)
        .with("step_size", step)
        .with("min_curvature_radius", tracker_config.min_curvature_radius)
        .with("max_dist", tracker_config.max_dist)
        .with("min_dist", tracker_config.min_dist)
        .with("threshold", threshold)
        .with("init_threshold", init_threshold)
        .with("max_num_tracks", engine_config.max_num_tracks)
        .with("max_num_attempts", engine_config.max_num_attempts)
        .with("unidirectional", args.unidirectional)
        .with("stop_when_included", args.stop)
        .with("precomputed", tracker_config.precomputed)
        .with("seed_value", base_seed);
    if method.is_probabilistic() {
        properties.set("trials", args.trials);
    }
    if let Some(spec) = &args.initdirection {
        properties.set("init_direction", spec);
    }
    properties.record_rois(&rois, &Role::ALL);
    properties.add_comment(format!("streamtrack {}", env!("CARGO_PKG_VERSION")));

    let engine = GenerationEngine::try_new(engine_config, tracker_config, &field, &rois)?;
    let mut writer = TextTrackWriter::create(&args.output, &properties)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let counters = engine
        .run(&mut writer, &mut StderrProgress::default())
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        "Wrote {} of {} attempted tracks to {}.",
        counters.count,
        counters.total_count,
        args.output.display()
    );
    Ok(())
}
