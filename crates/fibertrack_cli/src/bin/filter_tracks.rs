//! `filter_tracks`: keep the tracks of an existing file that satisfy new regions.
//!
//! ```bash
//! filter_tracks tracks.txt selected.txt --include 10,0,0,4 --exclude csf.ron
//! ```
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fibertrack::prelude::*;
use fibertrack_cli::{add_rois, init_tracing, same_file, RonVolumeLoader, StderrProgress};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "filter_tracks",
    version,
    about = "Select tracks by include and exclude regions",
    long_about = None
)]
struct Args {
    /// Input track file.
    input: PathBuf,

    /// Output track file.
    output: PathBuf,

    /// Tracks must pass through this region. Repeatable.
    #[arg(long = "include", value_name = "SPEC", allow_hyphen_values = true)]
    includes: Vec<String>,

    /// Tracks entering this region are discarded. Repeatable.
    #[arg(long = "exclude", value_name = "SPEC", allow_hyphen_values = true)]
    excludes: Vec<String>,

    /// Use nearest-voxel lookup for mask regions.
    #[arg(long)]
    nomaskinterp: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let overwrites_input = same_file(&args.input, &args.output)
        .with_context(|| format!("resolving {}", args.output.display()))?;
    if overwrites_input {
        bail!(
            "output {} is the input file {}",
            args.output.display(),
            args.input.display()
        );
    }

    let loader = RonVolumeLoader::new();
    let interpolate = !args.nomaskinterp;
    let mut rois = RoiSet::new();
    add_rois(&mut rois, Role::Include, &args.includes, &loader, interpolate)?;
    add_rois(&mut rois, Role::Exclude, &args.excludes, &loader, interpolate)?;
    let mut filter = TrackFilter::new(rois);

    let mut reader = TextTrackReader::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let mut properties = filter.output_properties(reader.properties());
    properties.add_comment(format!("filter_tracks {}", env!("CARGO_PKG_VERSION")));

    let mut writer = TextTrackWriter::create(&args.output, &properties)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let counters = filter
        .run(&mut reader, &mut writer, &mut StderrProgress::default())
        .with_context(|| format!("filtering {}", args.input.display()))?;

    info!(
        "Selected {} of {} tracks into {}.",
        counters.count,
        counters.total_count,
        args.output.display()
    );
    Ok(())
}
