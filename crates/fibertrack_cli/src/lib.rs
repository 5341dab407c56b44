#![forbid(unsafe_code)]
//! Shared plumbing for the `streamtrack` and `filter_tracks` binaries.

mod loader;
mod progress;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use fibertrack::error::{Error, Result};
use fibertrack::geometry::direction_from_angles;
use fibertrack::io::VolumeLoader;
use fibertrack::roi::{Role, Roi, RoiSet};
use glam::Vec3;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use loader::RonVolumeLoader;
pub use progress::StderrProgress;

/// Install the log subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Parse every spec in `specs` as a region of `role` and add it to `set`.
pub fn add_rois(
    set: &mut RoiSet,
    role: Role,
    specs: &[String],
    loader: &dyn VolumeLoader,
    interpolate: bool,
) -> Result<()> {
    for spec in specs {
        set.add(Roi::parse(role, spec, loader, interpolate)?);
    }
    Ok(())
}

/// Parse `az,el[,tolerance]` in degrees into a unit direction and an optional
/// tolerance in radians.
pub fn parse_init_direction(spec: &str) -> Result<(Vec3, Option<f32>)> {
    let values = spec
        .split(',')
        .map(|s| s.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::InvalidConfig(format!("initial direction '{spec}': {e}")))?;
    if !(2..=3).contains(&values.len()) || values.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidConfig(format!(
            "initial direction '{spec}': expected azimuth,elevation[,tolerance] in degrees"
        )));
    }
    let direction = direction_from_angles(values[0].to_radians(), values[1].to_radians());
    Ok((direction, values.get(2).map(|t| t.to_radians())))
}

/// Base seed when none was given on the command line.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Whether `input` and `output` resolve to the same file, following links and
/// relative components. `output` need not exist yet; its directory must.
pub fn same_file(input: &Path, output: &Path) -> Result<bool> {
    let input = fs::canonicalize(input)?;
    let output = match fs::canonicalize(output) {
        Ok(path) => path,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let Some(name) = output.file_name() else {
                return Ok(false);
            };
            let parent = match output.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            fs::canonicalize(parent)?.join(name)
        }
        Err(e) => return Err(e.into()),
    };
    Ok(input == output)
}
