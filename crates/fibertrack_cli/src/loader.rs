use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fibertrack::error::{Error, Result};
use fibertrack::geometry::Volume;
use fibertrack::io::VolumeLoader;

/// Loads volumes stored as RON files. Relative paths resolve against `base`.
#[derive(Clone, Debug, Default)]
pub struct RonVolumeLoader {
    base: Option<PathBuf>,
}

impl RonVolumeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.base {
            Some(base) if Path::new(path).is_relative() => base.join(path),
            _ => PathBuf::from(path),
        }
    }
}

impl VolumeLoader for RonVolumeLoader {
    fn load(&self, path: &str) -> Result<Volume> {
        let text = match fs::read_to_string(self.resolve(path)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::MissingImage {
                    path: path.to_owned(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let volume: Volume =
            ron::from_str(&text).map_err(|e| Error::Format(format!("{path}: {e}")))?;
        volume.validate()?;
        Ok(volume)
    }
}
