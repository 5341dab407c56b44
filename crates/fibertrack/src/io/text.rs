//! Line-oriented track file.
//!
//! ```text
//! fibertrack tracks
//! count:                    2
//! total_count:              5
//! method: SD_STREAM
//! roi: seed 0,0,0,2
//! comment: generated for testing
//! END
//! 0 0 0
//! 0 0 0.5
//! nan nan nan
//! ...
//! ```
//!
//! The header lists properties, then one point per line with `nan nan nan` closing
//! each track. A property whose key is `roi`, `comment` or `property`, or contains
//! `:`, is written as `property: <key length> <key>` with the value on the next line. The two counters are written as fixed-width fields and patched in
//! place on finalize.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use glam::Vec3;

use crate::error::{Error, Result};
use crate::geometry::Track;
use crate::io::{TrackReader, TrackWriter};
use crate::properties::{Properties, COUNT_KEY, TOTAL_COUNT_KEY};

const MAGIC: &str = "fibertrack tracks";
const END: &str = "END";
const SEPARATOR: &str = "nan nan nan";
const COUNT_WIDTH: usize = 20;
const ROI: &str = "roi";
const COMMENT: &str = "comment";
// Wraps properties whose key is itself a line tag or contains ':'.
const PROPERTY: &str = "property";

fn needs_wrapping(key: &str) -> bool {
    matches!(key, ROI | COMMENT | PROPERTY) || key.contains(':')
}

fn single_line(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

/// Streams tracks into a text track file.
pub struct TextTrackWriter<W: Write + Seek> {
    inner: W,
    count_offset: u64,
    total_offset: u64,
}

impl TextTrackWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: impl AsRef<Path>, properties: &Properties) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), properties)
    }
}

impl<W: Write + Seek> TextTrackWriter<W> {
    /// Write the header to `inner`, which must be positioned at the start of the file.
    pub fn new(mut inner: W, properties: &Properties) -> Result<Self> {
        writeln!(inner, "{MAGIC}")?;

        write!(inner, "{COUNT_KEY}: ")?;
        let count_offset = inner.stream_position()?;
        writeln!(inner, "{:>COUNT_WIDTH$}", 0)?;
        write!(inner, "{TOTAL_COUNT_KEY}: ")?;
        let total_offset = inner.stream_position()?;
        writeln!(inner, "{:>COUNT_WIDTH$}", 0)?;

        for (key, value) in properties.entries() {
            if key == COUNT_KEY || key == TOTAL_COUNT_KEY {
                continue;
            }
            let (key, value) = (single_line(key), single_line(value));
            let key = key.trim();
            if needs_wrapping(key) {
                writeln!(inner, "{PROPERTY}: {} {}", key.len(), key)?;
                writeln!(inner, "{value}")?;
            } else {
                writeln!(inner, "{key}: {value}")?;
            }
        }
        for (role, spec) in properties.rois() {
            writeln!(inner, "{ROI}: {} {}", role, single_line(spec))?;
        }
        for comment in properties.comments() {
            writeln!(inner, "{COMMENT}: {}", single_line(comment))?;
        }
        writeln!(inner, "{END}")?;

        Ok(Self {
            inner,
            count_offset,
            total_offset,
        })
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> TrackWriter for TextTrackWriter<W> {
    fn append(&mut self, track: &Track) -> Result<()> {
        for p in track.points() {
            writeln!(self.inner, "{} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(self.inner, "{SEPARATOR}")?;
        Ok(())
    }

    fn finalize(&mut self, count: usize, total_count: usize) -> Result<()> {
        let end = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(self.count_offset))?;
        write!(self.inner, "{count:>COUNT_WIDTH$}")?;
        self.inner.seek(SeekFrom::Start(self.total_offset))?;
        write!(self.inner, "{total_count:>COUNT_WIDTH$}")?;
        self.inner.seek(SeekFrom::Start(end))?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Reads tracks from a text track file.
pub struct TextTrackReader<R: BufRead> {
    inner: R,
    properties: Properties,
    line: String,
    line_no: usize,
}

impl TextTrackReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> TextTrackReader<R> {
    /// Parse the header from `inner`.
    pub fn new(inner: R) -> Result<Self> {
        let mut reader = Self {
            inner,
            properties: Properties::new(),
            line: String::new(),
            line_no: 0,
        };

        if !reader.read_line()? || reader.line.trim() != MAGIC {
            return Err(Error::Format("not a fibertrack track file".into()));
        }

        loop {
            if !reader.read_line()? {
                return Err(Error::Format("unexpected end of header".into()));
            }
            let line = reader.line.trim();
            if line == END {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(reader.format_error("expected 'key: value'"));
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                ROI => {
                    let Some((role, spec)) = value.split_once(' ') else {
                        return Err(reader.format_error("expected 'roi: <role> <spec>'"));
                    };
                    let role = role.parse()?;
                    reader.properties.add_roi(role, spec.trim());
                }
                COMMENT => reader.properties.add_comment(value),
                PROPERTY => {
                    let key = reader.wrapped_key(value)?;
                    if !reader.read_line()? {
                        return Err(reader.format_error("missing property value"));
                    }
                    let value = reader.line.trim_end_matches(['\n', '\r']).to_owned();
                    reader.properties.set(key, value);
                }
                _ => reader.properties.set(key, value),
            }
        }

        Ok(reader)
    }

    /// Key of a `property: <len> <key>` line; the value follows on the next line.
    fn wrapped_key(&self, rest: &str) -> Result<String> {
        rest.split_once(' ')
            .and_then(|(len, key)| {
                let len = len.parse::<usize>().ok()?;
                (key.len() == len).then(|| key.to_owned())
            })
            .ok_or_else(|| self.format_error("expected 'property: <length> <key>'"))
    }

    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self.inner.read_line(&mut self.line)?;
        self.line_no += 1;
        Ok(n > 0)
    }

    fn format_error(&self, what: &str) -> Error {
        Error::Format(format!("line {}: {}", self.line_no, what))
    }

    fn parse_point(&self) -> Result<Vec3> {
        let mut values = [0.0f32; 3];
        let mut fields = self.line.split_whitespace();
        for v in values.iter_mut() {
            *v = fields
                .next()
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| self.format_error("expected three coordinates"))?;
        }
        if fields.next().is_some() {
            return Err(self.format_error("expected three coordinates"));
        }
        Ok(Vec3::from_array(values))
    }
}

impl<R: BufRead> TrackReader for TextTrackReader<R> {
    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn next_track(&mut self) -> Result<Option<Track>> {
        let mut track = Track::new();
        loop {
            if !self.read_line()? {
                if track.is_empty() {
                    return Ok(None);
                }
                return Err(Error::Format("truncated track at end of file".into()));
            }
            if self.line.trim().is_empty() {
                continue;
            }
            let p = self.parse_point()?;
            if p.is_nan() {
                return Ok(Some(track));
            }
            track.push(p);
        }
    }
}
