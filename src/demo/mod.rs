pub mod frames;
pub mod header;

use crate::bundle::{TableBundle, TableData};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

pub use header::Header;

/// Capability interface for the demo-parsing collaborator: one invocation per
/// run, synchronous, yielding the complete table bundle.
pub trait DemoSource {
    fn parse(&mut self) -> Result<TableBundle>;
}

/// Production source reading a demo file from disk.
///
/// Decodes the container layer: validates the magic, reads the file header
/// into the `header` category, and walks the frame stream to the stop frame.
/// Event-level categories require message decoding below the container layer
/// and are reported as [`TableData::Absent`]; a richer backend slots in behind
/// [`DemoSource`] without touching the pipeline.
pub struct DemoFile {
    path: PathBuf,
}

impl DemoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DemoSource for DemoFile {
    fn parse(&mut self) -> Result<TableBundle> {
        let file = File::open(&self.path)
            .with_context(|| format!("opening `{}`", self.path.display()))?;
        let mut reader = BufReader::new(file);

        let header = Header::read(&mut reader)
            .with_context(|| format!("decoding header of `{}`", self.path.display()))?;
        let stats = frames::walk(&mut reader)
            .with_context(|| format!("walking frames of `{}`", self.path.display()))?;
        info!(
            map = %header.map_name,
            frames = stats.frames,
            packets = stats.packets,
            last_tick = stats.last_tick,
            "demo container decoded"
        );

        let mut bundle = TableBundle::empty();
        bundle.set("header", TableData::Record(header.into_record()));
        Ok(bundle)
    }
}
