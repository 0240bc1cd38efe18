use crate::export::ExportFormat;
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const USAGE: &str =
    "Usage: demex <DEMO_FILE> [--to_parquet true|false] [--beside_input true|false]";

/// Where the stem-named output directory is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPlacement {
    /// In the invoking process's working directory (the default).
    WorkingDir,
    /// As a sibling of the input file.
    BesideInput,
}

/// Resolved command line.
#[derive(Debug)]
pub struct Cli {
    pub demo_path: PathBuf,
    pub format: ExportFormat,
    pub placement: OutputPlacement,
}

impl Cli {
    /// Parse the argument list (program name excluded). Flags take a following
    /// value; a flag without one, an unknown option, or a surplus positional is
    /// a usage error.
    pub fn from_args(args: &[String]) -> Result<Cli> {
        let mut demo_path: Option<PathBuf> = None;
        let mut format = ExportFormat::Csv;
        let mut placement = OutputPlacement::WorkingDir;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--to_parquet" => {
                    if flag_is_true("--to_parquet", iter.next())? {
                        format = ExportFormat::Parquet;
                    }
                }
                "--beside_input" => {
                    if flag_is_true("--beside_input", iter.next())? {
                        placement = OutputPlacement::BesideInput;
                    }
                }
                opt if opt.starts_with("--") => bail!("unknown option `{}`", opt),
                _ => {
                    if demo_path.is_some() {
                        bail!("unexpected argument `{}`", arg);
                    }
                    demo_path = Some(PathBuf::from(arg));
                }
            }
        }

        let demo_path = match demo_path {
            Some(p) => p,
            None => bail!("missing demo file argument"),
        };

        Ok(Cli {
            demo_path,
            format,
            placement,
        })
    }

    /// Output directory for this run: the demo file's stem, under the working
    /// directory or beside the input depending on placement. Deterministic,
    /// no filesystem access.
    pub fn output_dir(&self) -> PathBuf {
        let stem = self.demo_path.file_stem().unwrap_or_default();
        match self.placement {
            OutputPlacement::WorkingDir => PathBuf::from(stem),
            OutputPlacement::BesideInput => match self.demo_path.parent() {
                Some(parent) => parent.join(stem),
                None => PathBuf::from(stem),
            },
        }
    }
}

/// Only a case-insensitive `true` selects the non-default behavior; any other
/// value is the default. A missing value is a usage error.
fn flag_is_true(flag: &str, value: Option<&String>) -> Result<bool> {
    match value {
        Some(v) => Ok(v.eq_ignore_ascii_case("true")),
        None => bail!("{} requires a value", flag),
    }
}
