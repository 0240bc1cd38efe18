use crate::bundle::TableBundle;
use crate::normalize::{normalize, Normalized};
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk encoding for exported tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Parquet => "Parquet",
        }
    }
}

/// What happened to one category during export.
#[derive(Debug)]
pub enum Outcome {
    Saved {
        category: &'static str,
        path: PathBuf,
        rows: usize,
    },
    Skipped {
        category: &'static str,
        reason: &'static str,
    },
}

/// Export every category of `bundle` into `out_dir`, one file per non-skipped
/// category, named `<category>.<ext>`. Categories are processed in the bundle's
/// fixed order; a skip never affects the next category, a write error aborts
/// the run and leaves already-written files in place.
pub fn export_bundle(
    bundle: TableBundle,
    out_dir: &Path,
    format: ExportFormat,
) -> Result<Vec<Outcome>> {
    let mut outcomes = Vec::new();

    for (category, data) in bundle {
        match normalize(data)? {
            Normalized::Skip { reason } => {
                println!("skipping {}: {}", category, reason);
                outcomes.push(Outcome::Skipped { category, reason });
            }
            Normalized::Table(batch) => {
                let file_name = format!("{}.{}", category, format.extension());
                let path = out_dir.join(&file_name);
                let rows = batch.num_rows();
                write_table(&batch, &path, format)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("saved {} ({} rows)", file_name, rows);
                outcomes.push(Outcome::Saved {
                    category,
                    path,
                    rows,
                });
            }
        }
    }

    Ok(outcomes)
}

/// Write one table to `path` in the chosen format, via a `.tmp` sibling that
/// is renamed into place once fully written.
fn write_table(batch: &RecordBatch, path: &Path, format: ExportFormat) -> Result<()> {
    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));

    match format {
        ExportFormat::Csv => write_csv(batch, &tmp_path)?,
        ExportFormat::Parquet => write_parquet(batch, &tmp_path)?,
    }

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "renaming `{}` to `{}`",
            tmp_path.display(),
            path.display()
        )
    })?;
    debug!(path = %path.display(), rows = batch.num_rows(), "wrote table");
    Ok(())
}

/// Header row of column names, no row-index column.
fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating `{}`", path.display()))?;
    let mut writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(file);
    writer.write(batch).context("writing CSV rows")?;
    Ok(())
}

fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating `{}`", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("initializing Parquet writer")?;
    writer.write(batch).context("writing Parquet rows")?;
    writer.close().context("closing Parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{Column, ColumnSet, ColumnValues, Record, TableData, CATEGORIES};
    use crate::normalize::{SKIP_NO_DATA, SKIP_NOT_TABULAR};
    use anyhow::Result;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,demex::export=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn kills_columns() -> ColumnSet {
        let mut cols = ColumnSet::new();
        cols.push(Column::new(
            "attacker_name",
            ColumnValues::Str(vec![Some("alpha".into()), Some("bravo".into())]),
        ));
        cols.push(Column::new(
            "victim_name",
            ColumnValues::Str(vec![Some("bravo".into()), Some("alpha".into())]),
        ));
        cols.push(Column::new(
            "headshot",
            ColumnValues::Bool(vec![Some(true), Some(false)]),
        ));
        cols
    }

    fn sample_bundle() -> TableBundle {
        let mut bundle = TableBundle::empty();
        let mut header = Record::new();
        header.push("map_name", "de_vertigo");
        header.push("playback_ticks", 279034i64);
        bundle.set("header", TableData::Record(header));
        bundle.set("kills", TableData::Columnar(kills_columns()));
        bundle.set("ticks", TableData::Unrecognized("a closure".into()));
        bundle
    }

    #[test]
    fn csv_export_writes_only_populated_categories() -> Result<()> {
        init_test_logging();
        let dir = TempDir::new()?;

        let outcomes = export_bundle(sample_bundle(), dir.path(), ExportFormat::Csv)?;
        assert_eq!(outcomes.len(), CATEGORIES.len());

        let mut files: Vec<String> = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["header.csv", "kills.csv"]);

        let kills = fs::read_to_string(dir.path().join("kills.csv"))?;
        let mut lines = kills.lines();
        assert_eq!(
            lines.next(),
            Some("attacker_name,victim_name,headshot"),
            "header row must list source columns only, no index column"
        );
        assert_eq!(lines.clone().count(), 2);
        Ok(())
    }

    #[test]
    fn outcomes_carry_row_counts_and_skip_reasons() -> Result<()> {
        let dir = TempDir::new()?;
        let outcomes = export_bundle(sample_bundle(), dir.path(), ExportFormat::Csv)?;

        for outcome in &outcomes {
            match outcome {
                Outcome::Saved {
                    category, rows, ..
                } => match *category {
                    "header" => assert_eq!(*rows, 1),
                    "kills" => assert_eq!(*rows, 2),
                    other => panic!("unexpected saved category {}", other),
                },
                Outcome::Skipped { category, reason } => {
                    if *category == "ticks" {
                        assert_eq!(*reason, SKIP_NOT_TABULAR);
                    } else {
                        assert_eq!(*reason, SKIP_NO_DATA);
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn parquet_export_round_trips_row_count() -> Result<()> {
        let dir = TempDir::new()?;
        export_bundle(sample_bundle(), dir.path(), ExportFormat::Parquet)?;

        let path = dir.path().join("kills.parquet");
        assert!(path.is_file());
        assert!(!dir.path().join("kills.csv").exists());

        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(1024)
            .build()?;
        let mut rows = 0;
        for batch in reader {
            rows += batch?.num_rows();
        }
        assert_eq!(rows, 2);
        Ok(())
    }

    #[test]
    fn rerunning_produces_byte_identical_files() -> Result<()> {
        let first = TempDir::new()?;
        let second = TempDir::new()?;
        export_bundle(sample_bundle(), first.path(), ExportFormat::Csv)?;
        export_bundle(sample_bundle(), second.path(), ExportFormat::Csv)?;

        for name in ["header.csv", "kills.csv"] {
            let a = fs::read(first.path().join(name))?;
            let b = fs::read(second.path().join(name))?;
            assert_eq!(a, b, "{} differs between runs", name);
        }
        Ok(())
    }

    #[test]
    fn all_absent_bundle_writes_nothing() -> Result<()> {
        let dir = TempDir::new()?;
        let outcomes = export_bundle(TableBundle::empty(), dir.path(), ExportFormat::Csv)?;
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, Outcome::Skipped { reason, .. } if *reason == SKIP_NO_DATA)));
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn no_tmp_files_left_behind() -> Result<()> {
        let dir = TempDir::new()?;
        export_bundle(sample_bundle(), dir.path(), ExportFormat::Parquet)?;
        let leftovers: Vec<_> = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "leftover tmp files: {:?}", leftovers);
        Ok(())
    }
}
