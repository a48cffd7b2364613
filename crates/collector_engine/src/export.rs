use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use collector_core::{crawl_dir_name, HarvestedRecord, SinkFormat, SinkSpec};
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{path}: line {line} is not a JSON object")]
    BadLine { path: String, line: usize },
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(ExportError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Directory holding one crawl's exported files. Partitioned by crawl time
/// so that re-running with the same `crawl_time` appends to the same files,
/// which is what makes incremental accumulation across runs work.
pub fn export_dir(files_store: &Path, source: &str, crawl_time: NaiveDateTime) -> PathBuf {
    files_store.join(source).join(crawl_dir_name(crawl_time))
}

/// Writes one sink's accumulated records into per-format files under one
/// crawl directory.
pub struct SinkExporter {
    dir: PathBuf,
}

impl SinkExporter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the sink's JSON Lines file, the one the store reads back.
    pub fn jsonlines_path(&self, spec: &SinkSpec) -> PathBuf {
        self.dir.join(format!("{}.json", spec.name))
    }

    /// Writes the sink's files and returns their paths. Appends to existing
    /// files unless the sink's overwrite policy says otherwise; sinks
    /// without true incremental fetch refetch their whole extent, so their
    /// files are truncated each run.
    pub fn write_sink(
        &self,
        spec: &SinkSpec,
        records: &[HarvestedRecord],
    ) -> Result<Vec<PathBuf>, ExportError> {
        ensure_output_dir(&self.dir)?;

        let mut written = Vec::new();
        for format in &spec.formats {
            let path = match format {
                SinkFormat::JsonLines => {
                    let path = self.jsonlines_path(spec);
                    self.write_jsonlines(&path, spec.overwrite, records)?;
                    path
                }
                SinkFormat::Csv => {
                    let path = self.dir.join(format!("{}.csv", spec.name));
                    self.write_csv(&path, spec.overwrite, records)?;
                    path
                }
            };
            written.push(path);
        }
        Ok(written)
    }

    fn open_for(&self, path: &Path, overwrite: bool) -> Result<(File, bool), ExportError> {
        let fresh = overwrite || !path.exists();
        let file = if overwrite {
            File::create(path)?
        } else {
            OpenOptions::new().create(true).append(true).open(path)?
        };
        Ok((file, fresh))
    }

    fn write_jsonlines(
        &self,
        path: &Path,
        overwrite: bool,
        records: &[HarvestedRecord],
    ) -> Result<(), ExportError> {
        let (file, _) = self.open_for(path, overwrite)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record.fields())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    fn write_csv(
        &self,
        path: &Path,
        overwrite: bool,
        records: &[HarvestedRecord],
    ) -> Result<(), ExportError> {
        // Appended batches must stay aligned with the file's existing
        // header: its columns win, and fields it does not name are dropped.
        let existing_header = if overwrite || !path.exists() {
            None
        } else {
            read_csv_header(path)?
        };
        let (file, _) = self.open_for(path, overwrite)?;
        let mut writer = BufWriter::new(file);

        let columns = match existing_header {
            Some(columns) => columns,
            None => {
                let columns = column_names(records);
                if !columns.is_empty() {
                    write_csv_row(&mut writer, columns.iter().map(String::as_str))?;
                }
                columns
            }
        };
        for record in records {
            let cells: Vec<String> = columns
                .iter()
                .map(|column| render_cell(record.get(column)))
                .collect();
            write_csv_row(&mut writer, cells.iter().map(String::as_str))?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}

/// Reads one sink's accumulated JSON Lines output back for the table
/// replace. Blank lines are skipped; anything else must be an object.
pub fn read_jsonlines(path: &Path) -> Result<Vec<HarvestedRecord>, ExportError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)?;
        let record = HarvestedRecord::from_value(value).ok_or_else(|| ExportError::BadLine {
            path: path.display().to_string(),
            line: index + 1,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Sorted union of top-level field names across the batch.
fn column_names(records: &[HarvestedRecord]) -> Vec<String> {
    let mut columns: Vec<String> = records
        .iter()
        .flat_map(|record| record.fields().keys().cloned())
        .collect();
    columns.sort();
    columns.dedup();
    columns
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Column names of an existing CSV file, `None` when the file is empty.
fn read_csv_header(path: &Path) -> Result<Option<Vec<String>>, ExportError> {
    let mut first_line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first_line)?;
    let line = first_line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_csv_row(line)))
}

fn parse_csv_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => quoted = false,
                other => cell.push(other),
            }
        } else {
            match c {
                '"' => quoted = true,
                ',' => cells.push(std::mem::take(&mut cell)),
                other => cell.push(other),
            }
        }
    }
    cells.push(cell);
    cells
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_csv_row<'a, W: Write>(
    mut writer: W,
    cells: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
    let mut first = true;
    for cell in cells {
        if !first {
            write!(writer, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(writer, "\"{}\"", escaped)?;
        } else {
            write!(writer, "{}", cell)?;
        }
    }
    writeln!(writer)
}
