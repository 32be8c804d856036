use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use blotter_core::{Record, RecordBatch, RecordId, ResumeCursor};
use blotter_logging::{blotter_debug, blotter_info, blotter_warn};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

/// Column headers of a stored day, in row order.
pub const STORAGE_HEADERS: [&str; 5] = ["Dispatch ID", "URL", "Activity", "Disposition", "Details"];

const DAY_FILE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected contents in {0}")]
    UnexpectedContents(String),
}

/// Where harvested batches end up.
///
/// Batches must be stored in increasing date order; the resume cursor is
/// derived from whatever was stored last.
pub trait StorageGateway {
    /// The newest stored day and the identifiers already stored for it.
    fn resume_cursor(&self) -> Result<ResumeCursor, StorageError>;

    /// Stores the records of `batch` that are not already stored for its day.
    fn store_batch(&self, batch: &RecordBatch) -> Result<(), StorageError>;

    /// Drops old days beyond the retention limit; returns how many went.
    fn prune(&self) -> Result<usize, StorageError> {
        Ok(0)
    }
}

/// One JSON file per day, `YYYY-MM-DD.json`, holding a header row and one
/// row per record.
#[derive(Debug, Clone)]
pub struct JsonDirStorage {
    dir: PathBuf,
    max_days: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct DaySheet {
    date: NaiveDate,
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl JsonDirStorage {
    pub fn new(dir: impl Into<PathBuf>, max_days: usize) -> Self {
        Self {
            dir: dir.into(),
            max_days,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn day_path(&self, day: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.json", day.format(DAY_FILE_FORMAT)))
    }

    /// Stored days, oldest first. Files that are not day files are ignored.
    pub fn stored_days(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut days: Vec<NaiveDate> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?;
                NaiveDate::parse_from_str(stem, DAY_FILE_FORMAT).ok()
            })
            .collect();
        days.sort();
        Ok(days)
    }

    fn read_sheet(&self, day: NaiveDate) -> Result<DaySheet, StorageError> {
        let path = self.day_path(day);
        let sheet: DaySheet = serde_json::from_str(&fs::read_to_string(&path)?)?;
        if sheet.headers.first().map(String::as_str) != Some(STORAGE_HEADERS[0]) {
            return Err(StorageError::UnexpectedContents(path.display().to_string()));
        }
        Ok(sheet)
    }

    fn write_sheet(&self, sheet: &DaySheet) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.day_path(sheet.date);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, sheet)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|err| StorageError::Io(err.error))?;
        Ok(target)
    }
}

impl StorageGateway for JsonDirStorage {
    fn resume_cursor(&self) -> Result<ResumeCursor, StorageError> {
        let Some(&day) = self.stored_days()?.last() else {
            return Ok(ResumeCursor::default());
        };
        let sheet = self.read_sheet(day)?;
        let mut ids = Vec::with_capacity(sheet.rows.len());
        for (index, row) in sheet.rows.iter().enumerate() {
            match row.first().map(cell_to_id) {
                None | Some(CellId::Blank) => break,
                Some(CellId::Id(id)) => ids.push(id),
                Some(CellId::Unexpected) => {
                    // Row 1 is the header row.
                    blotter_warn!("Unexpected value at row {} of {}", index + 2, day);
                }
            }
        }
        blotter_debug!("Resuming from {} with {} known id(s)", day, ids.len());
        Ok(ResumeCursor::new(Some(day), ids))
    }

    fn store_batch(&self, batch: &RecordBatch) -> Result<(), StorageError> {
        let mut sheet = if self.day_path(batch.date).exists() {
            self.read_sheet(batch.date)?
        } else {
            DaySheet {
                date: batch.date,
                headers: STORAGE_HEADERS.iter().map(|h| h.to_string()).collect(),
                rows: Vec::new(),
            }
        };
        let stored: BTreeSet<RecordId> = sheet
            .rows
            .iter()
            .filter_map(|row| match row.first().map(cell_to_id) {
                Some(CellId::Id(id)) => Some(id),
                _ => None,
            })
            .collect();
        let fresh: Vec<&Record> = batch
            .records
            .iter()
            .filter(|record| !stored.contains(&record.id))
            .collect();
        if fresh.len() < batch.len() {
            blotter_debug!(
                "Skipping {} record(s) already stored for {}",
                batch.len() - fresh.len(),
                batch.date
            );
        }
        sheet.rows.extend(fresh.iter().copied().map(record_row));
        let path = self.write_sheet(&sheet)?;
        blotter_info!(
            "Stored {} record(s) for {} in {:?}",
            fresh.len(),
            batch.date,
            path
        );
        Ok(())
    }

    fn prune(&self) -> Result<usize, StorageError> {
        let days = self.stored_days()?;
        let excess = days.len().saturating_sub(self.max_days);
        for day in &days[..excess] {
            fs::remove_file(self.day_path(*day))?;
            blotter_info!("Pruned stored day {}", day);
        }
        Ok(excess)
    }
}

enum CellId {
    Id(RecordId),
    Blank,
    Unexpected,
}

fn cell_to_id(cell: &Value) -> CellId {
    match cell {
        Value::Null => CellId::Blank,
        Value::String(text) if text.trim().is_empty() => CellId::Blank,
        Value::String(text) => text
            .trim()
            .parse()
            .map(CellId::Id)
            .unwrap_or(CellId::Unexpected),
        Value::Number(number) => number.as_u64().map(CellId::Id).unwrap_or(CellId::Unexpected),
        _ => CellId::Unexpected,
    }
}

/// A failed detail fetch stores its error message in the details column.
fn record_row(record: &Record) -> Vec<Value> {
    let details = match (record.failure(), record.details()) {
        (Some(failure), _) => failure.to_string(),
        (None, Some(text)) => text.to_string(),
        (None, None) => String::new(),
    };
    vec![
        json!(record.id),
        json!(record.url.as_str()),
        json!(record.activity.as_deref().unwrap_or("")),
        json!(record.disposition.as_deref().unwrap_or("")),
        json!(details),
    ]
}
