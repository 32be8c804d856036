use std::collections::BTreeSet;

use blotter_core::{RecordBatch, RecordId, ResumeCursor, Settings};
use blotter_logging::{blotter_debug, blotter_info};
use chrono::{Local, NaiveDate};

use crate::error::HarvestError;
use crate::fetch::Scraper;
use crate::harvest::harvest_day;
use crate::storage::StorageGateway;

/// Harvests every day from `from` through `through` (today if `None`),
/// oldest first, over one shared HTTP session.
///
/// `skip_ids` only applies to the first day, which is the day the previous
/// run stopped on. A start after the end yields no batches. The first failing
/// day aborts the range and nothing is returned for the days before it.
pub async fn synchronize(
    scraper: &Scraper,
    settings: &Settings,
    from: NaiveDate,
    through: Option<NaiveDate>,
    skip_ids: &BTreeSet<RecordId>,
) -> Result<Vec<RecordBatch>, HarvestError> {
    let through = through.unwrap_or_else(today);
    if from > through {
        blotter_debug!("Nothing to harvest: {} is after {}", from, through);
        return Ok(Vec::new());
    }

    let session = scraper.session()?;
    let mut skip_ids = Some(skip_ids);
    let mut batches = Vec::new();
    for day in from.iter_days().take_while(|day| *day <= through) {
        let batch = harvest_day(&session, settings, day, skip_ids.take()).await?;
        blotter_info!("Harvested {} record(s) for {}", batch.len(), day);
        batches.push(batch);
    }
    Ok(batches)
}

/// First day to harvest and the ids to skip on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePlan {
    pub start: NaiveDate,
    pub skip_ids: BTreeSet<RecordId>,
}

/// Works out where a run starts.
///
/// An explicit `from` wins; it only inherits the cursor's ids when it is the
/// cursor's own day. Without `from` the run resumes on the cursor day, or
/// starts at `today` when nothing has been stored yet.
pub fn resume_plan(cursor: &ResumeCursor, from: Option<NaiveDate>, today: NaiveDate) -> ResumePlan {
    let start = from.or(cursor.last_day).unwrap_or(today);
    let skip_ids = if cursor.last_day == Some(start) {
        cursor.known_ids.clone()
    } else {
        BTreeSet::new()
    };
    ResumePlan { start, skip_ids }
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub from: Option<NaiveDate>,
    pub through: Option<NaiveDate>,
    /// Harvest without storing or pruning.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub plan: ResumePlan,
    pub batches: Vec<RecordBatch>,
    pub stored: bool,
    pub pruned: usize,
}

impl SyncReport {
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(RecordBatch::len).sum()
    }
}

/// One full run: read the cursor, harvest the range, store each batch in
/// date order, prune.
///
/// Nothing is stored unless the whole range was harvested, so a failed run
/// leaves the cursor where it was and can simply be repeated.
pub async fn run_sync(
    scraper: &Scraper,
    settings: &Settings,
    storage: &dyn StorageGateway,
    options: SyncOptions,
) -> Result<SyncReport, HarvestError> {
    let cursor = storage.resume_cursor()?;
    let plan = resume_plan(&cursor, options.from, today());
    blotter_info!(
        "Starting at {} skipping {} known id(s)",
        plan.start,
        plan.skip_ids.len()
    );

    let batches = synchronize(scraper, settings, plan.start, options.through, &plan.skip_ids).await?;
    if options.dry_run {
        return Ok(SyncReport {
            plan,
            batches,
            stored: false,
            pruned: 0,
        });
    }

    for batch in &batches {
        storage.store_batch(batch)?;
    }
    let pruned = storage.prune()?;
    Ok(SyncReport {
        plan,
        batches,
        stored: true,
        pruned,
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
