use std::collections::BTreeSet;

use chrono::NaiveDate;
use url::Url;

/// Dispatch number of a listing row; unique within one day.
pub type RecordId = u64;

/// A detail page answered with an HTTP error status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{method} request to {url} failed with response {status}")]
pub struct BadResponse {
    /// Upper-case request method, e.g. `GET`.
    pub method: String,
    pub url: String,
    pub status: u16,
}

impl BadResponse {
    pub fn new(method: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            status,
        }
    }
}

/// Enrichment state of a record.
///
/// A record leaves the parser `Pending` and is enriched exactly once, after
/// which it holds either the detail text or the failure, never both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailState {
    #[default]
    Pending,
    /// Trimmed text of the details field. May be empty.
    Text(String),
    Failed(BadResponse),
}

/// One row of the daily listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    /// Detail page, resolved against the listing URL.
    pub url: Url,
    pub activity: Option<String>,
    pub disposition: Option<String>,
    pub has_details: bool,
    pub detail: DetailState,
}

impl Record {
    pub fn new(
        id: RecordId,
        url: Url,
        activity: Option<String>,
        disposition: Option<String>,
        has_details: bool,
    ) -> Self {
        Self {
            id,
            url,
            activity,
            disposition,
            has_details,
            detail: DetailState::Pending,
        }
    }

    /// Consumes a pending record and attaches the outcome of its detail fetch.
    pub fn enriched(self, outcome: Result<String, BadResponse>) -> Self {
        debug_assert!(
            self.is_pending(),
            "record {} enriched twice",
            self.id
        );
        let detail = match outcome {
            Ok(text) => DetailState::Text(text),
            Err(failure) => DetailState::Failed(failure),
        };
        Self { detail, ..self }
    }

    pub fn details(&self) -> Option<&str> {
        match &self.detail {
            DetailState::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&BadResponse> {
        match &self.detail {
            DetailState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.detail == DetailState::Pending
    }
}

/// Surviving records of one calendar day, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    pub date: NaiveDate,
    pub records: Vec<Record>,
}

impl RecordBatch {
    pub fn new(date: NaiveDate, records: Vec<Record>) -> Self {
        Self { date, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records.iter().map(|record| record.id)
    }
}

/// Where the previous run stopped: the newest persisted day and the
/// identifiers already stored for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResumeCursor {
    pub last_day: Option<NaiveDate>,
    pub known_ids: BTreeSet<RecordId>,
}

impl ResumeCursor {
    pub fn new(last_day: Option<NaiveDate>, known_ids: impl IntoIterator<Item = RecordId>) -> Self {
        Self {
            last_day,
            known_ids: known_ids.into_iter().collect(),
        }
    }
}
