//! Blotter engine: fetching, page parsing and the day-by-day sync pipeline.
//!
//! Data flows `synchronize` -> `harvest_day` -> `parse_listing` -> listing
//! filter -> `Session::fetch_many` -> `parse_details` -> detail filter, and
//! the resulting batches go to a [`StorageGateway`].
mod decode;
mod detail;
mod error;
mod fetch;
mod harvest;
mod html;
mod listing;
mod storage;
mod sync;

pub use blotter_core::{
    BadResponse, DetailState, ExclusionFilter, FetchSettings, Record, RecordBatch, RecordId,
    ResumeCursor, Settings,
};
pub use decode::{decode_body, DecodeError};
pub use detail::{parse_details, DETAILS_LABEL};
pub use error::{FetchError, HarvestError, LayoutError, TransportKind};
pub use fetch::{Method, Scraper, Session};
pub use harvest::harvest_day;
pub use listing::{parse_listing, IDENTIFIER_HEADER, REQUIRED_HEADERS};
pub use storage::{JsonDirStorage, StorageError, StorageGateway, STORAGE_HEADERS};
pub use sync::{resume_plan, run_sync, synchronize, ResumePlan, SyncOptions, SyncReport};
