//! Blotter core: record model, exclusion rules and validated settings.
//!
//! Nothing in this crate performs IO; the engine crate drives it.
mod filter;
mod record;
mod settings;

pub use filter::{ExclusionFilter, PatternList};
pub use record::{BadResponse, DetailState, Record, RecordBatch, RecordId, ResumeCursor};
pub use settings::{
    ConfigurationError, FetchSettings, RawSettings, SettingProblem, Settings,
    DEFAULT_ACTIVITY_EXCLUSIONS, DEFAULT_BASE_URL, DEFAULT_DATE_PARAM, DEFAULT_DAY_FORMAT,
    DEFAULT_DETAIL_EXCLUSIONS, DEFAULT_DISPOSITION_EXCLUSIONS, DEFAULT_MAX_DAYS,
};
