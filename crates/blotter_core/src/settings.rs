use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;

use crate::ExclusionFilter;

pub const DEFAULT_BASE_URL: &str = "https://www.iowa-city.org/IcgovApps/police/ActivityLog";
/// Non-padded month and day, four digit year: `7/4/2023`.
pub const DEFAULT_DAY_FORMAT: &str = "%-m/%-d/%Y";
pub const DEFAULT_DATE_PARAM: &str = "activityDate";
pub const DEFAULT_MAX_DAYS: usize = 20;

pub const DEFAULT_ACTIVITY_EXCLUSIONS: &[&str] = &[
    "MVA/PROPERTY DAMAGE ACCIDENT",
    "911 HANGUP",
    "SUICIDE/LAW",
    "TR/PARKING",
    "ESCORT/RELAY",
    "ALARM/PANIC/HOLDUP",
    "MENTAL IMPAIRMENT",
    "TRAFFIC STOP",
    "MISSING/JUVENILE",
    "WELFARE CHECK",
    "PAPER SERVICE/WARRANT",
    "^Z",
    "^TEST",
];

pub const DEFAULT_DISPOSITION_EXCLUSIONS: &[&str] = &["(EMPL ERROR|UNK CAUSE) ALARM"];

pub const DEFAULT_DETAIL_EXCLUSIONS: &[&str] = &[
    "CREATED FROM MOBILE",
    "CFS",
    "MILEAGE REPORT",
    "OLN/",
    "SOC/",
    "DOB/",
    "^EVE?NT",
    "^REF AMB",
    "^REQ CERT",
    "^FRONT DESK RELIEF",
    "^TYPE OF CALL CHANGED",
    "^SCHEDULED FOR",
    r"^\*+PRIVATE",
];

/// HTTP client limits shared by every request of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Settings as written in a settings file. Every field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawSettings {
    pub base_url: Option<String>,
    pub day_format: Option<String>,
    pub date_param: Option<String>,
    pub activity_exclusions: Option<Vec<String>>,
    pub disposition_exclusions: Option<Vec<String>>,
    pub detail_exclusions: Option<Vec<String>>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub redirect_limit: Option<usize>,
    pub max_body_bytes: Option<u64>,
    pub storage_dir: Option<PathBuf>,
    /// `None` in the file means the default; it cannot disable pruning.
    pub max_days: Option<usize>,
}

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingProblem {
    pub field: String,
    pub message: String,
}

impl SettingProblem {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SettingProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid settings: {}", join_problems(.problems))]
    Invalid { problems: Vec<SettingProblem> },
    #[error("could not read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse settings file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ConfigurationError {
    /// Names of the offending fields, empty for read and parse failures.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ConfigurationError::Invalid { problems } => {
                problems.iter().map(|p| p.field.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_problems(problems: &[SettingProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validated settings for a harvesting run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Url,
    pub day_format: String,
    pub date_param: String,
    pub filter: ExclusionFilter,
    pub fetch: FetchSettings,
    pub storage_dir: PathBuf,
    pub max_days: usize,
}

impl Settings {
    /// Validates every field and fails with the complete list of problems.
    pub fn from_raw(raw: RawSettings) -> Result<Self, ConfigurationError> {
        let mut problems = Vec::new();

        let base_url_text = raw.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = match Url::parse(base_url_text) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            Ok(url) => {
                problems.push(SettingProblem::new(
                    "base_url",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
                None
            }
            Err(err) => {
                problems.push(SettingProblem::new(
                    "base_url",
                    format!("'{base_url_text}' is not an absolute URL: {err}"),
                ));
                None
            }
        };

        let day_format = raw
            .day_format
            .unwrap_or_else(|| DEFAULT_DAY_FORMAT.to_string());
        if let Err(message) = check_day_format(&day_format) {
            problems.push(SettingProblem::new("day_format", message));
        }

        let date_param = raw
            .date_param
            .unwrap_or_else(|| DEFAULT_DATE_PARAM.to_string());
        if date_param.trim().is_empty() {
            problems.push(SettingProblem::new("date_param", "must not be empty"));
        }

        let activities = raw
            .activity_exclusions
            .unwrap_or_else(|| to_owned_list(DEFAULT_ACTIVITY_EXCLUSIONS));
        let dispositions = raw
            .disposition_exclusions
            .unwrap_or_else(|| to_owned_list(DEFAULT_DISPOSITION_EXCLUSIONS));
        let details = raw
            .detail_exclusions
            .unwrap_or_else(|| to_owned_list(DEFAULT_DETAIL_EXCLUSIONS));
        let filter = ExclusionFilter::compile(&activities, &dispositions, &details, &mut problems);

        let defaults = FetchSettings::default();
        let connect_timeout = positive_secs(
            "connect_timeout_secs",
            raw.connect_timeout_secs,
            defaults.connect_timeout,
            &mut problems,
        );
        let request_timeout = positive_secs(
            "request_timeout_secs",
            raw.request_timeout_secs,
            defaults.request_timeout,
            &mut problems,
        );
        let max_bytes = raw.max_body_bytes.unwrap_or(defaults.max_bytes);
        if max_bytes == 0 {
            problems.push(SettingProblem::new("max_body_bytes", "must be at least 1"));
        }
        let fetch = FetchSettings {
            connect_timeout,
            request_timeout,
            redirect_limit: raw.redirect_limit.unwrap_or(defaults.redirect_limit),
            max_bytes,
        };

        let storage_dir = raw.storage_dir.unwrap_or_else(|| PathBuf::from("data"));
        if storage_dir.as_os_str().is_empty() {
            problems.push(SettingProblem::new("storage_dir", "must not be empty"));
        }

        let max_days = raw.max_days.unwrap_or(DEFAULT_MAX_DAYS);
        if max_days == 0 {
            problems.push(SettingProblem::new("max_days", "must be at least 1"));
        }

        match base_url {
            Some(base_url) if problems.is_empty() => Ok(Self {
                base_url,
                day_format,
                date_param,
                filter,
                fetch,
                storage_dir,
                max_days,
            }),
            _ => Err(ConfigurationError::Invalid { problems }),
        }
    }

    /// Renders a day the way the listing page expects it in its query string.
    pub fn format_day(&self, day: NaiveDate) -> String {
        day.format(&self.day_format).to_string()
    }
}

fn check_day_format(format: &str) -> Result<(), String> {
    if format.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("'{format}' is not a valid date format"));
    }
    Ok(())
}

fn positive_secs(
    field: &str,
    value: Option<u64>,
    default: Duration,
    problems: &mut Vec<SettingProblem>,
) -> Duration {
    match value {
        Some(0) => {
            problems.push(SettingProblem::new(field, "must be at least 1 second"));
            default
        }
        Some(secs) => Duration::from_secs(secs),
        None => default,
    }
}

fn to_owned_list(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}
