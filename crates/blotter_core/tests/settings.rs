use std::path::PathBuf;
use std::time::Duration;

use blotter_core::{
    ConfigurationError, FetchSettings, RawSettings, Settings, DEFAULT_BASE_URL, DEFAULT_MAX_DAYS,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).unwrap();
    assert_eq!(settings.base_url.as_str(), DEFAULT_BASE_URL);
    assert_eq!(settings.date_param, "activityDate");
    assert_eq!(settings.fetch, FetchSettings::default());
    assert_eq!(settings.storage_dir, PathBuf::from("data"));
    assert_eq!(settings.max_days, DEFAULT_MAX_DAYS);
}

#[test]
fn default_day_format_is_not_zero_padded() {
    let settings = Settings::from_raw(RawSettings::default()).unwrap();
    let day = NaiveDate::from_ymd_opt(2023, 7, 4).unwrap();
    assert_eq!(settings.format_day(day), "7/4/2023");
}

#[test]
fn overrides_are_applied() {
    let raw = RawSettings {
        base_url: Some("http://test/police/log".to_string()),
        day_format: Some("%Y-%m-%d".to_string()),
        request_timeout_secs: Some(3),
        max_days: Some(2),
        ..RawSettings::default()
    };
    let settings = Settings::from_raw(raw).unwrap();
    let day = NaiveDate::from_ymd_opt(2023, 2, 15).unwrap();
    assert_eq!(settings.format_day(day), "2023-02-15");
    assert_eq!(settings.fetch.request_timeout, Duration::from_secs(3));
    assert_eq!(settings.max_days, 2);
}

#[test]
fn every_problem_is_named() {
    let raw = RawSettings {
        base_url: Some("not a url".to_string()),
        day_format: Some("%Q".to_string()),
        date_param: Some(" ".to_string()),
        activity_exclusions: Some(vec!["(unclosed".to_string()]),
        connect_timeout_secs: Some(0),
        max_days: Some(0),
        ..RawSettings::default()
    };
    let err = Settings::from_raw(raw).unwrap_err();
    assert_eq!(
        err.fields(),
        vec![
            "base_url",
            "day_format",
            "date_param",
            "activity_exclusions[0]",
            "connect_timeout_secs",
            "max_days",
        ]
    );
    let message = err.to_string();
    assert!(message.starts_with("invalid settings: base_url:"), "{message}");
    assert!(message.contains("(unclosed"), "{message}");
}

#[test]
fn non_http_base_url_is_rejected() {
    let raw = RawSettings {
        base_url: Some("ftp://example.com/log".to_string()),
        ..RawSettings::default()
    };
    match Settings::from_raw(raw) {
        Err(ConfigurationError::Invalid { problems }) => {
            assert_eq!(problems.len(), 1);
            assert_eq!(problems[0].field, "base_url");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
