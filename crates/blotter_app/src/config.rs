//! Settings file loading.
//!
//! The file is a RON map of [`RawSettings`] fields; anything left out keeps
//! its default. Without a file every default applies.

use std::fs;
use std::path::Path;

use blotter_core::{ConfigurationError, RawSettings, Settings};
use blotter_logging::blotter_info;

pub(crate) fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigurationError> {
    let raw = match path {
        Some(path) => read_raw(path)?,
        None => RawSettings::default(),
    };
    Settings::from_raw(raw)
}

fn read_raw(path: &Path) -> Result<RawSettings, ConfigurationError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = ron::from_str(&content).map_err(|err| ConfigurationError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    blotter_info!("Loaded settings from {:?}", path);
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use blotter_core::{PatternList, DEFAULT_DETAIL_EXCLUSIONS};
    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("blotter.ron");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn no_file_means_defaults() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.date_param, "activityDate");
        assert_eq!(settings.max_days, 20);
    }

    #[test]
    fn file_overrides_selected_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"(
                base_url: Some("http://localhost:8080/log"),
                activity_exclusions: Some(["^TEST"]),
                max_days: Some(3),
            )"#,
        );
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.base_url.as_str(), "http://localhost:8080/log");
        assert_eq!(settings.max_days, 3);
        assert_eq!(settings.filter.pattern_count(PatternList::Activities), 1);
        assert_eq!(
            settings.filter.pattern_count(PatternList::Details),
            DEFAULT_DETAIL_EXCLUSIONS.len()
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&dir.path().join("absent.ron"))).unwrap_err();
        assert!(matches!(err, ConfigurationError::Read { .. }));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "(colour: Some(\"blue\"))");
        let err = load_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
    }

    #[test]
    fn invalid_values_name_their_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "(max_days: Some(0), date_param: Some(\"\"))");
        let err = load_settings(Some(&path)).unwrap_err();
        assert_eq!(err.fields(), vec!["date_param", "max_days"]);
    }
}
