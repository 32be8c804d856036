use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::settings::{ConfigurationError, SettingProblem};
use crate::{DetailState, Record};

/// Which exclusion list a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternList {
    Activities,
    Dispositions,
    Details,
}

impl PatternList {
    pub fn setting_name(self) -> &'static str {
        match self {
            PatternList::Activities => "activity_exclusions",
            PatternList::Dispositions => "disposition_exclusions",
            PatternList::Details => "detail_exclusions",
        }
    }
}

impl fmt::Display for PatternList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.setting_name())
    }
}

/// Two-stage exclusion rules.
///
/// The listing stage looks at the details flag, activity and disposition.
/// The detail stage only looks at the detail text. Every pattern is an
/// unanchored, case-insensitive regular expression.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    activities: Vec<Regex>,
    dispositions: Vec<Regex>,
    details: Vec<Regex>,
}

impl ExclusionFilter {
    /// Compiles all three lists, reporting every bad pattern at once.
    pub fn from_patterns<S: AsRef<str>>(
        activities: &[S],
        dispositions: &[S],
        details: &[S],
    ) -> Result<Self, ConfigurationError> {
        let mut problems = Vec::new();
        let filter = Self::compile(activities, dispositions, details, &mut problems);
        if problems.is_empty() {
            Ok(filter)
        } else {
            Err(ConfigurationError::Invalid { problems })
        }
    }

    pub(crate) fn compile<S: AsRef<str>>(
        activities: &[S],
        dispositions: &[S],
        details: &[S],
        problems: &mut Vec<SettingProblem>,
    ) -> Self {
        Self {
            activities: compile_list(PatternList::Activities, activities, problems),
            dispositions: compile_list(PatternList::Dispositions, dispositions, problems),
            details: compile_list(PatternList::Details, details, problems),
        }
    }

    /// Listing-stage decision, made before any detail page is fetched.
    pub fn excludes_listing(&self, record: &Record) -> bool {
        if !record.has_details {
            return true;
        }
        any_match(&self.activities, record.activity.as_deref())
            || any_match(&self.dispositions, record.disposition.as_deref())
    }

    /// Detail-stage decision. Empty detail text is always kept.
    pub fn excludes_details(&self, details: &str) -> bool {
        !details.is_empty() && any_match(&self.details, Some(details))
    }

    /// Decision for a record in whatever state it is in.
    ///
    /// Pending records get the listing stage; enriched records get the detail
    /// stage only, since their activity and disposition were already checked.
    /// Records whose detail fetch failed are kept.
    pub fn excludes(&self, record: &Record) -> bool {
        if !record.has_details {
            return true;
        }
        match &record.detail {
            DetailState::Pending => self.excludes_listing(record),
            DetailState::Text(text) => self.excludes_details(text),
            DetailState::Failed(_) => false,
        }
    }

    pub fn pattern_count(&self, list: PatternList) -> usize {
        match list {
            PatternList::Activities => self.activities.len(),
            PatternList::Dispositions => self.dispositions.len(),
            PatternList::Details => self.details.len(),
        }
    }
}

fn compile_list<S: AsRef<str>>(
    list: PatternList,
    patterns: &[S],
    problems: &mut Vec<SettingProblem>,
) -> Vec<Regex> {
    patterns
        .iter()
        .enumerate()
        .filter_map(|(index, pattern)| {
            let pattern = pattern.as_ref();
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(regex) => Some(regex),
                Err(err) => {
                    problems.push(SettingProblem::new(
                        format!("{list}[{index}]"),
                        format!("error parsing regular expression '{pattern}': {err}"),
                    ));
                    None
                }
            }
        })
        .collect()
}

fn any_match(patterns: &[Regex], text: Option<&str>) -> bool {
    let text = text.unwrap_or("");
    patterns.iter().any(|pattern| pattern.is_match(text))
}
