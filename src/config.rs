//! Compiler configuration.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::DateTimeFormat;

/// Fixed date/time patterns. The year must have four digits and may not start
/// with zero; offsets are `±hh:mm` or `Z`.
pub const DATE_TIME_PATTERN: &str = r"[1-9]\d{3}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}([+-]\d{2}:\d{2}|Z)";
pub const DATE_PATTERN: &str = r"[1-9]\d{3}-\d{2}-\d{2}";
pub const TIME_PATTERN: &str = r"\d{2}:\d{2}:\d{2}([+-]\d{2}:\d{2}|Z)";

/// How `minimum: 0` / `maximum: 0` are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroBoundPolicy {
    /// A bound of exactly zero counts as absent. This deviates from JSON
    /// Schema and is the default for compatibility with existing forms.
    #[default]
    Ignore,
    /// Zero is a bound like any other.
    Honor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuilderConfig {
    /// Regex source per date/time format name (`date-time`, `date`, `time`).
    /// Names missing from the map attach no format validator.
    pub formats: BTreeMap<String, String>,
    pub zero_bounds: ZeroBoundPolicy,
    /// Attach the integer/decimal text pattern to numeric leaves.
    pub numeric_format_validators: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        let formats = [
            (DateTimeFormat::DateTime, DATE_TIME_PATTERN),
            (DateTimeFormat::Date, DATE_PATTERN),
            (DateTimeFormat::Time, TIME_PATTERN),
        ]
        .into_iter()
        .map(|(format, pattern)| (format.name().to_string(), pattern.to_string()))
        .collect();
        Self {
            formats,
            zero_bounds: ZeroBoundPolicy::default(),
            numeric_format_validators: true,
        }
    }
}

impl BuilderConfig {
    pub fn format_pattern(&self, format: DateTimeFormat) -> Option<&str> {
        self.formats.get(format.name()).map(String::as_str)
    }

    /// Returns the bound if the policy says it is present.
    pub fn effective_bound(&self, bound: Option<f64>) -> Option<f64> {
        match (bound, self.zero_bounds) {
            (Some(b), ZeroBoundPolicy::Ignore) if b == 0.0 => None,
            (b, _) => b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_date_time_formats() {
        let config = BuilderConfig::default();
        assert_eq!(config.format_pattern(DateTimeFormat::Date), Some(DATE_PATTERN));
        assert_eq!(config.format_pattern(DateTimeFormat::Time), Some(TIME_PATTERN));
        assert_eq!(config.format_pattern(DateTimeFormat::DateTime), Some(DATE_TIME_PATTERN));
    }

    #[test]
    fn zero_bounds_policy() {
        let mut config = BuilderConfig::default();
        assert_eq!(config.effective_bound(Some(0.0)), None);
        assert_eq!(config.effective_bound(Some(3.0)), Some(3.0));
        config.zero_bounds = ZeroBoundPolicy::Honor;
        assert_eq!(config.effective_bound(Some(0.0)), Some(0.0));
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let config: BuilderConfig = serde_json::from_str(r#"{ "zero-bounds": "honor" }"#).unwrap();
        assert_eq!(config.zero_bounds, ZeroBoundPolicy::Honor);
        assert!(config.numeric_format_validators);
        assert_eq!(config.formats.len(), 3);
    }
}
