use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::Retention;
use crate::error::ConfigError;
use crate::query::SortOrder;

/// Dashboard settings. Every field has a default so a config file only needs to name the values
/// it changes.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub tick_ms: u64,
    pub row_height: f64,
    pub viewport_height: f64,
    pub retention: Retention,
    pub amount_min: f64,
    pub amount_max: f64,
    /// Initial filter text.
    pub threshold: String,
    pub sort: SortOrder,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            row_height: 1.0,
            viewport_height: 20.0,
            retention: Retention::Unbounded,
            amount_min: 0.0,
            amount_max: 1000.0,
            threshold: String::new(),
            sort: SortOrder::None,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_to_string(path).map_err(|source| ConfigError::Io { source })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(contents).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "tick_ms must be greater than zero".to_string(),
            });
        }
        if !(self.amount_min < self.amount_max) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "amount range {}..{} is empty",
                    self.amount_min, self.amount_max
                ),
            });
        }
        if let Retention::MaxRecords(0) = self.retention {
            return Err(ConfigError::Invalid {
                reason: "max_records retention must keep at least one record".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DashboardConfig;
    use crate::buffer::Retention;
    use crate::error::ConfigError;
    use crate::query::SortOrder;

    #[test]
    fn test_that_missing_fields_take_defaults() {
        let config = DashboardConfig::from_json(r#"{ "tick_ms": 50 }"#).unwrap();
        assert!(config.tick_ms == 50);
        assert!(config.row_height == 1.0);
        assert!(config.retention == Retention::Unbounded);
    }

    #[test]
    fn test_that_retention_and_sort_parse_from_json() {
        let config = DashboardConfig::from_json(
            r#"{ "retention": { "max_records": 500 }, "sort": "descending", "threshold": "250" }"#,
        )
        .unwrap();
        assert!(config.retention == Retention::MaxRecords(500));
        assert!(config.sort == SortOrder::Descending);
        assert!(config.threshold == "250");
    }

    #[test]
    fn test_that_invalid_values_are_rejected() {
        let zero_tick = DashboardConfig::from_json(r#"{ "tick_ms": 0 }"#);
        assert!(matches!(zero_tick, Err(ConfigError::Invalid { .. })));

        let empty_range = DashboardConfig::from_json(r#"{ "amount_min": 5, "amount_max": 5 }"#);
        assert!(matches!(empty_range, Err(ConfigError::Invalid { .. })));

        let garbage = DashboardConfig::from_json("not json");
        assert!(matches!(garbage, Err(ConfigError::Parse { .. })));
    }
}
