use crate::error::RosterError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The three knobs that shape the model. Model weights are constants in
/// [`crate::model`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterConfig {
    /// Ceiling on assigned hours per person.
    #[serde(default = "default_max_hours")]
    pub max_hours: f64,
    /// Non-Sunday available hours a person needs before any Sunday shift.
    #[serde(default = "default_sunday_quota")]
    pub sunday_quota: f64,
    /// Wall-clock budget handed to the solving engine.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: f64,
}

fn default_max_hours() -> f64 {
    100.0
}

fn default_sunday_quota() -> f64 {
    20.0
}

fn default_time_limit_secs() -> f64 {
    30.0
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            max_hours: default_max_hours(),
            sunday_quota: default_sunday_quota(),
            time_limit_secs: default_time_limit_secs(),
        }
    }
}

/// Optional per-field replacements, from CLI flags or a request's config
/// block. Absent fields leave the underlying value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    pub max_hours: Option<f64>,
    pub sunday_quota: Option<f64>,
    pub time_limit_secs: Option<f64>,
}

impl From<RosterConfig> for ConfigOverrides {
    fn from(config: RosterConfig) -> Self {
        Self {
            max_hours: Some(config.max_hours),
            sunday_quota: Some(config.sunday_quota),
            time_limit_secs: Some(config.time_limit_secs),
        }
    }
}

impl RosterConfig {
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(value) = overrides.max_hours {
            self.max_hours = value;
        }
        if let Some(value) = overrides.sunday_quota {
            self.sunday_quota = value;
        }
        if let Some(value) = overrides.time_limit_secs {
            self.time_limit_secs = value;
        }
        self
    }

    pub fn validate(&self) -> Result<(), RosterError> {
        for (name, value) in [
            ("maxHours", self.max_hours),
            ("sundayQuota", self.sunday_quota),
            ("timeLimitSecs", self.time_limit_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RosterError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        if self.time_limit_secs == 0.0 {
            return Err(RosterError::InvalidConfig(
                "timeLimitSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.time_limit_secs)
    }
}
