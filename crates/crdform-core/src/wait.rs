//! Wait configuration for create/update and delete
//!
//! Timeouts are humantime strings. `0s` means "check once, never sleep"; a
//! negative timeout such as `-1s` means "wait as long as allowed", which is
//! capped at one week.

use humantime_serde::re::humantime;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::value::Value;

/// Upper bound for negative ("unlimited") timeouts
pub const ONE_WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long a wait loop may keep polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTimeout {
    /// Single check without sleeping
    Once,
    Within(Duration),
}

impl WaitTimeout {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let duration =
            humantime::parse_duration(body).map_err(|e| CoreError::InvalidDuration {
                value: input.to_string(),
                message: e.to_string(),
            })?;

        Ok(if duration.is_zero() {
            // `-0s` is still zero
            WaitTimeout::Once
        } else if negative {
            WaitTimeout::Within(ONE_WEEK)
        } else {
            WaitTimeout::Within(duration)
        })
    }

    /// Total time the loop may spend
    pub fn budget(&self) -> Duration {
        match self {
            WaitTimeout::Once => Duration::ZERO,
            WaitTimeout::Within(d) => *d,
        }
    }
}

impl Default for WaitTimeout {
    fn default() -> Self {
        WaitTimeout::Within(DEFAULT_TIMEOUT)
    }
}

impl std::fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", humantime::format_duration(self.budget()))
    }
}

/// `wait_for_delete` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteWait {
    pub timeout: WaitTimeout,
    pub poll_interval: Duration,
}

impl Default for DeleteWait {
    fn default() -> Self {
        Self {
            timeout: WaitTimeout::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DeleteWait {
    /// Read the block from state. A null block disables waiting.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        if !value.is_known() {
            return Ok(None);
        }
        Ok(Some(Self {
            timeout: timeout_field(value)?,
            poll_interval: poll_interval_field(value)?,
        }))
    }
}

/// One `wait_for_upsert` entry: poll until `jsonpath` renders `value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitCondition {
    pub jsonpath: String,
    pub value: String,
    pub timeout: WaitTimeout,
    pub poll_interval: Duration,
}

impl WaitCondition {
    /// Read the list from state. A null list means no conditions.
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>> {
        let Some(items) = value.as_list() else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .filter(|item| item.is_known())
            .map(|item| {
                let jsonpath = item
                    .get("jsonpath")
                    .as_str()
                    .ok_or_else(|| CoreError::MissingField {
                        field: "wait_for_upsert.jsonpath".to_string(),
                    })?
                    .to_string();
                let expected = item
                    .get("value")
                    .as_str()
                    .ok_or_else(|| CoreError::MissingField {
                        field: "wait_for_upsert.value".to_string(),
                    })?
                    .to_string();
                Ok(Self {
                    jsonpath,
                    value: expected,
                    timeout: timeout_field(item)?,
                    poll_interval: poll_interval_field(item)?,
                })
            })
            .collect()
    }
}

fn timeout_field(block: &Value) -> Result<WaitTimeout> {
    match block.get("timeout").as_str() {
        Some(s) => WaitTimeout::parse(s),
        None => Ok(WaitTimeout::default()),
    }
}

fn poll_interval_field(block: &Value) -> Result<Duration> {
    let Some(s) = block.get("poll_interval").as_str() else {
        return Ok(DEFAULT_POLL_INTERVAL);
    };
    let interval = humantime::parse_duration(s.trim()).map_err(|e| CoreError::InvalidDuration {
        value: s.to_string(),
        message: e.to_string(),
    })?;
    if interval.is_zero() {
        return Err(CoreError::InvalidDuration {
            value: s.to_string(),
            message: "poll interval must be positive".to_string(),
        });
    }
    Ok(interval)
}
