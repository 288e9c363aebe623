//! Configuration module for environment variable parsing.
//!
//! All settings come from `DRAG_*` environment variables and are read exactly
//! once at startup. Nothing here changes after [`Config::from_env`] returns.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Port the webhook listener binds to.
pub const DEFAULT_PORT: u16 = 1291;

pub const SECRET_VAR: &str = "DRAG_SECRET";
pub const COMMAND_VAR: &str = "DRAG_COMMAND";
pub const INIT_VAR: &str = "DRAG_INIT";
pub const INTERVAL_VAR: &str = "DRAG_INTERVAL";

/// Errors that abort startup before any socket is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("both DRAG_SECRET and DRAG_COMMAND environment variables needed (missing {0})")]
    Missing(&'static str),

    #[error("invalid {var} value {value:?}: {reason}")]
    InvalidInterval {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for both the GitLab token and the GitHub HMAC scheme
    pub secret: String,

    /// Shell command run on every trigger
    pub command: String,

    /// Shell command run once at startup, before the process split
    pub init_command: Option<String>,

    /// Poller period; `None` disables the poller
    pub interval: Option<Duration>,

    /// Port for the webhook listener
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = required(&lookup, SECRET_VAR)?;
        let command = required(&lookup, COMMAND_VAR)?;

        let init_command = lookup(INIT_VAR).filter(|v| !v.trim().is_empty());

        let interval = match lookup(INTERVAL_VAR) {
            Some(raw) if !raw.trim().is_empty() => {
                let interval =
                    parse_interval(&raw).map_err(|reason| ConfigError::InvalidInterval {
                        var: INTERVAL_VAR,
                        value: raw.clone(),
                        reason,
                    })?;
                Some(interval)
            }
            _ => None,
        };

        Ok(Config {
            secret,
            command,
            init_command,
            interval,
            port: DEFAULT_PORT,
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Parse a human-readable duration like `"90"`, `"3s"`, `"1h30m"` or `"2 days"`.
///
/// A bare number means seconds. Terms may be separated by whitespace or commas
/// and are summed. A zero total is rejected since the poller would spin.
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    if let Ok(secs) = s.parse::<u64>() {
        return nonzero(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        // Find the boundary between digits and suffix.
        let idx = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if idx == 0 {
            return Err(format!("expected a number at '{}'", rest));
        }
        let (num_part, tail) = rest.split_at(idx);
        let value: u64 = num_part
            .parse()
            .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

        let tail = tail.trim_start();
        let unit_len = tail
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        let (unit, after) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(format!("duration '{}' missing unit suffix", num_part));
        }

        let term = unit_duration(&unit.to_lowercase(), value)?;
        total = total
            .checked_add(term)
            .ok_or_else(|| "duration overflows".to_string())?;
        rest = after;
    }

    nonzero(total)
}

fn unit_duration(unit: &str, value: u64) -> Result<Duration, String> {
    let secs_per = match unit {
        "ms" | "msec" | "msecs" | "millis" | "millisecond" | "milliseconds" => {
            return Ok(Duration::from_millis(value))
        }
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60 * 60,
        "d" | "day" | "days" => 24 * 60 * 60,
        "w" | "wk" | "wks" | "week" | "weeks" => 7 * 24 * 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, h, d or w",
                unit
            ))
        }
    };

    value
        .checked_mul(secs_per)
        .map(Duration::from_secs)
        .ok_or_else(|| "duration overflows".to_string())
}

fn nonzero(d: Duration) -> Result<Duration, String> {
    if d.is_zero() {
        Err("interval must be greater than zero".to_string())
    } else {
        Ok(d)
    }
}
