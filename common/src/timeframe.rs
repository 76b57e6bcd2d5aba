//! Timeframe tokens such as `"15m"`, `"4h"` or `"1d"`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeframeError {
    #[error("timeframe token is empty")]
    Empty,
    #[error("timeframe '{0}' has no valid amount")]
    InvalidAmount(String),
    #[error("timeframe '{token}' has unknown unit '{unit}' (expected m, h, d or w)")]
    InvalidUnit { token: String, unit: String },
}

/// Fixed-length recurring interval parsed from a textual token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    token: String,
    millis: i64,
}

impl Timeframe {
    /// Convenience constructor; a zero amount is clamped to one minute.
    pub fn minutes(amount: u32) -> Self {
        let amount = amount.max(1);
        Self {
            token: format!("{}m", amount),
            millis: i64::from(amount) * 60_000,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn as_millis(&self) -> i64 {
        self.millis
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis as u64)
    }

    /// Start of the epoch-aligned window containing `epoch_millis`
    pub fn window_start(&self, epoch_millis: i64) -> i64 {
        epoch_millis.div_euclid(self.millis) * self.millis
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            return Err(TimeframeError::Empty);
        }

        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len());
        let (amount, unit) = token.split_at(split);

        let amount: i64 = amount
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| TimeframeError::InvalidAmount(token.to_string()))?;

        let unit_millis = match unit {
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            "w" => 7 * 86_400_000,
            _ => {
                return Err(TimeframeError::InvalidUnit {
                    token: token.to_string(),
                    unit: unit.to_string(),
                })
            }
        };

        let millis = amount
            .checked_mul(unit_millis)
            .ok_or_else(|| TimeframeError::InvalidAmount(token.to_string()))?;

        Ok(Self {
            token: token.to_string(),
            millis,
        })
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.token
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!("1m".parse::<Timeframe>().unwrap().as_millis(), 60_000);
        assert_eq!("15m".parse::<Timeframe>().unwrap().as_millis(), 900_000);
        assert_eq!("4h".parse::<Timeframe>().unwrap().as_millis(), 14_400_000);
        assert_eq!("1d".parse::<Timeframe>().unwrap().as_millis(), 86_400_000);
        assert_eq!(
            "15m".parse::<Timeframe>().unwrap().as_duration(),
            Duration::from_secs(900)
        );
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert_eq!("".parse::<Timeframe>(), Err(TimeframeError::Empty));
        assert!(matches!(
            "m".parse::<Timeframe>(),
            Err(TimeframeError::InvalidAmount(_))
        ));
        assert!(matches!(
            "0m".parse::<Timeframe>(),
            Err(TimeframeError::InvalidAmount(_))
        ));
        assert!(matches!(
            "15x".parse::<Timeframe>(),
            Err(TimeframeError::InvalidUnit { .. })
        ));
    }

    #[test]
    fn test_window_alignment() {
        let tf: Timeframe = "15m".parse().unwrap();
        let boundary = 1_700_000_100_000_i64 / 900_000 * 900_000;

        assert_eq!(tf.window_start(boundary), boundary);
        assert_eq!(tf.window_start(boundary + 1), boundary);
        assert_eq!(tf.window_start(boundary + 899_999), boundary);
        assert_eq!(tf.window_start(boundary + 900_000), boundary + 900_000);
        assert_eq!(tf.window_start(-1), -900_000);
    }

    #[test]
    fn test_serde_as_token() {
        let tf: Timeframe = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(tf.token(), "4h");
        assert_eq!(serde_json::to_string(&tf).unwrap(), "\"4h\"");
        assert!(serde_json::from_str::<Timeframe>("\"4y\"").is_err());
    }
}
