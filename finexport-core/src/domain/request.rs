//! Export invocation payload

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use super::result::{Error, Result};

/// Lookback used when the payload does not set one
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Raw invocation event, as received from the scheduler or CLI
#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(default)]
    public_tokens: Option<Map<String, JsonValue>>,
    #[serde(default)]
    transaction_lookback_days: Option<JsonValue>,
}

/// One export invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// (alias, public token) pairs in payload order
    pub tokens: Vec<(String, String)>,
    pub lookback_days: u32,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl ExportRequest {
    pub fn new(tokens: Vec<(String, String)>, lookback_days: u32) -> Self {
        Self {
            tokens,
            lookback_days,
        }
    }

    /// Parse the `{public_tokens, transaction_lookback_days}` payload
    ///
    /// Null or empty token values are kept as aliases but treated as absent
    /// by the exporter. Lookback may be an integer or an integer string.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: JsonValue) -> Result<Self> {
        let raw: RawEvent = serde_json::from_value(value)?;

        let mut tokens = Vec::new();
        for (alias, token) in raw.public_tokens.unwrap_or_default() {
            let token = match token {
                JsonValue::Null => String::new(),
                JsonValue::String(s) => s,
                other => {
                    return Err(Error::validation(format!(
                        "public token for '{}' must be a string, got {}",
                        alias, other
                    )))
                }
            };
            tokens.push((alias, token));
        }

        let lookback_days = match raw.transaction_lookback_days {
            None | Some(JsonValue::Null) => DEFAULT_LOOKBACK_DAYS,
            Some(value) => parse_lookback(&value)?,
        };

        Ok(Self {
            tokens,
            lookback_days,
        })
    }

    /// Token for an alias, if one was supplied and is non-empty
    pub fn token_for(&self, alias: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, t)| t.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Aliases exactly as supplied, in payload order
    pub fn aliases(&self) -> Vec<String> {
        self.tokens.iter().map(|(a, _)| a.clone()).collect()
    }
}

fn parse_lookback(value: &JsonValue) -> Result<u32> {
    let parsed = match value {
        // Whole floats such as 7.0 are accepted, fractional ones are not
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let days = parsed.ok_or_else(|| {
        Error::validation(format!(
            "transaction_lookback_days must be an integer, got {}",
            value
        ))
    })?;
    u32::try_from(days).map_err(|_| {
        Error::validation(format!(
            "transaction_lookback_days must be between 0 and {}, got {}",
            u32::MAX,
            days
        ))
    })
}
