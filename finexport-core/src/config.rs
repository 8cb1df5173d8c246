//! Configuration management
//!
//! All settings come from the environment (or any key lookup, for tests) and
//! are validated once, before any network call:
//! ```text
//! PLAID_CLIENT_ID, PLAID_SECRET        required
//! PLAID_ENV                            sandbox | development | production
//! PLAID_BASE_URL                       override the API host (mock servers)
//! PLAID_COUNTRY_CODES                  comma-separated, default US
//! DATA_BUCKET                          required
//! DATA_PREFIX                          default personal-finance
//! AWS_REGION, AWS_ENDPOINT_URL         S3 location
//! AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN
//! ```

use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use crate::domain::result::{Error, Result};

pub const DEFAULT_PREFIX: &str = "personal-finance";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Shown in place of any secret value
const REDACTED: &str = "***";

/// Plaid deployment to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "sandbox",
            PlaidEnvironment::Development => "development",
            PlaidEnvironment::Production => "production",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
            PlaidEnvironment::Development => "https://development.plaid.com",
            PlaidEnvironment::Production => "https://production.plaid.com",
        }
    }
}

impl FromStr for PlaidEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(Error::config(format!(
                "PLAID_ENV must be one of sandbox, development, production (got '{}')",
                other
            ))),
        }
    }
}

/// Settings for the Plaid client
#[derive(Debug, Clone)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: SecretString,
    pub environment: PlaidEnvironment,
    /// Replaces the environment's host when set
    pub base_url: Option<String>,
    pub products: Vec<String>,
    pub country_codes: Vec<String>,
}

impl PlaidConfig {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: SecretString::from(secret.into()),
            environment: PlaidEnvironment::default(),
            base_url: None,
            products: vec!["transactions".to_string()],
            country_codes: vec!["US".to_string()],
        }
    }

    /// Host requests are sent to
    pub fn api_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
    }
}

/// Static AWS credentials for request signing
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

/// Settings for the destination bucket
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub bucket: String,
    pub prefix: String,
    pub region: String,
    /// Custom S3-compatible endpoint (path-style addressing)
    pub endpoint: Option<String>,
    /// Only required by the S3 store
    pub credentials: Option<AwsCredentials>,
}

impl StoreConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            credentials: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Aggregate application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub plaid: PlaidConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match optional("PLAID_ENV") {
            Some(value) => value.parse()?,
            None => PlaidEnvironment::default(),
        };
        let country_codes = optional("PLAID_COUNTRY_CODES")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| vec!["US".to_string()]);

        let plaid = PlaidConfig {
            environment,
            base_url: optional("PLAID_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            country_codes,
            ..PlaidConfig::new(
                require(&lookup, "PLAID_CLIENT_ID")?,
                require(&lookup, "PLAID_SECRET")?,
            )
        };

        let credentials = match (
            optional("AWS_ACCESS_KEY_ID"),
            optional("AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(AwsCredentials {
                access_key_id,
                secret_access_key: SecretString::from(secret_access_key),
                session_token: optional("AWS_SESSION_TOKEN").map(SecretString::from),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::config(
                    "AWS_SECRET_ACCESS_KEY must be set when AWS_ACCESS_KEY_ID is",
                ))
            }
            (None, Some(_)) => {
                return Err(Error::config(
                    "AWS_ACCESS_KEY_ID must be set when AWS_SECRET_ACCESS_KEY is",
                ))
            }
        };

        let store = StoreConfig {
            bucket: require(&lookup, "DATA_BUCKET")?,
            prefix: optional("DATA_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            region: optional("AWS_REGION")
                .or_else(|| optional("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: optional("AWS_ENDPOINT_URL").map(|u| u.trim_end_matches('/').to_string()),
            credentials,
        };

        Ok(Self { plaid, store })
    }

    /// Settings as (name, value) pairs with secrets masked
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let credentials = self.store.credentials.as_ref();
        vec![
            ("PLAID_CLIENT_ID", self.plaid.client_id.clone()),
            ("PLAID_SECRET", redact(Some(&self.plaid.secret))),
            ("PLAID_ENV", self.plaid.environment.as_str().to_string()),
            ("plaid host", self.plaid.api_base_url().to_string()),
            ("PLAID_COUNTRY_CODES", self.plaid.country_codes.join(",")),
            ("DATA_BUCKET", self.store.bucket.clone()),
            ("DATA_PREFIX", self.store.prefix.clone()),
            ("AWS_REGION", self.store.region.clone()),
            (
                "AWS_ENDPOINT_URL",
                self.store.endpoint.clone().unwrap_or_else(|| "(aws)".to_string()),
            ),
            (
                "AWS_ACCESS_KEY_ID",
                credentials
                    .map(|c| c.access_key_id.clone())
                    .unwrap_or_else(|| "(not set)".to_string()),
            ),
            (
                "AWS_SECRET_ACCESS_KEY",
                redact(credentials.map(|c| &c.secret_access_key)),
            ),
            (
                "AWS_SESSION_TOKEN",
                redact(credentials.and_then(|c| c.session_token.as_ref())),
            ),
        ]
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Err(Error::config(format!(
            "Missing required environment variable: {}",
            key
        ))),
        Some(value) if value.trim().is_empty() => Err(Error::config(format!(
            "Environment variable {} must not be empty",
            key
        ))),
        Some(value) => Ok(value),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn redact(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if !secret.expose_secret().is_empty() => REDACTED.to_string(),
        _ => "(not set)".to_string(),
    }
}
