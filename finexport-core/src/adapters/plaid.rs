//! Plaid API client
//!
//! Handles communication with the Plaid API for token exchange, account,
//! transaction and institution lookups.
//!
//! API Documentation: https://plaid.com/docs/api/

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::config::PlaidConfig;
use crate::domain::result::{Error, Result};
use crate::domain::Record;
use crate::ports::{AccessToken, DataProvider, TransactionsPage};

const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// API Request / Response Models (matching the Plaid API)
// =============================================================================

#[derive(Debug, Serialize)]
struct PublicTokenExchangeRequest<'a> {
    public_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublicTokenExchangeResponse {
    access_token: String,
    item_id: String,
}

#[derive(Debug, Serialize)]
struct AccountsGetRequest<'a> {
    access_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccountsGetResponse {
    accounts: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct TransactionsGetRequest<'a> {
    access_token: &'a str,
    start_date: String,
    end_date: String,
    options: TransactionsGetOptions,
}

#[derive(Debug, Serialize)]
struct TransactionsGetOptions {
    count: u32,
    offset: u64,
}

#[derive(Debug, Deserialize)]
struct TransactionsGetResponse {
    transactions: Vec<Record>,
    total_transactions: u64,
}

#[derive(Debug, Serialize)]
struct InstitutionsGetByIdRequest<'a> {
    institution_id: &'a str,
    country_codes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct InstitutionsGetByIdResponse {
    institution: JsonValue,
}

/// Error body returned by Plaid on non-2xx responses
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PlaidApiError {
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Plaid endpoint a request went to; decides how errors are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    PublicTokenExchange,
    AccountsGet,
    TransactionsGet,
    InstitutionsGetById,
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Endpoint::PublicTokenExchange => "/item/public_token/exchange",
            Endpoint::AccountsGet => "/accounts/get",
            Endpoint::TransactionsGet => "/transactions/get",
            Endpoint::InstitutionsGetById => "/institutions/get_by_id",
        }
    }
}

// =============================================================================
// Plaid HTTP Client
// =============================================================================

/// Plaid API client
#[derive(Debug)]
pub struct PlaidClient {
    client: Client,
    base_url: String,
    client_id: String,
    secret: SecretString,
    country_codes: Vec<String>,
}

impl PlaidClient {
    /// Create a client for the configured environment
    pub fn new(config: &PlaidConfig) -> Result<Self> {
        if config.client_id.is_empty() || config.secret.expose_secret().is_empty() {
            return Err(Error::config("Plaid client id and secret are required"));
        }

        let base_url = config.api_base_url().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| Error::config(format!("Invalid Plaid base URL '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            country_codes: config.country_codes.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to an endpoint and decode the response
    fn post<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint.path());

        let response = self
            .client
            .post(&url)
            .header("PLAID-CLIENT-ID", &self.client_id)
            .header("PLAID-SECRET", self.secret.expose_secret())
            .json(body)
            .send()
            .map_err(map_request_error)?;

        let response = check_response_status(endpoint, response)?;

        response.json::<T>().map_err(|e| {
            Error::transport(format!(
                "Failed to parse Plaid {} response: {}",
                endpoint.path(),
                e
            ))
        })
    }
}

impl DataProvider for PlaidClient {
    fn name(&self) -> &str {
        "plaid"
    }

    fn exchange_public_token(&self, public_token: &str) -> Result<AccessToken> {
        let response: PublicTokenExchangeResponse = self.post(
            Endpoint::PublicTokenExchange,
            &PublicTokenExchangeRequest { public_token },
        )?;
        info!(item_id = %response.item_id, "Successfully exchanged public token");
        Ok(AccessToken::new(response.access_token))
    }

    fn fetch_institution_metadata(&self, institution_id: &str) -> Result<JsonValue> {
        let response: InstitutionsGetByIdResponse = self.post(
            Endpoint::InstitutionsGetById,
            &InstitutionsGetByIdRequest {
                institution_id,
                country_codes: &self.country_codes,
            },
        )?;
        Ok(response.institution)
    }

    fn fetch_accounts(&self, access_token: &AccessToken) -> Result<Vec<Record>> {
        let response: AccountsGetResponse = self.post(
            Endpoint::AccountsGet,
            &AccountsGetRequest {
                access_token: access_token.expose_secret(),
            },
        )?;
        Ok(response.accounts)
    }

    fn fetch_transactions_page(
        &self,
        access_token: &AccessToken,
        start_date: NaiveDate,
        end_date: NaiveDate,
        count: u32,
        offset: u64,
    ) -> Result<TransactionsPage> {
        let response: TransactionsGetResponse = self.post(
            Endpoint::TransactionsGet,
            &TransactionsGetRequest {
                access_token: access_token.expose_secret(),
                start_date: start_date.format("%Y-%m-%d").to_string(),
                end_date: end_date.format("%Y-%m-%d").to_string(),
                options: TransactionsGetOptions { count, offset },
            },
        )?;
        Ok(TransactionsPage {
            transactions: response.transactions,
            total: response.total_transactions,
        })
    }
}

/// Map request errors to user-friendly messages
fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::transport(format!(
            "Connection to Plaid timed out after {} seconds",
            REQUEST_TIMEOUT_SECS
        ))
    } else if error.is_connect() {
        Error::transport("Unable to connect to Plaid servers")
    } else {
        Error::transport(format!("Plaid request failed: {}", error))
    }
}

/// Pass successful responses through, classify the rest
fn check_response_status(endpoint: Endpoint, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .json::<PlaidApiError>()
        .unwrap_or_default();
    Err(classify_error(endpoint, status.as_u16(), &body))
}

fn classify_error(endpoint: Endpoint, status: u16, body: &PlaidApiError) -> Error {
    let detail = if body.error_code.is_empty() {
        format!("HTTP {} from {}", status, endpoint.path())
    } else {
        format!(
            "{} {} ({}): {}",
            body.error_type,
            body.error_code,
            endpoint.path(),
            body.error_message
        )
    };

    if status == 429 || body.error_type == "RATE_LIMIT_EXCEEDED" {
        return Error::RateLimit(detail);
    }

    match endpoint {
        Endpoint::PublicTokenExchange
            if (400..500).contains(&status)
                && matches!(
                    body.error_type.as_str(),
                    "INVALID_INPUT" | "INVALID_REQUEST" | "ITEM_ERROR" | ""
                ) =>
        {
            Error::AuthExchange(detail)
        }
        Endpoint::InstitutionsGetById
            if status == 404
                || matches!(
                    body.error_code.as_str(),
                    "INVALID_INSTITUTION" | "INSTITUTION_NOT_FOUND"
                ) =>
        {
            Error::NotFound(detail)
        }
        _ => Error::Transport(detail),
    }
}
