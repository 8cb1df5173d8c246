//! Data aggregation provider port
//!
//! Defines the interface for exchanging link tokens and fetching account and
//! transaction data from an aggregation API (Plaid, test stubs, etc.)

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::Record;

/// Default number of transactions requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Consecutive pages without new records before pagination gives up
pub const MAX_STALLED_PAGES: u32 = 3;

/// Durable credential for one institution linkage
///
/// Lives for a single run. `Debug` never prints the token.
#[derive(Debug, Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }
}

impl ExposeSecret<str> for AccessToken {
    fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

/// One page of a transaction listing
#[derive(Debug, Clone, Default)]
pub struct TransactionsPage {
    pub transactions: Vec<Record>,
    /// Server-reported total for the whole window
    pub total: u64,
}

/// Data aggregation provider trait
///
/// Every call is a network round-trip; implementations do no caching.
pub trait DataProvider: Send + Sync {
    /// Provider name (e.g., "plaid")
    fn name(&self) -> &str;

    /// Exchange a one-time public token for an access token
    ///
    /// Fails with `AuthExchange` for invalid, expired or already redeemed tokens.
    fn exchange_public_token(&self, public_token: &str) -> Result<AccessToken>;

    /// Fetch provider metadata for an institution
    ///
    /// Fails with `NotFound` if the provider no longer knows the ID.
    fn fetch_institution_metadata(&self, institution_id: &str) -> Result<JsonValue>;

    /// Fetch every account of the linked item (single call)
    fn fetch_accounts(&self, access_token: &AccessToken) -> Result<Vec<Record>>;

    /// Fetch one page of transactions dated within `[start_date, end_date]`
    fn fetch_transactions_page(
        &self,
        access_token: &AccessToken,
        start_date: NaiveDate,
        end_date: NaiveDate,
        count: u32,
        offset: u64,
    ) -> Result<TransactionsPage>;

    /// Fetch all transactions in the window, page by page
    ///
    /// Offsets advance by `page_size` from 0 until the cumulative count reaches
    /// the server-reported total. Three consecutive pages that add nothing end
    /// the loop with a `Pagination` error.
    fn fetch_transactions(
        &self,
        access_token: &AccessToken,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page_size: u32,
    ) -> Result<Vec<Record>> {
        if page_size == 0 {
            return Err(Error::validation("page size must be greater than zero"));
        }

        let mut transactions = Vec::new();
        let mut offset = 0u64;
        let mut stalled = 0u32;

        loop {
            let page = self.fetch_transactions_page(
                access_token,
                start_date,
                end_date,
                page_size,
                offset,
            )?;
            let received = page.transactions.len();
            transactions.extend(page.transactions);
            debug!(
                provider = self.name(),
                offset,
                received,
                cumulative = transactions.len(),
                total = page.total,
                "Fetched transactions page"
            );

            if transactions.len() as u64 >= page.total {
                break;
            }

            if received == 0 {
                stalled += 1;
                warn!(
                    provider = self.name(),
                    offset,
                    stalled,
                    "Transactions page added no records"
                );
                if stalled >= MAX_STALLED_PAGES {
                    return Err(Error::Pagination(format!(
                        "{} consecutive empty pages at offset {} with {} of {} transactions retrieved",
                        stalled,
                        offset,
                        transactions.len(),
                        page.total
                    )));
                }
            } else {
                stalled = 0;
            }

            offset += u64::from(page_size);
        }

        Ok(transactions)
    }
}
