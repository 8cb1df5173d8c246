//! Export service - drive one export run across all linked institutions

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::domain::result::{Error, Result};
use crate::domain::{
    tag_record, Dataset, ExportRequest, ExportSummary, InstitutionRegistry, InstitutionSummary,
    Record, UploadResult,
};
use crate::ports::{DataProvider, ObjectStore, DEFAULT_PAGE_SIZE};
use crate::services::TabularWriter;

/// Export service
///
/// Processes the registry's institutions one after another. Any provider or
/// store error aborts the whole run; rows are only accumulated once all
/// fetches for an institution have succeeded.
pub struct ExportService {
    provider: Arc<dyn DataProvider>,
    store: Arc<dyn ObjectStore>,
    registry: InstitutionRegistry,
    writer: TabularWriter,
    bucket: String,
    page_size: u32,
}

impl ExportService {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        store: Arc<dyn ObjectStore>,
        registry: InstitutionRegistry,
        store_config: &StoreConfig,
    ) -> Self {
        Self {
            provider,
            store,
            registry,
            writer: TabularWriter::new(store_config.prefix.clone()),
            bucket: store_config.bucket.clone(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the transaction page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Run an export using the current time
    pub fn run(&self, request: &ExportRequest) -> Result<ExportSummary> {
        self.run_at(request, Utc::now())
    }

    /// Run an export as of `now`
    ///
    /// `now` fixes both the transaction window and the object key timestamps
    /// for the whole run.
    pub fn run_at(&self, request: &ExportRequest, now: DateTime<Utc>) -> Result<ExportSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("export", %run_id, provider = self.provider.name());
        let _guard = span.enter();

        let (start_date, end_date) = lookback_window(now.date_naive(), request.lookback_days)?;
        info!(%start_date, %end_date, tokens = request.tokens.len(), "Starting export");

        let mut summary = ExportSummary {
            institution_tokens: request.aliases(),
            ..Default::default()
        };
        let mut accounts_rows: Vec<Record> = Vec::new();
        let mut transactions_rows: Vec<Record> = Vec::new();

        for (alias, institution) in self.registry.lookup_all() {
            let Some(public_token) = request.token_for(alias) else {
                info!(institution = %alias, "Skipping institution because no public token was provided");
                continue;
            };

            let access_token = self.provider.exchange_public_token(public_token)?;
            let metadata = self.provider.fetch_institution_metadata(&institution.id)?;
            let accounts = self.provider.fetch_accounts(&access_token)?;
            let transactions = self.provider.fetch_transactions(
                &access_token,
                start_date,
                end_date,
                self.page_size,
            )?;

            info!(
                institution = %alias,
                accounts = accounts.len(),
                transactions = transactions.len(),
                "Fetched institution data"
            );

            let account_count = accounts.len();
            let transaction_count = transactions.len();
            accounts_rows.extend(
                accounts
                    .into_iter()
                    .map(|record| tag_record(alias, institution, record)),
            );
            transactions_rows.extend(
                transactions
                    .into_iter()
                    .map(|record| tag_record(alias, institution, record)),
            );
            summary.uploads.institutions.push((
                alias.clone(),
                InstitutionSummary {
                    institution: metadata,
                    account_count,
                    transaction_count,
                },
            ));
        }

        for (dataset, rows) in [
            (Dataset::Accounts, &accounts_rows),
            (Dataset::Transactions, &transactions_rows),
        ] {
            if rows.is_empty() {
                continue;
            }
            let upload = self.write_dataset(dataset, rows, now)?;
            summary.uploads.set_dataset(dataset, upload);
        }

        info!(entries = summary.uploads.len(), "Export finished");
        Ok(summary)
    }

    fn write_dataset(
        &self,
        dataset: Dataset,
        rows: &[Record],
        now: DateTime<Utc>,
    ) -> Result<UploadResult> {
        let body = self
            .writer
            .serialize_with_columns(&dataset.columns(), rows)?;
        let key = self.writer.compute_key(dataset.as_str(), now);
        let receipt = self.store.put(&self.bucket, &key, &body)?;

        info!(
            %dataset,
            store = self.store.name(),
            bucket = %receipt.bucket,
            key = %receipt.key,
            records = rows.len(),
            bytes = receipt.bytes_written,
            "Uploaded dataset"
        );

        Ok(UploadResult {
            bucket: receipt.bucket,
            key: receipt.key,
            record_count: rows.len(),
        })
    }
}

/// Inclusive `[today - lookback_days, today]`
pub fn lookback_window(today: NaiveDate, lookback_days: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = today
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .ok_or_else(|| {
            Error::validation(format!(
                "transaction lookback of {} days is out of range",
                lookback_days
            ))
        })?;
    Ok((start, today))
}
