//! Export run summary

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::record::Dataset;

/// Summary keys reserved for dataset uploads
pub const RESERVED_UPLOAD_KEYS: [&str; 2] = ["accounts_csv", "transactions_csv"];

/// Where a dataset landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub record_count: usize,
}

/// Per-institution counts for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionSummary {
    /// Institution metadata as returned by the provider
    pub institution: JsonValue,
    pub account_count: usize,
    pub transaction_count: usize,
}

/// The `uploads` mapping of the run output
///
/// Serializes as a single object: one entry per processed institution alias
/// (in processing order), followed by `accounts_csv` / `transactions_csv` when
/// those datasets were written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uploads {
    pub institutions: Vec<(String, InstitutionSummary)>,
    pub accounts_csv: Option<UploadResult>,
    pub transactions_csv: Option<UploadResult>,
}

impl Uploads {
    pub fn institution(&self, alias: &str) -> Option<&InstitutionSummary> {
        self.institutions
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, s)| s)
    }

    pub fn dataset(&self, dataset: Dataset) -> Option<&UploadResult> {
        match dataset {
            Dataset::Accounts => self.accounts_csv.as_ref(),
            Dataset::Transactions => self.transactions_csv.as_ref(),
        }
    }

    pub(crate) fn set_dataset(&mut self, dataset: Dataset, result: UploadResult) {
        match dataset {
            Dataset::Accounts => self.accounts_csv = Some(result),
            Dataset::Transactions => self.transactions_csv = Some(result),
        }
    }

    /// Number of entries in the serialized mapping
    pub fn len(&self) -> usize {
        self.institutions.len()
            + usize::from(self.accounts_csv.is_some())
            + usize::from(self.transactions_csv.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Uploads {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (alias, summary) in &self.institutions {
            map.serialize_entry(alias, summary)?;
        }
        if let Some(upload) = &self.accounts_csv {
            map.serialize_entry(Dataset::Accounts.summary_key(), upload)?;
        }
        if let Some(upload) = &self.transactions_csv {
            map.serialize_entry(Dataset::Transactions.summary_key(), upload)?;
        }
        map.end()
    }
}

/// Output of one export invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSummary {
    pub uploads: Uploads,
    /// Aliases supplied in the request, in request order
    pub institution_tokens: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_summary_serializes_to_empty_uploads() {
        let summary = ExportSummary::default();
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({"uploads": {}, "institution_tokens": []})
        );
        assert!(summary.uploads.is_empty());
    }

    #[test]
    fn test_uploads_serialize_as_one_mapping() {
        let mut uploads = Uploads::default();
        uploads.institutions.push((
            "chase".to_string(),
            InstitutionSummary {
                institution: json!({"institution_id": "ins_3"}),
                account_count: 2,
                transaction_count: 3,
            },
        ));
        uploads.set_dataset(
            Dataset::Accounts,
            UploadResult {
                bucket: "finance-bucket".to_string(),
                key: "exports/accounts_20230102T030405Z.csv".to_string(),
                record_count: 2,
            },
        );

        let value = serde_json::to_value(&uploads).unwrap();
        assert_eq!(value["chase"]["account_count"], json!(2));
        assert_eq!(value["accounts_csv"]["record_count"], json!(2));
        assert!(value.get("transactions_csv").is_none());

        let keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["chase", "accounts_csv"]);
        assert_eq!(uploads.len(), 2);
    }
}
