//! Exported rows and dataset schemas

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::institution::Institution;

/// A flat provider record: field name → JSON value, in provider order
pub type Record = Map<String, JsonValue>;

/// Provenance columns prepended to every exported row
pub const PROVENANCE_COLUMNS: [&str; 3] = ["institution_alias", "institution_id", "institution_name"];

const ACCOUNT_COLUMNS: &[&str] = &[
    "account_id",
    "name",
    "official_name",
    "mask",
    "type",
    "subtype",
    "balances",
    "verification_status",
    "persistent_account_id",
];

const TRANSACTION_COLUMNS: &[&str] = &[
    "transaction_id",
    "account_id",
    "date",
    "authorized_date",
    "datetime",
    "authorized_datetime",
    "name",
    "merchant_name",
    "amount",
    "iso_currency_code",
    "unofficial_currency_code",
    "pending",
    "pending_transaction_id",
    "payment_channel",
    "transaction_type",
    "transaction_code",
    "category",
    "category_id",
    "personal_finance_category",
    "location",
    "payment_meta",
    "counterparties",
    "account_owner",
    "check_number",
    "logo_url",
    "website",
    "merchant_entity_id",
];

/// One of the two collections written per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Accounts,
    Transactions,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Accounts => "accounts",
            Dataset::Transactions => "transactions",
        }
    }

    /// Key of this dataset's entry in the export summary
    pub fn summary_key(&self) -> &'static str {
        match self {
            Dataset::Accounts => "accounts_csv",
            Dataset::Transactions => "transactions_csv",
        }
    }

    /// Canonical column order: provenance first, then the provider's fields
    pub fn columns(&self) -> Vec<String> {
        let fields = match self {
            Dataset::Accounts => ACCOUNT_COLUMNS,
            Dataset::Transactions => TRANSACTION_COLUMNS,
        };
        PROVENANCE_COLUMNS
            .iter()
            .chain(fields.iter())
            .map(|c| c.to_string())
            .collect()
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix a provider record with institution provenance
///
/// Provenance values always win: a provider field sharing a provenance name is
/// dropped so rows from different institutions stay distinguishable.
pub fn tag_record(alias: &str, institution: &Institution, record: Record) -> Record {
    let mut tagged = Map::with_capacity(record.len() + PROVENANCE_COLUMNS.len());
    tagged.insert("institution_alias".to_string(), JsonValue::from(alias));
    tagged.insert(
        "institution_id".to_string(),
        JsonValue::from(institution.id.as_str()),
    );
    tagged.insert(
        "institution_name".to_string(),
        JsonValue::from(institution.display_name.as_str()),
    );
    for (key, value) in record {
        if !PROVENANCE_COLUMNS.contains(&key.as_str()) {
            tagged.insert(key, value);
        }
    }
    tagged
}
