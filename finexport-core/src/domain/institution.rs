//! Supported institutions
//!
//! The registry is a table of alias → institution. Processing order is the
//! table order, so adding an institution is a data change only.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::summary::RESERVED_UPLOAD_KEYS;

/// A financial institution as identified by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    /// Provider institution ID (e.g. "ins_3")
    pub id: String,
    pub display_name: String,
}

impl Institution {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// One row of a registry file
#[derive(Debug, Deserialize)]
struct RegistryEntry {
    alias: String,
    id: String,
    display_name: String,
}

/// Ordered alias → institution table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutionRegistry {
    entries: Vec<(String, Institution)>,
}

impl InstitutionRegistry {
    /// Build a registry from ordered entries
    ///
    /// Rejects empty fields, duplicate aliases and aliases that would clash
    /// with the dataset keys of the export summary.
    pub fn new(entries: Vec<(String, Institution)>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (alias, institution) in &entries {
            if alias.trim().is_empty() {
                return Err(Error::validation("Institution alias must not be empty"));
            }
            if institution.id.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Institution '{}' has an empty id",
                    alias
                )));
            }
            if institution.display_name.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Institution '{}' has an empty display name",
                    alias
                )));
            }
            if RESERVED_UPLOAD_KEYS.contains(&alias.as_str()) {
                return Err(Error::validation(format!(
                    "Institution alias '{}' is reserved",
                    alias
                )));
            }
            if !seen.insert(alias.as_str()) {
                return Err(Error::validation(format!(
                    "Duplicate institution alias: {}",
                    alias
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Institutions supported out of the box
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                (
                    "chase".to_string(),
                    Institution::new("ins_3", "JPMorgan Chase"),
                ),
                // Apple Card is issued by Goldman Sachs; Plaid lists it under this ID
                (
                    "apple_card".to_string(),
                    Institution::new("ins_130893", "Apple Card"),
                ),
            ],
        }
    }

    /// Load a registry from a JSON array of `{alias, id, display_name}`
    pub fn from_json(text: &str) -> Result<Self> {
        let rows: Vec<RegistryEntry> = serde_json::from_str(text)?;
        Self::new(
            rows.into_iter()
                .map(|r| (r.alias, Institution::new(r.id, r.display_name)))
                .collect(),
        )
    }

    /// All institutions in processing order
    pub fn lookup_all(&self) -> &[(String, Institution)] {
        &self.entries
    }

    pub fn get(&self, alias: &str) -> Option<&Institution> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, institution)| institution)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InstitutionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
