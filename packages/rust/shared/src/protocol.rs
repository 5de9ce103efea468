//! Request and response bodies exchanged with reconciliation and extension services.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Candidate, ColumnKind, lenient_string};

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// `POST reconciliators/<relativeUrl>` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRequest {
    pub service_id: String,
    /// Leading `column$index` header item, then one item per row.
    pub items: Vec<ReconciliationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationItem {
    pub id: String,
    pub label: String,
}

/// One entry of a reconciliation response: the candidates for a cell
/// (`<rowId>$<columnName>`) or for the column header (`column$index`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    pub id: String,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
    #[serde(default)]
    pub metadata: Vec<Candidate>,
}

// ---------------------------------------------------------------------------
// Extension
// ---------------------------------------------------------------------------

/// `POST extenders/<relativeUrl>` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRequest {
    pub service_id: String,
    /// Source column name to `rowId -> matched entity id`.
    pub items: IndexMap<String, IndexMap<String, String>>,
    pub property: Vec<String>,
    pub dates: IndexMap<String, Vec<String>>,
    pub weather_params: Vec<String>,
    pub decimal_format: Vec<String>,
}

/// Extension service reply: new columns keyed by an opaque key, and for each
/// key the source column it was derived from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtensionResponse {
    #[serde(default)]
    pub columns: IndexMap<String, ExtensionColumn>,
    #[serde(default)]
    pub meta: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtensionColumn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ColumnKind>,
    /// `None` when the service omitted the key entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cells: Option<IndexMap<String, ExtensionCell>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtensionCell {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub label: Option<String>,
    #[serde(default)]
    pub metadata: Vec<Candidate>,
}

/// Labels are often numeric; keep them as text.
fn lenient_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(Some)
}
