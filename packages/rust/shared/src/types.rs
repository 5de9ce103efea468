//! Table document model shared by every semtab crate.
//!
//! The JSON shape follows the tabular backend: a `table` header, ordered
//! `columns` keyed by name, and ordered `rows` keyed by opaque row id, each
//! row holding one cell per declared column.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Separator between the row id and the column name inside a cell id.
pub const CELL_ID_SEPARATOR: char = '$';

/// Id of the synthetic pseudo-row that carries the column header.
pub const COLUMN_INDEX_ID: &str = "column$index";

/// Build the canonical cell id `<rowId>$<columnName>`.
pub fn cell_id(row_id: &str, column_name: &str) -> String {
    format!("{row_id}{CELL_ID_SEPARATOR}{column_name}")
}

/// Split a cell id at its last `$` into `(row_id, column_name)`.
///
/// Row ids are opaque and may contain `$` themselves; when the column is
/// known, prefer [`row_id_in_column`].
pub fn split_cell_id(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once(CELL_ID_SEPARATOR)
}

/// The row id of `id` when it names a cell of `column_name`.
pub fn row_id_in_column<'a>(id: &'a str, column_name: &str) -> Option<&'a str> {
    id.strip_suffix(column_name)?.strip_suffix(CELL_ID_SEPARATOR)
}

// ---------------------------------------------------------------------------
// TableDocument
// ---------------------------------------------------------------------------

/// A whole table as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    /// Table-level header.
    #[serde(default)]
    pub table: TableInstance,
    /// Declared columns, in display order.
    pub columns: IndexMap<String, Column>,
    /// Rows keyed by opaque row id, in insertion order.
    pub rows: IndexMap<String, Row>,
}

impl TableDocument {
    /// Number of cells in `column_name` whose annotation is present.
    pub fn annotated_cells(&self, column_name: &str) -> usize {
        self.rows
            .values()
            .filter_map(|row| row.cells.get(column_name))
            .filter(|cell| cell.annotation_meta.is_annotated())
            .count()
    }
}

/// The `table` header of a [`TableDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInstance {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub id_dataset: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub n_cols: usize,
    #[serde(default)]
    pub n_rows: usize,
    #[serde(default)]
    pub n_cells: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_cells_reconciliated: Option<usize>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_modified_date: String,
    #[serde(default)]
    pub min_meta_score: f64,
    #[serde(default = "default_max_meta_score")]
    pub max_meta_score: f64,
    /// Fields this crate does not interpret, carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TableInstance {
    fn default() -> Self {
        Self {
            id: String::new(),
            id_dataset: String::new(),
            name: String::new(),
            n_cols: 0,
            n_rows: 0,
            n_cells: 0,
            n_cells_reconciliated: None,
            last_modified_date: String::new(),
            min_meta_score: 0.0,
            max_meta_score: default_max_meta_score(),
            extra: Map::new(),
        }
    }
}

fn default_max_meta_score() -> f64 {
    1.0
}

/// Accept a JSON string, number, or null where a string is expected.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

/// Read a candidate flag; anything but `true` is `false`.
fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// Read a candidate score; anything but a JSON number is missing.
fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64())
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Annotation lifecycle of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnStatus {
    #[default]
    #[serde(rename = "empty", alias = "unannotated")]
    Unannotated,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "reconciliated", alias = "reconciled")]
    Reconciled,
}

/// Whether a column holds plain values or knowledge-base entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Literal,
    Entity,
}

/// Per-service coverage record stored in a column's `context`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub reconciliated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default)]
    pub status: ColumnStatus,
    #[serde(default)]
    pub kind: ColumnKind,
    /// Service prefix to coverage record, oldest first.
    #[serde(default)]
    pub context: IndexMap<String, ContextInfo>,
    #[serde(default)]
    pub metadata: Vec<ColumnCandidate>,
    #[serde(default)]
    pub annotation_meta: AnnotationMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Column {
    /// A fresh, unannotated column named `name`.
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            id: name.to_string(),
            label: name.to_string(),
            status: ColumnStatus::Unannotated,
            kind,
            context: IndexMap::new(),
            metadata: Vec::new(),
            annotation_meta: AnnotationMeta::Unannotated,
            extra: Map::new(),
        }
    }

    /// The most recently written context entry. Only this one is authoritative
    /// when a column has been reconciled more than once.
    pub fn authoritative_context(&self) -> Option<(&str, &ContextInfo)> {
        self.context
            .last()
            .map(|(prefix, info)| (prefix.as_str(), info))
    }
}

/// Column-level summary candidate written by a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCandidate {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "match")]
    pub matched: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub name: EntityName,
    /// Entities proposed for the column header itself.
    #[serde(default)]
    pub entity: Vec<Candidate>,
    #[serde(default)]
    pub property: Vec<Value>,
    /// First type of every matched cell candidate, duplicates kept.
    #[serde(default, rename = "type")]
    pub types: Vec<TypeDescriptor>,
}

// ---------------------------------------------------------------------------
// Rows and cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub cells: IndexMap<String, Cell>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Always `<rowId>$<columnName>`.
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default)]
    pub metadata: Vec<Candidate>,
    #[serde(default)]
    pub annotation_meta: AnnotationMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    /// An empty cell for `row_id` in `column_name`.
    pub fn empty(row_id: &str, column_name: &str) -> Self {
        Self {
            id: cell_id(row_id, column_name),
            label: String::new(),
            metadata: Vec::new(),
            annotation_meta: AnnotationMeta::Unannotated,
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// One entity proposed by a service for a cell (or a column header).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// `<prefix>:<entityId>`, e.g. `geo:2523920`.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: CandidateName,
    /// Missing when the service sent a malformed entry.
    #[serde(
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,
    #[serde(default, rename = "match", deserialize_with = "lenient_bool")]
    pub matched: bool,
    #[serde(default, rename = "type")]
    pub types: Vec<TypeDescriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Candidate {
    /// The part of `id` after the first `:`, if any.
    pub fn entity_id(&self) -> Option<&str> {
        self.id.split_once(':').map(|(_, rest)| rest)
    }
}

/// A candidate name: the bare label a service sends, or the resolved form
/// carrying the entity URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateName {
    Resolved(EntityName),
    Label(String),
}

impl CandidateName {
    /// The human-readable label regardless of form.
    pub fn value(&self) -> &str {
        match self {
            Self::Resolved(name) => &name.value,
            Self::Label(label) => label,
        }
    }

    /// The entity URI, once resolved.
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::Resolved(name) => Some(&name.uri),
            Self::Label(_) => None,
        }
    }
}

impl Default for CandidateName {
    fn default() -> Self {
        Self::Label(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityName {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub uri: String,
}

/// A knowledge-base type attached to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// AnnotationMeta
// ---------------------------------------------------------------------------

/// Three-way match outcome of an annotated cell or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// Annotated, but nothing contributed a verdict (`match.value = null`).
    Undetermined,
    NoMatch,
    Matched,
}

impl MatchStatus {
    pub fn from_value(value: Option<bool>) -> Self {
        match value {
            None => Self::Undetermined,
            Some(false) => Self::NoMatch,
            Some(true) => Self::Matched,
        }
    }

    pub fn as_value(self) -> Option<bool> {
        match self {
            Self::Undetermined => None,
            Self::NoMatch => Some(false),
            Self::Matched => Some(true),
        }
    }
}

/// Annotation summary attached to a cell or a column.
///
/// Serializes as `{}` when unannotated and as
/// `{annotated, match: {value}, lowestScore, highestScore}` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "AnnotationMetaRepr", into = "AnnotationMetaRepr")]
pub enum AnnotationMeta {
    #[default]
    Unannotated,
    Annotated {
        status: MatchStatus,
        lowest_score: Option<f64>,
        highest_score: Option<f64>,
    },
}

impl AnnotationMeta {
    pub fn is_annotated(&self) -> bool {
        matches!(self, Self::Annotated { .. })
    }

    /// Match outcome, or `None` when not annotated at all.
    pub fn status(&self) -> Option<MatchStatus> {
        match self {
            Self::Unannotated => None,
            Self::Annotated { status, .. } => Some(*status),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status() == Some(MatchStatus::Matched)
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationMetaRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotated: Option<bool>,
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    match_value: Option<MatchValueRepr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lowest_score: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    highest_score: Option<Option<f64>>,
}

#[derive(Serialize, Deserialize)]
struct MatchValueRepr {
    #[serde(default)]
    value: Option<bool>,
}

impl From<AnnotationMetaRepr> for AnnotationMeta {
    fn from(repr: AnnotationMetaRepr) -> Self {
        if repr.annotated != Some(true) {
            return Self::Unannotated;
        }
        Self::Annotated {
            status: MatchStatus::from_value(repr.match_value.and_then(|m| m.value)),
            lowest_score: repr.lowest_score.flatten(),
            highest_score: repr.highest_score.flatten(),
        }
    }
}

impl From<AnnotationMeta> for AnnotationMetaRepr {
    fn from(meta: AnnotationMeta) -> Self {
        match meta {
            AnnotationMeta::Unannotated => Self::default(),
            AnnotationMeta::Annotated {
                status,
                lowest_score,
                highest_score,
            } => Self {
                annotated: Some(true),
                match_value: Some(MatchValueRepr {
                    value: status.as_value(),
                }),
                lowest_score: Some(lowest_score),
                highest_score: Some(highest_score),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceDescriptor
// ---------------------------------------------------------------------------

/// One reconciliation or extension backend as listed by the service catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub relative_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_id_roundtrip() {
        let id = cell_id("r1", "City");
        assert_eq!(id, "r1$City");
        assert_eq!(split_cell_id(&id), Some(("r1", "City")));
        assert_eq!(split_cell_id(COLUMN_INDEX_ID), Some(("column", "index")));
        assert_eq!(split_cell_id("no-separator"), None);
    }

    #[test]
    fn row_ids_may_contain_the_separator() {
        let id = cell_id("2024$01", "City");
        assert_eq!(row_id_in_column(&id, "City"), Some("2024$01"));
        assert_eq!(row_id_in_column(&id, "Date"), None);
        assert_eq!(row_id_in_column("r0City", "City"), None);
        assert_eq!(split_cell_id(&id), Some(("2024$01", "City")));
    }

    #[test]
    fn malformed_candidate_fields_decode_leniently() {
        let candidates: Vec<Candidate> = serde_json::from_value(json!([
            { "id": "geo:1", "name": "Rome", "score": "n/a", "match": null },
            { "id": "geo:2", "name": "Turin", "score": 0.4, "match": "yes" },
            { "id": "geo:3", "name": "Milan", "score": 0.8, "match": true }
        ]))
        .expect("deserialize");

        assert_eq!(candidates[0].score, None);
        assert!(!candidates[0].matched);
        assert_eq!(candidates[1].score, Some(0.4));
        assert!(!candidates[1].matched);
        assert!(candidates[2].matched);
    }

    #[test]
    fn unannotated_meta_serializes_as_empty_object() {
        let value = serde_json::to_value(AnnotationMeta::Unannotated).expect("serialize");
        assert_eq!(value, json!({}));

        let parsed: AnnotationMeta = serde_json::from_value(json!({})).expect("deserialize");
        assert_eq!(parsed, AnnotationMeta::Unannotated);
    }

    #[test]
    fn undetermined_meta_keeps_nulls() {
        let meta = AnnotationMeta::Annotated {
            status: MatchStatus::Undetermined,
            lowest_score: None,
            highest_score: None,
        };
        let value = serde_json::to_value(meta).expect("serialize");
        assert_eq!(
            value,
            json!({
                "annotated": true,
                "match": { "value": null },
                "lowestScore": null,
                "highestScore": null
            })
        );

        let parsed: AnnotationMeta = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, meta);
    }

    #[test]
    fn annotated_false_reads_as_unannotated() {
        let parsed: AnnotationMeta = serde_json::from_value(json!({
            "annotated": false,
            "match": { "value": false }
        }))
        .expect("deserialize");
        assert!(!parsed.is_annotated());
    }

    #[test]
    fn candidate_name_accepts_both_forms() {
        let plain: Candidate =
            serde_json::from_value(json!({ "id": "geo:1", "name": "Rome", "score": 0.5 }))
                .expect("plain name");
        assert_eq!(plain.name, CandidateName::Label("Rome".into()));
        assert_eq!(plain.entity_id(), Some("1"));
        assert!(!plain.matched);

        let resolved: Candidate = serde_json::from_value(json!({
            "id": "geo:1",
            "name": { "value": "Rome", "uri": "http://geo/1" },
            "match": true,
            "type": [{ "id": "A", "name": "city" }]
        }))
        .expect("resolved name");
        assert_eq!(resolved.name.value(), "Rome");
        assert_eq!(resolved.name.uri(), Some("http://geo/1"));
        assert_eq!(resolved.score, None);
        assert_eq!(resolved.types.len(), 1);
    }

    #[test]
    fn column_status_uses_backend_vocabulary() {
        let col = Column::new("City", ColumnKind::Literal);
        let value = serde_json::to_value(&col).expect("serialize");
        assert_eq!(value["status"], "empty");
        assert_eq!(value["kind"], "literal");
        assert_eq!(value["annotationMeta"], json!({}));

        let status: ColumnStatus = serde_json::from_value(json!("reconciliated")).expect("status");
        assert_eq!(status, ColumnStatus::Reconciled);
    }

    #[test]
    fn table_instance_accepts_numeric_ids_and_keeps_extras() {
        let doc: TableDocument = serde_json::from_value(json!({
            "table": { "id": 12, "idDataset": "3", "name": "cities", "owner": "x" },
            "columns": {},
            "rows": {}
        }))
        .expect("deserialize");
        assert_eq!(doc.table.id, "12");
        assert_eq!(doc.table.id_dataset, "3");
        assert_eq!(doc.table.max_meta_score, 1.0);
        assert_eq!(doc.table.extra["owner"], "x");
    }

    #[test]
    fn authoritative_context_is_last_written() {
        let mut col = Column::new("City", ColumnKind::Entity);
        col.context.insert(
            "wd".into(),
            ContextInfo {
                uri: "https://www.wikidata.org/wiki/".into(),
                total: 2,
                reconciliated: 2,
            },
        );
        col.context.insert(
            "geo".into(),
            ContextInfo {
                uri: "http://www.geonames.org/".into(),
                total: 2,
                reconciliated: 1,
            },
        );
        let (prefix, info) = col.authoritative_context().expect("context");
        assert_eq!(prefix, "geo");
        assert_eq!(info.reconciliated, 1);
    }
}
