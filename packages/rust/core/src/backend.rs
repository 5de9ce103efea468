//! Table header bookkeeping and the payload the backend's table update expects.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use semtab_shared::{Column, Row, TableDocument, TableInstance};

/// Recompute `nCols`, `nRows` and `nCells` from the document body.
pub fn refresh_table_stats(doc: &mut TableDocument) {
    doc.table.n_cols = doc.columns.len();
    doc.table.n_rows = doc.rows.len();
    doc.table.n_cells = doc.rows.values().map(|row| row.cells.len()).sum();
}

/// Stamp `lastModifiedDate`. Kept apart from the passes so they stay
/// deterministic.
pub fn touch(doc: &mut TableDocument, now: DateTime<Utc>) {
    doc.table.last_modified_date = now.to_rfc3339_opts(SecondsFormat::Millis, true);
}

/// Identity fields that override the ones read from the document.
#[derive(Debug, Clone, Default)]
pub struct TableIdentity {
    pub id: Option<String>,
    pub id_dataset: Option<String>,
    pub name: Option<String>,
}

/// `{byId, allIds}` form of an ordered map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Indexed<T> {
    pub by_id: IndexMap<String, T>,
    pub all_ids: Vec<String>,
}

impl<T: Clone> Indexed<T> {
    fn from_map(map: &IndexMap<String, T>) -> Self {
        Self {
            by_id: map.clone(),
            all_ids: map.keys().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUpdatePayload {
    pub table_instance: TableInstance,
    pub columns: Indexed<Column>,
    pub rows: Indexed<Row>,
}

/// Reshape `doc` for the backend's table update.
///
/// `nCellsReconciliated` comes from the authoritative context of
/// `reconciled_column`, or 0 when that column has none. Header fields this
/// crate does not know about are not sent.
pub fn backend_update_payload(
    doc: &TableDocument,
    reconciled_column: &str,
    identity: Option<TableIdentity>,
) -> BackendUpdatePayload {
    let reconciliated = doc
        .columns
        .get(reconciled_column)
        .and_then(Column::authoritative_context)
        .map_or(0, |(_, info)| info.reconciliated);

    let mut table_instance = doc.table.clone();
    table_instance.n_cells_reconciliated = Some(reconciliated);
    table_instance.extra.clear();
    if let Some(identity) = identity {
        if let Some(id) = identity.id {
            table_instance.id = id;
        }
        if let Some(id_dataset) = identity.id_dataset {
            table_instance.id_dataset = id_dataset;
        }
        if let Some(name) = identity.name {
            table_instance.name = name;
        }
    }

    BackendUpdatePayload {
        table_instance,
        columns: Indexed::from_map(&doc.columns),
        rows: Indexed::from_map(&doc.rows),
    }
}
